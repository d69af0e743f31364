//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("lumen")
}

fn get_fixture_path(name: &str) -> String {
    format!("../core/tests/fixtures/{}", name)
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("fingerprint"));
}

#[test]
fn test_cli_fingerprint() {
    cmd()
        .args(["fingerprint", "--title", "Foo", "--content", "bar body", "https://a.example/x"])
        .assert()
        .success()
        .stdout("2beeb21e39de8499cfaf24c3ba9c784661e193b93a6b899867f88c76a1d4477d\n");
}

#[test]
fn test_cli_fingerprint_of_link_only() {
    let out = cmd().args(["fingerprint", "https://a.example/x"]).output().unwrap();
    assert!(out.status.success());
    let hex = String::from_utf8(out.stdout).unwrap();
    assert_eq!(hex.trim().len(), 64);
}

#[test]
fn test_cli_feed_file() {
    cmd()
        .args(["feed", &get_fixture_path("feeds/world.rss")])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://harbor.example/news/cranes"))
        .stdout(predicate::str::contains("2024-05-01"));
}

#[test]
fn test_cli_feed_json() {
    let out = cmd().args(["feed", "--json", &get_fixture_path("feeds/science.atom")]).output().unwrap();
    assert!(out.status.success());

    let entries: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[0]["link"], "https://harbor.example/science/tides");
}

#[test]
fn test_cli_feed_stdin() {
    let xml = std::fs::read_to_string(get_fixture_path("feeds/world.rss")).unwrap();
    cmd()
        .args(["feed", "-"])
        .write_stdin(xml)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ferry timetable changes"));
}

#[test]
fn test_cli_feed_rejects_html() {
    cmd()
        .args(["feed", &get_fixture_path("pages/cranes.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse feed"));
}

#[test]
fn test_cli_extract_json() {
    let out = cmd()
        .args(["extract", "--url", "https://harbor.example/news/cranes", &get_fixture_path("pages/cranes.html")])
        .output()
        .unwrap();
    assert!(out.status.success());

    let extracted: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(extracted["canonical_url"], "https://harbor.example/world/2024/05/01/harbor-cranes-return");
    assert_eq!(extracted["title"], "Harbor cranes return after storm");
}

#[test]
fn test_cli_extract_text_to_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("cranes.txt");

    cmd()
        .args(["extract", "-f", "text", "-o", output.to_str().unwrap()])
        .arg(get_fixture_path("pages/cranes.html"))
        .assert()
        .success();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("Container cranes"));
}

#[test]
fn test_cli_extract_invalid_format() {
    cmd()
        .args(["extract", "-f", "pdf", &get_fixture_path("pages/cranes.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_cli_ingest_unreachable_sources() {
    let tmp = TempDir::new().unwrap();
    let sources = tmp.path().join("sources.json");
    let store = tmp.path().join("store").join("articles.json");
    std::fs::write(
        &sources,
        r#"[{"id":"down","name":"Down","feed_url":"http://127.0.0.1:9/rss","leaning":"center"}]"#,
    )
    .unwrap();

    let out = cmd()
        .args(["ingest", "--timeout", "2", "--sources", sources.to_str().unwrap()])
        .args(["--store", store.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(out.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(summary["sourcesAttempted"], 1);
    assert_eq!(summary["sourcesFailed"], 1);
    assert_eq!(summary["articlesAccepted"], 0);
    assert_eq!(summary["failures"][0]["kind"], "feed");
}

#[test]
fn test_cli_ingest_empty_sources_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let sources = tmp.path().join("sources.toml");
    std::fs::write(&sources, "").unwrap();

    cmd()
        .args(["ingest", "--dry-run", "--sources", sources.to_str().unwrap()])
        .args(["--store", tmp.path().join("articles.json").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no sources configured"));
}

#[test]
fn test_cli_ingest_missing_sources_file() {
    cmd()
        .args(["ingest", "--sources", "/nonexistent/sources.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading sources"));
}

#[test]
fn test_cli_completions() {
    cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lumen"));
}
