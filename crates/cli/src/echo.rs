use owo_colors::OwoColorize;

use lumen_core::{ExtractedContent, RunFailure, RunSummary};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Lumen".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "News ingestion pipeline\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

fn print_row(label: &str, value: impl std::fmt::Display) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.to_string().bright_white());
}

/// Print the counters of a finished run, then each recorded failure
pub fn print_run_summary(summary: &RunSummary) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Run Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_row("Sources attempted", summary.sources_attempted);
    print_row("Sources failed", summary.sources_failed);
    print_row("Entries fetched", summary.entries_fetched);
    print_row("Articles accepted", summary.articles_accepted);
    print_row("Duplicates skipped", summary.duplicates_skipped);
    print_row("Extraction errors", summary.extraction_errors);
    print_row("Persistence errors", summary.persistence_errors);
    let elapsed = summary.finished_at - summary.started_at;
    print_row("Elapsed", format!("{:.2}s", elapsed.as_seconds_f64()));
    eprintln!();

    for failure in &summary.failures {
        match failure {
            RunFailure::Feed { source_id, cause } => print_warning(&format!("feed {}: {}", source_id, cause)),
            RunFailure::Extraction { link, cause, .. } => print_warning(&format!("page {}: {}", link, cause)),
            RunFailure::Persistence { link, cause, .. } => print_error(&format!("store {}: {}", link, cause)),
        }
    }
}

/// Print extraction details summary
pub fn print_extraction_details(extracted: &ExtractedContent) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_row("Canonical URL", &extracted.canonical_url);
    if let Some(title) = &extracted.title {
        print_row("Title", title);
    }
    if let Some(text) = &extracted.main_text {
        print_row("Text", format_size(text.len()));
    }
    if let Some(image) = &extracted.lead_image_url {
        print_row("Lead image", image);
    }
    eprintln!();
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
