use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use lumen_core::{
    CancelHandle, ContentExtractor, FetchConfig, Fetcher, HttpFetcher, Ingestor, JsonFileStore, MemoryStore,
    PersistenceAdapter, PipelineConfig, ReadabilityConfig, RunControl, fetch_file, fingerprint, load_sources,
    parse_feed,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Html,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: json, html, text", s)),
        }
    }
}

/// Ingest news articles from RSS/Atom sources
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author = "Lumen Contributors")]
#[command(version)]
#[command(about = "Ingest, extract and deduplicate news articles", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one ingestion pass over a source list and print the run summary
    Ingest(IngestArgs),
    /// Fetch or read a feed and list its entries
    Feed(FeedArgs),
    /// Extract readable content from a page
    Extract(ExtractArgs),
    /// Print the fingerprint of a title, content and link
    Fingerprint(FingerprintArgs),
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug)]
struct HttpArgs {
    /// HTTP timeout in seconds
    #[arg(long, default_value = "10", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl HttpArgs {
    fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig { timeout: self.timeout, user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent) }
    }
}

#[derive(clap::Args, Debug)]
struct IngestArgs {
    /// Source list (TOML `[[sources]]` tables or a JSON array)
    #[arg(short, long, value_name = "FILE")]
    sources: PathBuf,

    /// Article store (default: <data dir>/lumen/articles.json)
    #[arg(long, value_name = "FILE")]
    store: Option<PathBuf>,

    /// Deduplicate against the store but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Feeds and pages fetched at the same time
    #[arg(long, default_value = "4", value_name = "NUM")]
    concurrency: usize,

    /// Extract at most this many entries per feed
    #[arg(long, value_name = "NUM")]
    max_entries: Option<usize>,

    /// Stop fetching after this many seconds
    #[arg(long, value_name = "SECS")]
    run_timeout: Option<u64>,

    #[command(flatten)]
    http: HttpArgs,
}

#[derive(clap::Args, Debug)]
struct FeedArgs {
    /// Feed URL, local file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Print entries as a JSON array
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    http: HttpArgs,
}

#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Page URL, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// URL the page was served from, for local input
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (json, html, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// Minimum character threshold for content candidates
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Maximum number of top candidates to track
    #[arg(long, default_value = "5", value_name = "NUM")]
    max_elements: usize,

    /// Minimum score for a candidate to be used
    #[arg(long, default_value = "20", value_name = "SCORE")]
    min_score: f64,

    #[command(flatten)]
    http: HttpArgs,
}

#[derive(clap::Args, Debug)]
struct FingerprintArgs {
    /// Article link
    #[arg(value_name = "LINK")]
    link: String,

    /// Article title
    #[arg(long)]
    title: Option<String>,

    /// Article content
    #[arg(long)]
    content: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read `input` from stdin, a URL, or a file.
async fn read_input(input: &str, http: &HttpArgs, verbose: bool) -> anyhow::Result<String> {
    if input == "-" {
        if verbose {
            echo::print_step(1, 2, "Reading from stdin");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        Ok(buffer)
    } else if is_url(input) {
        if verbose {
            echo::print_step(1, 2, &format!("Fetching from {}", input.bright_white().underline()));
        }
        let fetcher = HttpFetcher::new(&http.fetch_config()).context("Failed to build HTTP client")?;
        fetcher.fetch_text(input).await.context("Failed to fetch URL")
    } else {
        if verbose {
            echo::print_step(1, 2, &format!("Reading from file {}", input.bright_white()));
        }
        fetch_file(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

/// A URL naming where local input came from.
fn local_page_url(input: &str) -> String {
    let path = Path::new(input);
    fs::canonicalize(path)
        .ok()
        .and_then(|abs| url::Url::from_file_path(abs).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| "file:///stdin".to_string())
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("data"))
        .join("lumen")
        .join("articles.json")
}

async fn run_ingest(args: IngestArgs, verbose: bool) -> anyhow::Result<()> {
    let sources = load_sources(&args.sources)?;
    let store_path = args.store.unwrap_or_else(default_store_path);

    if verbose {
        echo::print_info(&format!("{} sources from {}", sources.len(), args.sources.display()));
        echo::print_info(&format!("Store: {}", store_path.display()));
    }

    let file_store = JsonFileStore::new(&store_path);
    let adapter: Arc<dyn PersistenceAdapter> = if args.dry_run {
        let existing = file_store.articles().await.context("Failed to read article store")?;
        Arc::new(MemoryStore::with_articles(existing))
    } else {
        Arc::new(file_store)
    };

    let fetcher = HttpFetcher::new(&args.http.fetch_config()).context("Failed to build HTTP client")?;
    let config = PipelineConfig {
        concurrency: args.concurrency,
        max_entries_per_source: args.max_entries,
        ..Default::default()
    };
    let ingestor = Ingestor::new(Arc::new(fetcher), adapter, config);

    let handle = CancelHandle::new();
    let mut control = RunControl::new().with_cancel(&handle);
    if let Some(secs) = args.run_timeout {
        control = control.with_timeout(Duration::from_secs(secs));
    }

    let on_interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let summary = ingestor.run(&sources, &control).await?;

    if verbose {
        echo::print_run_summary(&summary);
    }
    if summary.cancelled {
        echo::print_warning("Run stopped before every fetch finished");
    }
    echo::print_success(&summary.headline());

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_feed(args: &FeedArgs, verbose: bool) -> anyhow::Result<()> {
    let xml = read_input(&args.input, &args.http, verbose).await?;
    if verbose {
        echo::print_step(2, 2, "Parsing feed");
    }
    let feed = parse_feed(&xml).context("Failed to parse feed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&feed.entries)?);
        return Ok(());
    }

    if let Some(title) = &feed.title {
        echo::print_info(title);
    }
    for entry in &feed.entries {
        let published = entry.published_at.map(|d| d.date().to_string()).unwrap_or_else(|| "-".to_string());
        println!("{}\t{}\t{}", published, entry.title.as_deref().unwrap_or("(untitled)"), entry.link);
    }
    Ok(())
}

async fn run_extract(args: ExtractArgs, verbose: bool) -> anyhow::Result<()> {
    let readability = ReadabilityConfig::builder()
        .char_threshold(args.char_threshold)
        .nb_top_candidates(args.max_elements)
        .min_score(args.min_score)
        .build();

    let html = read_input(&args.input, &args.http, verbose).await?;
    if verbose {
        echo::print_info(&format!("Size: {}", echo::format_size(html.len())));
        echo::print_step(2, 2, "Extracting main content");
    }

    let page_url = match &args.url {
        Some(url) => url.clone(),
        None if is_url(&args.input) => args.input.clone(),
        None => local_page_url(&args.input),
    };

    let extractor = ContentExtractor::new(Arc::new(HttpFetcher::new(&args.http.fetch_config())?), readability);
    let extracted = extractor.extract_html(&page_url, &html);

    if let Some(cause) = &extracted.extraction_error {
        anyhow::bail!("Failed to extract content: {}", cause);
    }
    if verbose {
        echo::print_extraction_details(&extracted);
    }

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&extracted)?,
        OutputFormat::Html => extracted.rich_html.unwrap_or_default(),
        OutputFormat::Text => extracted.main_text.unwrap_or_default(),
    };

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn run_fingerprint(args: &FingerprintArgs) {
    println!("{}", fingerprint(args.title.as_deref(), args.content.as_deref(), &args.link));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    match cli.command {
        Command::Ingest(args) => run_ingest(args, cli.verbose).await,
        Command::Feed(args) => run_feed(&args, cli.verbose).await,
        Command::Extract(args) => run_extract(args, cli.verbose).await,
        Command::Fingerprint(args) => {
            run_fingerprint(&args);
            Ok(())
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lumen", &mut io::stdout());
            Ok(())
        }
    }
}
