use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use giil::exif;
use giil::fetch::{self, HttpFetcher, PageFetcher};
use giil::format::{self, Format};
use giil::outcome::{FetchFailure, OutcomeKind};
use giil::report::{self, MetadataRecord, Outcome};

#[derive(Parser, Debug)]
#[command(
    name = "giil",
    version,
    about = "Fetch an image from a share link, extract metadata, and print a structured result"
)]
struct Cli {
    /// Share link to fetch the image from
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Output format: json or toon (overrides GIIL_OUTPUT_FORMAT)
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Directory to save the downloaded image into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Fetch timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    timeout: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging (diagnostics go to stderr; stdout carries the result)
    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Resolve the format first: an invalid value aborts before any fetch.
    let format = match format::resolve_from_env(cli.format.as_deref()) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("giil: {e}");
            std::process::exit(i32::from(OutcomeKind::UsageError.exit_code()));
        }
    };

    let outcome = run(&cli).await;
    let code = match report::emit(&outcome, format) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("giil: failed to encode result: {e}");
            1
        }
    };
    std::process::exit(i32::from(code));
}

async fn run(cli: &Cli) -> Outcome {
    let Some(url) = cli.url.as_deref() else {
        return failure(FetchFailure::MissingUrl);
    };
    match fetch_and_save(cli, url).await {
        Ok(record) => Outcome::Success(record),
        Err(e) => failure(e),
    }
}

fn failure(signal: FetchFailure) -> Outcome {
    let kind = OutcomeKind::classify(&signal);
    log::debug!("Fetch failed: {signal} → {}", kind.code());
    Outcome::Failure(kind, signal.to_string())
}

async fn fetch_and_save(cli: &Cli, url: &str) -> Result<MetadataRecord, FetchFailure> {
    let fetcher = HttpFetcher::new();
    log::debug!("Fetching {url} via {}", fetcher.name());

    let image = fetcher.fetch(url, Duration::from_secs(cli.timeout)).await?;
    log::debug!(
        "Fetched {} bytes ({})",
        image.bytes.len(),
        image.content_type.as_deref().unwrap_or("unknown type")
    );

    let path = fetch::save_image(&cli.output, &image)?;
    log::debug!("Saved {}", path.display());

    let mut record = MetadataRecord::new(
        path.display().to_string(),
        image.method.to_string(),
        image.bytes.len() as u64,
    );
    record.dimensions = exif::dimensions(&image.bytes);
    record.captured_at = exif::capture_time(&image.bytes);
    Ok(record)
}
