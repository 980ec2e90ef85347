// ABOUTME: CLI binary for the scrubber sanitization pipeline.
// ABOUTME: Reads a JSON array of items from a file or stdin and writes the JSON array of output records.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use digests_scrubber::{OutputRecord, Pipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scrubber")]
#[command(about = "Sanitize a batch of HTML documents and extract their main content")]
struct Args {
    /// JSON file holding an array of items (default: stdin)
    #[arg()]
    input: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Record failing items as {error, message} and keep going
    #[arg(long = "isolate")]
    isolate: bool,

    /// Number of items processed at once
    #[arg(short = 'j', long = "concurrency", default_value_t = 1)]
    concurrency: usize,

    /// Per-item deadline in milliseconds
    #[arg(long = "timeout-ms")]
    timeout_ms: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long = "pretty")]
    pretty: bool,

    /// Print elapsed time in ms to stderr
    #[arg(long = "timing")]
    timing: bool,
}

/// Read the raw batch entries. Each entry is decoded separately by the
/// pipeline, so one malformed item does not reject the whole batch.
fn read_items(input: Option<&PathBuf>) -> anyhow::Result<Vec<serde_json::Value>> {
    let raw = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("input must be a JSON array of items")
}

fn format_output(records: &[OutputRecord], pretty: bool) -> anyhow::Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(out)
}

fn build_pipeline(args: &Args) -> Pipeline {
    let mut builder = Pipeline::builder()
        .isolate_failures(args.isolate)
        .concurrency(args.concurrency);
    if let Some(ms) = args.timeout_ms {
        builder = builder.item_timeout(Duration::from_millis(ms));
    }
    builder.build()
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let items = match read_items(args.input.as_ref()) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let pipeline = build_pipeline(&args);
    let start = Instant::now();
    let records = match pipeline.run_batch(items).await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };
    let elapsed = start.elapsed();

    let output_str = match format_output(&records, args.pretty) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error encoding output: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Some(output_path) = &args.output {
        if let Err(e) = fs::write(output_path, &output_str) {
            eprintln!("error writing to {:?}: {}", output_path, e);
            return ExitCode::from(1);
        }
    } else {
        println!("{}", output_str);
    }

    if args.timing {
        let _ = writeln!(io::stderr(), "elapsed: {}ms", elapsed.as_millis());
    }

    ExitCode::SUCCESS
}
