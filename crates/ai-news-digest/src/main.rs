use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use shared::{run_batch, Config, DigestWriter, Pipeline, Summary};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ai-news-digest")]
#[command(about = "Collect AI news from Product Hunt, Hacker News and X, and summarize it in Japanese")]
struct Args {
    /// Directory for the JSON, CSV, text and HTML output (overrides AI_NEWS_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print the digest without writing any files
    #[arg(long)]
    no_save: bool,

    /// Directory for the daily log file
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,
}

/// Daily log file stem; the appender adds the `.log` suffix
fn log_file_prefix(date: NaiveDate) -> String {
    format!("ai_news_{}", date.format("%Y%m%d"))
}

/// Log to stderr, and to `<log_dir>/ai_news_YYYYMMDD.log` when a directory is given.
/// The returned guard flushes the file when dropped.
fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(log_file_prefix(Local::now().date_naive()))
                .filename_suffix("log")
                .build(dir)
                .context("Failed to open log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_dir = (!args.no_log_file).then_some(args.log_dir.as_path());
    let _log_guard = init_tracing(log_dir)?;

    println!("📰 Collecting AI news...");
    let (config, report) = run_batch(Config::from_env, Pipeline::from_config)
        .await
        .context("AI news run failed")?;

    for count in &report.collected {
        println!("✓ {}: {} items", count.source, count.count);
    }
    for failure in &report.failures {
        println!("⚠ {} skipped: {}", failure.source, failure.message);
    }
    println!(
        "✓ {} of {} items are AI-related",
        report.filtered,
        report.total_collected()
    );

    let digest = &report.summary;
    if digest.is_empty() {
        println!("\nNo AI-related news found.");
        return Ok(());
    }

    let summarized = digest
        .entries
        .iter()
        .filter(|entry| matches!(entry.summary, Summary::Success(_)))
        .count();
    println!(
        "✓ Summarized {}/{} items in Japanese\n",
        summarized,
        digest.entries.len()
    );
    println!("{}", digest.text);

    if args.no_save {
        return Ok(());
    }

    let output_dir = args.output_dir.unwrap_or(config.output_dir);
    let writer = DigestWriter::new(output_dir);
    let paths = writer
        .write_all(digest)
        .with_context(|| format!("Failed to save digest to {}", writer.output_dir().display()))?;

    println!("\n💾 Saved:");
    for path in &paths {
        println!("  {}", path.display());
    }

    Ok(())
}
