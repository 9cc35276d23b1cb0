use accesstat::{analyze_file, CombinedParser, IngestOptions, Report, Statistics};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Access logs in combined format
    #[clap(required = true)]
    files: Vec<PathBuf>,

    /// Abort a file when one of its lines is longer than this (in characters)
    #[clap(long, default_value_t = accesstat::ingest::DEFAULT_MAX_LINE_LENGTH)]
    max_line_length: usize,

    /// Fold all files into one report instead of one report per file
    #[clap(long)]
    cumulative: bool,

    /// Print reports as JSON
    #[clap(long)]
    json: bool,
}

fn print_report(args: &Cli, title: &str, stats: &Statistics) -> Result<()> {
    let report = Report::from_statistics(stats);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("== {}", title);
        print!("{}", report);
    }
    Ok(())
}

fn run(args: &Cli) -> Result<bool> {
    let parser = CombinedParser::default();
    let options = IngestOptions {
        max_line_length: args.max_line_length,
    };
    let mut all_ok = true;
    let mut cumulative = Statistics::new();

    for (idx, path) in args.files.iter().enumerate() {
        let mut own = Statistics::new();
        let stats = if args.cumulative {
            &mut cumulative
        } else {
            &mut own
        };
        match analyze_file(path, &parser, stats, &options) {
            Ok(summary) => {
                tracing::info!(
                    "File #{} {}: {} lines ({} parsed, {} malformed), longest {}, shortest {}",
                    idx + 1,
                    path.display(),
                    summary.total_lines,
                    summary.parsed,
                    summary.malformed,
                    summary.longest_line,
                    summary.shortest_line
                );
            }
            Err(e) => {
                tracing::error!("Stopped analysing {}: {}", path.display(), e);
                all_ok = false;
                // a partially read file still reports what was folded before the failure
                if own.is_empty() {
                    continue;
                }
            }
        }
        if !args.cumulative {
            print_report(args, &path.display().to_string(), &own)?;
        }
    }

    if args.cumulative {
        print_report(args, "all files", &cumulative)?;
    }
    Ok(all_ok)
}

fn main() -> Result<()> {
    std::env::set_var(
        "RUST_LOG",
        format!("info,{}", std::env::var("RUST_LOG").unwrap_or_default()),
    );
    let enable_color = std::env::var("NO_COLOR").is_err();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(enable_color)
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    tracing::debug!("{:?}", args);

    if !run(&args)? {
        std::process::exit(1);
    }
    Ok(())
}
