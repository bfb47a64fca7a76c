//! `voxgrade`: rate a degraded recording against its reference.
//!
//! ```text
//! voxgrade <reference.wav> <degraded.wav> [--narrowband] [--config <file>] [--json] [--raw]
//! ```
//!
//! The score goes to stdout; logs go to stderr (`RUST_LOG`, default
//! `voxgrade=info`).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;
use voxgrade_core::{Bandwidth, Rater, RatingConfig};

const USAGE: &str = "Usage: voxgrade <reference.wav> <degraded.wav> \
[--narrowband] [--config <file.json>] [--json] [--raw]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Score,
    Raw,
    Json,
}

#[derive(Debug)]
struct Args {
    reference: PathBuf,
    degraded: PathBuf,
    narrowband: bool,
    config: Option<PathBuf>,
    output: Output,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut narrowband = false;
    let mut config: Option<PathBuf> = None;
    let mut output = Output::Score;

    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--narrowband" => narrowband = true,
            "--config" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --config");
                };
                config = Some(PathBuf::from(v));
            }
            "--json" => output = Output::Json,
            "--raw" => output = Output::Raw,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown argument: {other}"),
            _ => files.push(PathBuf::from(arg)),
        }
    }

    let [reference, degraded]: [PathBuf; 2] = files
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected two WAV files\n{USAGE}"))?;
    Ok(Args {
        reference,
        degraded,
        narrowband,
        config,
        output,
    })
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RatingConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => RatingConfig::default(),
    };
    if args.narrowband {
        config.bandwidth = Bandwidth::Narrowband;
    }

    let rater = Rater::new(config);
    info!(
        reference = %args.reference.display(),
        degraded = %args.degraded.display(),
        bandwidth = ?config.bandwidth,
        "rating"
    );
    let report = rater
        .rate_files(&args.reference, &args.degraded)
        .with_context(|| {
            format!(
                "rating {} against {}",
                args.degraded.display(),
                args.reference.display()
            )
        })?;

    match args.output {
        Output::Score => println!("{}", format_score(report.score)),
        Output::Raw => println!("{}", format_score(report.raw_score)),
        Output::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Four significant digits, as `4.123` or `12.35`.
fn format_score(v: f32) -> String {
    let magnitude = if v == 0.0 {
        0
    } else {
        v.abs().log10().floor() as i32
    };
    let decimals = (3 - magnitude).max(0) as usize;
    format!("{v:.decimals$}")
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voxgrade=info")),
        )
        .init();

    let result = parse_args(std::env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        eprintln!("voxgrade: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_files_and_flags() {
        let a = args(&["ref.wav", "--narrowband", "deg.wav", "--json"]).unwrap();
        assert_eq!(a.reference, PathBuf::from("ref.wav"));
        assert_eq!(a.degraded, PathBuf::from("deg.wav"));
        assert!(a.narrowband);
        assert_eq!(a.output, Output::Json);
        assert!(a.config.is_none());
    }

    #[test]
    fn config_needs_a_value() {
        assert!(args(&["a.wav", "b.wav", "--config"]).is_err());
        let a = args(&["a.wav", "b.wav", "--config", "c.json", "--raw"]).unwrap();
        assert_eq!(a.config, Some(PathBuf::from("c.json")));
        assert_eq!(a.output, Output::Raw);
    }

    #[test]
    fn rejects_wrong_file_count_and_unknown_flags() {
        assert!(args(&["a.wav"]).is_err());
        assert!(args(&["a.wav", "b.wav", "c.wav"]).is_err());
        assert!(args(&["a.wav", "b.wav", "--wideband"]).is_err());
    }

    #[test]
    fn scores_keep_four_significant_digits() {
        assert_eq!(format_score(4.12345), "4.123");
        assert_eq!(format_score(1.0), "1.000");
        assert_eq!(format_score(-0.5), "-0.5000");
        assert_eq!(format_score(0.0), "0.000");
    }
}
