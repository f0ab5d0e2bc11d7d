// src/bin/kfilter_cli.rs
use clap::Parser;
use gr_kfilter::kfilter::frontends::{
    parse_flush_policy_str, parse_input_format, parse_output_format, parse_records,
    write_records, InputFormat, OutputFormat, ParseError, CSV_HEADER,
};
use gr_kfilter::kfilter::{FadsFilter, FilterConfig, FlushPolicy, StreamingKFilter};
use std::error::Error;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn flush_arg(s: &str) -> Result<FlushPolicy, ParseError> {
    parse_flush_policy_str(Some(s))
}

/// Anonymize a stream of scalar measurements with a streaming k-anonymity filter.
///
/// Records are read from stdin (or --input), released anonymised on stdout.
/// Set KFILTER_LOG (e.g. `debug`) to see filter decisions on stderr.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Anonymity set size (> 1) [default: 100]
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Buffer length that forces publication (>= k) [default: 2000]
    #[arg(short = 'd', long = "delay")]
    delay: Option<usize>,

    /// Maximum cluster age for reuse, in ticks [default: 200]
    #[arg(short = 'r', long = "reuse", allow_hyphen_values = true)]
    reuse: Option<i64>,

    /// What to do with buffered records at end of input (drop|publish) [default: drop]
    #[arg(long, value_parser = flush_arg)]
    flush: Option<FlushPolicy>,

    /// JSON file with filter parameters; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read records from this file instead of stdin
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Input format (csv|ndjson)
    #[arg(long, value_parser = parse_input_format, default_value = "csv")]
    input_format: InputFormat,

    /// Output format (csv|ndjson)
    #[arg(short = 'o', long, value_parser = parse_output_format, default_value = "csv")]
    output: OutputFormat,

    /// Omit the CSV header line
    #[arg(long)]
    no_header: bool,

    /// Print the final metrics as JSON on stderr
    #[arg(long)]
    metrics: bool,
}

impl Args {
    fn filter_config(&self) -> Result<FilterConfig, Box<dyn Error>> {
        let mut cfg = match &self.config {
            Some(path) => FilterConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => FilterConfig::default(),
        };
        if let Some(k) = self.k {
            cfg.k = k;
        }
        if let Some(d) = self.delay {
            cfg.delay_constraint = d;
        }
        if let Some(r) = self.reuse {
            cfg.reuse_constraint = r;
        }
        if let Some(p) = self.flush {
            cfg.flush_policy = p;
        }
        Ok(cfg)
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<String, Box<dyn Error>> {
    match path {
        Some(p) => Ok(std::fs::read_to_string(p)?),
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            Ok(s)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("KFILTER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();
    let args = Args::parse();

    let mut filter = FadsFilter::from_config(args.filter_config()?)?;
    let records = parse_records(&read_input(args.input.as_ref())?, args.input_format)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.output == OutputFormat::Csv && !args.no_header {
        writeln!(out, "{CSV_HEADER}")?;
    }

    for r in records {
        filter.ingest(r);
        write_records(&mut out, &filter.drain_outputs(), args.output)?;
    }
    filter.flush();
    write_records(&mut out, &filter.drain_outputs(), args.output)?;
    out.flush()?;

    if args.metrics {
        eprintln!("{}", serde_json::to_string(&filter.metrics())?);
    }
    Ok(())
}
