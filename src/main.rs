use clap::Parser;
use imgfetch::config::{CliArgs, Config};
use imgfetch::dedupe::DedupeStrategy;
use imgfetch::driver::{UrlSource, run_batch};
use imgfetch::fetch::Fetcher;
use log::{LevelFilter, debug, info};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "imgfetch")]
#[command(about = "Fetch images from URLs into a local directory, skipping duplicates")]
struct Args {
    /// Image URLs to fetch (prompts for a comma-separated list if omitted)
    urls: Vec<String>,

    /// Directory to save images into (default: Fetched_Images)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Read URLs from a file, comma or newline separated (use - for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Duplicate detection strategy [possible values: index, scan]
    #[arg(long, value_enum)]
    dedupe: Option<DedupeStrategy>,

    /// Per-request timeout in seconds (default: 10)
    #[arg(long = "timeout")]
    timeout_secs: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long = "user-agent")]
    user_agent: Option<String>,

    /// Largest response body accepted, in bytes (default: unlimited)
    #[arg(long = "max-bytes")]
    max_bytes: Option<u64>,

    /// Exit with a non-zero status if any URL failed with an error
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    strict: Option<bool>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors and the summary
    #[arg(short, long)]
    quiet: bool,
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp(None)
        .init();
}

fn main() -> io::Result<ExitCode> {
    let args = Args::parse();
    init_logger(args.verbose, args.quiet);

    let cli_args = CliArgs {
        dir: args.dir,
        user_agent: args.user_agent,
        timeout_secs: args.timeout_secs,
        max_bytes: args.max_bytes,
        dedupe: args.dedupe,
        strict: args.strict,
    };
    let cfg = Config::build(cli_args, args.config);

    debug!("Save directory: {:?}", cfg.save_dir);
    debug!("Dedupe strategy: {:?}", cfg.dedupe);
    debug!("Timeout: {}s", cfg.timeout_secs);
    debug!("Strict mode: {}", cfg.strict);

    if !args.quiet {
        println!("Welcome to the Ubuntu Image Fetcher");
        println!("A tool for mindfully collecting images from the web\n");
    }

    let urls = UrlSource::select(args.urls, args.input).collect()?;
    info!("Processing {} URL(s)", urls.len());

    let mut fetcher = Fetcher::new(&cfg).quiet(args.quiet);
    let summary = run_batch(&mut fetcher, &urls);

    println!("\n{}", summary.render());
    if !args.quiet {
        println!("\nConnection strengthened. Community enriched.");
    }

    if cfg.strict && summary.errors > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
