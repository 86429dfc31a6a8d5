use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spdlog::{info, warn};

use postgraph::logger::configure_logger;
use postgraph::pipeline::{run, Settings};

use crate::commands::{build_cmd, check_cmd, feed_cmd, tags_cmd, FeedFilter};
use crate::config::open_config;

mod commands;
mod config;

const CFG_FILE_NAME: &str = "postgraph.toml";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Posts directory, overrides the configured one
    #[arg(short, long, global = true)]
    posts_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Builds the document set and writes it as JSON
    Build {
        /// Output file. Falls back to paths.output, then to stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Exit with failure when any error-level violation is found
        #[arg(long)]
        strict: bool,
    },
    /// Lists every violation, grouped by severity
    Check,
    /// Prints one page of the feed
    Feed {
        /// Only posts with this tag (case-insensitive)
        #[arg(short, long)]
        tag: Option<String>,

        /// Only posts in this category
        #[arg(long)]
        category: Option<String>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Lists tags by number of posts
    Tags,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let (mut config, config_path) = open_config(args.config_path.map(PathBuf::from))?;
    if let Some(posts_dir) = args.posts_dir {
        config.paths.posts_dir = PathBuf::from(posts_dir);
    }

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }
    match config_path {
        Some(path) => info!("Configuration read from {}", path.display()),
        None => info!("No {} found, using defaults", CFG_FILE_NAME),
    }

    let settings = Settings::from_config(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers)
        .thread_name("postgraph-worker")
        .build()
        .context("Could not start the worker runtime")?;
    let set = runtime.block_on(run(&settings))?;

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Build { output, strict } => {
            let output = output.map(PathBuf::from).or_else(|| config.paths.output.clone());
            build_cmd(&set, output, strict, &mut stdout)
        }
        Command::Check => check_cmd(&set, &mut stdout),
        Command::Feed { tag, category, page } => {
            let filter = FeedFilter { tag, category };
            feed_cmd(&set, &filter, page, config.defaults.page_size as usize, &mut stdout)
        }
        Command::Tags => tags_cmd(&set, &mut stdout),
    }
}
