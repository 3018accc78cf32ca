mod flags;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use flags::SearchMethodFlag;
use std::path::{Path, PathBuf};
use trice_id::{IdCatalog, LocationCatalog, Run, RunConfig, SourceScanner};

#[derive(Parser)]
#[command(name = "trice")]
#[command(about = "ID management for compact trace logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove trice IDs from source files
    Clean(RunArgs),

    /// Assign trice IDs in source files and update the ID list
    Insert(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source roots to process (repeatable)
    #[arg(long = "src", default_value = ".")]
    src: Vec<PathBuf>,

    /// Path of the ID list JSON file
    #[arg(long, default_value = "til.json")]
    til: PathBuf,

    /// Path of the location information JSON file
    #[arg(long, default_value = "li.json")]
    li: PathBuf,

    /// Smallest ID the allocator may hand out
    #[arg(long, default_value_t = 1000)]
    id_min: u32,

    /// Largest ID the allocator may hand out
    #[arg(long, default_value_t = 7999)]
    id_max: u32,

    /// ID search strategy
    #[arg(long, value_enum, default_value_t = SearchMethodFlag::Random)]
    id_method: SearchMethodFlag,

    /// Use the file cache under <user-home>/.trice/cache
    #[arg(long)]
    cache: bool,

    /// Override the home directory the cache resolves under
    #[arg(long)]
    user_home: Option<PathBuf>,

    /// Tolerate a missing location information file
    #[arg(long)]
    logging: bool,

    /// Prefix marking format strings exempt from specifier-count checks
    #[arg(long, default_value = "")]
    s_alias_prefix: String,

    /// Suffix marking format strings exempt from specifier-count checks
    #[arg(long, default_value = "")]
    s_alias_suffix: String,
}

impl RunArgs {
    fn to_config(&self, verbose: bool) -> RunConfig {
        let defaults = RunConfig::with_defaults();
        RunConfig {
            cache_enabled: self.cache,
            user_home: self.user_home.clone().unwrap_or(defaults.user_home),
            id_min: self.id_min,
            id_max: self.id_max,
            id_method: self.id_method.as_domain(),
            verbose,
            logging: self.logging,
            s_alias_prefix: self.s_alias_prefix.clone(),
            s_alias_suffix: self.s_alias_suffix.clone(),
            src_extensions: defaults.src_extensions,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Clean(args) => cmd_clean(&args, cli.verbose),
        Commands::Insert(args) => cmd_insert(&args, cli.verbose),
    }
}

fn cmd_clean(args: &RunArgs, verbose: bool) -> Result<()> {
    let cfg = args.to_config(verbose);
    let files = SourceScanner::new(&args.src, &cfg).scan();

    let mut run = Run::new(cfg, IdCatalog::new(), LocationCatalog::new());
    run.clean_tree(&files)?;
    finish(run, None)
}

fn cmd_insert(args: &RunArgs, verbose: bool) -> Result<()> {
    let cfg = args.to_config(verbose);
    let catalog = IdCatalog::load(&args.til)?;
    let locations = LocationCatalog::load(&args.li, cfg.logging)?;
    let files = SourceScanner::new(&args.src, &cfg).scan();

    let mut run = Run::new(cfg, catalog, locations);
    run.insert_tree(&files)?;
    run.save_catalogs(&args.til, &args.li)?;
    finish(run, Some(&args.til))
}

fn finish(run: Run, til: Option<&Path>) -> Result<()> {
    if let Some(til) = til {
        log::info!("ID list {} holds {} items", til.display(), run.catalog().len());
    }
    let stats = run.into_stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    if stats.has_errors() {
        bail!("{} file(s) failed", stats.errors.len());
    }
    Ok(())
}
