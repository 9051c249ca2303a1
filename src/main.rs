use clap::Parser;
use eyre::{Context, Result, eyre};
use granola_export::paths::{FilenameStyle, PathRegistry};
use granola_export::utils::{self, ProcessResult};
use granola_export::{exporter, shared};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Export Granola meeting notes, summaries and transcripts to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to export markdown files.
    /// Defaults to ./granola-backup if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    /// Path to Granola's cache file (cache-v3.json).
    /// Auto-detected if omitted.
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/granola-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Shared note URL (https://notes.granola.ai/d/...) or bare note id. Repeatable.
    /// When given, only shared notes are fetched.
    #[arg(long, value_name = "URL")]
    url: Vec<String>,

    /// Overwrite existing files.
    #[arg(short, long, visible_alias = "overwrite")]
    force: bool,

    /// Use slugified filenames (2024-05-06-weekly-sync.md).
    #[arg(long)]
    slug: bool,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output (progress bars).
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    filename_style: Option<FilenameStyle>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("granola-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fetch_shared(urls: &[String], config: &utils::ExportConfig) -> Result<()> {
    let client = shared::build_client()?;
    let mut registry = PathRegistry::new();
    let mut failures = 0usize;

    for arg in urls {
        let outcome = shared::resolve_share_url(arg).and_then(|url| {
            if !config.quiet {
                eprintln!("Fetching shared note from {} ...", url);
            }
            shared::save_shared_note(&client, &url, config, &mut registry)
        });
        match outcome {
            Ok((path, ProcessResult::Skipped)) => {
                if !config.quiet {
                    eprintln!("Skipped (already exists): {}", path.display());
                }
            }
            Ok((path, _)) => {
                if !config.quiet {
                    eprintln!("Saved: {}", path.display());
                }
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error fetching {}: {:#}", arg, e);
            }
        }
    }

    if failures == urls.len() {
        return Err(eyre!("No shared notes could be saved"));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve target_dir (CLI > Config > Default)
    let target_dir = cli
        .target_dir
        .or(file_cfg.target_dir)
        .unwrap_or_else(|| PathBuf::from("granola-backup"));

    // 3. Resolve filename style (CLI flag > Config > Default)
    let filename_style = if cli.slug {
        FilenameStyle::Slug
    } else {
        file_cfg.filename_style.unwrap_or_default()
    };

    // 4. Resolve cache_path (CLI > Config > Auto-detect)
    let cache_path = cli
        .cache
        .or(file_cfg.cache_path)
        .or_else(utils::default_cache_path);

    // 5. Build the Export Config
    let config = utils::ExportConfig {
        target_dir,
        cache_path: cache_path.clone().unwrap_or_default(),
        filename_style,
        force: cli.force,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    // 6. Run the Business Logic
    if !cli.url.is_empty() {
        return fetch_shared(&cli.url, &config);
    }

    let Some(cache_path) = cache_path else {
        return Err(eyre!(
            "Could not determine cache path.\nUse --cache to specify manually, or set cache_path in config.toml."
        ));
    };
    if !cache_path.exists() {
        return Err(eyre!(
            "Granola cache not found at: {}\nMake sure Granola is installed and has been used at least once, or use --cache to specify the path.",
            cache_path.display()
        ));
    }

    if !config.quiet {
        eprintln!("Loading cache from {} ...", cache_path.display());
    }
    exporter::execute(&config).map(|_| ())
}
