use mediasift::cli::{Cli, Commands, ConfigAction};
use mediasift::config::{expand_path, Config};
use mediasift::error::{MediaSiftError, Result};
use mediasift::{Engine, StopFlag, UpdateOutcome};
use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Index { dir, profile } => {
            cmd_index(cli.config, dir, profile)?;
        }
        Commands::Search {
            query,
            limit,
            page,
            per_page,
            json,
        } => {
            cmd_search(cli.config, &query, limit, page, per_page, json)?;
        }
        Commands::Status { json } => {
            cmd_status(cli.config, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "mediasift=debug"
    } else {
        "mediasift=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_index(
    config_path: Option<PathBuf>,
    dir: Option<PathBuf>,
    profile: Option<String>,
) -> Result<()> {
    let config = load_config(config_path, profile)?;
    let engine = Engine::open(&config)?;

    let root = match dir {
        Some(dir) => expand_path(&dir)?,
        None => engine.media_dir().to_path_buf(),
    };
    println!("Indexing {}", root.display());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| MediaSiftError::io(e, "Failed to create tokio runtime"))?;

    let outcome = rt.block_on(async {
        let stop = StopFlag::new();

        // Ctrl-C only raises the flag; the run stops between two files
        let watcher = {
            let stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nStopping after the current file...");
                    stop.request_stop();
                }
            })
        };

        let result = engine.spawn_update(root, print_progress, stop).join().await;
        watcher.abort();
        result
    })?;

    match outcome {
        UpdateOutcome::NoNewFiles => {
            println!("✓ Index is up to date ({} entries)", engine.status().entries);
        }
        UpdateOutcome::Completed(stats) => {
            println!(
                "✓ Indexed {} new files in {:.1}s",
                stats.added,
                stats.duration_ms as f64 / 1000.0
            );
            if stats.failed > 0 {
                println!("  Skipped {} files that could not be read", stats.failed);
            }
            println!("  Index now holds {} entries", engine.status().entries);
        }
        UpdateOutcome::Cancelled(stats) => {
            println!(
                "Stopped at {}/{}. Run `mediasift index` again to resume.",
                stats.processed, stats.total
            );
        }
    }

    Ok(())
}

fn print_progress(processed: usize, total: usize) {
    if total == 0 {
        return;
    }

    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r  [{}/{}]", processed, total);
    if processed == total {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

fn cmd_search(
    config_path: Option<PathBuf>,
    query: &str,
    limit: Option<usize>,
    page: usize,
    per_page: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut config = load_config(config_path, None)?;
    if let Some(limit) = limit {
        config.search.fetch_limit = limit;
    }
    let per_page = per_page.unwrap_or(config.search.per_page);

    let engine = Engine::open(&config)?;
    if !engine.exists_and_nonempty() {
        println!("Index is empty. Run 'mediasift index' first.");
        return Ok(());
    }

    let results = engine.search_page(query, page, per_page)?;

    if json {
        let out = serde_json::to_string_pretty(&results).map_err(|e| MediaSiftError::Json {
            source: e,
            context: "Failed to serialize search results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if results.results.is_empty() {
        println!("No results");
        return Ok(());
    }

    let first = (page.max(1) - 1) * per_page.max(1);
    for (i, hit) in results.results.iter().enumerate() {
        println!("{:>4}. {:>5.1}  {}", first + i + 1, hit.score, hit.path);
    }
    if results.has_more {
        println!("\nMore results: --page {}", page.max(1) + 1);
    }

    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path, None)?;
    let engine = Engine::open(&config)?;
    let status = engine.status();

    if json {
        let out = serde_json::to_string_pretty(&status).map_err(|e| MediaSiftError::Json {
            source: e,
            context: "Failed to serialize status".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    println!("mediasift Status");
    println!("================");
    println!("\nIndex: {}", status.snapshot_path.display());
    println!("  Entries: {}", status.entries);
    if let Some(dimension) = status.dimension {
        println!("  Dimension: {}", dimension);
    }
    match status.last_updated {
        Some(at) => println!("  Last updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Last updated: never"),
    }

    if let Some(progress) = status.pending_progress {
        println!(
            "\nInterrupted run: {}/{} files (saved {})",
            progress.processed_files,
            progress.total_files,
            progress.last_save_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| MediaSiftError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MediaSiftError::io(
                        e,
                        format!("Failed to create config directory: {:?}", parent),
                    )
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'mediasift config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        return Ok(config);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}
