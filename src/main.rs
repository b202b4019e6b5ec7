//! Pathman CLI - copy and inspect local and S3 paths

use anyhow::Context;
use clap::Parser;
use pathman::config::{CliArgs, Commands, LogFormat};
use pathman::{Copier, PathHandle, Storage};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    init_logging(&args);

    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// -v/-q override RUST_LOG; without them RUST_LOG applies, defaulting to warn
fn init_logging(args: &CliArgs) {
    let level = if args.quiet {
        Some("error")
    } else {
        match args.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    };
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(args: CliArgs) -> anyhow::Result<i32> {
    let storage = build_storage(&args).await?;

    match &args.command {
        Commands::Copy {
            source,
            destination,
            ..
        } => {
            let options = args.command.copy_options().unwrap_or_default();
            let report = Copier::new(storage)
                .with_options(options)
                .copy(&PathHandle::new(source), &PathHandle::new(destination))
                .await
                .with_context(|| format!("copy {} -> {} failed", source, destination))?;

            if !args.quiet {
                report.print_summary();
            }
        }

        Commands::List { path, recursive } => {
            let path = PathHandle::new(path);
            let entries = if *recursive {
                storage.walk(&path).await?
            } else {
                storage.ls(&path).await?
            };
            for entry in entries {
                println!("{}", entry);
            }
        }

        Commands::Exists { path } => {
            if !storage.exists(&PathHandle::new(path)).await? {
                return Ok(1);
            }
        }

        Commands::Cat { path } => {
            let data = storage.read_bytes(&PathHandle::new(path)).await?;
            std::io::stdout()
                .write_all(&data)
                .context("failed to write to stdout")?;
        }

        Commands::Remove { path, recursive } => {
            let path = PathHandle::new(path);
            if storage.is_dir(&path).await? {
                storage.rmdir(&path, *recursive).await?;
            } else {
                storage.remove(&path).await?;
            }
        }

        Commands::Mkdir { path } => {
            storage.mkdir(&PathHandle::new(path)).await?;
        }
    }

    Ok(0)
}

#[cfg(feature = "native_s3")]
async fn build_storage(args: &CliArgs) -> anyhow::Result<Storage> {
    use pathman::config::ObjectStoreConfig;
    use pathman::storage::NativeS3Store;
    use std::sync::Arc;

    let config = match &args.config {
        Some(path) => ObjectStoreConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ObjectStoreConfig::from_env(),
    };
    tracing::debug!("Object store config: region={} endpoint={:?}", config.region, config.endpoint);

    let store = NativeS3Store::new(&config).await?;
    Ok(Storage::new(Arc::new(store)))
}

#[cfg(not(feature = "native_s3"))]
async fn build_storage(args: &CliArgs) -> anyhow::Result<Storage> {
    if args.config.is_some() {
        tracing::warn!("--config ignored: built without the native_s3 feature");
    }
    Ok(Storage::local_only())
}
