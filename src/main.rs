mod cli;

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use url::Url;
use vodplay::{
    catalog::{HttpCatalog, VideoCatalog},
    config::{self, Config},
    orchestrator::{Route, SessionOrchestrator},
    player::{HeadlessSink, HlsEngineFactory, PlaybackStatus},
};
use vodplay_common::VideoId;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vodplay=trace,vodplay_hls=trace".to_string()
        } else {
            "vodplay=debug,vodplay_hls=debug".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::List => block_on(list_videos(config_path)),
        Commands::Play { id, quality } => block_on(play(config_path, id, quality)),
        Commands::Delete { id, yes } => block_on(delete(config_path, id, yes)),
        Commands::Upload {
            file,
            title,
            description,
        } => block_on(upload(config_path, &file, &title, &description)),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vodplay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}

fn catalog_for(config: &Config) -> Result<HttpCatalog> {
    let base_url = Url::parse(&config.api.base_url)
        .with_context(|| format!("Invalid API base URL: {}", config.api.base_url))?;
    HttpCatalog::new(base_url, config.api.timeout()).context("Failed to build HTTP client")
}

async fn list_videos(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = catalog_for(&config)?;

    let entries = catalog.list_videos().await?;
    if entries.is_empty() {
        println!("No videos available.");
        return Ok(());
    }

    for entry in entries {
        let Some(id) = entry.key() else {
            tracing::debug!("Skipping catalog entry without an id: {:?}", entry);
            continue;
        };
        let record = entry.into_record(&id);
        let duration = record
            .duration_seconds
            .map(format_duration)
            .unwrap_or_else(|| "--:--".to_string());
        println!("{}  {:>8}  {}", record.id, duration, record.display_title());
    }

    Ok(())
}

async fn play(config_path: Option<&Path>, id: Option<String>, quality: Option<String>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = Arc::new(catalog_for(&config)?);

    let id = match id {
        Some(id) => VideoId::new(id),
        None => {
            let first = catalog
                .list_videos()
                .await?
                .into_iter()
                .find_map(|e| e.key())
                .context("The catalog is empty")?;
            tracing::info!(video_id = %first, "No video given, playing the first catalog entry");
            first
        }
    };

    let engines = Arc::new(HlsEngineFactory::new(
        catalog.client().clone(),
        config.playback.bandwidth_estimate_bps,
    ));
    let sink = HeadlessSink::new();
    let options = config.playback.session_options(quality.as_deref());

    let mut orchestrator = SessionOrchestrator::new(catalog, engines, options)
        .with_settle(config.playback.settle());
    orchestrator.attach_sink(Arc::new(sink.clone()));
    orchestrator.navigate(id);

    let settled = orchestrator
        .pump_until(config.api.timeout(), |view| {
            view.error.is_some()
                || matches!(
                    view.playback_status,
                    PlaybackStatus::Playing | PlaybackStatus::Failed
                )
        })
        .await;
    orchestrator.run_until_settled().await;
    if !settled {
        tracing::warn!("Timed out waiting for playback to start");
    }

    let view = orchestrator.view();
    if let Some(record) = &view.record {
        println!("{}", record.display_title());
        println!("{}", record.display_description());
    }
    if !view.quality_levels.is_empty() {
        println!("Quality levels:");
        for level in &view.quality_levels {
            let marker = if level.selection() == view.selected_quality {
                "*"
            } else {
                " "
            };
            println!(" {} {:>3}  {}", marker, level.index, level.label);
        }
    }
    if let Some(source) = sink.source() {
        println!("Source: {}", source);
    }
    println!("Status: {}", view.playback_status);

    orchestrator.shutdown();

    match view.error_message() {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}

async fn delete(config_path: Option<&Path>, id: String, yes: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = Arc::new(catalog_for(&config)?);
    let engines = Arc::new(HlsEngineFactory::new(
        catalog.client().clone(),
        config.playback.bandwidth_estimate_bps,
    ));

    let confirmed = yes || confirm(&format!("Delete video {}?", id))?;

    let mut orchestrator =
        SessionOrchestrator::new(catalog, engines, config.playback.session_options(None));
    orchestrator.navigate(id.as_str());
    if !orchestrator.request_delete(confirmed) {
        println!("Not deleted.");
        return Ok(());
    }

    orchestrator
        .pump_until(config.api.timeout(), |view| !view.deleting)
        .await;

    let view = orchestrator.view();
    if view.route == Route::Catalog {
        println!("Deleted {}", id);
        return Ok(());
    }
    match view.error_message() {
        Some(message) if !view.deleting => anyhow::bail!(message),
        _ => anyhow::bail!("Timed out waiting for the delete to complete"),
    }
}

async fn upload(config_path: Option<&Path>, file: &Path, title: &str, description: &str) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let catalog = catalog_for(&config)?;

    let entry = catalog.upload_video(file, title, description).await?;
    match entry.key() {
        Some(id) => println!("Uploaded {} as {}", file.display(), id),
        None => println!("Uploaded {}", file.display()),
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (hours, mins, secs) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  API: {}", config.api.base_url);
            println!("  Timeout: {}s", config.api.timeout_secs);
            println!("  Autoplay: {}", config.playback.autoplay);
            println!("  Initial quality: {}", config.playback.initial_quality);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  API: {}", config.api.base_url);
        }
    }

    Ok(())
}
