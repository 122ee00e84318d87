mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use site_builder_config::BuilderConfig;
use site_builder_core::history::{
    history_config, validate_site_id, HistoryConfig, PersistenceLayer,
};
use site_builder_core::{Autosaver, BlockHistoryManager, ContentBlock};

/// Edits restaurant site layouts from scripted builder actions.
#[derive(Parser, Debug)]
#[command(name = "site-builder", version, about)]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSON array of actions and print the resulting blocks.
    Replay {
        script: PathBuf,
        /// Site id (defaults to the configured site).
        #[arg(long, value_parser = parse_site_id)]
        site: Option<String>,
        /// Start from the site's latest autosave instead of an empty canvas.
        #[arg(long)]
        resume: bool,
        /// Save the result even when autosave is disabled.
        #[arg(long)]
        save: bool,
    },
    /// Print the latest saved blocks of a site.
    Show {
        #[arg(long, value_parser = parse_site_id)]
        site: Option<String>,
    },
    /// List the saved revisions of a site.
    Revisions {
        #[arg(long, value_parser = parse_site_id)]
        site: Option<String>,
    },
    /// List sites that have saved revisions.
    Sites,
    /// Delete every saved revision of a site.
    Clear {
        #[arg(long, value_parser = parse_site_id)]
        site: Option<String>,
    },
}

/// Rejects site ids that can't be used as revision keys.
fn parse_site_id(s: &str) -> std::result::Result<String, String> {
    validate_site_id(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(BuilderConfig::config_path);
    let config = BuilderConfig::load_or_create(&config_path);
    let history = history_config(&config);
    tracing::debug!(config = %config_path.display(), data_dir = %history.data_dir.display(), "config loaded");

    let site_or_default = |site: Option<String>| site.unwrap_or_else(|| config.default_site_id.clone());

    match cli.command {
        Command::Replay {
            script,
            site,
            resume,
            save,
        } => {
            let site = site_or_default(site);
            run_replay(&config, history, &script, &site, resume, save)
        }
        Command::Show { site } => show(&history.data_dir, &site_or_default(site)),
        Command::Revisions { site } => list_revisions(&history.data_dir, &site_or_default(site)),
        Command::Sites => list_sites(&history.data_dir),
        Command::Clear { site } => {
            let site = site_or_default(site);
            PersistenceLayer::open(&history.data_dir)?.delete_site(&site)?;
            tracing::info!(site_id = %site, "saved revisions cleared");
            Ok(())
        }
    }
}

fn run_replay(
    config: &BuilderConfig,
    history: HistoryConfig,
    script_path: &Path,
    site: &str,
    resume: bool,
    save: bool,
) -> Result<()> {
    validate_site_id(site)?;
    let steps = script::load_script(script_path)?;
    let persist = save || config.autosave_enabled;
    let store = if resume || persist {
        Some(PersistenceLayer::open(&history.data_dir)?)
    } else {
        None
    };

    let mut manager = match &store {
        Some(store) if resume => BlockHistoryManager::restore_or_new(site, store, history)?,
        _ => BlockHistoryManager::new(history),
    };

    let mut autosaver = match &store {
        Some(store) if persist => {
            let mut saver = Autosaver::new(
                Arc::clone(store),
                site,
                Duration::from_secs(config.autosave_interval_secs),
                config.max_autosave_revisions,
            );
            if resume {
                saver.mark_saved(&manager);
            }
            Some(saver)
        }
        _ => None,
    };

    let summary = script::replay(&mut manager, steps);
    tracing::info!(
        applied = summary.applied,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "script replayed"
    );

    if let Some(saver) = autosaver.as_mut() {
        saver.flush(&manager)?;
    }

    print_blocks(manager.blocks())
}

fn show(data_dir: &Path, site: &str) -> Result<()> {
    let store = PersistenceLayer::open(data_dir)?;
    match store.latest_revision::<Vec<ContentBlock>>(site)? {
        Some(rev) => print_blocks(&rev.state),
        None => {
            eprintln!("No saved revisions for site {site}");
            Ok(())
        }
    }
}

fn list_revisions(data_dir: &Path, site: &str) -> Result<()> {
    let store = PersistenceLayer::open(data_dir)?;
    for rev in store.read_revisions::<Vec<ContentBlock>>(site)? {
        let saved_at = chrono::DateTime::from_timestamp_millis(rev.saved_at_ms)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}\t{}\t{} blocks", rev.revision, saved_at, rev.state.len());
    }
    Ok(())
}

fn list_sites(data_dir: &Path) -> Result<()> {
    let store = PersistenceLayer::open(data_dir)?;
    for site in store.list_sites()? {
        println!("{site}");
    }
    Ok(())
}

fn print_blocks(blocks: &[ContentBlock]) -> Result<()> {
    let json = serde_json::to_string_pretty(blocks).context("Failed to serialize blocks")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::try_parse_from([
            "site-builder",
            "replay",
            "edits.json",
            "--site",
            "bistro",
            "--resume",
        ])
        .unwrap();
        match cli.command {
            Command::Replay {
                script,
                site,
                resume,
                save,
            } => {
                assert_eq!(script, PathBuf::from("edits.json"));
                assert_eq!(site.as_deref(), Some("bistro"));
                assert!(resume);
                assert!(!save);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_site_with_key_separator() {
        for site in ["a#b", "a$", ""] {
            for command in ["show", "revisions", "clear"] {
                assert!(
                    Cli::try_parse_from(["site-builder", command, "--site", site]).is_err(),
                    "{command} accepted site {site:?}"
                );
            }
            assert!(Cli::try_parse_from([
                "site-builder",
                "replay",
                "edits.json",
                "--site",
                site
            ])
            .is_err());
        }
        assert!(Cli::try_parse_from(["site-builder", "clear", "--site", "a-b"]).is_ok());
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["site-builder", "show", "--config", "/tmp/sb.json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sb.json")));
        assert!(matches!(cli.command, Command::Show { site: None }));
    }

    #[test]
    fn test_replay_saves_and_resumes() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = BuilderConfig {
            data_dir: dir.path().join("data").to_string_lossy().into_owned(),
            ..Default::default()
        };
        let history = history_config(&config);
        let script_path = dir.path().join("script.json");
        std::fs::write(
            &script_path,
            r#"[{"action": "add", "block_type": "header", "at_index": 0}]"#,
        )
        .unwrap();

        run_replay(&config, history.clone(), &script_path, "cafe", false, true).unwrap();
        run_replay(&config, history.clone(), &script_path, "cafe", true, true).unwrap();

        let store = PersistenceLayer::open(&history.data_dir).unwrap();
        let latest = store
            .latest_revision::<Vec<ContentBlock>>("cafe")
            .unwrap()
            .unwrap();
        assert_eq!(latest.state.len(), 2);
        assert_eq!(store.count_revisions("cafe").unwrap(), 2);
    }
}
