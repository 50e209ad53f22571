//! Menu shown when no subcommand is given.

use airfield_recon_airfield_models::MatchMode;
use airfield_recon_pipeline::config::PipelineConfig;
use dialoguer::{Confirm, Select};

use crate::Commands;

/// Top-level actions available in the menu.
enum Tool {
    Run,
    Scrape,
    Extract,
    Reconcile,
    ShowConfig,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Run,
        Self::Scrape,
        Self::Extract,
        Self::Reconcile,
        Self::ShowConfig,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Run => "Run full pipeline",
            Self::Scrape => "Refresh page cache",
            Self::Extract => "Extract airfields from cache",
            Self::Reconcile => "Reconcile BTS, NFDC and site",
            Self::ShowConfig => "Show configuration",
        }
    }

    const fn command(&self) -> Commands {
        match self {
            Self::Run => Commands::Run,
            Self::Scrape => Commands::Scrape,
            Self::Extract => Commands::Extract,
            Self::Reconcile => Commands::Reconcile,
            Self::ShowConfig => Commands::Config,
        }
    }
}

const MODES: &[MatchMode] = &[MatchMode::All, MatchMode::Closed, MatchMode::Open];

/// Prompts for an action and the settings it depends on.
///
/// # Errors
///
/// Returns an error if the terminal cannot be read or the cache directory
/// cannot be listed.
pub fn choose(config: &mut PipelineConfig) -> Result<Commands, Box<dyn std::error::Error>> {
    println!("Airfield Recon");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;
    let tool = &Tool::ALL[idx];

    if matches!(tool, Tool::Run)
        && !config.offline
        && airfield_recon_pipeline::has_cached_pages(&config.cache_dir)?
    {
        config.offline = !Confirm::new()
            .with_prompt(format!(
                "{} already holds pages. Check the site for updates?",
                config.cache_dir.display()
            ))
            .default(true)
            .interact()?;
    }

    if matches!(tool, Tool::Run | Tool::Reconcile) {
        let labels: Vec<&str> = MODES.iter().map(AsRef::as_ref).collect();
        let current = MODES
            .iter()
            .position(|m| *m == config.match_mode)
            .unwrap_or(0);
        let idx = Select::new()
            .with_prompt("Which BTS airports should be checked?")
            .items(&labels)
            .default(current)
            .interact()?;
        config.match_mode = MODES[idx];
    }

    Ok(tool.command())
}
