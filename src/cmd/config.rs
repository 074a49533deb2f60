use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{StoredConfig, config_file_path};
use crate::domain::release::ActionKind;
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
    /// Map a tracker issue type to a changelog action kind.
    MapType {
        tracker_type: String,
        /// One of add, fix, remove, update.
        kind: String,
    },
    /// Remove a tracker issue type mapping.
    UnmapType { tracker_type: String },
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
        ConfigCommand::MapType { tracker_type, kind } => {
            let mut cfg = StoredConfig::load()?;
            map_type(&mut cfg, &tracker_type, &kind)?;
            cfg.save()?;
            println!("Mapped issue type '{tracker_type}' to '{kind}'.");
            Ok(())
        }
        ConfigCommand::UnmapType { tracker_type } => {
            let mut cfg = StoredConfig::load()?;
            if cfg.issue_types.remove(&tracker_type).is_none() {
                println!("Issue type '{tracker_type}' was not mapped.");
                return Ok(());
            }
            cfg.save()?;
            println!("Removed mapping for issue type '{tracker_type}'.");
            Ok(())
        }
    }
}

fn map_type(cfg: &mut StoredConfig, tracker_type: &str, kind: &str) -> AppResult<()> {
    let tracker_type = tracker_type.trim();
    if tracker_type.is_empty() {
        return Err(AppError::Configuration(
            "tracker issue type must not be empty".to_string(),
        ));
    }
    let kind = ActionKind::from_str(kind).ok_or_else(|| {
        let known: Vec<_> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
        AppError::Configuration(format!(
            "unknown action kind '{kind}', expected one of {}",
            known.join(", ")
        ))
    })?;
    cfg.issue_types
        .insert(tracker_type.to_string(), kind.as_str().to_string());
    Ok(())
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring changes-report.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Secrets are stored in the local config file; protect your filesystem accordingly.");
    println!();

    apply_prompt(
        "Tracker API URL (e.g., https://api.github.com)",
        &mut cfg.tracker_url,
        false,
    )?;
    apply_prompt("Tracker username (empty for token auth)", &mut cfg.tracker_username, false)?;
    apply_prompt("Tracker API token", &mut cfg.tracker_token, true)?;
    apply_prompt("Default project (owner/repo)", &mut cfg.project, false)?;
    apply_prompt("Milestone label prefix", &mut cfg.milestone_label_prefix, false)?;
    apply_prompt("Issue type label prefix", &mut cfg.type_label_prefix, false)?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    if cfg.issue_types.is_empty() {
        println!("No issue types mapped yet; run `changes-report config map-type <TYPE> <KIND>`.");
    }
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Tracker API URL: {}", display_value(&cfg.tracker_url));
    println!("Tracker username: {}", display_value(&cfg.tracker_username));
    println!("Tracker API token: {}", mask_secret(&cfg.tracker_token));
    println!("Default project: {}", display_value(&cfg.project));
    println!(
        "Milestone label prefix: {}",
        display_value(&cfg.milestone_label_prefix)
    );
    println!(
        "Issue type label prefix: {}",
        display_value(&cfg.type_label_prefix)
    );
    if cfg.issue_types.is_empty() {
        println!("Issue types: <not set>");
    } else {
        println!("Issue types:");
        for (tracker_type, kind) in &cfg.issue_types {
            println!("  {tracker_type} -> {kind}");
        }
    }

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();
    Ok(if trimmed.is_empty() {
        PromptAction::Keep
    } else if trimmed == "-" {
        PromptAction::Clear
    } else {
        PromptAction::Set(trimmed.to_string())
    })
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

enum PromptAction {
    Keep,
    Clear,
    Set(String),
}
