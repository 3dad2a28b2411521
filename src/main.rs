use clap::Parser;
use context_picker::app_logic::{FolderSession, Severity, format_row, format_total};
use context_picker::core::{
    CoreLocalFolderSource, CoreSettingsManager, FolderSourceOperations, JsonFolderSource,
    SettingsManagerOperations, UiSettings,
};
use context_picker::initialize_logging_at;
use simplelog::LevelFilter;
use std::path::PathBuf;
use std::process::ExitCode;

const APP_NAME: &str = "ContextPicker";

/// Pick files from a folder and see how many tokens the selection costs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder to scan
    root: PathBuf,

    /// Read the folder tree and counts from a saved JSON payload instead of scanning
    #[arg(long, value_name = "FILE")]
    payload: Option<PathBuf>,

    /// Check a node (and its subtree) by key, e.g. `src/main.rs`
    #[arg(long = "select", value_name = "KEY", action = clap::ArgAction::Append)]
    select: Vec<String>,

    /// Uncheck a node (and its subtree) by key; applied after all selects
    #[arg(long = "deselect", value_name = "KEY", action = clap::ArgAction::Append)]
    deselect: Vec<String>,

    /// Compute accurate token counts with the cl100k tokenizer
    #[arg(long)]
    accurate: bool,

    /// Ask the source to drop cached scan data before fetching. A local scan starts
    /// with an empty cache in every run, so this only matters for long-lived sources.
    #[arg(long)]
    refresh: bool,

    /// Extra exclude pattern (gitignore syntax), added to the saved ones
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Remember the folder as pinned
    #[arg(long)]
    pin: bool,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "info", value_parser = parse_log_level)]
    log_level: LevelFilter,
}

fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level '{value}'"))
}

fn load_settings(manager: &dyn SettingsManagerOperations) -> UiSettings {
    match manager.load_settings(APP_NAME) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Main: Could not load settings ({e}); using defaults.");
            UiSettings::default()
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logging_at(cli.log_level);
    log::info!("Main: Starting with root {:?}.", cli.root);

    let settings_manager = CoreSettingsManager::new();
    let mut settings = load_settings(&settings_manager);

    let source: Box<dyn FolderSourceOperations> = match &cli.payload {
        Some(payload_path) => Box::new(JsonFolderSource::new(payload_path)),
        None => {
            let mut exclude_patterns = settings.exclude_patterns.clone();
            exclude_patterns.extend(cli.exclude.iter().cloned());
            Box::new(CoreLocalFolderSource::new(&cli.root, exclude_patterns))
        }
    };

    let mut session = FolderSession::default();
    session.refresh_from(source.as_ref(), cli.refresh, cli.accurate);

    let mut failed = false;
    for note in session.take_notifications() {
        match note.severity {
            Severity::Info => eprintln!("{}", note.message),
            Severity::Warning => eprintln!("warning: {}", note.message),
            Severity::Error => {
                eprintln!("error: {}", note.message);
                failed = true;
            }
        }
    }
    if failed {
        return ExitCode::FAILURE;
    }

    for (keys, checked) in [(&cli.select, true), (&cli.deselect, false)] {
        for key in keys {
            if !session.tree().contains(key) {
                eprintln!("warning: no node with key {key:?}");
                continue;
            }
            session.toggle(key, checked);
        }
    }

    for row in session.tree_rows() {
        println!("{}", format_row(&row));
    }
    println!("{}", format_total(&session.included_total()));

    if cli.pin {
        let folder = std::fs::canonicalize(&cli.root).unwrap_or_else(|_| cli.root.clone());
        if settings.pin_folder(&folder.to_string_lossy()) {
            if let Err(e) = settings_manager.save_settings(APP_NAME, &settings) {
                eprintln!("warning: could not save settings: {e}");
            } else {
                log::info!("Main: Pinned {folder:?}.");
            }
        }
    }

    ExitCode::SUCCESS
}
