use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use flakeframe::core::config::{self, FileSettingsStore, SettingsStore};
use flakeframe::core::menu::Menu;
use flakeframe::core::session::{Outcome, Session, SessionOptions};
use flakeframe::core::settings::Settings;
use flakeframe::geocode::{Geocoder, NominatimGeocoder, SuggestionEngine};
use flakeframe::input;
use flakeframe::tui::{self, TerminalGuard, TerminalRenderer};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "flakeframe", about = "Terminal weather map: location setup")]
struct Args {
    /// Geocoder base URL (overrides config file and FLAKEFRAME_GEOCODER_URL)
    #[arg(long)]
    geocoder_url: Option<String>,

    /// Don't look up place names while typing
    #[arg(long)]
    no_suggestions: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to flakeframe.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("flakeframe.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!("Flakeframe starting up");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal: {}", e);
            eprintln!("flakeframe: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable config: {}", e);
        config::FlakeConfig::default()
    });
    let resolved = config::resolve(&file_config, args.geocoder_url.as_deref(), args.no_suggestions);
    log::debug!("Resolved config: {:?}", resolved);

    let settings_path = FileSettingsStore::default_location()
        .map(|store| store.path().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("flakeframe-settings.toml"));
    let mut settings = FileSettingsStore::new(settings_path.clone())
        .load()
        .unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable settings: {}", e);
            Settings::default()
        });

    // Drives network calls only; the input loop itself stays on this thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(
        Some(resolved.geocoder_url.clone()),
        &resolved.user_agent,
        resolved.timeout,
    )?);
    log::info!("Using geocoder {} at {}", geocoder.name(), resolved.geocoder_url);

    let mut keys = input::open_keys()?;
    tui::install_panic_hook();
    if let Err(e) = tui::install_signal_handler() {
        log::warn!("Could not install signal handler: {}", e);
    }

    let outcome = {
        let _guard = TerminalGuard::enter()?;
        let mut renderer = TerminalRenderer::new()?;
        let mut menu = Menu::default();
        let mut status: Option<String> = None;

        loop {
            let mut session = Session::new(
                menu.clone(),
                settings,
                Box::new(FileSettingsStore::new(settings_path.clone())),
                Arc::clone(&geocoder),
                runtime.handle().clone(),
                SessionOptions::from(&resolved),
            );
            if resolved.suggestions {
                session = session.with_suggestions(SuggestionEngine::new(
                    Arc::clone(&geocoder),
                    runtime.handle().clone(),
                    resolved.debounce,
                    resolved.suggestion_limit,
                ));
            }
            if let Some(message) = status.take() {
                session = session.with_status(message);
            }

            let outcome = session.run(keys.as_mut(), &mut renderer)?;
            settings = *session.settings();
            menu = session.menu().clone();

            match outcome {
                Outcome::OpenSubmenu(name) => {
                    log::info!("Submenu {:?} requested, not available", name);
                    status = Some(format!("The {name} menu is not available yet"));
                }
                other => break other,
            }
        }
    };

    match outcome {
        Outcome::Resolved(coordinate) => println!("{coordinate}"),
        Outcome::Quit | Outcome::OpenSubmenu(_) => log::info!("Quit without choosing a location"),
    }
    Ok(())
}
