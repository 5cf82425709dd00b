use std::path::{Path, PathBuf};

use log::{info, warn};

use tunedex::config::Config;
use tunedex::db_manager::DbManager;
use tunedex::error_log::ErrorLog;
use tunedex::library_manager::LibraryManager;
use tunedex::metadata_tags::LoftyTagReader;
use tunedex::playlist_manager;

fn load_config(config_file: &Path) -> Config {
    if !config_file.exists() {
        let default_config = Config::default();
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        match toml::to_string(&default_config) {
            Ok(serialized) => {
                if let Err(err) = std::fs::write(config_file, serialized) {
                    warn!("Failed to write default config: {}", err);
                }
            }
            Err(err) => warn!("Failed to serialize default config: {}", err),
        }
        return default_config;
    }

    match std::fs::read_to_string(config_file) {
        Ok(content) => toml::from_str::<Config>(&content).unwrap_or_default(),
        Err(err) => {
            warn!(
                "Failed to read config {}: {}. Using defaults.",
                config_file.display(),
                err
            );
            Config::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config = load_config(Path::new("config.toml"));

    let mut db = if config.storage.database_path.is_empty() {
        DbManager::open_default()?
    } else {
        DbManager::open(Path::new(&config.storage.database_path))?
    };

    let music_dir = PathBuf::from(&config.library.music_directory);
    let manager = LibraryManager::new(
        LoftyTagReader,
        ErrorLog::new(config.storage.error_log_path.as_str()),
    );

    let summary = manager.run_scan(&mut db, &music_dir)?;
    info!(
        "Scan finished: {} indexed, {} unchanged, {} failed of {} discovered",
        summary.indexed, summary.unchanged, summary.failed, summary.discovered
    );

    let synced = playlist_manager::resync(&mut db, &music_dir)?;
    info!("Playlist resync finished: {} playlist(s)", synced);

    Ok(())
}
