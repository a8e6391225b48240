use std::path::{Path, PathBuf};

use crate::cli::commands::{ConfigAction, ConfigCmd};
use crate::io::config_io::{self, ConfigError};
use crate::model::config::Config;

/// Effective configuration and the file it came from
#[derive(Debug, Clone)]
pub struct Settings {
    pub path: PathBuf,
    pub config: Config,
}

/// Resolve the config file, load it, and apply URL overrides
pub fn load_settings(explicit: Option<&Path>, url_flag: Option<&str>) -> Result<Settings, ConfigError> {
    let path = config_io::resolve_config_path(explicit);
    let mut config = config_io::load_config(&path)?;
    config_io::apply_url_overrides(&mut config, std::env::var(config_io::URL_ENV).ok(), url_flag);
    Ok(Settings { path, config })
}

pub fn cmd_config(
    settings: &Settings,
    args: ConfigCmd,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        ConfigAction::Show => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings.config)?);
            } else {
                println!("# {}", settings.path.display());
                print!("{}", toml::to_string_pretty(&settings.config)?);
            }
        }
        ConfigAction::SetUrl(set) => {
            let mut doc = config_io::read_config_document(&settings.path)?;
            config_io::set_base_url(&mut doc, &set.url);
            config_io::write_config_document(&settings.path, &doc)?;
            println!("base_url = {:?} ({})", set.url, settings.path.display());
        }
    }
    Ok(())
}
