//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::write_output;

pub fn cmd_config(action: ConfigAction, path: &Path) -> Result<()> {
    write_output(&run(action, path)?)
}

fn run(action: ConfigAction, path: &Path) -> Result<String> {
    match action {
        ConfigAction::Path => Ok(format!("{}\n", path.display())),
        ConfigAction::Show => {
            let config = Config::load_from(path);
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            Ok(format!("# {}\n{}", path.display(), content))
        }
        ConfigAction::Get { key } => {
            let config = Config::load_from(path);
            Ok(match config.get(key) {
                Some(value) => format!("{}\n", value),
                None => "(not set)\n".to_string(),
            })
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(path);
            config.set(key, &value)?;
            config.save_to(path)?;
            Ok(format!(
                "Set {:?} = {}\n",
                key,
                config.get(key).unwrap_or_default()
            ))
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load_from(path);
            config.unset(key);
            config.save_to(path)?;
            Ok(format!("Unset {:?}\n", key))
        }
    }
}
