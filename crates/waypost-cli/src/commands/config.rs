//! `waypost config`: inspect or create the configuration file.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, path: &Path, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{content}");
            if let Err(e) = config.validate() {
                eprintln!("\n{e}");
            }
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::default()
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::default();

        cmd_config(ConfigAction::Init { force: false }, &path, &config).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        let err = cmd_config(ConfigAction::Init { force: false }, &path, &config).unwrap_err();
        assert!(err.to_string().contains("--force"));
        cmd_config(ConfigAction::Init { force: true }, &path, &config).unwrap();
    }
}
