//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let mut shown = settings.clone();
            if shown.api.api_key.is_some() {
                shown.api.api_key = Some("********".to_string());
            }
            let toml_str = toml::to_string_pretty(&shown)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            settings.set(key, value)?;
            settings.save_to(&config_path)?;
            let shown = if key == "api.api_key" { "********" } else { value.as_str() };
            Output::success(&format!("Set {} = {}", key, shown));
            Output::kv("File", &config_path.display().to_string());
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_writes_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run_config(
            &ConfigAction::Set {
                key: "generation.max_concurrent_sections".to_string(),
                value: "2".to_string(),
            },
            Settings::default(),
            Some(path.clone()),
        )
        .unwrap();

        let saved = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(saved.generation.max_concurrent_sections, 2);
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let result = run_config(
            &ConfigAction::Set {
                key: "generation.nonexistent".to_string(),
                value: "1".to_string(),
            },
            Settings::default(),
            Some(path.clone()),
        );

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
