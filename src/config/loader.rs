use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.lextro/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let lextro_dir = home.join(".lextro");

        if !lextro_dir.exists() {
            fs::create_dir_all(&lextro_dir).context("Failed to create .lextro directory")?;
        }

        Self::load_from(&lextro_dir.join("config.toml"))
    }

    /// Load from an explicit path; a missing file is created with defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let data_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config.data_dir = data_dir;
            config
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                data_dir,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.extension.max_retries, 3);
    }

    #[test]
    fn existing_file_is_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [generation]
            model = "gemini-1.5-pro"

            [[identity.sessions]]
            token = "tok_abc"
            external_id = "user_1"
            email = "ada@example.com"
            first_name = "Ada"
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.identity.sessions.len(), 1);
        assert_eq!(config.identity.sessions[0].first_name.as_deref(), Some("Ada"));
        assert_eq!(config.config_path, path);
    }

    #[test]
    fn invalid_values_fail_loading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[extension]\nbase_backoff_ms = 9000\nmax_backoff_ms = 100\n",
        )
        .unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Validation(message)) if message.contains("max_backoff_ms")
        ));
    }

    #[test]
    fn save_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::load_from(&path).unwrap();
        config.server.port = 4100;
        config.save().unwrap();

        let reloaded: Config = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.server.port, 4100);
    }
}
