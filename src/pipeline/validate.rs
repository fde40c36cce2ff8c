// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::{Config, PlatformId};
use crate::utils::log;

/// Load and validate the configuration file, reporting what it contains.
pub fn run_validate(config_path: &Path) -> Result<Config> {
    log::header("Validating configuration");

    let loaded = Config::load(config_path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    match loaded {
        Ok(config) => {
            log::success(&format!("{} is valid", config_path.display()));
            log::sub_item(&format!("User agent: {}", config.http.user_agent));
            log::sub_item(&format!("Timeout: {}s", config.http.timeout_secs));
            log::sub_item(&format!("Max concurrent: {}", config.sync.max_concurrent));
            log::sub_item(&format!(
                "Retry: {} attempts, {}ms to {}ms",
                config.sync.retry.max_attempts,
                config.sync.retry.base_delay_ms,
                config.sync.retry.max_delay_ms
            ));
            log::sub_item(&format!("Data dir: {}", config.store.data_dir.display()));
            for platform in PlatformId::ALL {
                log::sub_item(&format!(
                    "{}: {}",
                    platform,
                    config.platforms.base_url(platform)
                ));
            }
            Ok(config)
        }
        Err(e) => {
            log::failure(&format!("{} is invalid: {}", config_path.display(), e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_good_config() {
        log::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[sync]\nmax_concurrent = 2\n").unwrap();

        let config = run_validate(&path).unwrap();
        assert_eq!(config.sync.max_concurrent, 2);
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        log::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[sync]\nmax_concurrent = 0\n").unwrap();
        assert!(run_validate(&path).is_err());

        assert!(run_validate(&tmp.path().join("missing.toml")).is_err());
    }
}
