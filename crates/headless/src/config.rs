//! Configuration file for the headless client
//!
//! Reads `~/.config/remote-ui/config.toml`; missing keys keep their defaults.

use std::path::{Path, PathBuf};

use remote_ui_web::ClientConfig;

/// Default config path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("remote-ui")
        .join("config.toml")
}

/// Load from the default path, falling back to defaults
pub fn load() -> ClientConfig {
    load_from_path(&default_config_path()).unwrap_or_default()
}

/// Load from a specific path; `None` when the file is missing or malformed
pub fn load_from_path(path: &Path) -> Option<ClientConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("remote-ui-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_from_path(Path::new("/nonexistent/remote-ui/config.toml")).is_none());
    }

    #[test]
    fn sections_override_defaults() {
        let path = write_temp(
            "sections.toml",
            r#"
host = "http://10.0.0.2:8888"

[retry]
send_attempts = 9

[font]
family = "Consolas"
"#,
        );
        let config = load_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.host, "http://10.0.0.2:8888");
        assert_eq!(config.retry.send_attempts, 9);
        assert_eq!(config.retry.max_delay_ms, 5000);
        assert_eq!(config.font.family, "Consolas");
        assert_eq!(config.font.size, 14);
    }

    #[test]
    fn malformed_file_is_none() {
        let path = write_temp("bad.toml", "host = [");
        assert!(load_from_path(&path).is_none());
        std::fs::remove_file(&path).ok();
    }
}
