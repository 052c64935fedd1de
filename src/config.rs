use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Row cap for the upcoming-events card and the `upcoming` subcommand.
    pub upcoming_limit: usize,
    /// Input poll interval for the dashboard loop, in milliseconds.
    pub poll_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upcoming_limit: 12,
            poll_ms: 250,
        }
    }
}

/// Reads `config.toml` from the state directory. A missing file is the
/// normal case and yields defaults; an unreadable or invalid file also
/// yields defaults, plus a warning for the caller to surface.
pub fn load_config(state_dir: &Path) -> (Config, Option<String>) {
    let path = state_dir.join(CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) => match toml::from_str(&raw) {
            Ok(config) => (config, None),
            Err(err) => (
                Config::default(),
                Some(format!("{} is invalid, using defaults: {err}", path.display())),
            ),
        },
        Err(err) if err.kind() == ErrorKind::NotFound => (Config::default(), None),
        Err(err) => (
            Config::default(),
            Some(format!("could not read {}: {err}", path.display())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{Config, load_config};

    #[test]
    fn missing_file_yields_defaults_without_warning() {
        let dir = temp_dir("deskdash_config_missing");
        let (config, warning) = load_config(&dir);
        assert_eq!(config, Config::default());
        assert!(warning.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let dir = temp_dir("deskdash_config_partial");
        fs::create_dir_all(&dir).expect("temp dir should be creatable");
        fs::write(dir.join("config.toml"), "upcoming_limit = 5\n")
            .expect("write should succeed");

        let (config, warning) = load_config(&dir);
        assert_eq!(config.upcoming_limit, 5);
        assert_eq!(config.poll_ms, Config::default().poll_ms);
        assert!(warning.is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn invalid_file_degrades_to_defaults_with_warning() {
        let dir = temp_dir("deskdash_config_invalid");
        fs::create_dir_all(&dir).expect("temp dir should be creatable");
        fs::write(dir.join("config.toml"), "upcoming_limit = \"many\"\n")
            .expect("write should succeed");

        let (config, warning) = load_config(&dir);
        assert_eq!(config, Config::default());
        assert!(warning.is_some());

        let _ = fs::remove_dir_all(dir);
    }

    fn temp_dir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("{}_{}", name, std::process::id()));
        dir
    }
}
