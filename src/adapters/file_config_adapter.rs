//! INI configuration file, with optional environment overrides.
//!
//! Keys are case-insensitive. An override named `DAYTRADER_<SECTION>_<KEY>`
//! (for example `DAYTRADER_TRADING_MIN_SIGNAL_STRENGTH`) replaces the file
//! value for `[section] key` once [`FileConfigAdapter::with_env`] is applied.
//! Section names must not contain underscores for this to be unambiguous.

use std::collections::HashMap;
use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;

pub const ENV_PREFIX: &str = "DAYTRADER_";

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
    overrides: HashMap<(String, String), String>,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self::wrap(config))
    }

    pub fn from_string(content: &str) -> Result<Self, TraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TraderError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self::wrap(config))
    }

    fn wrap(config: Ini) -> Self {
        Self {
            config,
            overrides: HashMap::new(),
        }
    }

    /// Apply `DAYTRADER_*` variables from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs; names without the
    /// prefix or without a `SECTION_KEY` split are ignored.
    pub fn with_overrides<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let Some((section, key)) = rest.split_once('_') else {
                continue;
            };
            if section.is_empty() || key.is_empty() {
                continue;
            }
            tracing::debug!(variable = %name, "config override from environment");
            self.overrides
                .insert((section.to_lowercase(), key.to_lowercase()), value);
        }
        self
    }

    fn raw(&self, section: &str, key: &str) -> Option<String> {
        self.overrides
            .get(&(section.to_lowercase(), key.to_lowercase()))
            .cloned()
            .or_else(|| self.config.get(section, key))
            .map(|v| v.trim().to_string())
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.raw(section, key).filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.raw(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.raw(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.raw(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[trading]
symbols = INFY, TCS
min_signal_strength = 0.75
scan_interval_secs = 10
market_open_hour = abc

[risk]
max_daily_loss_percent = 1.5

[logging]
json = yes
level =
"#;

    fn sample() -> FileConfigAdapter {
        FileConfigAdapter::from_string(SAMPLE).unwrap()
    }

    #[test]
    fn reads_typed_values() {
        let config = sample();
        assert_eq!(
            config.get_string("trading", "symbols"),
            Some("INFY, TCS".to_string())
        );
        assert_eq!(config.get_int("trading", "scan_interval_secs", 5), 10);
        assert_eq!(config.get_double("trading", "min_signal_strength", 0.7), 0.75);
        assert_eq!(config.get_double("risk", "max_daily_loss_percent", 1.0), 1.5);
        assert!(config.get_bool("logging", "json", false));
    }

    #[test]
    fn missing_or_malformed_values_fall_back() {
        let config = sample();
        assert_eq!(config.get_string("trading", "missing"), None);
        assert_eq!(config.get_string("nosection", "key"), None);
        assert_eq!(config.get_int("trading", "market_open_hour", 9), 9);
        assert_eq!(config.get_double("risk", "missing", 5.0), 5.0);
        assert!(!config.get_bool("logging", "missing", false));
    }

    #[test]
    fn empty_value_reads_as_absent() {
        assert_eq!(sample().get_string("logging", "level"), None);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let config = FileConfigAdapter::from_string("[Trading]\nMin_Signal_Strength = 0.8\n").unwrap();
        assert_eq!(config.get_double("trading", "min_signal_strength", 0.0), 0.8);
    }

    #[test]
    fn bool_spellings() {
        let config =
            FileConfigAdapter::from_string("[x]\na = on\nb = 1\nc = off\nd = no\ne = maybe\n")
                .unwrap();
        assert!(config.get_bool("x", "a", false));
        assert!(config.get_bool("x", "b", false));
        assert!(!config.get_bool("x", "c", true));
        assert!(!config.get_bool("x", "d", true));
        assert!(config.get_bool("x", "e", true));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = sample().with_overrides([
            ("DAYTRADER_TRADING_MIN_SIGNAL_STRENGTH".to_string(), "0.9".to_string()),
            ("DAYTRADER_SQLITE_PATH".to_string(), "/tmp/t.db".to_string()),
            ("DAYTRADER_NOKEY".to_string(), "ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);

        assert_eq!(config.get_double("trading", "min_signal_strength", 0.7), 0.9);
        assert_eq!(config.get_string("sqlite", "path"), Some("/tmp/t.db".to_string()));
        assert_eq!(config.get_int("trading", "scan_interval_secs", 5), 10);
        assert_eq!(config.get_string("nokey", ""), None);
    }

    #[test]
    fn from_file_reads_and_reports_missing_files() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[data]\nbars_dir = /var/bars\n").unwrap();
        let config = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(config.get_string("data", "bars_dir"), Some("/var/bars".to_string()));

        let err = FileConfigAdapter::from_file("/nonexistent/daytrader.ini").err().unwrap();
        assert!(matches!(err, TraderError::ConfigParse { .. }));
    }
}
