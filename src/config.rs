use std::path::PathBuf;
use std::time::Duration;

use crate::cover::NormalizeOptions;
use crate::error::ConfigError;
use crate::store::DEFAULT_SLOT;

const ENV_DATA_DIR: &str = "BOOKSHELF_DATA_DIR";
const ENV_SLOT: &str = "BOOKSHELF_SLOT";
const ENV_MAX_DIMENSION: &str = "BOOKSHELF_MAX_DIMENSION";
const ENV_JPEG_QUALITY: &str = "BOOKSHELF_JPEG_QUALITY";
const ENV_DECODE_TIMEOUT_SECS: &str = "BOOKSHELF_DECODE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub slot: String,
    pub normalize: NormalizeOptions,
}

impl Settings {
    /// `<platform data dir>/bookshelf`, when the platform has one.
    pub fn default_data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("bookshelf"))
    }

    /// Defaults plus `BOOKSHELF_*` overrides from `lookup`. The data dir
    /// comes from `BOOKSHELF_DATA_DIR` when set, else `default_data_dir`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_data_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let env_dir = lookup(ENV_DATA_DIR).filter(|dir| !dir.trim().is_empty());
        if env_dir.is_none() && default_data_dir.is_none() {
            return Err(ConfigError::NoDataDir);
        }
        let base = Self::with_data_dir(default_data_dir.unwrap_or_default());
        Ok(base.with_lookup(&lookup))
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            slot: DEFAULT_SLOT.to_string(),
            normalize: NormalizeOptions::default(),
        }
    }

    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(slot) = lookup(ENV_SLOT) {
            self.slot = slot;
        }
        if let Some(value) = lookup(ENV_MAX_DIMENSION) {
            match value.parse() {
                Ok(max) => self.normalize.max_dimension = max,
                Err(_) => log::warn!("ignoring {}={}, not a number", ENV_MAX_DIMENSION, value),
            }
        }
        if let Some(value) = lookup(ENV_JPEG_QUALITY) {
            match value.parse() {
                Ok(quality) => self.normalize.quality = quality,
                Err(_) => log::warn!("ignoring {}={}, not a number", ENV_JPEG_QUALITY, value),
            }
        }
        if let Some(value) = lookup(ENV_DECODE_TIMEOUT_SECS) {
            match value.parse() {
                Ok(secs) => self.normalize.timeout = Duration::from_secs(secs),
                Err(_) => log::warn!("ignoring {}={}, not a number", ENV_DECODE_TIMEOUT_SECS, value),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.normalize.max_dimension == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if !(1..=100).contains(&self.normalize.quality) {
            return Err(ConfigError::Quality(self.normalize.quality));
        }
        if self.normalize.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.slot.trim().is_empty() {
            return Err(ConfigError::EmptySlot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::error::ConfigError;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn settings() -> Settings {
        Settings::with_data_dir(PathBuf::from("/tmp/shelf"))
    }

    #[test]
    fn defaults_are_a_300px_q70_cover_in_the_bookshelf_slot() {
        let settings = settings();
        assert_eq!(settings.slot, "bookshelf");
        assert_eq!(settings.normalize.max_dimension, 300);
        assert_eq!(settings.normalize.quality, 70);
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn env_overrides_apply_and_bad_numbers_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BOOKSHELF_DATA_DIR", "/var/lib/shelf"),
            ("BOOKSHELF_SLOT", " library "),
            ("BOOKSHELF_MAX_DIMENSION", "512"),
            ("BOOKSHELF_JPEG_QUALITY", "high"),
            ("BOOKSHELF_DECODE_TIMEOUT_SECS", "2"),
        ]);
        let settings = settings().with_lookup(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(settings.data_dir, PathBuf::from("/var/lib/shelf"));
        assert_eq!(settings.slot, "library");
        assert_eq!(settings.normalize.max_dimension, 512);
        assert_eq!(settings.normalize.quality, 70);
        assert_eq!(settings.normalize.timeout, Duration::from_secs(2));
    }

    #[test]
    fn env_data_dir_covers_a_missing_platform_dir() {
        let settings = Settings::from_lookup(
            |key| (key == "BOOKSHELF_DATA_DIR").then(|| "/srv/shelf".to_string()),
            None,
        )
        .expect("env data dir is enough");
        assert_eq!(settings.data_dir, PathBuf::from("/srv/shelf"));

        assert_eq!(
            Settings::from_lookup(|_| None, None),
            Err(ConfigError::NoDataDir)
        );
        let platform = PathBuf::from("/home/reader/.local/share/bookshelf");
        let fallback =
            Settings::from_lookup(|_| None, Some(platform.clone())).expect("platform dir");
        assert_eq!(fallback.data_dir, platform);
    }

    #[test]
    fn invalid_settings_are_reported() {
        let mut bad = settings();
        bad.normalize.max_dimension = 0;
        assert_eq!(bad.validate(), Err(ConfigError::ZeroDimension));

        let mut bad = settings();
        bad.normalize.quality = 0;
        assert_eq!(bad.validate(), Err(ConfigError::Quality(0)));

        let mut bad = settings();
        bad.normalize.timeout = Duration::ZERO;
        assert_eq!(bad.validate(), Err(ConfigError::ZeroTimeout));

        let mut bad = settings();
        bad.slot = "   ".to_string();
        assert_eq!(bad.validate(), Err(ConfigError::EmptySlot));
    }
}
