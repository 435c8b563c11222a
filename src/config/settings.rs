use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::CipherStrength;
use crate::errors::{FileVaultError, Result};
use crate::vault::integrity::DEFAULT_CONCURRENCY;
use crate::vault::IntegrityScanner;

/// Project-level configuration, loaded from `.filevault.toml`.
///
/// Every field has a sensible default so FileVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Cipher strength for new vaults when `--strength` is not given.
    #[serde(default)]
    pub default_strength: CipherStrength,

    /// Maximum number of ciphertexts verified at once by `check`.
    #[serde(default = "default_integrity_concurrency")]
    pub integrity_concurrency: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_integrity_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_strength: CipherStrength::default(),
            integrity_concurrency: default_integrity_concurrency(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".filevault.toml";

    /// Load settings from `<project_dir>/.filevault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            FileVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.integrity_concurrency == 0 {
            return Err(FileVaultError::ConfigError(
                "integrity_concurrency must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Build an integrity scanner bounded by `integrity_concurrency`.
    pub fn integrity_scanner(&self) -> IntegrityScanner {
        let bound = NonZeroUsize::new(self.integrity_concurrency).unwrap_or(NonZeroUsize::MIN);
        IntegrityScanner::new(bound)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.default_strength, CipherStrength::Strong);
        assert_eq!(s.integrity_concurrency, 50);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_strength, CipherStrength::Strong);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
default_strength = "weak"
integrity_concurrency = 4
"#;
        fs::write(tmp.path().join(".filevault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_strength, CipherStrength::Weak);
        assert_eq!(settings.integrity_concurrency, 4);
        assert_eq!(settings.integrity_scanner().concurrency(), 4);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".filevault.toml"), "default_strength = \"medium\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_strength, CipherStrength::Medium);
        assert_eq!(settings.integrity_concurrency, 50);
    }

    #[test]
    fn load_rejects_zero_concurrency() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".filevault.toml"), "integrity_concurrency = 0\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".filevault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_errors_on_unknown_strength() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".filevault.toml"), "default_strength = \"ultra\"\n").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }
}
