use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf};

use crate::forecast::{BackendId, DEFAULT_HORIZON_DAYS, DEFAULT_INTERVAL_LEVEL};
use crate::forecast::mstl::DEFAULT_SEASONAL_PERIODS;

/// Options stored for a single forecasting backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendOptions {
    pub interval_level: Option<f64>,
    pub seasonal_periods: Option<Vec<usize>>,
}

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Optional default backend id, e.g. "ets" or "mstl".
    pub default_backend: Option<String>,

    /// Default forecast horizon in days.
    pub horizon_days: Option<usize>,

    /// Directory charts are written into.
    pub output_dir: Option<PathBuf>,

    /// Example TOML:
    /// [backends.mstl]
    /// interval_level = 0.9
    /// seasonal_periods = [365]
    pub backends: HashMap<String, BackendOptions>,
}

impl Settings {
    /// Return the default backend as a strongly-typed BackendId.
    ///
    /// Unlike credentials, a backend needs no setup before first use, so
    /// an unset default falls back to `ets`.
    pub fn default_backend_id(&self) -> Result<BackendId> {
        match self.default_backend.as_ref() {
            Some(s) => BackendId::try_from(s.as_str()),
            None => Ok(BackendId::Ets),
        }
    }

    pub fn backend_options(&self, id: BackendId) -> Option<&BackendOptions> {
        self.backends.get(id.as_str())
    }

    /// Uncertainty interval level for a backend, with the built-in
    /// default when nothing is stored.
    pub fn interval_level(&self, id: BackendId) -> f64 {
        self.backend_options(id)
            .and_then(|opts| opts.interval_level)
            .unwrap_or(DEFAULT_INTERVAL_LEVEL)
    }

    /// Seasonal periods for a backend, with the built-in default when
    /// nothing is stored.
    pub fn seasonal_periods(&self, id: BackendId) -> Vec<usize> {
        self.backend_options(id)
            .and_then(|opts| opts.seasonal_periods.clone())
            .unwrap_or_else(|| DEFAULT_SEASONAL_PERIODS.to_vec())
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS)
    }

    /// Store default backend as string.
    pub fn set_default_backend(&mut self, id: BackendId) {
        self.default_backend = Some(id.as_str().to_string());
    }

    /// Set/replace one backend's stored options; the first configured
    /// backend becomes the default.
    pub fn upsert_backend(&mut self, id: BackendId, options: BackendOptions) {
        self.backends.insert(id.as_str().to_string(), options);

        if self.default_backend.is_none() {
            self.default_backend = Some(id.to_string());
        }
    }

    pub fn is_backend_configured(&self, id: BackendId) -> bool {
        self.backends.contains_key(id.as_str())
    }

    /// Load settings from disk, or return an empty default if the file
    /// doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::settings_file_path()?;
        if !path.exists() {
            // First run: no settings file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the settings file.
    pub fn settings_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "climate", "climate-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("settings.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_falls_back_to_ets() {
        let settings = Settings::default();
        let id = settings.default_backend_id().expect("fallback must exist");
        assert_eq!(id, BackendId::Ets);
    }

    #[test]
    fn unknown_default_backend_errors() {
        let settings = Settings {
            default_backend: Some("doesnotexist".to_string()),
            ..Settings::default()
        };

        let err = settings.default_backend_id().unwrap_err();
        assert!(err.to_string().contains("Unknown backend"));
    }

    #[test]
    fn upsert_sets_default_once() {
        let mut settings = Settings::default();

        settings.upsert_backend(
            BackendId::Mstl,
            BackendOptions { interval_level: Some(0.9), seasonal_periods: Some(vec![7, 365]) },
        );
        settings.upsert_backend(BackendId::Ets, BackendOptions::default());

        let default = settings.default_backend_id().expect("default must exist");
        assert_eq!(default, BackendId::Mstl);
        assert!(settings.is_backend_configured(BackendId::Ets));
        assert!(settings.is_backend_configured(BackendId::Mstl));
    }

    #[test]
    fn set_default_backend_overrides_default() {
        let mut settings = Settings::default();

        settings.upsert_backend(BackendId::Mstl, BackendOptions::default());
        settings.set_default_backend(BackendId::Ets);

        let default = settings.default_backend_id().expect("default must exist");
        assert_eq!(default, BackendId::Ets);
    }

    #[test]
    fn stored_options_override_built_in_defaults() {
        let mut settings = Settings::default();
        assert_eq!(settings.interval_level(BackendId::Ets), DEFAULT_INTERVAL_LEVEL);
        assert_eq!(settings.seasonal_periods(BackendId::Mstl), vec![365]);

        settings.upsert_backend(
            BackendId::Mstl,
            BackendOptions { interval_level: Some(0.8), seasonal_periods: Some(vec![7]) },
        );

        assert_eq!(settings.interval_level(BackendId::Mstl), 0.8);
        assert_eq!(settings.seasonal_periods(BackendId::Mstl), vec![7]);
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let mut settings = Settings {
            horizon_days: Some(90),
            output_dir: Some(PathBuf::from("charts")),
            ..Settings::default()
        };
        settings.upsert_backend(
            BackendId::Mstl,
            BackendOptions { interval_level: Some(0.9), seasonal_periods: Some(vec![365]) },
        );

        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.default_backend, Some("mstl".to_string()));
        assert_eq!(parsed.horizon_days(), 90);
        assert_eq!(parsed.interval_level(BackendId::Mstl), 0.9);
    }
}
