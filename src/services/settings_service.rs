use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::settings::CalendarSettings;

const ENV_SPACING_MILLIS: &str = "PLANET_SPACING_MILLIS";
const ENV_HORIZON_DAYS: &str = "PLANET_HORIZON_DAYS";
const ENV_UTC_OFFSET_MINUTES: &str = "PLANET_UTC_OFFSET_MINUTES";

const MAX_HORIZON_DAYS: u32 = 366;
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> AppResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(AppError::validation_with_details(
                "settings file must be .yaml, .yml or .json",
                json!({ "path": path.display().to_string() }),
            )),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SettingsUpdateInput {
    pub spacing_millis: Option<i64>,
    pub horizon_days: Option<u32>,
    pub utc_offset_minutes: Option<i32>,
}

/// Calendar settings backed by a YAML or JSON file.
///
/// A missing file reads as the defaults. Values are cached after the first
/// read and the cache is refreshed on every successful update.
pub struct SettingsService {
    path: PathBuf,
    format: ConfigFormat,
    cache: RwLock<Option<CalendarSettings>>,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let format = ConfigFormat::from_path(&path)?;
        Ok(Self {
            path,
            format,
            cache: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings with environment overrides applied.
    pub fn get(&self) -> AppResult<CalendarSettings> {
        if let Some(settings) = self.cached() {
            return Ok(settings);
        }

        let mut settings = if self.path.exists() {
            Self::load(&self.path)?
        } else {
            debug!(target: "planet::settings", path = %self.path.display(), "settings file missing, using defaults");
            CalendarSettings::default()
        };
        Self::apply_env_overrides(&mut settings)?;
        Self::validate(&settings)?;

        self.store_cache(&settings);
        Ok(settings)
    }

    /// Validates the merged result before anything is written.
    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<CalendarSettings> {
        let mut current = self.get()?;

        if let Some(spacing) = input.spacing_millis {
            current.spacing_millis = spacing;
        }
        if let Some(horizon) = input.horizon_days {
            current.horizon_days = horizon;
        }
        if let Some(offset) = input.utc_offset_minutes {
            current.utc_offset_minutes = offset;
        }
        Self::validate(&current)?;

        self.save(&current)?;
        self.store_cache(&current);
        Ok(current)
    }

    fn cached(&self) -> Option<CalendarSettings> {
        match self.cache.read() {
            Ok(guard) => guard.clone(),
            Err(_) => {
                warn!(target: "planet::settings", path = %self.path.display(), "settings cache poisoned, reading file");
                None
            }
        }
    }

    fn store_cache(&self, settings: &CalendarSettings) {
        match self.cache.write() {
            Ok(mut guard) => *guard = Some(settings.clone()),
            Err(_) => {
                warn!(target: "planet::settings", path = %self.path.display(), "settings cache poisoned, not updated");
            }
        }
    }

    fn save(&self, settings: &CalendarSettings) -> AppResult<()> {
        let body = match self.format {
            ConfigFormat::Yaml => serde_yaml::to_string(settings)?,
            ConfigFormat::Json => serde_json::to_string_pretty(settings)?,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, body)?;
        info!(target: "planet::settings", path = %self.path.display(), "settings saved");
        Ok(())
    }

    pub fn from_yaml_str(source: &str) -> AppResult<CalendarSettings> {
        let settings: CalendarSettings = serde_yaml::from_str(source)?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    pub fn from_json_str(source: &str) -> AppResult<CalendarSettings> {
        let settings: CalendarSettings = serde_json::from_str(source)?;
        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Reads a settings file, choosing the format by extension.
    pub fn load(path: &Path) -> AppResult<CalendarSettings> {
        let format = ConfigFormat::from_path(path)?;
        let source = fs::read_to_string(path)?;
        let settings = match format {
            ConfigFormat::Yaml => Self::from_yaml_str(&source)?,
            ConfigFormat::Json => Self::from_json_str(&source)?,
        };
        debug!(target: "planet::settings", path = %path.display(), ?settings, "settings loaded");
        Ok(settings)
    }

    pub fn apply_env_overrides(settings: &mut CalendarSettings) -> AppResult<()> {
        Self::apply_overrides(settings, |key| std::env::var(key).ok())
    }

    /// Applies `PLANET_*` overrides produced by `lookup`. Unparsable values
    /// are an error rather than silently ignored.
    pub fn apply_overrides<F>(settings: &mut CalendarSettings, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SPACING_MILLIS) {
            settings.spacing_millis = parse_override(ENV_SPACING_MILLIS, &value)?;
        }
        if let Some(value) = lookup(ENV_HORIZON_DAYS) {
            settings.horizon_days = parse_override(ENV_HORIZON_DAYS, &value)?;
        }
        if let Some(value) = lookup(ENV_UTC_OFFSET_MINUTES) {
            settings.utc_offset_minutes = parse_override(ENV_UTC_OFFSET_MINUTES, &value)?;
        }
        Ok(())
    }

    pub fn validate(settings: &CalendarSettings) -> AppResult<()> {
        if settings.spacing_millis < 0 {
            return Err(AppError::validation_with_details(
                "spacing cannot be negative",
                json!({ "spacingMillis": settings.spacing_millis }),
            ));
        }
        if settings.spacing_millis < CalendarSettings::MIN_SPACING_MILLIS {
            warn!(
                target: "planet::settings",
                spacing = settings.spacing_millis,
                floor = CalendarSettings::MIN_SPACING_MILLIS,
                "spacing below the floor will be raised"
            );
        }
        if !(1..=MAX_HORIZON_DAYS).contains(&settings.horizon_days) {
            return Err(AppError::validation_with_details(
                format!("horizon must be between 1 and {MAX_HORIZON_DAYS} days"),
                json!({ "horizonDays": settings.horizon_days }),
            ));
        }
        if settings.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(AppError::validation_with_details(
                "UTC offset must be within 18 hours",
                json!({ "utcOffsetMinutes": settings.utc_offset_minutes }),
            ));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        AppError::validation_with_details(
            format!("{key} is not a valid number"),
            json!({ "key": key, "value": value }),
        )
    })
}
