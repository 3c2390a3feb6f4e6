use crate::backend::{AppId, ScrollVelocity};
use crate::version::PlatformVersion;
use crate::{HealthError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const HEALTH_APP_BUNDLE_ID: &str = "com.apple.Health";
pub const SPRINGBOARD_BUNDLE_ID: &str = "com.apple.springboard";

/// Every wait used by the flows. Serialized as (fractional) seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Root tab-bar button.
    #[serde(with = "secs")]
    pub tab_bar: Duration,
    /// First lookup of a category or sample type row; the list loads lazily.
    #[serde(with = "secs")]
    pub list_lookup: Duration,
    /// Lookups after each scroll gesture.
    #[serde(with = "secs")]
    pub scroll_retry: Duration,
    /// Navigation-bar title confirming arrival on a page.
    #[serde(with = "secs")]
    pub arrival: Duration,
    /// Sheet controls such as "Add Data", "Add" and value fields.
    #[serde(with = "secs")]
    pub control: Duration,
    /// Date and time picker elements.
    #[serde(with = "secs")]
    pub picker: Duration,
    /// Waiting for a dismissed sheet to go away.
    #[serde(with = "secs")]
    pub sheet_dismiss: Duration,
    /// Probe for the onboarding welcome screen.
    #[serde(with = "secs")]
    pub onboarding_probe: Duration,
    /// Each onboarding "Continue"/"Next" step.
    #[serde(with = "secs")]
    pub onboarding_step: Duration,
    /// Waiting for onboarding to advance past the demographic-info step.
    #[serde(with = "secs")]
    pub onboarding_advance: Duration,
    /// First wait for the "Health Access" sheet.
    #[serde(with = "secs")]
    pub authorization_first: Duration,
    /// Second, longer wait for the "Health Access" sheet.
    #[serde(with = "secs")]
    pub authorization_second: Duration,
    /// Steps of the Health Records authorization sheet.
    #[serde(with = "secs")]
    pub records_step: Duration,
    /// Quick check for a system alert left up at the end of a flow.
    #[serde(with = "secs")]
    pub alert: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            tab_bar: Duration::from_secs(2),
            list_lookup: Duration::from_secs(30),
            scroll_retry: Duration::from_secs(10),
            arrival: Duration::from_secs(20),
            control: Duration::from_secs(3),
            picker: Duration::from_secs(1),
            sheet_dismiss: Duration::from_secs(2),
            onboarding_probe: Duration::from_secs(3),
            onboarding_step: Duration::from_secs(5),
            onboarding_advance: Duration::from_secs(60),
            authorization_first: Duration::from_secs(10),
            authorization_second: Duration::from_secs(20),
            records_step: Duration::from_secs(5),
            alert: Duration::from_secs(1),
        }
    }
}

impl Timeouts {
    /// Multiply every timeout, e.g. for slow CI simulators.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |d: Duration| d.mul_f64(factor);
        Self {
            tab_bar: scale(self.tab_bar),
            list_lookup: scale(self.list_lookup),
            scroll_retry: scale(self.scroll_retry),
            arrival: scale(self.arrival),
            control: scale(self.control),
            picker: scale(self.picker),
            sheet_dismiss: scale(self.sheet_dismiss),
            onboarding_probe: scale(self.onboarding_probe),
            onboarding_step: scale(self.onboarding_step),
            onboarding_advance: scale(self.onboarding_advance),
            authorization_first: scale(self.authorization_first),
            authorization_second: scale(self.authorization_second),
            records_step: scale(self.records_step),
            alert: scale(self.alert),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub health_app: AppId,
    pub springboard: AppId,
    pub os_version: PlatformVersion,
    pub timeouts: Timeouts,
    pub max_scroll_attempts: u32,
    pub scroll_velocity: ScrollVelocity,
    /// Fail loudly when the notifications alert shows up without "Allow".
    pub strict_alerts: bool,
    pub decimal_separator: char,
    /// Fragment of a day button's label in the date picker; `{day}` is
    /// replaced with the day of month.
    pub day_label_template: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            health_app: AppId::new(HEALTH_APP_BUNDLE_ID),
            springboard: AppId::new(SPRINGBOARD_BUNDLE_ID),
            os_version: PlatformVersion::default(),
            timeouts: Timeouts::default(),
            max_scroll_attempts: 2,
            scroll_velocity: ScrollVelocity::Default,
            strict_alerts: true,
            decimal_separator: '.',
            day_label_template: ", {day}. ".to_string(),
        }
    }
}

impl HealthConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Defaults, overlaid with `ARKAVO_HEALTH_CONFIG` (a JSON file), then
    /// `ARKAVO_HEALTH_OS_VERSION` and `ARKAVO_HEALTH_TIMEOUT_SCALE`.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("ARKAVO_HEALTH_CONFIG") {
            Ok(path) => {
                debug!(path = %path, "loading health config file");
                Self::from_file(path)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(version) = std::env::var("ARKAVO_HEALTH_OS_VERSION") {
            config.os_version = PlatformVersion::parse(&version)?;
        }

        if let Ok(scale) = std::env::var("ARKAVO_HEALTH_TIMEOUT_SCALE") {
            let factor: f64 = scale.parse().map_err(|_| {
                HealthError::Config(format!("Invalid ARKAVO_HEALTH_TIMEOUT_SCALE '{}'", scale))
            })?;
            if !(factor.is_finite() && factor > 0.0) {
                return Err(HealthError::Config(format!(
                    "ARKAVO_HEALTH_TIMEOUT_SCALE must be positive, got {}",
                    factor
                )));
            }
            config.timeouts = config.timeouts.scaled(factor);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_os_version(mut self, version: PlatformVersion) -> Self {
        self.os_version = version;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.health_app.as_str().is_empty() {
            return Err(HealthError::Config("health_app must not be empty".to_string()));
        }
        if !self.day_label_template.contains("{day}") {
            return Err(HealthError::Config(format!(
                "day_label_template '{}' has no {{day}} placeholder",
                self.day_label_template
            )));
        }
        Ok(())
    }

    pub fn day_label_fragment(&self, day: u32) -> String {
        self.day_label_template.replace("{day}", &day.to_string())
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HealthConfig::default();
        assert_eq!(config.health_app.as_str(), "com.apple.Health");
        assert_eq!(config.max_scroll_attempts, 2);
        assert_eq!(config.timeouts.onboarding_advance, Duration::from_secs(60));
        assert_eq!(config.day_label_fragment(3), ", 3. ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HealthConfig::from_json(
            r#"{
                "os_version": {"major": 26, "minor": 0, "patch": 0},
                "timeouts": {"arrival": 2.5},
                "strict_alerts": false
            }"#,
        )
        .unwrap();
        assert!(config.os_version.uses_search_tab());
        assert_eq!(config.timeouts.arrival, Duration::from_millis(2500));
        assert_eq!(config.timeouts.tab_bar, Duration::from_secs(2));
        assert!(!config.strict_alerts);
        assert_eq!(config.springboard.as_str(), "com.apple.springboard");
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = HealthConfig::from_json(r#"{"day_label_template": "day"}"#);
        assert!(matches!(result, Err(HealthError::Config(_))));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        let result = HealthConfig::from_json(r#"{"timeouts": {"control": -1.0}}"#);
        assert!(matches!(result, Err(HealthError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_scroll_attempts": 4}}"#).unwrap();
        let config = HealthConfig::from_file(file.path()).unwrap();
        assert_eq!(config.max_scroll_attempts, 4);
    }

    #[test]
    fn test_scaled_timeouts() {
        let timeouts = Timeouts::default().scaled(2.0);
        assert_eq!(timeouts.tab_bar, Duration::from_secs(4));
        assert_eq!(timeouts.onboarding_advance, Duration::from_secs(120));
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = HealthConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(HealthConfig::from_json(&json).unwrap(), config);
    }
}
