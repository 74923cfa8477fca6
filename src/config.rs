//! Configuration for entity history resolution
//!
//! Controls timezone fallback, the synthetic far-future bound used for
//! open-ended frames, and the default aggregation window padding.
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::de::Error;

/// Resolution configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Zone used when an entity has no zone, or a malformed one
    #[serde(default = "Config::default_timezone")]
    pub default_timezone: String,

    /// Days subtracted from the maximum representable instant to form the
    /// end of open-ended frames
    #[serde(default = "Config::default_far_future_backoff_days")]
    pub far_future_backoff_days: u32,

    /// Widest aggregation window callers are expected to request
    #[serde(default = "Config::default_max_window_days")]
    pub max_window_days: u32,

    /// Backward shift applied once when localization overflows
    #[serde(default = "Config::default_overflow_retry_days")]
    pub overflow_retry_days: u32,

    #[serde(default = "Config::default_window_lead_days")]
    pub window_lead_days: u32,

    #[serde(default = "Config::default_window_tail_days")]
    pub window_tail_days: u32,

    /// First day of a `TimeGroup::Week` period
    #[serde(default = "Config::default_week_start")]
    pub week_start: Weekday,
}

impl Config {
    fn default_timezone() -> String {
        "UTC".to_string()
    }

    const fn default_far_future_backoff_days() -> u32 {
        400
    }

    const fn default_max_window_days() -> u32 {
        366
    }

    const fn default_overflow_retry_days() -> u32 {
        7
    }

    const fn default_window_lead_days() -> u32 {
        1
    }

    const fn default_window_tail_days() -> u32 {
        2
    }

    const fn default_week_start() -> Weekday {
        Weekday::Mon
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = timezone.into();
        self
    }

    pub fn with_far_future_backoff_days(mut self, days: u32) -> Self {
        self.far_future_backoff_days = days;
        self
    }

    pub fn with_max_window_days(mut self, days: u32) -> Self {
        assert!(days > 0, "Max window must be at least one day");
        self.max_window_days = days;
        self
    }

    pub fn with_overflow_retry_days(mut self, days: u32) -> Self {
        assert!(days > 0, "Overflow retry shift must be at least one day");
        self.overflow_retry_days = days;
        self
    }

    pub fn with_window_padding(mut self, lead_days: u32, tail_days: u32) -> Self {
        self.window_lead_days = lead_days;
        self.window_tail_days = tail_days;
        self
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Parsed default zone, falling back to UTC.
    pub fn default_tz(&self) -> Tz {
        self.default_timezone.parse::<Tz>().unwrap_or(Tz::UTC)
    }

    /// Stand-in end instant for frames that have not ended.
    ///
    /// This is a large-but-finite bound, not a modeled infinity: it keeps
    /// localization and day arithmetic in range.
    pub fn far_future(&self) -> DateTime<Utc> {
        let max = Utc.from_utc_datetime(&NaiveDateTime::MAX);
        max.checked_sub_signed(Duration::days(i64::from(self.far_future_backoff_days)))
            .unwrap_or(max)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_timezone.parse::<Tz>().is_err() {
            return Err(format!(
                "Default timezone '{}' is not a known zone",
                self.default_timezone
            ));
        }

        if self.overflow_retry_days == 0 {
            return Err("Overflow retry shift must be at least one day".to_string());
        }

        if self.max_window_days == 0 {
            return Err("Max window must be at least one day".to_string());
        }

        let required = self.max_window_days + self.overflow_retry_days;
        if self.far_future_backoff_days < required {
            log::warn!(
                "Far-future backoff of {} days is below max window + retry ({} days); \
                windows near the open-ended bound may overflow",
                self.far_future_backoff_days,
                required
            );
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone: Self::default_timezone(),
            far_future_backoff_days: Self::default_far_future_backoff_days(),
            max_window_days: Self::default_max_window_days(),
            overflow_retry_days: Self::default_overflow_retry_days(),
            window_lead_days: Self::default_window_lead_days(),
            window_tail_days: Self::default_window_tail_days(),
            week_start: Self::default_week_start(),
        }
    }
}
