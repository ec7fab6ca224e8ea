use std::str::FromStr;

use jiff::SignedDuration;
use thiserror::Error;

use crate::kmh::Kmh;

const RECENT_THRESHOLD_ENV_VAR: &str = "COURIER_RECENT_THRESHOLD_SECS";
const MIN_MOVING_SPEED_ENV_VAR: &str = "COURIER_MIN_MOVING_SPEED_KMH";
const SUBSCRIBER_BUFFER_ENV_VAR: &str = "COURIER_SUBSCRIBER_BUFFER";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    /// A fix older than this is no longer considered live.
    pub recent_threshold: SignedDuration,

    /// Below this speed a fix is treated as stationary and does not move the ETA.
    pub min_moving_speed: Kmh,

    /// Events buffered per subscriber before new ones are dropped for it.
    pub subscriber_buffer: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            recent_threshold: SignedDuration::from_secs(300),
            min_moving_speed: Kmh::new(0.5),
            subscriber_buffer: 64,
        }
    }
}

impl TrackingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TrackingConfig::default();

        if let Some(seconds) = parse_var::<i64, _>(&lookup, RECENT_THRESHOLD_ENV_VAR)? {
            if seconds < 0 {
                return Err(invalid(RECENT_THRESHOLD_ENV_VAR, seconds.to_string()));
            }
            config.recent_threshold = SignedDuration::from_secs(seconds);
        }

        if let Some(speed) = parse_var::<f64, _>(&lookup, MIN_MOVING_SPEED_ENV_VAR)? {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(invalid(MIN_MOVING_SPEED_ENV_VAR, speed.to_string()));
            }
            config.min_moving_speed = Kmh::new(speed);
        }

        if let Some(buffer) = parse_var::<usize, _>(&lookup, SUBSCRIBER_BUFFER_ENV_VAR)? {
            if buffer == 0 {
                return Err(invalid(SUBSCRIBER_BUFFER_ENV_VAR, buffer.to_string()));
            }
            config.subscriber_buffer = buffer;
        }

        Ok(config)
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { name, value }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, raw)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn should_use_defaults_without_variables() {
        let config = TrackingConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.recent_threshold.as_secs(), 300);
        assert_eq!(config.min_moving_speed, Kmh::new(0.5));
        assert_eq!(config.subscriber_buffer, 64);
    }

    #[test]
    fn should_read_overrides() {
        let config = TrackingConfig::from_lookup(lookup_from(&[
            ("COURIER_RECENT_THRESHOLD_SECS", "120"),
            ("COURIER_MIN_MOVING_SPEED_KMH", "1.5"),
            ("COURIER_SUBSCRIBER_BUFFER", " 8 "),
        ]))
        .unwrap();

        assert_eq!(config.recent_threshold.as_secs(), 120);
        assert_eq!(config.min_moving_speed, Kmh::new(1.5));
        assert_eq!(config.subscriber_buffer, 8);
    }

    #[test]
    fn should_reject_invalid_values() {
        let error =
            TrackingConfig::from_lookup(lookup_from(&[("COURIER_SUBSCRIBER_BUFFER", "0")]))
                .unwrap_err();
        assert_eq!(
            error,
            ConfigError::InvalidValue {
                name: "COURIER_SUBSCRIBER_BUFFER",
                value: String::from("0"),
            }
        );

        assert!(
            TrackingConfig::from_lookup(lookup_from(&[("COURIER_MIN_MOVING_SPEED_KMH", "fast")]))
                .is_err()
        );
    }
}
