//! Driver configuration from environment variables.

use core::str::FromStr;

use anyhow::{Context, bail};
use serde::Serialize;

pub const PRODUCERS_VAR: &str = "KEYQUEUE_PRODUCERS";
pub const CONSUMERS_VAR: &str = "KEYQUEUE_CONSUMERS";
pub const VOLUME_MULTIPLIER_VAR: &str = "KEYQUEUE_VOLUME_MULTIPLIER";
pub const MAX_SLEEP_MS_VAR: &str = "KEYQUEUE_MAX_SLEEP_MS";
pub const DRAIN_TIMEOUT_MS_VAR: &str = "KEYQUEUE_DRAIN_TIMEOUT_MS";

/// Upper bound of the random factor applied to `volume_multiplier`.
pub const MAX_VOLUME_FACTOR: u32 = 5;

/// Driver run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverConfig {
    /// Number of producer threads.
    pub producers: u32,
    /// Number of keys, one counting consumer each.
    pub consumers: u32,
    /// Each producer sends `volume_multiplier × rand(1..=MAX_VOLUME_FACTOR)` messages.
    pub volume_multiplier: u32,
    /// Upper bound of the random pause between two enqueues.
    pub max_sleep_ms: u64,
    /// How long to wait for deliveries to settle after producers finish.
    pub drain_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            producers: 10,
            consumers: 5,
            volume_multiplier: 20,
            max_sleep_ms: 20,
            drain_timeout_ms: 10_000,
        }
    }
}

impl DriverConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source; unset variables
    /// keep their defaults, malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            producers: parse_var(&lookup, PRODUCERS_VAR, defaults.producers)?,
            consumers: parse_var(&lookup, CONSUMERS_VAR, defaults.consumers)?,
            volume_multiplier: parse_var(&lookup, VOLUME_MULTIPLIER_VAR, defaults.volume_multiplier)?,
            max_sleep_ms: parse_var(&lookup, MAX_SLEEP_MS_VAR, defaults.max_sleep_ms)?,
            drain_timeout_ms: parse_var(&lookup, DRAIN_TIMEOUT_MS_VAR, defaults.drain_timeout_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.consumers == 0 {
            bail!("{CONSUMERS_VAR} must be at least 1");
        }
        // Per-consumer expected counts are u32; the whole run must fit.
        let worst_case = self
            .volume_multiplier
            .checked_mul(MAX_VOLUME_FACTOR)
            .and_then(|volume| volume.checked_mul(self.producers));
        if worst_case.is_none() {
            bail!(
                "{VOLUME_MULTIPLIER_VAR}={} with {PRODUCERS_VAR}={} overflows the message count",
                self.volume_multiplier,
                self.producers
            );
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {name}={raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn unset_variables_use_defaults() {
        let config = DriverConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DriverConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = DriverConfig::from_lookup(lookup(&[
            (PRODUCERS_VAR, "3"),
            (CONSUMERS_VAR, " 2 "),
            (MAX_SLEEP_MS_VAR, "0"),
        ]))
        .unwrap();

        assert_eq!(config.producers, 3);
        assert_eq!(config.consumers, 2);
        assert_eq!(config.max_sleep_ms, 0);
        assert_eq!(config.volume_multiplier, 20);
    }

    #[test]
    fn malformed_variable_is_an_error() {
        let err = DriverConfig::from_lookup(lookup(&[(PRODUCERS_VAR, "many")])).unwrap_err();
        assert!(err.to_string().contains(PRODUCERS_VAR));
    }

    #[test]
    fn overflowing_volume_is_rejected() {
        let err = DriverConfig::from_lookup(lookup(&[(VOLUME_MULTIPLIER_VAR, "2000000000")])).unwrap_err();
        assert!(err.to_string().contains("overflows"));

        // Each producer alone fits, but ten of them do not.
        let err = DriverConfig::from_lookup(lookup(&[(VOLUME_MULTIPLIER_VAR, "100000000")])).unwrap_err();
        assert!(err.to_string().contains(VOLUME_MULTIPLIER_VAR));

        let ok = DriverConfig::from_lookup(lookup(&[(VOLUME_MULTIPLIER_VAR, "80000000")])).unwrap();
        assert_eq!(ok.volume_multiplier, 80_000_000);
    }

    #[test]
    fn zero_consumers_is_rejected() {
        let err = DriverConfig::from_lookup(lookup(&[(CONSUMERS_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
