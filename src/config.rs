//! Container configuration.
//!
//! Options can be set in code through [`ContainerBuilder`](crate::ContainerBuilder),
//! read from prefixed environment variables, or (with the `config` feature)
//! deserialized from JSON.

use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::{DiError, DiResult};

/// Default ceiling for nested resolutions on one thread.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Order in which [`Container::dispose`](crate::Container::dispose) releases
/// tracked instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum ReleaseOrder {
    /// Release in the order instances were produced.
    #[default]
    Tracked,
    /// Release newest first, so dependents go before their dependencies.
    Reverse,
}

impl FromStr for ReleaseOrder {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracked" | "fifo" => Ok(ReleaseOrder::Tracked),
            "reverse" | "lifo" => Ok(ReleaseOrder::Reverse),
            _ => Err(DiError::InvalidArgument("release_order")),
        }
    }
}

impl fmt::Display for ReleaseOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseOrder::Tracked => f.write_str("tracked"),
            ReleaseOrder::Reverse => f.write_str("reverse"),
        }
    }
}

/// Behavioural switches for a [`Container`](crate::Container).
///
/// # Examples
///
/// ```
/// use lodge_ioc::{ContainerOptions, ReleaseOrder};
///
/// let options = ContainerOptions {
///     release_order: ReleaseOrder::Reverse,
///     ..ContainerOptions::default()
/// };
/// assert!(options.detect_cycles);
/// assert_eq!(options.max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Record the per-thread resolution path so cycles report every hop and
    /// `max_depth` is enforced. Re-entrant resolution of an entry that is
    /// being built on the same thread is rejected either way.
    pub detect_cycles: bool,
    /// Maximum nesting of factory evaluations on one thread. A container
    /// built with 0 uses 1.
    pub max_depth: usize,
    pub release_order: ReleaseOrder,
    /// Release remaining tracked instances when the container is dropped.
    pub dispose_on_drop: bool,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            max_depth: DEFAULT_MAX_DEPTH,
            release_order: ReleaseOrder::Tracked,
            dispose_on_drop: true,
        }
    }
}

impl ContainerOptions {
    /// Reads options from `LODGE_*` environment variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_env_with_prefix("LODGE")
    }

    /// Reads options from `{PREFIX}_DETECT_CYCLES`, `{PREFIX}_MAX_DEPTH`,
    /// `{PREFIX}_RELEASE_ORDER` and `{PREFIX}_DISPOSE_ON_DROP`.
    ///
    /// Unset variables keep their defaults. A value that does not parse
    /// fails with [`DiError::InvalidArgument`] naming the variable suffix.
    pub fn from_env_with_prefix(prefix: &str) -> DiResult<Self> {
        let mut options = Self::default();
        let prefix = prefix.to_uppercase();

        if let Some(value) = read_var(&prefix, "DETECT_CYCLES") {
            options.detect_cycles = parse_bool(&value).ok_or(DiError::InvalidArgument("DETECT_CYCLES"))?;
        }
        if let Some(value) = read_var(&prefix, "MAX_DEPTH") {
            options.max_depth = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or(DiError::InvalidArgument("MAX_DEPTH"))?;
        }
        if let Some(value) = read_var(&prefix, "RELEASE_ORDER") {
            options.release_order = value.parse().map_err(|_| DiError::InvalidArgument("RELEASE_ORDER"))?;
        }
        if let Some(value) = read_var(&prefix, "DISPOSE_ON_DROP") {
            options.dispose_on_drop = parse_bool(&value).ok_or(DiError::InvalidArgument("DISPOSE_ON_DROP"))?;
        }

        Ok(options)
    }

    /// Deserializes options from JSON; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn read_var(prefix: &str, name: &str) -> Option<String> {
    let key = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", prefix, name)
    };
    env::var(key).ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_order_parses_aliases() {
        assert_eq!("tracked".parse::<ReleaseOrder>().unwrap(), ReleaseOrder::Tracked);
        assert_eq!("LIFO".parse::<ReleaseOrder>().unwrap(), ReleaseOrder::Reverse);
        assert_eq!(
            "sideways".parse::<ReleaseOrder>(),
            Err(DiError::InvalidArgument("release_order"))
        );
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let options = ContainerOptions::from_json(r#"{ "release_order": "reverse" }"#).unwrap();
        assert_eq!(options.release_order, ReleaseOrder::Reverse);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(options.dispose_on_drop);
    }
}
