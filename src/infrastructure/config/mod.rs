//! Infrastructure configuration modules.

pub mod encoder;
pub mod logging;
pub mod search;
pub mod settings;
pub mod solver;
pub mod topology;

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Seconds from a config field as a [`Duration`].
pub(crate) fn seconds(field: &'static str, value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| ConfigError::invalid(field, format!("{secs}: {e}")).into())
        })
        .transpose()
}
