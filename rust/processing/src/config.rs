// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instancing configuration, optionally loaded from environment variables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tuning knobs of the instancing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancingConfig {
    /// Maximum number of templates opened per facet group key bucket.
    pub template_count_limit: u32,
    /// Minimum cluster size (template included) for facet groups to be instanced.
    pub min_instance_count: usize,
    /// Minimum cluster size for pyramids to be instanced.
    pub min_pyramid_instance_count: usize,
    /// Match key buckets on the rayon pool.
    pub parallel: bool,
}

impl Default for InstancingConfig {
    fn default() -> Self {
        Self {
            template_count_limit: 1000,
            min_instance_count: 10,
            min_pyramid_instance_count: 2,
            parallel: true,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl InstancingConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            template_count_limit: env_or("REVEAL_TEMPLATE_COUNT_LIMIT", defaults.template_count_limit),
            min_instance_count: env_or("REVEAL_MIN_INSTANCE_COUNT", defaults.min_instance_count),
            min_pyramid_instance_count: env_or(
                "REVEAL_MIN_PYRAMID_INSTANCE_COUNT",
                defaults.min_pyramid_instance_count,
            ),
            parallel: env_or("REVEAL_PARALLEL_MATCHING", defaults.parallel),
        }
    }

    /// Load configuration from a JSON document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.template_count_limit == 0 {
            return Err(Error::InvalidConfig(
                "template_count_limit must be at least 1".to_string(),
            ));
        }
        if self.min_instance_count < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_instance_count must be at least 2, got {}",
                self.min_instance_count
            )));
        }
        if self.min_pyramid_instance_count < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_pyramid_instance_count must be at least 2, got {}",
                self.min_pyramid_instance_count
            )));
        }
        Ok(())
    }
}
