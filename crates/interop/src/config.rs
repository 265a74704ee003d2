// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use fabric_runtime::ApartmentConfig;
use serde::{Deserialize, Deserializer};

use crate::error::{InteropError, Result};

/// Client-wide settings shared by every native call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Timeout handed to native calls when the caller does not pick one
	#[serde(rename = "default_timeout_ms", deserialize_with = "millis")]
	pub default_timeout: Duration,
	/// Timeout for long-running test commands (chaos, progress polling)
	#[serde(rename = "operation_timeout_ms", deserialize_with = "millis")]
	pub operation_timeout: Duration,
	pub apartment: ApartmentConfig,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			default_timeout: Duration::from_secs(60),
			operation_timeout: Duration::from_secs(300),
			apartment: ApartmentConfig::default(),
		}
	}
}

impl ClientConfig {
	pub fn from_json(json: &str) -> Result<Self> {
		serde_json::from_str(json).map_err(|e| InteropError::Config(e.to_string()))
	}

	pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
		self.default_timeout = timeout;
		self
	}

	pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
		self.operation_timeout = timeout;
		self
	}

	pub fn with_apartment(mut self, apartment: ApartmentConfig) -> Self {
		self.apartment = apartment;
		self
	}
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
	D: Deserializer<'de>,
{
	u64::deserialize(deserializer).map(Duration::from_millis)
}
