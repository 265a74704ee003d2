// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use serde::Deserialize;

/// Configuration of an [`Apartment`](crate::Apartment).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApartmentConfig {
	/// Number of worker threads
	pub threads: usize,
	/// Maximum number of closures queued or running at once
	pub max_in_flight: usize,
	/// Worker threads are named `{thread_name_prefix}-{index}`
	pub thread_name_prefix: String,
}

impl Default for ApartmentConfig {
	fn default() -> Self {
		Self {
			threads: num_cpus::get(),
			max_in_flight: 1024,
			thread_name_prefix: "mta".to_string(),
		}
	}
}

impl ApartmentConfig {
	pub fn with_threads(mut self, threads: usize) -> Self {
		self.threads = threads;
		self
	}

	pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
		self.max_in_flight = max_in_flight;
		self
	}

	pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.thread_name_prefix = prefix.into();
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_missing_fields_fall_back_to_defaults() {
		let config: ApartmentConfig = serde_json::from_str(r#"{ "threads": 2 }"#).unwrap();

		assert_eq!(config.threads, 2);
		assert_eq!(config.max_in_flight, 1024);
		assert_eq!(config.thread_name_prefix, "mta");
	}

	#[test]
	fn test_builder_setters() {
		let config = ApartmentConfig::default().with_threads(3).with_max_in_flight(7).with_thread_name_prefix("native");

		assert_eq!(config.threads, 3);
		assert_eq!(config.max_in_flight, 7);
		assert_eq!(config.thread_name_prefix, "native");
	}
}
