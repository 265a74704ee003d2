// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use fabric_abi::testability::{
	PARTITION_SELECTOR_NAMED, PARTITION_SELECTOR_PARTITION_ID, PARTITION_SELECTOR_RANDOM,
	PARTITION_SELECTOR_SINGLETON, PARTITION_SELECTOR_UNIFORM_INT64, PartitionSelectorFFI,
};
use fabric_interop::{InteropError, PinArena, Result, ToNative};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SERVICE_NAME_SCHEME: &str = "fabric:/";

/// Picks the partition a fault command targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionSelector {
	Singleton {
		service_name: String,
	},
	Named {
		service_name: String,
		partition_name: String,
	},
	/// The int64 range partition containing `partition_key`
	UniformInt64 {
		service_name: String,
		partition_key: i64,
	},
	PartitionId {
		service_name: String,
		partition_id: Uuid,
	},
	Random {
		service_name: String,
	},
}

impl PartitionSelector {
	pub fn singleton(service_name: impl Into<String>) -> Self {
		Self::Singleton {
			service_name: service_name.into(),
		}
	}

	pub fn named(service_name: impl Into<String>, partition_name: impl Into<String>) -> Self {
		Self::Named {
			service_name: service_name.into(),
			partition_name: partition_name.into(),
		}
	}

	pub fn uniform_int64(service_name: impl Into<String>, partition_key: i64) -> Self {
		Self::UniformInt64 {
			service_name: service_name.into(),
			partition_key,
		}
	}

	pub fn partition_id(service_name: impl Into<String>, partition_id: Uuid) -> Self {
		Self::PartitionId {
			service_name: service_name.into(),
			partition_id,
		}
	}

	pub fn random(service_name: impl Into<String>) -> Self {
		Self::Random {
			service_name: service_name.into(),
		}
	}

	pub fn service_name(&self) -> &str {
		match self {
			Self::Singleton {
				service_name,
			}
			| Self::Named {
				service_name,
				..
			}
			| Self::UniformInt64 {
				service_name,
				..
			}
			| Self::PartitionId {
				service_name,
				..
			}
			| Self::Random {
				service_name,
			} => service_name,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		let service_name = self.service_name();
		if !service_name.starts_with(SERVICE_NAME_SCHEME) || service_name.len() == SERVICE_NAME_SCHEME.len() {
			return Err(InteropError::invalid_argument(
				"service_name",
				format!("`{service_name}` is not a {SERVICE_NAME_SCHEME} name"),
			));
		}
		if let Self::Named {
			partition_name,
			..
		} = self && partition_name.is_empty()
		{
			return Err(InteropError::invalid_argument("partition_name", "must not be empty"));
		}
		Ok(())
	}

	fn selector_type(&self) -> u32 {
		match self {
			Self::Singleton {
				..
			} => PARTITION_SELECTOR_SINGLETON,
			Self::Named {
				..
			} => PARTITION_SELECTOR_NAMED,
			Self::UniformInt64 {
				..
			} => PARTITION_SELECTOR_UNIFORM_INT64,
			Self::PartitionId {
				..
			} => PARTITION_SELECTOR_PARTITION_ID,
			Self::Random {
				..
			} => PARTITION_SELECTOR_RANDOM,
		}
	}

	/// Text form of the partition key, if the selector carries one
	fn partition_key(&self) -> Option<String> {
		match self {
			Self::Named {
				partition_name,
				..
			} => Some(partition_name.clone()),
			Self::UniformInt64 {
				partition_key,
				..
			} => Some(partition_key.to_string()),
			Self::PartitionId {
				partition_id,
				..
			} => Some(partition_id.to_string()),
			Self::Singleton {
				..
			}
			| Self::Random {
				..
			} => None,
		}
	}
}

impl ToNative for PartitionSelector {
	type Native = PartitionSelectorFFI;

	fn to_native(&self, arena: &PinArena) -> Result<PartitionSelectorFFI> {
		Ok(PartitionSelectorFFI {
			service_name: arena.pin_str(self.service_name())?.as_ptr(),
			selector_type: self.selector_type(),
			partition_key: arena.pin_opt_str(self.partition_key().as_deref())?,
		})
	}
}
