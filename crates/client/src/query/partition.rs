// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::ptr;

use fabric_abi::query::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{opt_string_from_native, slice_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HealthState;

native_enum! {
	pub enum ServiceKind {
		Stateless = SERVICE_KIND_STATELESS,
		Stateful = SERVICE_KIND_STATEFUL,
	}
}

native_enum! {
	pub enum PartitionStatus {
		Ready = PARTITION_STATUS_READY,
		NotReady = PARTITION_STATUS_NOT_READY,
		InQuorumLoss = PARTITION_STATUS_IN_QUORUM_LOSS,
		Reconfiguring = PARTITION_STATUS_RECONFIGURING,
		Deleting = PARTITION_STATUS_DELETING,
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionScheme {
	Singleton,
	Int64Range {
		low_key: i64,
		high_key: i64,
	},
	Named {
		name: String,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionQueryDescription {
	pub service_name: String,
	pub partition_id_filter: Option<Uuid>,
	pub continuation_token: Option<String>,
}

impl PartitionQueryDescription {
	pub fn new(service_name: impl Into<String>) -> Self {
		Self {
			service_name: service_name.into(),
			partition_id_filter: None,
			continuation_token: None,
		}
	}

	pub fn with_partition_id(mut self, partition_id: Uuid) -> Self {
		self.partition_id_filter = Some(partition_id);
		self
	}

	pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
		self.continuation_token = Some(token.into());
		self
	}

	pub(crate) fn validate(&self) -> Result<()> {
		if self.service_name.is_empty() {
			return Err(InteropError::invalid_argument("service_name", "must not be empty"));
		}
		Ok(())
	}
}

impl ToNative for PartitionQueryDescription {
	type Native = PartitionQueryDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<PartitionQueryDescriptionFFI> {
		let partition_id_filter = match &self.partition_id_filter {
			Some(id) => arena.pin(id)?.as_ptr(),
			None => ptr::null(),
		};
		Ok(PartitionQueryDescriptionFFI {
			service_name: arena.pin_str(&self.service_name)?.as_ptr(),
			partition_id_filter,
			continuation_token: arena.pin_opt_str(self.continuation_token.as_deref())?,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
	pub id: Uuid,
	pub service_kind: ServiceKind,
	pub scheme: PartitionScheme,
	pub status: PartitionStatus,
	pub health_state: HealthState,
	/// Target replica count of a stateful partition, instance count otherwise
	pub replica_count: u32,
	/// Only set for stateful partitions
	pub min_replica_set_size: Option<u32>,
}

impl FromNative for Partition {
	type Native = PartitionQueryResultItemFFI;

	unsafe fn from_native(native: &PartitionQueryResultItemFFI) -> Result<Self> {
		let scheme = match native.partition_scheme {
			PARTITION_SCHEME_SINGLETON => PartitionScheme::Singleton,
			PARTITION_SCHEME_INT64_RANGE => PartitionScheme::Int64Range {
				low_key: native.low_key,
				high_key: native.high_key,
			},
			PARTITION_SCHEME_NAMED => PartitionScheme::Named {
				name: unsafe { opt_string_from_native(native.partition_name, "partition.name") }?
					.ok_or_else(|| InteropError::MalformedResult("named partition without a name".to_string()))?,
			},
			other => return Err(InteropError::MalformedResult(format!("unknown partition scheme {other}"))),
		};
		let service_kind = ServiceKind::from_native_value(native.service_kind)?;

		Ok(Self {
			id: unsafe { Uuid::from_native(&native.partition_id) }?,
			service_kind,
			scheme,
			status: PartitionStatus::from_native_value(native.partition_status)?,
			health_state: HealthState::from_native_value(native.health_state)?,
			replica_count: native.replica_count,
			min_replica_set_size: match service_kind {
				ServiceKind::Stateful => Some(native.min_replica_set_size),
				ServiceKind::Stateless => None,
			},
		})
	}
}

/// One page of partitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionList {
	pub partitions: Vec<Partition>,
	pub continuation_token: Option<String>,
}

impl FromNative for PartitionList {
	type Native = PartitionListFFI;

	unsafe fn from_native(native: &PartitionListFFI) -> Result<Self> {
		let partitions = unsafe { slice_from_native(native.items, native.count, "partition_list") }?
			.iter()
			.map(|item| unsafe { Partition::from_native(item) })
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			partitions,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "partition_list.continuation_token")
			}?,
		})
	}
}
