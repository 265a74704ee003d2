// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use fabric_abi::query::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HealthState, ServiceKind};

native_enum! {
	pub enum ReplicaStatus {
		InBuild = REPLICA_STATUS_IN_BUILD,
		Standby = REPLICA_STATUS_STANDBY,
		Ready = REPLICA_STATUS_READY,
		Down = REPLICA_STATUS_DOWN,
		Dropped = REPLICA_STATUS_DROPPED,
	}
}

native_enum! {
	pub enum ReplicaRole {
		Primary = REPLICA_ROLE_PRIMARY,
		IdleSecondary = REPLICA_ROLE_IDLE_SECONDARY,
		ActiveSecondary = REPLICA_ROLE_ACTIVE_SECONDARY,
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaQueryDescription {
	pub partition_id: Uuid,
	pub replica_or_instance_id_filter: Option<u64>,
	pub continuation_token: Option<String>,
	/// Page size; `None` leaves it to the runtime
	pub max_results: Option<u32>,
}

impl ReplicaQueryDescription {
	pub fn new(partition_id: Uuid) -> Self {
		Self {
			partition_id,
			replica_or_instance_id_filter: None,
			continuation_token: None,
			max_results: None,
		}
	}

	pub fn with_replica_or_instance_id(mut self, id: u64) -> Self {
		self.replica_or_instance_id_filter = Some(id);
		self
	}

	pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
		self.continuation_token = Some(token.into());
		self
	}

	pub fn with_max_results(mut self, max_results: u32) -> Self {
		self.max_results = Some(max_results);
		self
	}

	pub(crate) fn validate(&self) -> Result<()> {
		if self.partition_id.is_nil() {
			return Err(InteropError::invalid_argument("partition_id", "must be set"));
		}
		// 0 is the native wildcard
		if self.replica_or_instance_id_filter == Some(0) {
			return Err(InteropError::invalid_argument("replica_or_instance_id_filter", "must not be 0"));
		}
		if self.max_results == Some(0) {
			return Err(InteropError::invalid_argument("max_results", "must be positive"));
		}
		Ok(())
	}
}

impl ToNative for ReplicaQueryDescription {
	type Native = ReplicaQueryDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ReplicaQueryDescriptionFFI> {
		Ok(ReplicaQueryDescriptionFFI {
			partition_id: self.partition_id.to_native(arena)?,
			replica_or_instance_id_filter: self.replica_or_instance_id_filter.unwrap_or(0),
			continuation_token: arena.pin_opt_str(self.continuation_token.as_deref())?,
			max_results: self.max_results.unwrap_or(0),
		})
	}
}

/// A stateful replica or a stateless instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
	pub service_kind: ServiceKind,
	pub id: u64,
	/// Only set for stateful replicas
	pub role: Option<ReplicaRole>,
	pub status: ReplicaStatus,
	pub health_state: HealthState,
	pub node_name: String,
	pub address: String,
	pub last_in_build_duration: Duration,
}

impl FromNative for Replica {
	type Native = ReplicaQueryResultItemFFI;

	unsafe fn from_native(native: &ReplicaQueryResultItemFFI) -> Result<Self> {
		let service_kind = ServiceKind::from_native_value(native.service_kind)?;
		let role = match (service_kind, native.replica_role) {
			(ServiceKind::Stateless, _) | (ServiceKind::Stateful, REPLICA_ROLE_NONE) => None,
			(ServiceKind::Stateful, role) => Some(ReplicaRole::from_native_value(role)?),
		};
		Ok(Self {
			service_kind,
			id: native.replica_or_instance_id,
			role,
			status: ReplicaStatus::from_native_value(native.replica_status)?,
			health_state: HealthState::from_native_value(native.health_state)?,
			node_name: unsafe { string_from_native(native.node_name, "replica.node_name") }?,
			address: unsafe { string_from_native(native.replica_address, "replica.address") }?,
			last_in_build_duration: Duration::from_secs(native.last_in_build_duration_secs.max(0) as u64),
		})
	}
}

/// One page of replicas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaList {
	pub replicas: Vec<Replica>,
	pub continuation_token: Option<String>,
}

impl FromNative for ReplicaList {
	type Native = ReplicaListFFI;

	unsafe fn from_native(native: &ReplicaListFFI) -> Result<Self> {
		let replicas = unsafe { slice_from_native(native.items, native.count, "replica_list") }?
			.iter()
			.map(|item| unsafe { Replica::from_native(item) })
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			replicas,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "replica_list.continuation_token")
			}?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(service_kind: u32, replica_role: u32) -> ReplicaQueryResultItemFFI {
		ReplicaQueryResultItemFFI {
			service_kind,
			replica_or_instance_id: 131,
			replica_role,
			replica_status: REPLICA_STATUS_READY,
			health_state: HEALTH_STATE_OK,
			node_name: c"node-1".as_ptr(),
			replica_address: c"tcp://10.0.0.1:2020".as_ptr(),
			last_in_build_duration_secs: -4,
		}
	}

	#[test]
	fn test_nil_partition_is_rejected() {
		let err = ReplicaQueryDescription::new(Uuid::nil()).validate().unwrap_err();
		assert!(matches!(err, InteropError::InvalidArgument { ref argument, .. } if argument == "partition_id"));
	}

	#[test]
	fn test_unfiltered_query_sends_wildcard_id() {
		let arena = PinArena::open();
		let id = Uuid::new_v4();
		let native = ReplicaQueryDescription::new(id).to_native(&arena).unwrap();
		assert_eq!(native.replica_or_instance_id_filter, 0);
		assert_eq!(native.partition_id.bytes, *id.as_bytes());
	}

	#[test]
	fn test_stateless_instances_have_no_role() {
		let instance = unsafe { Replica::from_native(&item(SERVICE_KIND_STATELESS, REPLICA_ROLE_PRIMARY)) }.unwrap();
		assert_eq!(instance.role, None);

		let replica = unsafe { Replica::from_native(&item(SERVICE_KIND_STATEFUL, REPLICA_ROLE_PRIMARY)) }.unwrap();
		assert_eq!(replica.role, Some(ReplicaRole::Primary));
		assert_eq!(replica.last_in_build_duration, Duration::ZERO);
	}

	#[test]
	fn test_unknown_role_is_malformed() {
		let err = unsafe { Replica::from_native(&item(SERVICE_KIND_STATEFUL, 9)) }.unwrap_err();
		assert!(matches!(err, InteropError::MalformedResult(_)));
	}
}
