// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! Cluster topology query layouts

use core::ffi::{c_char, c_void};

use crate::{
	data::{GuidFFI, StringPairListFFI},
	operation::{BeginWithDescriptionFn, EndWithOutputFn},
};

pub const NODE_STATUS_UP: u32 = 1;
pub const NODE_STATUS_DOWN: u32 = 2;
pub const NODE_STATUS_ENABLING: u32 = 3;
pub const NODE_STATUS_DISABLING: u32 = 4;
pub const NODE_STATUS_DISABLED: u32 = 5;
pub const NODE_STATUS_UNKNOWN: u32 = 6;
pub const NODE_STATUS_REMOVED: u32 = 7;

pub const NODE_STATUS_FILTER_DEFAULT: u32 = 0x0000;
pub const NODE_STATUS_FILTER_UP: u32 = 0x0001;
pub const NODE_STATUS_FILTER_DOWN: u32 = 0x0002;
pub const NODE_STATUS_FILTER_ENABLING: u32 = 0x0004;
pub const NODE_STATUS_FILTER_DISABLING: u32 = 0x0008;
pub const NODE_STATUS_FILTER_DISABLED: u32 = 0x0010;
pub const NODE_STATUS_FILTER_UNKNOWN: u32 = 0x0020;
pub const NODE_STATUS_FILTER_REMOVED: u32 = 0x0040;
pub const NODE_STATUS_FILTER_ALL: u32 = 0xFFFF;

pub const SERVICE_KIND_STATELESS: u32 = 1;
pub const SERVICE_KIND_STATEFUL: u32 = 2;

pub const PARTITION_SCHEME_SINGLETON: u32 = 1;
pub const PARTITION_SCHEME_INT64_RANGE: u32 = 2;
pub const PARTITION_SCHEME_NAMED: u32 = 3;

pub const PARTITION_STATUS_READY: u32 = 1;
pub const PARTITION_STATUS_NOT_READY: u32 = 2;
pub const PARTITION_STATUS_IN_QUORUM_LOSS: u32 = 3;
pub const PARTITION_STATUS_RECONFIGURING: u32 = 4;
pub const PARTITION_STATUS_DELETING: u32 = 5;

pub const APPLICATION_STATUS_READY: u32 = 1;
pub const APPLICATION_STATUS_UPGRADING: u32 = 2;
pub const APPLICATION_STATUS_CREATING: u32 = 3;
pub const APPLICATION_STATUS_DELETING: u32 = 4;
pub const APPLICATION_STATUS_FAILED: u32 = 5;

pub const SERVICE_STATUS_ACTIVE: u32 = 1;
pub const SERVICE_STATUS_UPGRADING: u32 = 2;
pub const SERVICE_STATUS_DELETING: u32 = 3;
pub const SERVICE_STATUS_CREATING: u32 = 4;
pub const SERVICE_STATUS_FAILED: u32 = 5;

pub const REPLICA_STATUS_IN_BUILD: u32 = 1;
pub const REPLICA_STATUS_STANDBY: u32 = 2;
pub const REPLICA_STATUS_READY: u32 = 3;
pub const REPLICA_STATUS_DOWN: u32 = 4;
pub const REPLICA_STATUS_DROPPED: u32 = 5;

/// Stateless instances have no role
pub const REPLICA_ROLE_NONE: u32 = 0;
pub const REPLICA_ROLE_PRIMARY: u32 = 1;
pub const REPLICA_ROLE_IDLE_SECONDARY: u32 = 2;
pub const REPLICA_ROLE_ACTIVE_SECONDARY: u32 = 3;

pub const HEALTH_STATE_OK: u32 = 1;
pub const HEALTH_STATE_WARNING: u32 = 2;
pub const HEALTH_STATE_ERROR: u32 = 3;
pub const HEALTH_STATE_UNKNOWN: u32 = 0xFFFF;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NodeQueryDescriptionFFI {
	/// Null to return all nodes
	pub node_name_filter: *const c_char,
	pub node_status_filter: u32,
	pub continuation_token: *const c_char,
	/// 0 means no limit
	pub max_results: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NodeQueryResultItemFFI {
	pub node_name: *const c_char,
	pub ip_address_or_fqdn: *const c_char,
	pub node_type: *const c_char,
	pub code_version: *const c_char,
	pub node_status: u32,
	pub is_seed_node: u8,
	pub upgrade_domain: *const c_char,
	pub fault_domain: *const c_char,
	pub health_state: u32,
	pub node_up_time_secs: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NodeListFFI {
	pub count: usize,
	pub items: *const NodeQueryResultItemFFI,
	/// Null when the listing is complete
	pub continuation_token: *const c_char,
}

impl NodeListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PartitionQueryDescriptionFFI {
	pub service_name: *const c_char,
	/// Null to return every partition of the service
	pub partition_id_filter: *const GuidFFI,
	pub continuation_token: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PartitionQueryResultItemFFI {
	pub partition_id: GuidFFI,
	pub service_kind: u32,
	pub partition_scheme: u32,
	/// Set for named partitions, null otherwise
	pub partition_name: *const c_char,
	/// Set for int64 range partitions
	pub low_key: i64,
	pub high_key: i64,
	pub partition_status: u32,
	pub health_state: u32,
	/// Target replica count (stateful) or instance count (stateless)
	pub replica_count: u32,
	/// Zero for stateless services
	pub min_replica_set_size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PartitionListFFI {
	pub count: usize,
	pub items: *const PartitionQueryResultItemFFI,
	pub continuation_token: *const c_char,
}

impl PartitionListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplicationQueryDescriptionFFI {
	/// Null to return every application
	pub application_name_filter: *const c_char,
	/// Null to return applications of every type
	pub application_type_name_filter: *const c_char,
	pub continuation_token: *const c_char,
	/// 0 means no limit
	pub max_results: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplicationQueryResultItemFFI {
	pub application_name: *const c_char,
	pub application_type_name: *const c_char,
	pub application_type_version: *const c_char,
	pub status: u32,
	pub health_state: u32,
	/// Null when the application overrides no parameters
	pub parameters: *const StringPairListFFI,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ApplicationListFFI {
	pub count: usize,
	pub items: *const ApplicationQueryResultItemFFI,
	pub continuation_token: *const c_char,
}

impl ApplicationListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ServiceQueryDescriptionFFI {
	pub application_name: *const c_char,
	/// Null to return every service of the application
	pub service_name_filter: *const c_char,
	pub continuation_token: *const c_char,
	/// 0 means no limit
	pub max_results: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ServiceQueryResultItemFFI {
	pub service_name: *const c_char,
	pub service_type_name: *const c_char,
	pub service_manifest_version: *const c_char,
	pub service_kind: u32,
	/// Always 0 for stateless services
	pub has_persisted_state: u8,
	pub service_status: u32,
	pub health_state: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ServiceListFFI {
	pub count: usize,
	pub items: *const ServiceQueryResultItemFFI,
	pub continuation_token: *const c_char,
}

impl ServiceListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReplicaQueryDescriptionFFI {
	pub partition_id: GuidFFI,
	/// 0 to return every replica or instance
	pub replica_or_instance_id_filter: u64,
	pub continuation_token: *const c_char,
	/// 0 means no limit
	pub max_results: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReplicaQueryResultItemFFI {
	pub service_kind: u32,
	pub replica_or_instance_id: u64,
	/// `REPLICA_ROLE_NONE` for stateless instances
	pub replica_role: u32,
	pub replica_status: u32,
	pub health_state: u32,
	pub node_name: *const c_char,
	pub replica_address: *const c_char,
	pub last_in_build_duration_secs: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReplicaListFFI {
	pub count: usize,
	pub items: *const ReplicaQueryResultItemFFI,
	pub continuation_token: *const c_char,
}

impl ReplicaListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

/// Function table of the native query client
#[repr(C)]
#[derive(Clone, Copy)]
pub struct QueryClientVTableFFI {
	pub begin_get_node_list: BeginWithDescriptionFn<NodeQueryDescriptionFFI>,
	pub end_get_node_list: EndWithOutputFn<NodeListFFI>,

	pub begin_get_partition_list: BeginWithDescriptionFn<PartitionQueryDescriptionFFI>,
	pub end_get_partition_list: EndWithOutputFn<PartitionListFFI>,

	pub begin_get_application_list: BeginWithDescriptionFn<ApplicationQueryDescriptionFFI>,
	pub end_get_application_list: EndWithOutputFn<ApplicationListFFI>,

	pub begin_get_service_list: BeginWithDescriptionFn<ServiceQueryDescriptionFFI>,
	pub end_get_service_list: EndWithOutputFn<ServiceListFFI>,

	pub begin_get_replica_list: BeginWithDescriptionFn<ReplicaQueryDescriptionFFI>,
	pub end_get_replica_list: EndWithOutputFn<ReplicaListFFI>,

	/// Releases the client instance
	pub release: extern "C" fn(instance: *mut c_void),
}
