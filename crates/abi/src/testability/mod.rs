// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! Fault-injection and test-orchestration layouts
//!
//! Pointers inside request structures only need to stay valid for the
//! duration of the `BeginX` call. Pointers inside result structures filled by
//! `EndX` stay valid until the operation context is released.

mod vtable;

use core::ffi::c_char;

pub use vtable::TestManagementClientVTableFFI;

use crate::data::{GuidFFI, StringPairListFFI};

pub const PARTITION_SELECTOR_SINGLETON: u32 = 1;
pub const PARTITION_SELECTOR_NAMED: u32 = 2;
pub const PARTITION_SELECTOR_UNIFORM_INT64: u32 = 3;
pub const PARTITION_SELECTOR_PARTITION_ID: u32 = 4;
pub const PARTITION_SELECTOR_RANDOM: u32 = 5;

pub const DATA_LOSS_MODE_PARTIAL: u32 = 1;
pub const DATA_LOSS_MODE_FULL: u32 = 2;

pub const QUORUM_LOSS_MODE_QUORUM_REPLICAS: u32 = 1;
pub const QUORUM_LOSS_MODE_ALL_REPLICAS: u32 = 2;

pub const RESTART_PARTITION_MODE_ALL_REPLICAS_OR_INSTANCES: u32 = 1;
pub const RESTART_PARTITION_MODE_ONLY_ACTIVE_SECONDARIES: u32 = 2;

pub const TEST_COMMAND_STATE_RUNNING: u32 = 1;
pub const TEST_COMMAND_STATE_ROLLING_BACK: u32 = 2;
pub const TEST_COMMAND_STATE_COMPLETED: u32 = 3;
pub const TEST_COMMAND_STATE_FAULTED: u32 = 4;
pub const TEST_COMMAND_STATE_CANCELLED: u32 = 5;
pub const TEST_COMMAND_STATE_FORCE_CANCELLED: u32 = 6;

pub const TEST_COMMAND_STATE_FILTER_RUNNING: u32 = 0x0001;
pub const TEST_COMMAND_STATE_FILTER_ROLLING_BACK: u32 = 0x0002;
pub const TEST_COMMAND_STATE_FILTER_COMPLETED_SUCCESSFULLY: u32 = 0x0008;
pub const TEST_COMMAND_STATE_FILTER_FAILED: u32 = 0x0010;
pub const TEST_COMMAND_STATE_FILTER_CANCELLED: u32 = 0x0020;
pub const TEST_COMMAND_STATE_FILTER_FORCE_CANCELLED: u32 = 0x0040;
pub const TEST_COMMAND_STATE_FILTER_ALL: u32 = 0xFFFF;

pub const TEST_COMMAND_TYPE_DATA_LOSS: u32 = 0x0001;
pub const TEST_COMMAND_TYPE_QUORUM_LOSS: u32 = 0x0002;
pub const TEST_COMMAND_TYPE_RESTART_PARTITION: u32 = 0x0004;
pub const TEST_COMMAND_TYPE_NODE_TRANSITION: u32 = 0x0008;
pub const TEST_COMMAND_TYPE_FILTER_ALL: u32 = 0xFFFF;

pub const CHAOS_STATUS_RUNNING: u32 = 1;
pub const CHAOS_STATUS_STOPPED: u32 = 2;

pub const CHAOS_SCHEDULE_STATUS_STOPPED: u32 = 1;
pub const CHAOS_SCHEDULE_STATUS_ACTIVE: u32 = 2;
pub const CHAOS_SCHEDULE_STATUS_EXPIRED: u32 = 3;
pub const CHAOS_SCHEDULE_STATUS_PENDING: u32 = 4;

pub const CHAOS_SCHEDULE_DAY_SUNDAY: u8 = 0x01;
pub const CHAOS_SCHEDULE_DAY_MONDAY: u8 = 0x02;
pub const CHAOS_SCHEDULE_DAY_TUESDAY: u8 = 0x04;
pub const CHAOS_SCHEDULE_DAY_WEDNESDAY: u8 = 0x08;
pub const CHAOS_SCHEDULE_DAY_THURSDAY: u8 = 0x10;
pub const CHAOS_SCHEDULE_DAY_FRIDAY: u8 = 0x20;
pub const CHAOS_SCHEDULE_DAY_SATURDAY: u8 = 0x40;

pub const NODE_TRANSITION_TYPE_START: u32 = 1;
pub const NODE_TRANSITION_TYPE_STOP: u32 = 2;

pub const CHAOS_EVENT_STARTED: u32 = 1;
pub const CHAOS_EVENT_EXECUTING_FAULTS: u32 = 2;
pub const CHAOS_EVENT_VALIDATION_FAILED: u32 = 3;
pub const CHAOS_EVENT_TEST_ERROR: u32 = 4;
pub const CHAOS_EVENT_WAITING: u32 = 5;
pub const CHAOS_EVENT_STOPPED: u32 = 6;

/// Selects the partition a command targets
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PartitionSelectorFFI {
	pub service_name: *const c_char,
	pub selector_type: u32,
	/// Partition name, int64 key or partition id in text form; null when unused
	pub partition_key: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InvokeDataLossDescriptionFFI {
	pub operation_id: GuidFFI,
	pub partition_selector: *const PartitionSelectorFFI,
	pub mode: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InvokeQuorumLossDescriptionFFI {
	pub operation_id: GuidFFI,
	pub partition_selector: *const PartitionSelectorFFI,
	pub mode: u32,
	pub quorum_loss_duration_ms: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RestartPartitionDescriptionFFI {
	pub operation_id: GuidFFI,
	pub partition_selector: *const PartitionSelectorFFI,
	pub mode: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCommandListDescriptionFFI {
	pub state_filter: u32,
	pub type_filter: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CancelTestCommandDescriptionFFI {
	pub operation_id: GuidFFI,
	pub force: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosParametersFFI {
	pub max_cluster_stabilization_timeout_secs: u64,
	pub max_concurrent_faults: u32,
	pub enable_move_replica_faults: u8,
	pub wait_time_between_faults_secs: u64,
	pub wait_time_between_iterations_secs: u64,
	pub time_to_run_secs: u64,
	pub context: *const StringPairListFFI,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosReportFilterFFI {
	pub start_time_utc_ms: i64,
	pub end_time_utc_ms: i64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosReportDescriptionFFI {
	/// Null when a continuation token is given
	pub filter: *const ChaosReportFilterFFI,
	pub continuation_token: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SelectedPartitionFFI {
	pub service_name: *const c_char,
	pub partition_id: GuidFFI,
}

/// Progress of a data loss, quorum loss or restart command
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PartitionProgressFFI {
	pub state: u32,
	/// Result code of the finished command, 0 while running
	pub error_code: i32,
	/// Null until the target partition has been resolved
	pub selected_partition: *const SelectedPartitionFFI,
}

impl PartitionProgressFFI {
	pub const fn empty() -> Self {
		Self {
			state: 0,
			error_code: 0,
			selected_partition: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCommandStatusFFI {
	pub operation_id: GuidFFI,
	pub state: u32,
	pub command_type: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCommandStatusListFFI {
	pub count: usize,
	pub items: *const TestCommandStatusFFI,
}

impl TestCommandStatusListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosEventFFI {
	pub kind: u32,
	pub timestamp_utc_ms: i64,
	pub reason: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosReportFFI {
	pub status: u32,
	pub event_count: usize,
	pub events: *const ChaosEventFFI,
	pub continuation_token: *const c_char,
}

impl ChaosReportFFI {
	pub const fn empty() -> Self {
		Self {
			status: 0,
			event_count: 0,
			events: core::ptr::null(),
			continuation_token: core::ptr::null(),
		}
	}
}

/// Current chaos status together with the parameters of the last start
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosDescriptionFFI {
	pub status: u32,
	pub schedule_status: u32,
	/// Null when chaos has never been started
	pub parameters: *const ChaosParametersFFI,
}

impl ChaosDescriptionFFI {
	pub const fn empty() -> Self {
		Self {
			status: 0,
			schedule_status: 0,
			parameters: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaosTimeOfDayFFI {
	pub hour: u8,
	pub minute: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaosTimeRangeFFI {
	pub start: ChaosTimeOfDayFFI,
	pub end: ChaosTimeOfDayFFI,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosScheduleJobFFI {
	/// Name of an entry in the schedule's parameter dictionary
	pub parameters_name: *const c_char,
	/// Bitmask of `CHAOS_SCHEDULE_DAY_*`
	pub active_days: u8,
	pub time_range_count: usize,
	pub time_ranges: *const ChaosTimeRangeFFI,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosNamedParametersFFI {
	pub name: *const c_char,
	pub parameters: *const ChaosParametersFFI,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosScheduleFFI {
	pub start_date_utc_ms: i64,
	pub expiry_date_utc_ms: i64,
	pub parameters_count: usize,
	pub parameters: *const ChaosNamedParametersFFI,
	pub job_count: usize,
	pub jobs: *const ChaosScheduleJobFFI,
}

/// Versioned schedule; a set is rejected unless `version` matches the stored one
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaosScheduleDescriptionFFI {
	pub version: u32,
	pub schedule: *const ChaosScheduleFFI,
}

impl ChaosScheduleDescriptionFFI {
	pub const fn empty() -> Self {
		Self {
			version: 0,
			schedule: core::ptr::null(),
		}
	}
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NodeTransitionDescriptionFFI {
	/// One of `NODE_TRANSITION_TYPE_*`
	pub transition_type: u32,
	pub operation_id: GuidFFI,
	pub node_name: *const c_char,
	pub node_instance_id: u64,
	/// Only read for stop transitions
	pub stop_duration_secs: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NodeTransitionProgressFFI {
	pub state: u32,
	/// Result code of the finished transition, 0 while running
	pub error_code: i32,
	/// Null until the node has been resolved
	pub node_name: *const c_char,
	pub node_instance_id: u64,
}

impl NodeTransitionProgressFFI {
	pub const fn empty() -> Self {
		Self {
			state: 0,
			error_code: 0,
			node_name: core::ptr::null(),
			node_instance_id: 0,
		}
	}
}
