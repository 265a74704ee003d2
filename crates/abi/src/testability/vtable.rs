// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

use core::ffi::c_void;

use super::{
	CancelTestCommandDescriptionFFI, ChaosDescriptionFFI, ChaosParametersFFI, ChaosReportDescriptionFFI,
	ChaosReportFFI, ChaosScheduleDescriptionFFI, InvokeDataLossDescriptionFFI, InvokeQuorumLossDescriptionFFI,
	NodeTransitionDescriptionFFI, NodeTransitionProgressFFI, PartitionProgressFFI,
	RestartPartitionDescriptionFFI, TestCommandListDescriptionFFI, TestCommandStatusListFFI,
};
use crate::{
	data::GuidFFI,
	operation::{BeginFn, BeginWithDescriptionFn, EndFn, EndWithOutputFn},
};

/// Function table of the native test-management client
///
/// All `begin_*` entries follow the convention documented in
/// [`crate::operation`]: they return 0 and write the context into `ctx_out`
/// on success, and never invoke `callback` on failure.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TestManagementClientVTableFFI {
	pub begin_start_partition_data_loss: BeginWithDescriptionFn<InvokeDataLossDescriptionFFI>,
	pub end_start_partition_data_loss: EndFn,

	pub begin_start_partition_quorum_loss: BeginWithDescriptionFn<InvokeQuorumLossDescriptionFFI>,
	pub end_start_partition_quorum_loss: EndFn,

	pub begin_start_partition_restart: BeginWithDescriptionFn<RestartPartitionDescriptionFFI>,
	pub end_start_partition_restart: EndFn,

	pub begin_get_partition_data_loss_progress: BeginWithDescriptionFn<GuidFFI>,
	pub end_get_partition_data_loss_progress: EndWithOutputFn<PartitionProgressFFI>,

	pub begin_get_partition_quorum_loss_progress: BeginWithDescriptionFn<GuidFFI>,
	pub end_get_partition_quorum_loss_progress: EndWithOutputFn<PartitionProgressFFI>,

	pub begin_get_partition_restart_progress: BeginWithDescriptionFn<GuidFFI>,
	pub end_get_partition_restart_progress: EndWithOutputFn<PartitionProgressFFI>,

	pub begin_get_test_command_status_list: BeginWithDescriptionFn<TestCommandListDescriptionFFI>,
	pub end_get_test_command_status_list: EndWithOutputFn<TestCommandStatusListFFI>,

	pub begin_cancel_test_command: BeginWithDescriptionFn<CancelTestCommandDescriptionFFI>,
	pub end_cancel_test_command: EndFn,

	pub begin_start_chaos: BeginWithDescriptionFn<ChaosParametersFFI>,
	pub end_start_chaos: EndFn,

	pub begin_stop_chaos: BeginFn,
	pub end_stop_chaos: EndFn,

	pub begin_get_chaos_report: BeginWithDescriptionFn<ChaosReportDescriptionFFI>,
	pub end_get_chaos_report: EndWithOutputFn<ChaosReportFFI>,

	pub begin_get_chaos: BeginFn,
	pub end_get_chaos: EndWithOutputFn<ChaosDescriptionFFI>,

	pub begin_get_chaos_schedule: BeginFn,
	pub end_get_chaos_schedule: EndWithOutputFn<ChaosScheduleDescriptionFFI>,

	pub begin_set_chaos_schedule: BeginWithDescriptionFn<ChaosScheduleDescriptionFFI>,
	pub end_set_chaos_schedule: EndFn,

	pub begin_start_node_transition: BeginWithDescriptionFn<NodeTransitionDescriptionFFI>,
	pub end_start_node_transition: EndFn,

	pub begin_get_node_transition_progress: BeginWithDescriptionFn<GuidFFI>,
	pub end_get_node_transition_progress: EndWithOutputFn<NodeTransitionProgressFFI>,

	/// Releases the client instance
	///
	/// # Safety
	/// - Must be called exactly once per instance
	/// - Contexts obtained from the instance must be released first
	pub release: extern "C" fn(instance: *mut c_void),
}
