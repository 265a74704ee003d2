// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Fault injection and chaos testing

mod chaos;
mod client;
mod command;
mod node;
mod schedule;
mod selector;

pub use chaos::{
	ChaosDescription, ChaosEvent, ChaosEventKind, ChaosParameters, ChaosReport, ChaosReportFilter, ChaosReportRequest,
	ChaosStatus,
};
pub use client::TestManagementClient;
pub use command::{
	CancelTestCommandDescription, DataLossMode, InvokeDataLossDescription, InvokeQuorumLossDescription,
	PartitionDataLossProgress, PartitionProgress, PartitionQuorumLossProgress, PartitionRestartProgress,
	QuorumLossMode, RestartPartitionDescription, RestartPartitionMode, SelectedPartition, TestCommandListDescription,
	TestCommandProgressState, TestCommandStateFilter, TestCommandStatus, TestCommandStatusList, TestCommandType,
	TestCommandTypeFilter,
};
pub use node::{NodeTransition, NodeTransitionDescription, NodeTransitionProgress, NodeTransitionTarget};
pub use schedule::{
	ChaosSchedule, ChaosScheduleActiveDays, ChaosScheduleDescription, ChaosScheduleJob, ChaosScheduleStatus,
	ChaosTimeOfDay, ChaosTimeRange,
};
pub use selector::PartitionSelector;
