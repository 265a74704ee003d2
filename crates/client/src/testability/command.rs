// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{ops::BitOr, time::Duration};

use fabric_abi::testability::*;
use fabric_interop::{
	FromNative, InteropError, NativeErrorCode, PinArena, Result, ToNative, marshal::slice_from_native,
	to_milliseconds,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PartitionSelector;

native_enum! {
	pub enum DataLossMode {
		/// Some replicas lose data; the partition may recover from the rest
		Partial = DATA_LOSS_MODE_PARTIAL,
		Full = DATA_LOSS_MODE_FULL,
	}
}

native_enum! {
	pub enum QuorumLossMode {
		QuorumReplicas = QUORUM_LOSS_MODE_QUORUM_REPLICAS,
		AllReplicas = QUORUM_LOSS_MODE_ALL_REPLICAS,
	}
}

native_enum! {
	pub enum RestartPartitionMode {
		AllReplicasOrInstances = RESTART_PARTITION_MODE_ALL_REPLICAS_OR_INSTANCES,
		OnlyActiveSecondaries = RESTART_PARTITION_MODE_ONLY_ACTIVE_SECONDARIES,
	}
}

native_enum! {
	pub enum TestCommandProgressState {
		Running = TEST_COMMAND_STATE_RUNNING,
		RollingBack = TEST_COMMAND_STATE_ROLLING_BACK,
		Completed = TEST_COMMAND_STATE_COMPLETED,
		Faulted = TEST_COMMAND_STATE_FAULTED,
		Cancelled = TEST_COMMAND_STATE_CANCELLED,
		ForceCancelled = TEST_COMMAND_STATE_FORCE_CANCELLED,
	}
}

impl TestCommandProgressState {
	/// The command will not change state anymore
	pub fn is_terminal(self) -> bool {
		!matches!(self, Self::Running | Self::RollingBack)
	}
}

native_enum! {
	pub enum TestCommandType {
		DataLoss = TEST_COMMAND_TYPE_DATA_LOSS,
		QuorumLoss = TEST_COMMAND_TYPE_QUORUM_LOSS,
		RestartPartition = TEST_COMMAND_TYPE_RESTART_PARTITION,
		NodeTransition = TEST_COMMAND_TYPE_NODE_TRANSITION,
	}
}

pub(super) fn require_operation_id(operation_id: &Uuid) -> Result<()> {
	if operation_id.is_nil() {
		return Err(InteropError::invalid_argument("operation_id", "must not be nil"));
	}
	Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeDataLossDescription {
	pub operation_id: Uuid,
	pub partition_selector: PartitionSelector,
	pub mode: DataLossMode,
}

impl InvokeDataLossDescription {
	pub fn new(operation_id: Uuid, partition_selector: PartitionSelector, mode: DataLossMode) -> Self {
		Self {
			operation_id,
			partition_selector,
			mode,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		require_operation_id(&self.operation_id)?;
		self.partition_selector.validate()
	}
}

impl ToNative for InvokeDataLossDescription {
	type Native = InvokeDataLossDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<InvokeDataLossDescriptionFFI> {
		Ok(InvokeDataLossDescriptionFFI {
			operation_id: self.operation_id.to_native(arena)?,
			partition_selector: arena.pin(&self.partition_selector)?.as_ptr(),
			mode: self.mode.as_native(),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeQuorumLossDescription {
	pub operation_id: Uuid,
	pub partition_selector: PartitionSelector,
	pub mode: QuorumLossMode,
	/// How long the partition is kept in quorum loss
	pub quorum_loss_duration: Duration,
}

impl InvokeQuorumLossDescription {
	pub fn new(
		operation_id: Uuid,
		partition_selector: PartitionSelector,
		mode: QuorumLossMode,
		quorum_loss_duration: Duration,
	) -> Self {
		Self {
			operation_id,
			partition_selector,
			mode,
			quorum_loss_duration,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		require_operation_id(&self.operation_id)?;
		self.partition_selector.validate()?;
		if self.quorum_loss_duration.is_zero() {
			return Err(InteropError::invalid_argument("quorum_loss_duration", "must be positive"));
		}
		to_milliseconds(self.quorum_loss_duration, "quorum_loss_duration").map(|_| ())
	}
}

impl ToNative for InvokeQuorumLossDescription {
	type Native = InvokeQuorumLossDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<InvokeQuorumLossDescriptionFFI> {
		Ok(InvokeQuorumLossDescriptionFFI {
			operation_id: self.operation_id.to_native(arena)?,
			partition_selector: arena.pin(&self.partition_selector)?.as_ptr(),
			mode: self.mode.as_native(),
			quorum_loss_duration_ms: to_milliseconds(self.quorum_loss_duration, "quorum_loss_duration")?,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPartitionDescription {
	pub operation_id: Uuid,
	pub partition_selector: PartitionSelector,
	pub mode: RestartPartitionMode,
}

impl RestartPartitionDescription {
	pub fn new(operation_id: Uuid, partition_selector: PartitionSelector, mode: RestartPartitionMode) -> Self {
		Self {
			operation_id,
			partition_selector,
			mode,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		require_operation_id(&self.operation_id)?;
		self.partition_selector.validate()
	}
}

impl ToNative for RestartPartitionDescription {
	type Native = RestartPartitionDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<RestartPartitionDescriptionFFI> {
		Ok(RestartPartitionDescriptionFFI {
			operation_id: self.operation_id.to_native(arena)?,
			partition_selector: arena.pin(&self.partition_selector)?.as_ptr(),
			mode: self.mode.as_native(),
		})
	}
}

/// The partition a command ended up targeting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPartition {
	pub service_name: String,
	pub partition_id: Uuid,
}

impl FromNative for SelectedPartition {
	type Native = SelectedPartitionFFI;

	unsafe fn from_native(native: &SelectedPartitionFFI) -> Result<Self> {
		Ok(Self {
			service_name: unsafe { String::from_native(&native.service_name) }?,
			partition_id: unsafe { Uuid::from_native(&native.partition_id) }?,
		})
	}
}

/// Progress of a data loss, quorum loss or restart command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionProgress {
	pub state: TestCommandProgressState,
	/// Unset until the target partition has been resolved
	pub selected_partition: Option<SelectedPartition>,
	/// Result code of a faulted command
	pub error: Option<NativeErrorCode>,
}

pub type PartitionDataLossProgress = PartitionProgress;
pub type PartitionQuorumLossProgress = PartitionProgress;
pub type PartitionRestartProgress = PartitionProgress;

impl FromNative for PartitionProgress {
	type Native = PartitionProgressFFI;

	unsafe fn from_native(native: &PartitionProgressFFI) -> Result<Self> {
		let selected_partition = match unsafe { native.selected_partition.as_ref() } {
			Some(selected) => Some(unsafe { SelectedPartition::from_native(selected) }?),
			None => None,
		};
		Ok(Self {
			state: TestCommandProgressState::from_native_value(native.state)?,
			selected_partition,
			error: (native.error_code != 0).then_some(NativeErrorCode(native.error_code)),
		})
	}
}

/// Bit set of [`TestCommandProgressState`]s to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCommandStateFilter(pub u32);

impl TestCommandStateFilter {
	pub const RUNNING: Self = Self(TEST_COMMAND_STATE_FILTER_RUNNING);
	pub const ROLLING_BACK: Self = Self(TEST_COMMAND_STATE_FILTER_ROLLING_BACK);
	pub const COMPLETED_SUCCESSFULLY: Self = Self(TEST_COMMAND_STATE_FILTER_COMPLETED_SUCCESSFULLY);
	pub const FAILED: Self = Self(TEST_COMMAND_STATE_FILTER_FAILED);
	pub const CANCELLED: Self = Self(TEST_COMMAND_STATE_FILTER_CANCELLED);
	pub const FORCE_CANCELLED: Self = Self(TEST_COMMAND_STATE_FILTER_FORCE_CANCELLED);
	pub const ALL: Self = Self(TEST_COMMAND_STATE_FILTER_ALL);
}

impl BitOr for TestCommandStateFilter {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

/// Bit set of [`TestCommandType`]s to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCommandTypeFilter(pub u32);

impl TestCommandTypeFilter {
	pub const DATA_LOSS: Self = Self(TEST_COMMAND_TYPE_DATA_LOSS);
	pub const QUORUM_LOSS: Self = Self(TEST_COMMAND_TYPE_QUORUM_LOSS);
	pub const RESTART_PARTITION: Self = Self(TEST_COMMAND_TYPE_RESTART_PARTITION);
	pub const NODE_TRANSITION: Self = Self(TEST_COMMAND_TYPE_NODE_TRANSITION);
	pub const ALL: Self = Self(TEST_COMMAND_TYPE_FILTER_ALL);
}

impl BitOr for TestCommandTypeFilter {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommandListDescription {
	pub state_filter: TestCommandStateFilter,
	pub type_filter: TestCommandTypeFilter,
}

impl Default for TestCommandListDescription {
	fn default() -> Self {
		Self {
			state_filter: TestCommandStateFilter::ALL,
			type_filter: TestCommandTypeFilter::ALL,
		}
	}
}

impl TestCommandListDescription {
	pub fn new(state_filter: TestCommandStateFilter, type_filter: TestCommandTypeFilter) -> Self {
		Self {
			state_filter,
			type_filter,
		}
	}
}

impl ToNative for TestCommandListDescription {
	type Native = TestCommandListDescriptionFFI;

	fn to_native(&self, _arena: &PinArena) -> Result<TestCommandListDescriptionFFI> {
		Ok(TestCommandListDescriptionFFI {
			state_filter: self.state_filter.0,
			type_filter: self.type_filter.0,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommandStatus {
	pub operation_id: Uuid,
	pub state: TestCommandProgressState,
	pub command_type: TestCommandType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommandStatusList {
	pub items: Vec<TestCommandStatus>,
}

impl TestCommandStatusList {
	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &TestCommandStatus> {
		self.items.iter()
	}

	pub fn find(&self, operation_id: Uuid) -> Option<&TestCommandStatus> {
		self.items.iter().find(|status| status.operation_id == operation_id)
	}
}

impl IntoIterator for TestCommandStatusList {
	type Item = TestCommandStatus;
	type IntoIter = std::vec::IntoIter<TestCommandStatus>;

	fn into_iter(self) -> Self::IntoIter {
		self.items.into_iter()
	}
}

impl FromNative for TestCommandStatusList {
	type Native = TestCommandStatusListFFI;

	unsafe fn from_native(native: &TestCommandStatusListFFI) -> Result<Self> {
		let items = unsafe { slice_from_native(native.items, native.count, "test_command_status_list") }?
			.iter()
			.map(|item| -> Result<TestCommandStatus> {
				Ok(TestCommandStatus {
					operation_id: unsafe { Uuid::from_native(&item.operation_id) }?,
					state: TestCommandProgressState::from_native_value(item.state)?,
					command_type: TestCommandType::from_native_value(item.command_type)?,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			items,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelTestCommandDescription {
	pub operation_id: Uuid,
	/// Skip the rollback of the command's effects
	pub force: bool,
}

impl CancelTestCommandDescription {
	pub fn new(operation_id: Uuid, force: bool) -> Self {
		Self {
			operation_id,
			force,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		require_operation_id(&self.operation_id)
	}
}

impl ToNative for CancelTestCommandDescription {
	type Native = CancelTestCommandDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<CancelTestCommandDescriptionFFI> {
		Ok(CancelTestCommandDescriptionFFI {
			operation_id: self.operation_id.to_native(arena)?,
			force: self.force.to_native(arena)?,
		})
	}
}
