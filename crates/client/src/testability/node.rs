// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use fabric_abi::testability::*;
use fabric_interop::{
	FromNative, InteropError, NativeErrorCode, PinArena, Result, ToNative, marshal::opt_string_from_native,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{TestCommandProgressState, command::require_operation_id};

/// Brings a node up or takes it down for a while
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTransition {
	Start {
		node_name: String,
		node_instance_id: u64,
	},
	Stop {
		node_name: String,
		node_instance_id: u64,
		/// The node is restarted once this has passed
		stop_duration: Duration,
	},
}

impl NodeTransition {
	pub fn node_name(&self) -> &str {
		match self {
			Self::Start {
				node_name,
				..
			}
			| Self::Stop {
				node_name,
				..
			} => node_name,
		}
	}

	pub fn node_instance_id(&self) -> u64 {
		match self {
			Self::Start {
				node_instance_id,
				..
			}
			| Self::Stop {
				node_instance_id,
				..
			} => *node_instance_id,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTransitionDescription {
	pub operation_id: Uuid,
	pub transition: NodeTransition,
}

impl NodeTransitionDescription {
	pub fn start(operation_id: Uuid, node_name: impl Into<String>, node_instance_id: u64) -> Self {
		Self {
			operation_id,
			transition: NodeTransition::Start {
				node_name: node_name.into(),
				node_instance_id,
			},
		}
	}

	pub fn stop(
		operation_id: Uuid,
		node_name: impl Into<String>,
		node_instance_id: u64,
		stop_duration: Duration,
	) -> Self {
		Self {
			operation_id,
			transition: NodeTransition::Stop {
				node_name: node_name.into(),
				node_instance_id,
				stop_duration,
			},
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		require_operation_id(&self.operation_id)?;
		if self.transition.node_name().is_empty() {
			return Err(InteropError::invalid_argument("node_name", "must not be empty"));
		}
		if let NodeTransition::Stop {
			stop_duration,
			..
		} = &self.transition
		{
			stop_duration_secs(*stop_duration)?;
		}
		Ok(())
	}
}

fn stop_duration_secs(stop_duration: Duration) -> Result<u32> {
	if stop_duration < Duration::from_secs(1) {
		return Err(InteropError::invalid_argument("stop_duration", "must be at least one second"));
	}
	u32::try_from(stop_duration.as_secs())
		.map_err(|_| InteropError::invalid_argument("stop_duration", "too long to be represented in seconds"))
}

impl ToNative for NodeTransitionDescription {
	type Native = NodeTransitionDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<NodeTransitionDescriptionFFI> {
		let (transition_type, stop_duration_secs) = match &self.transition {
			NodeTransition::Start {
				..
			} => (NODE_TRANSITION_TYPE_START, 0),
			NodeTransition::Stop {
				stop_duration,
				..
			} => (NODE_TRANSITION_TYPE_STOP, stop_duration_secs(*stop_duration)?),
		};
		Ok(NodeTransitionDescriptionFFI {
			transition_type,
			operation_id: self.operation_id.to_native(arena)?,
			node_name: arena.pin_str(self.transition.node_name())?.as_ptr(),
			node_instance_id: self.transition.node_instance_id(),
			stop_duration_secs,
		})
	}
}

/// The node a transition resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTransitionTarget {
	pub node_name: String,
	pub node_instance_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTransitionProgress {
	pub state: TestCommandProgressState,
	/// Unset until the node has been resolved
	pub target: Option<NodeTransitionTarget>,
	/// Result code of a faulted transition
	pub error: Option<NativeErrorCode>,
}

impl FromNative for NodeTransitionProgress {
	type Native = NodeTransitionProgressFFI;

	unsafe fn from_native(native: &NodeTransitionProgressFFI) -> Result<Self> {
		let target = unsafe { opt_string_from_native(native.node_name, "node_transition_progress.node_name") }?.map(
			|node_name| NodeTransitionTarget {
				node_name,
				node_instance_id: native.node_instance_id,
			},
		);
		Ok(Self {
			state: TestCommandProgressState::from_native_value(native.state)?,
			target,
			error: (native.error_code != 0).then_some(NativeErrorCode(native.error_code)),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::ffi::CStr;

	use fabric_abi::constants::FABRIC_E_NODE_NOT_FOUND;

	use super::*;

	#[test]
	fn test_start_ignores_stop_duration() {
		let arena = PinArena::open();
		let description = NodeTransitionDescription::start(Uuid::new_v4(), "node-1", 7);
		let native = description.to_native(&arena).unwrap();
		assert_eq!(native.transition_type, NODE_TRANSITION_TYPE_START);
		assert_eq!(native.stop_duration_secs, 0);
		assert_eq!(native.node_instance_id, 7);
		assert_eq!(unsafe { CStr::from_ptr(native.node_name) }.to_str().unwrap(), "node-1");
	}

	#[test]
	fn test_stop_carries_duration_in_seconds() {
		let arena = PinArena::open();
		let description =
			NodeTransitionDescription::stop(Uuid::new_v4(), "node-2", 3, Duration::from_secs(600));
		let native = description.to_native(&arena).unwrap();
		assert_eq!(native.transition_type, NODE_TRANSITION_TYPE_STOP);
		assert_eq!(native.stop_duration_secs, 600);
	}

	#[test]
	fn test_sub_second_stop_is_rejected() {
		let description =
			NodeTransitionDescription::stop(Uuid::new_v4(), "node-2", 3, Duration::from_millis(500));
		let err = description.validate().unwrap_err();
		assert!(matches!(err, InteropError::InvalidArgument { ref argument, .. } if argument == "stop_duration"));
	}

	#[test]
	fn test_empty_node_name_is_rejected() {
		let description = NodeTransitionDescription::start(Uuid::new_v4(), "", 1);
		let err = description.validate().unwrap_err();
		assert!(matches!(err, InteropError::InvalidArgument { ref argument, .. } if argument == "node_name"));
	}

	#[test]
	fn test_unresolved_progress_has_no_target() {
		let native = NodeTransitionProgressFFI::empty();
		let native = NodeTransitionProgressFFI {
			state: TEST_COMMAND_STATE_RUNNING,
			..native
		};
		let progress = unsafe { NodeTransitionProgress::from_native(&native) }.unwrap();
		assert_eq!(progress.state, TestCommandProgressState::Running);
		assert_eq!(progress.target, None);
	}

	#[test]
	fn test_faulted_progress_keeps_error_and_target() {
		let native = NodeTransitionProgressFFI {
			state: TEST_COMMAND_STATE_FAULTED,
			error_code: FABRIC_E_NODE_NOT_FOUND,
			node_name: c"node-9".as_ptr(),
			node_instance_id: 12,
		};
		let progress = unsafe { NodeTransitionProgress::from_native(&native) }.unwrap();
		assert_eq!(progress.error, Some(NativeErrorCode(FABRIC_E_NODE_NOT_FOUND)));
		assert_eq!(
			progress.target,
			Some(NodeTransitionTarget {
				node_name: "node-9".to_string(),
				node_instance_id: 12,
			})
		);
	}
}
