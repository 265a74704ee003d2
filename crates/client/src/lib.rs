// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Managed client surface of the native cluster runtime
//!
//! Every method follows the same shape: validate the request, pin it into an
//! arena, call the native `BeginX` entry point through the bridge, await the
//! completion, call `EndX` and copy the result into owned Rust values before
//! the native context is released.

macro_rules! native_enum {
	(
		$(#[$meta:meta])*
		$vis:vis enum $name:ident {
			$($(#[$vmeta:meta])* $variant:ident = $value:path),+ $(,)?
		}
	) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
		$vis enum $name {
			$($(#[$vmeta])* $variant),+
		}

		impl $name {
			/// Native wire value
			pub fn as_native(self) -> u32 {
				match self {
					$(Self::$variant => $value),+
				}
			}

			pub fn from_native_value(value: u32) -> fabric_interop::Result<Self> {
				match value {
					$($value => Ok(Self::$variant),)+
					other => Err(fabric_interop::InteropError::MalformedResult(format!(
						concat!("unknown ", stringify!($name), " value {}"),
						other
					))),
				}
			}
		}
	};
}

mod channel;
pub mod fabric;
pub mod native;
pub mod query;
pub mod testability;

pub use fabric::FabricClient;
pub use fabric_interop::{CancellationToken, ClientConfig, InteropError, NativeErrorCode, Result};
pub use fabric_runtime::ApartmentConfig;
pub use native::{NativeClient, NativeQueryClient, NativeTestManagementClient, NativeVTable};
pub use query::{
	Application, ApplicationList, ApplicationQueryDescription, ApplicationStatus, HealthState, Node, NodeList,
	NodeQueryDescription, NodeStatus, NodeStatusFilter, Partition, PartitionList, PartitionQueryDescription,
	PartitionScheme, PartitionStatus, QueryClient, Replica, ReplicaList, ReplicaQueryDescription, ReplicaRole,
	ReplicaStatus, Service, ServiceKind, ServiceList, ServiceQueryDescription, ServiceStatus,
};
pub use testability::{
	CancelTestCommandDescription, ChaosDescription, ChaosEvent, ChaosEventKind, ChaosParameters, ChaosReport,
	ChaosReportFilter, ChaosReportRequest, ChaosSchedule, ChaosScheduleActiveDays, ChaosScheduleDescription,
	ChaosScheduleJob, ChaosScheduleStatus, ChaosStatus, ChaosTimeOfDay, ChaosTimeRange, DataLossMode,
	InvokeDataLossDescription, InvokeQuorumLossDescription, NodeTransition, NodeTransitionDescription,
	NodeTransitionProgress, NodeTransitionTarget, PartitionDataLossProgress, PartitionProgress,
	PartitionQuorumLossProgress, PartitionRestartProgress, PartitionSelector, QuorumLossMode,
	RestartPartitionDescription, RestartPartitionMode, SelectedPartition, TestCommandListDescription,
	TestCommandProgressState, TestCommandStateFilter, TestCommandStatus, TestCommandStatusList, TestCommandType,
	TestCommandTypeFilter, TestManagementClient,
};
