// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! An in-process stand-in for the native cluster runtime
//!
//! [`ScriptedOperation`] implements a single native operation context whose
//! completion the test controls. [`SimulatedCluster`] builds on it to expose
//! the native test-management and query client function tables backed by an
//! in-memory cluster model.

pub mod cluster;
mod logging;
pub mod operation;
pub mod wait;

pub use cluster::{
	ChaosEventRecord, SimulatedApplication, SimulatedChaos, SimulatedChaosParameters, SimulatedChaosSchedule,
	SimulatedCluster, SimulatedCommand, SimulatedNode, SimulatedNodeTransition, SimulatedPartition, SimulatedReplica,
	SimulatedScheduleJob, SimulatedService, format_guid,
};
pub use logging::init_tracing;
pub use operation::{CallbackCounters, Completion, ScriptedOperation};
pub use wait::wait_for;
