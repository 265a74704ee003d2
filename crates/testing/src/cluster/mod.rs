// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-memory cluster behind the native client function tables
//!
//! Every `begin_*` entry point copies what it needs out of its request while
//! the call is running, decides the outcome against the model, and hands the
//! result to a [`ScriptedOperation`] completed in the configured
//! [`Completion`] mode. `end_*` entry points fill output structures with
//! memory retained by the operation context.

mod query;
mod testability;

use std::{
	any::Any,
	collections::HashMap,
	ffi::{CStr, c_char, c_void},
	sync::{
		Arc,
		atomic::{AtomicI64, AtomicU32, AtomicUsize, Ordering},
	},
};

use fabric_abi::{
	constants::{E_POINTER, S_OK, succeeded},
	data::{StringPairFFI, StringPairListFFI},
	operation::{AsyncCallbackFFI, AsyncOperationContextFFI},
	query::{
		APPLICATION_STATUS_READY, HEALTH_STATE_OK, NODE_STATUS_UP, PARTITION_SCHEME_INT64_RANGE,
		PARTITION_SCHEME_NAMED, PARTITION_SCHEME_SINGLETON, PARTITION_STATUS_READY, QueryClientVTableFFI,
		REPLICA_ROLE_NONE, REPLICA_ROLE_PRIMARY, REPLICA_STATUS_READY, SERVICE_KIND_STATEFUL,
		SERVICE_KIND_STATELESS, SERVICE_STATUS_ACTIVE,
	},
	testability::{
		CHAOS_SCHEDULE_STATUS_STOPPED, CHAOS_STATUS_STOPPED, ChaosTimeRangeFFI, TestManagementClientVTableFFI,
	},
};
use parking_lot::Mutex;
use tracing::debug;

use crate::operation::{CallbackCounters, Completion, ScriptedOperation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedNode {
	pub name: String,
	pub address: String,
	pub node_type: String,
	pub code_version: String,
	pub status: u32,
	pub is_seed: bool,
	pub upgrade_domain: String,
	pub fault_domain: String,
	pub health_state: u32,
	pub up_time_secs: i64,
	/// Bumped every time the node is started again
	pub instance_id: u64,
}

impl SimulatedNode {
	/// A healthy node that has been up for an hour
	pub fn up(name: &str) -> Self {
		Self {
			name: name.to_string(),
			address: format!("{name}.cluster.local"),
			node_type: "NodeType0".to_string(),
			code_version: "10.1.0.0".to_string(),
			status: NODE_STATUS_UP,
			is_seed: false,
			upgrade_domain: "UD0".to_string(),
			fault_domain: "fd:/0".to_string(),
			health_state: HEALTH_STATE_OK,
			up_time_secs: 3600,
			instance_id: 1,
		}
	}

	pub fn with_instance_id(mut self, instance_id: u64) -> Self {
		self.instance_id = instance_id;
		self
	}

	pub fn with_status(mut self, status: u32) -> Self {
		self.status = status;
		self
	}

	pub fn seed(mut self) -> Self {
		self.is_seed = true;
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedPartition {
	pub service_name: String,
	pub id: [u8; 16],
	pub service_kind: u32,
	pub scheme: u32,
	pub name: Option<String>,
	pub low_key: i64,
	pub high_key: i64,
	pub status: u32,
	pub health_state: u32,
	pub replica_count: u32,
	pub min_replica_set_size: u32,
}

impl SimulatedPartition {
	/// Ready stateful singleton partition with three replicas
	pub fn singleton(service_name: &str, id: [u8; 16]) -> Self {
		Self {
			service_name: service_name.to_string(),
			id,
			service_kind: SERVICE_KIND_STATEFUL,
			scheme: PARTITION_SCHEME_SINGLETON,
			name: None,
			low_key: 0,
			high_key: 0,
			status: PARTITION_STATUS_READY,
			health_state: HEALTH_STATE_OK,
			replica_count: 3,
			min_replica_set_size: 2,
		}
	}

	pub fn named(service_name: &str, id: [u8; 16], name: &str) -> Self {
		Self {
			scheme: PARTITION_SCHEME_NAMED,
			name: Some(name.to_string()),
			..Self::singleton(service_name, id)
		}
	}

	pub fn ranged(service_name: &str, id: [u8; 16], low_key: i64, high_key: i64) -> Self {
		Self {
			scheme: PARTITION_SCHEME_INT64_RANGE,
			low_key,
			high_key,
			..Self::singleton(service_name, id)
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedApplication {
	pub name: String,
	pub type_name: String,
	pub type_version: String,
	pub status: u32,
	pub health_state: u32,
	pub parameters: Vec<(String, String)>,
}

impl SimulatedApplication {
	/// A ready, healthy application of `type_name` 1.0.0
	pub fn ready(name: &str, type_name: &str) -> Self {
		Self {
			name: name.to_string(),
			type_name: type_name.to_string(),
			type_version: "1.0.0".to_string(),
			status: APPLICATION_STATUS_READY,
			health_state: HEALTH_STATE_OK,
			parameters: Vec::new(),
		}
	}

	pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
		self.parameters.push((key.to_string(), value.to_string()));
		self
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedService {
	pub application_name: String,
	pub name: String,
	pub type_name: String,
	pub manifest_version: String,
	pub service_kind: u32,
	pub has_persisted_state: bool,
	pub status: u32,
	pub health_state: u32,
}

impl SimulatedService {
	/// An active stateful service with persisted state
	pub fn stateful(application_name: &str, name: &str) -> Self {
		Self {
			application_name: application_name.to_string(),
			name: name.to_string(),
			type_name: format!("{}Type", name.rsplit('/').next().unwrap_or(name)),
			manifest_version: "1.0.0".to_string(),
			service_kind: SERVICE_KIND_STATEFUL,
			has_persisted_state: true,
			status: SERVICE_STATUS_ACTIVE,
			health_state: HEALTH_STATE_OK,
		}
	}

	pub fn stateless(application_name: &str, name: &str) -> Self {
		Self {
			service_kind: SERVICE_KIND_STATELESS,
			has_persisted_state: false,
			..Self::stateful(application_name, name)
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedReplica {
	pub partition_id: [u8; 16],
	pub id: u64,
	pub service_kind: u32,
	pub role: u32,
	pub status: u32,
	pub health_state: u32,
	pub node_name: String,
	pub address: String,
	pub last_in_build_duration_secs: i64,
}

impl SimulatedReplica {
	/// A ready primary replica on `node_name`
	pub fn primary(partition_id: [u8; 16], id: u64, node_name: &str) -> Self {
		Self {
			partition_id,
			id,
			service_kind: SERVICE_KIND_STATEFUL,
			role: REPLICA_ROLE_PRIMARY,
			status: REPLICA_STATUS_READY,
			health_state: HEALTH_STATE_OK,
			node_name: node_name.to_string(),
			address: format!("tcp://{node_name}:20{}", id % 100),
			last_in_build_duration_secs: 0,
		}
	}

	pub fn with_role(mut self, role: u32) -> Self {
		self.role = role;
		self
	}

	/// A ready stateless instance on `node_name`
	pub fn instance(partition_id: [u8; 16], id: u64, node_name: &str) -> Self {
		Self {
			service_kind: SERVICE_KIND_STATELESS,
			role: REPLICA_ROLE_NONE,
			..Self::primary(partition_id, id, node_name)
		}
	}
}

/// A fault command started through the test-management client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedCommand {
	pub operation_id: [u8; 16],
	pub command_type: u32,
	pub mode: u32,
	pub state: u32,
	pub service_name: String,
	pub partition_id: [u8; 16],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaosEventRecord {
	pub kind: u32,
	pub timestamp_utc_ms: i64,
	pub reason: String,
}

/// Parameters chaos was last started with, or a named set of a schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedChaosParameters {
	pub max_cluster_stabilization_timeout_secs: u64,
	pub max_concurrent_faults: u32,
	pub enable_move_replica_faults: bool,
	pub wait_time_between_faults_secs: u64,
	pub wait_time_between_iterations_secs: u64,
	pub time_to_run_secs: u64,
	pub context: Vec<(String, String)>,
}

/// Chaos scheduler state of the simulated cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedChaos {
	pub status: u32,
	pub schedule_status: u32,
	/// Unset until chaos has been started once
	pub parameters: Option<SimulatedChaosParameters>,
	pub events: Vec<ChaosEventRecord>,
}

impl Default for SimulatedChaos {
	fn default() -> Self {
		Self {
			status: CHAOS_STATUS_STOPPED,
			schedule_status: CHAOS_SCHEDULE_STATUS_STOPPED,
			parameters: None,
			events: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedScheduleJob {
	pub parameters_name: String,
	pub active_days: u8,
	pub time_ranges: Vec<ChaosTimeRangeFFI>,
}

/// The stored chaos schedule; `version` grows with every accepted set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedChaosSchedule {
	pub version: u32,
	pub start_date_utc_ms: i64,
	pub expiry_date_utc_ms: i64,
	pub parameters: Vec<(String, SimulatedChaosParameters)>,
	pub jobs: Vec<SimulatedScheduleJob>,
}

impl Default for SimulatedChaosSchedule {
	fn default() -> Self {
		Self {
			version: 0,
			start_date_utc_ms: 0,
			expiry_date_utc_ms: i64::MAX,
			parameters: Vec::new(),
			jobs: Vec::new(),
		}
	}
}

/// A node start or stop started through the test-management client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedNodeTransition {
	pub operation_id: [u8; 16],
	pub transition_type: u32,
	pub node_name: String,
	pub node_instance_id: u64,
	pub stop_duration_secs: u32,
	pub state: u32,
	pub error_code: i32,
}

/// Outcome decided at begin time
pub(crate) struct Outcome {
	hr: i32,
	output: Option<Box<dyn Any + Send>>,
}

impl Outcome {
	pub(crate) fn ok() -> Self {
		Self {
			hr: S_OK,
			output: None,
		}
	}

	pub(crate) fn with_output<T: Any + Send>(output: T) -> Self {
		Self {
			hr: S_OK,
			output: Some(Box::new(output)),
		}
	}

	pub(crate) fn failed(hr: i32) -> Self {
		Self {
			hr,
			output: None,
		}
	}
}

pub(crate) struct ClusterState {
	completion: Mutex<Completion>,
	nodes: Mutex<Vec<SimulatedNode>>,
	partitions: Mutex<Vec<SimulatedPartition>>,
	applications: Mutex<Vec<SimulatedApplication>>,
	services: Mutex<Vec<SimulatedService>>,
	replicas: Mutex<Vec<SimulatedReplica>>,
	commands: Mutex<Vec<SimulatedCommand>>,
	chaos: Mutex<SimulatedChaos>,
	schedule: Mutex<SimulatedChaosSchedule>,
	node_transitions: Mutex<Vec<SimulatedNodeTransition>>,
	report_page_size: AtomicUsize,
	begin_failures: Mutex<HashMap<&'static str, i32>>,
	end_failures: Mutex<HashMap<&'static str, i32>>,
	calls: Mutex<Vec<&'static str>>,
	operations: Mutex<Vec<ScriptedOperation>>,
	counters: CallbackCounters,
	last_timeout_ms: AtomicU32,
	instance_releases: AtomicUsize,
	clock_ms: AtomicI64,
}

impl ClusterState {
	/// Runs the begin half of a native call.
	///
	/// `decide` reads the request and returns the outcome, or a result code
	/// that fails begin itself.
	pub(crate) fn begin_operation(
		&self,
		method: &'static str,
		timeout_ms: u32,
		callback: AsyncCallbackFFI,
		ctx_out: *mut *mut AsyncOperationContextFFI,
		decide: impl FnOnce(&ClusterState) -> Result<Outcome, i32>,
	) -> i32 {
		self.calls.lock().push(method);
		self.last_timeout_ms.store(timeout_ms, Ordering::SeqCst);

		if let Some(hr) = self.begin_failures.lock().remove(method) {
			debug!(method, hr, "injected begin failure");
			return hr;
		}

		let outcome = match decide(self) {
			Ok(outcome) => outcome,
			Err(hr) => return hr,
		};
		let hr = self.end_failures.lock().remove(method).unwrap_or(outcome.hr);

		let operation = ScriptedOperation::with_counters(*self.completion.lock(), self.counters.clone()).with_result(hr);
		if let Some(output) = outcome.output {
			operation.set_output(output);
		}
		self.operations.lock().push(operation.clone());

		operation.begin(callback, ctx_out)
	}

	pub(crate) fn next_timestamp(&self) -> i64 {
		self.clock_ms.fetch_add(1000, Ordering::SeqCst)
	}

	pub(crate) fn now(&self) -> i64 {
		self.clock_ms.load(Ordering::SeqCst)
	}
}

/// Runs the end half of a native call that fills an output structure.
///
/// `fill` runs only when the operation succeeded, with the output decided at
/// begin.
pub(crate) fn end_with_output<T: Any + Send, O>(
	ctx: *mut AsyncOperationContextFFI,
	out: *mut O,
	fill: impl FnOnce(&ScriptedOperation, T) -> O,
) -> i32 {
	if ctx.is_null() {
		return E_POINTER;
	}
	let operation = unsafe { ScriptedOperation::from_context(ctx) };
	let hr = operation.end(ctx);
	if !succeeded(hr) {
		return hr;
	}
	if out.is_null() {
		return E_POINTER;
	}
	match operation.take_output::<T>() {
		Some(output) => {
			let filled = fill(&operation, output);
			unsafe { out.write(filled) };
			S_OK
		}
		None => E_POINTER,
	}
}

pub(crate) extern "C" fn end_without_output(_instance: *mut c_void, ctx: *mut AsyncOperationContextFFI) -> i32 {
	if ctx.is_null() {
		return E_POINTER;
	}
	unsafe { ScriptedOperation::from_context(ctx) }.end(ctx)
}

pub(crate) unsafe fn state_of<'a>(instance: *mut c_void) -> &'a ClusterState {
	unsafe { &*(instance as *const ClusterState) }
}

pub(crate) unsafe fn read_text(ptr: *const c_char) -> Option<String> {
	if ptr.is_null() {
		return None;
	}
	Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Null when there are no pairs
pub(crate) fn retain_pairs(operation: &ScriptedOperation, pairs: &[(String, String)]) -> *const StringPairListFFI {
	if pairs.is_empty() {
		return std::ptr::null();
	}
	let items: Vec<StringPairFFI> = pairs
		.iter()
		.map(|(key, value)| StringPairFFI {
			key: operation.retain_text(key),
			value: operation.retain_text(value),
		})
		.collect();
	operation.retain(StringPairListFFI {
		count: items.len(),
		items: operation.retain_slice(items),
	})
}

/// Lower-case hyphenated text form of a 128-bit identifier
pub fn format_guid(bytes: &[u8; 16]) -> String {
	let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
	format!("{}-{}-{}-{}-{}", &hex[0..8], &hex[8..12], &hex[12..16], &hex[16..20], &hex[20..32])
}

pub(crate) extern "C" fn release_instance(instance: *mut c_void) {
	let state = unsafe { Arc::from_raw(instance as *const ClusterState) };
	state.instance_releases.fetch_add(1, Ordering::SeqCst);
}

/// A simulated native cluster runtime
///
/// Cheap to clone; clones share the cluster.
#[derive(Clone)]
pub struct SimulatedCluster {
	state: Arc<ClusterState>,
}

impl Default for SimulatedCluster {
	fn default() -> Self {
		Self::new()
	}
}

impl SimulatedCluster {
	/// An empty cluster completing operations on native threads
	pub fn new() -> Self {
		Self {
			state: Arc::new(ClusterState {
				completion: Mutex::new(Completion::Deferred(std::time::Duration::ZERO)),
				nodes: Mutex::new(Vec::new()),
				partitions: Mutex::new(Vec::new()),
				applications: Mutex::new(Vec::new()),
				services: Mutex::new(Vec::new()),
				replicas: Mutex::new(Vec::new()),
				commands: Mutex::new(Vec::new()),
				chaos: Mutex::new(SimulatedChaos::default()),
				schedule: Mutex::new(SimulatedChaosSchedule::default()),
				node_transitions: Mutex::new(Vec::new()),
				report_page_size: AtomicUsize::new(100),
				begin_failures: Mutex::new(HashMap::new()),
				end_failures: Mutex::new(HashMap::new()),
				calls: Mutex::new(Vec::new()),
				operations: Mutex::new(Vec::new()),
				counters: CallbackCounters::default(),
				last_timeout_ms: AtomicU32::new(0),
				instance_releases: AtomicUsize::new(0),
				clock_ms: AtomicI64::new(1_700_000_000_000),
			}),
		}
	}

	pub fn with_completion(self, completion: Completion) -> Self {
		*self.state.completion.lock() = completion;
		self
	}

	pub fn with_report_page_size(self, page_size: usize) -> Self {
		self.state.report_page_size.store(page_size.max(1), Ordering::SeqCst);
		self
	}

	pub fn add_node(&self, node: SimulatedNode) {
		self.state.nodes.lock().push(node);
	}

	pub fn nodes(&self) -> Vec<SimulatedNode> {
		self.state.nodes.lock().clone()
	}

	pub fn add_partition(&self, partition: SimulatedPartition) {
		self.state.partitions.lock().push(partition);
	}

	pub fn add_application(&self, application: SimulatedApplication) {
		self.state.applications.lock().push(application);
	}

	pub fn add_service(&self, service: SimulatedService) {
		self.state.services.lock().push(service);
	}

	pub fn add_replica(&self, replica: SimulatedReplica) {
		self.state.replicas.lock().push(replica);
	}

	/// Makes the next begin of `method` fail with `hr`
	pub fn fail_begin(&self, method: &'static str, hr: i32) {
		self.state.begin_failures.lock().insert(method, hr);
	}

	/// Makes the next operation of `method` complete with `hr`
	pub fn fail_end(&self, method: &'static str, hr: i32) {
		self.state.end_failures.lock().insert(method, hr);
	}

	/// Begin entry points called so far, in order
	pub fn calls(&self) -> Vec<&'static str> {
		self.state.calls.lock().clone()
	}

	/// Counters shared by every operation of this cluster
	pub fn counters(&self) -> CallbackCounters {
		self.state.counters.clone()
	}

	pub fn operations(&self) -> Vec<ScriptedOperation> {
		self.state.operations.lock().clone()
	}

	pub fn commands(&self) -> Vec<SimulatedCommand> {
		self.state.commands.lock().clone()
	}

	pub fn set_command_state(&self, operation_id: [u8; 16], state: u32) {
		if let Some(command) = self.state.commands.lock().iter_mut().find(|c| c.operation_id == operation_id) {
			command.state = state;
		}
	}

	pub fn chaos(&self) -> SimulatedChaos {
		self.state.chaos.lock().clone()
	}

	pub fn chaos_schedule(&self) -> SimulatedChaosSchedule {
		self.state.schedule.lock().clone()
	}

	pub fn node_transitions(&self) -> Vec<SimulatedNodeTransition> {
		self.state.node_transitions.lock().clone()
	}

	/// Current time of the cluster clock, in unix milliseconds
	pub fn now_utc_ms(&self) -> i64 {
		self.state.now()
	}

	/// Appends an event to the chaos report
	pub fn record_chaos_event(&self, kind: u32, reason: &str) -> i64 {
		let timestamp_utc_ms = self.state.next_timestamp();
		self.state.chaos.lock().events.push(ChaosEventRecord {
			kind,
			timestamp_utc_ms,
			reason: reason.to_string(),
		});
		timestamp_utc_ms
	}

	/// Timeout passed to the most recent begin
	pub fn last_timeout_ms(&self) -> u32 {
		self.state.last_timeout_ms.load(Ordering::SeqCst)
	}

	/// Number of client instances released through their function table
	pub fn instance_releases(&self) -> usize {
		self.state.instance_releases.load(Ordering::SeqCst)
	}

	/// A new native test-management client instance.
	///
	/// The instance holds a reference to the cluster until it is released
	/// through the table's `release` entry.
	pub fn test_management_client(&self) -> (&'static TestManagementClientVTableFFI, *mut c_void) {
		(&testability::VTABLE, Arc::into_raw(self.state.clone()) as *mut c_void)
	}

	/// A new native query client instance, released like
	/// [`test_management_client`](Self::test_management_client)
	pub fn query_client(&self) -> (&'static QueryClientVTableFFI, *mut c_void) {
		(&query::VTABLE, Arc::into_raw(self.state.clone()) as *mut c_void)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_guid() {
		let bytes = [
			0x67, 0xe5, 0x50, 0x44, 0x10, 0xb1, 0x42, 0x6f, 0x92, 0x47, 0xbb, 0x68, 0x0e, 0x5f, 0xe0, 0xc8,
		];
		assert_eq!(format_guid(&bytes), "67e55044-10b1-426f-9247-bb680e5fe0c8");
	}

	#[test]
	fn test_instances_are_released() {
		let cluster = SimulatedCluster::new();
		let (vtable, instance) = cluster.test_management_client();

		(vtable.release)(instance);

		assert_eq!(cluster.instance_releases(), 1);
	}
}
