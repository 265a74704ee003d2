// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::ffi::c_void;

use fabric_abi::{
	constants::{
		E_INVALIDARG, E_POINTER, FABRIC_E_CHAOS_ALREADY_RUNNING, FABRIC_E_INSTANCE_ID_MISMATCH,
		FABRIC_E_KEY_NOT_FOUND, FABRIC_E_NODE_IS_UP, FABRIC_E_NODE_NOT_FOUND, FABRIC_E_NODE_TRANSITION_IN_PROGRESS,
		FABRIC_E_PARTITION_NOT_FOUND, FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS,
	},
	data::GuidFFI,
	operation::{AsyncCallbackFFI, AsyncOperationContextFFI},
	query::{NODE_STATUS_DOWN, NODE_STATUS_UP, PARTITION_SCHEME_INT64_RANGE, PARTITION_SCHEME_NAMED, PARTITION_SCHEME_SINGLETON},
	testability::*,
};

use super::{
	ChaosEventRecord, ClusterState, Outcome, SimulatedChaosParameters, SimulatedChaosSchedule, SimulatedCommand,
	SimulatedNodeTransition, SimulatedScheduleJob, end_with_output, end_without_output, format_guid, read_text,
	retain_pairs, state_of,
};
use crate::operation::ScriptedOperation;

pub(super) static VTABLE: TestManagementClientVTableFFI = TestManagementClientVTableFFI {
	begin_start_partition_data_loss,
	end_start_partition_data_loss: end_without_output,
	begin_start_partition_quorum_loss,
	end_start_partition_quorum_loss: end_without_output,
	begin_start_partition_restart,
	end_start_partition_restart: end_without_output,
	begin_get_partition_data_loss_progress,
	end_get_partition_data_loss_progress: end_progress,
	begin_get_partition_quorum_loss_progress,
	end_get_partition_quorum_loss_progress: end_progress,
	begin_get_partition_restart_progress,
	end_get_partition_restart_progress: end_progress,
	begin_get_test_command_status_list,
	end_get_test_command_status_list,
	begin_cancel_test_command,
	end_cancel_test_command: end_without_output,
	begin_start_chaos,
	end_start_chaos: end_without_output,
	begin_stop_chaos,
	end_stop_chaos: end_without_output,
	begin_get_chaos_report,
	end_get_chaos_report,
	begin_get_chaos,
	end_get_chaos,
	begin_get_chaos_schedule,
	end_get_chaos_schedule,
	begin_set_chaos_schedule,
	end_set_chaos_schedule: end_without_output,
	begin_start_node_transition,
	end_start_node_transition: end_without_output,
	begin_get_node_transition_progress,
	end_get_node_transition_progress,
	release: super::release_instance,
};

/// Copies a parameter set out of a request
unsafe fn read_parameters(parameters: *const ChaosParametersFFI) -> Result<SimulatedChaosParameters, i32> {
	let parameters = unsafe { parameters.as_ref() }.ok_or(E_POINTER)?;
	if parameters.max_concurrent_faults == 0 {
		return Err(E_INVALIDARG);
	}

	let mut context = Vec::new();
	if let Some(pairs) = unsafe { parameters.context.as_ref() } {
		for pair in unsafe { read_slice(pairs.items, pairs.count) }? {
			let key = unsafe { read_text(pair.key) }.ok_or(E_POINTER)?;
			let value = unsafe { read_text(pair.value) }.ok_or(E_POINTER)?;
			context.push((key, value));
		}
	}

	Ok(SimulatedChaosParameters {
		max_cluster_stabilization_timeout_secs: parameters.max_cluster_stabilization_timeout_secs,
		max_concurrent_faults: parameters.max_concurrent_faults,
		enable_move_replica_faults: parameters.enable_move_replica_faults != 0,
		wait_time_between_faults_secs: parameters.wait_time_between_faults_secs,
		wait_time_between_iterations_secs: parameters.wait_time_between_iterations_secs,
		time_to_run_secs: parameters.time_to_run_secs,
		context,
	})
}

unsafe fn read_slice<'a, T>(items: *const T, count: usize) -> Result<&'a [T], i32> {
	if count == 0 {
		return Ok(&[]);
	}
	if items.is_null() {
		return Err(E_POINTER);
	}
	Ok(unsafe { std::slice::from_raw_parts(items, count) })
}

fn retain_parameters(operation: &ScriptedOperation, parameters: &SimulatedChaosParameters) -> *const ChaosParametersFFI {
	let context = retain_pairs(operation, &parameters.context);
	operation.retain(ChaosParametersFFI {
		max_cluster_stabilization_timeout_secs: parameters.max_cluster_stabilization_timeout_secs,
		max_concurrent_faults: parameters.max_concurrent_faults,
		enable_move_replica_faults: u8::from(parameters.enable_move_replica_faults),
		wait_time_between_faults_secs: parameters.wait_time_between_faults_secs,
		wait_time_between_iterations_secs: parameters.wait_time_between_iterations_secs,
		time_to_run_secs: parameters.time_to_run_secs,
		context,
	})
}

struct Selector {
	service_name: String,
	selector_type: u32,
	key: Option<String>,
}

unsafe fn read_selector(selector: *const PartitionSelectorFFI) -> Result<Selector, i32> {
	let selector = unsafe { selector.as_ref() }.ok_or(E_POINTER)?;
	let service_name = unsafe { read_text(selector.service_name) }.ok_or(E_POINTER)?;
	if !(PARTITION_SELECTOR_SINGLETON..=PARTITION_SELECTOR_RANDOM).contains(&selector.selector_type) {
		return Err(E_INVALIDARG);
	}
	Ok(Selector {
		service_name,
		selector_type: selector.selector_type,
		key: unsafe { read_text(selector.partition_key) },
	})
}

impl ClusterState {
	fn resolve(&self, selector: &Selector) -> Option<(String, [u8; 16])> {
		let partitions = self.partitions.lock();
		let key = selector.key.as_deref();
		partitions
			.iter()
			.filter(|p| p.service_name == selector.service_name)
			.find(|p| match selector.selector_type {
				PARTITION_SELECTOR_SINGLETON => p.scheme == PARTITION_SCHEME_SINGLETON,
				PARTITION_SELECTOR_NAMED => p.scheme == PARTITION_SCHEME_NAMED && p.name.as_deref() == key,
				PARTITION_SELECTOR_UNIFORM_INT64 => {
					p.scheme == PARTITION_SCHEME_INT64_RANGE
						&& key.and_then(|k| k.parse::<i64>().ok()).is_some_and(|k| p.low_key <= k && k <= p.high_key)
				}
				PARTITION_SELECTOR_PARTITION_ID => key.is_some_and(|k| k.eq_ignore_ascii_case(&format_guid(&p.id))),
				_ => true,
			})
			.map(|p| (p.service_name.clone(), p.id))
	}

	fn operation_id_in_use(&self, operation_id: [u8; 16]) -> bool {
		self.commands.lock().iter().any(|c| c.operation_id == operation_id)
			|| self.node_transitions.lock().iter().any(|t| t.operation_id == operation_id)
	}

	fn start_command(&self, operation_id: [u8; 16], command_type: u32, mode: u32, selector: &Selector) -> Outcome {
		if self.operation_id_in_use(operation_id) {
			return Outcome::failed(FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS);
		}
		let Some((service_name, partition_id)) = self.resolve(selector) else {
			return Outcome::failed(FABRIC_E_PARTITION_NOT_FOUND);
		};
		self.commands.lock().push(SimulatedCommand {
			operation_id,
			command_type,
			mode,
			state: TEST_COMMAND_STATE_RUNNING,
			service_name,
			partition_id,
		});
		Outcome::ok()
	}

	/// Reports a command's progress; running commands finish once observed.
	fn progress(&self, operation_id: &GuidFFI, command_type: u32) -> Outcome {
		let mut commands = self.commands.lock();
		let Some(command) =
			commands.iter_mut().find(|c| c.operation_id == operation_id.bytes && c.command_type == command_type)
		else {
			return Outcome::failed(FABRIC_E_KEY_NOT_FOUND);
		};

		let progress = Progress {
			state: command.state,
			service_name: command.service_name.clone(),
			partition_id: command.partition_id,
		};
		if command.state == TEST_COMMAND_STATE_RUNNING {
			command.state = TEST_COMMAND_STATE_COMPLETED;
		}
		Outcome::with_output(progress)
	}
}

extern "C" fn begin_start_partition_data_loss(
	instance: *mut c_void,
	description: *const InvokeDataLossDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("start_partition_data_loss", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		if !matches!(description.mode, DATA_LOSS_MODE_PARTIAL | DATA_LOSS_MODE_FULL) {
			return Err(E_INVALIDARG);
		}
		let selector = unsafe { read_selector(description.partition_selector) }?;
		Ok(state.start_command(
			description.operation_id.bytes,
			TEST_COMMAND_TYPE_DATA_LOSS,
			description.mode,
			&selector,
		))
	})
}

extern "C" fn begin_start_partition_quorum_loss(
	instance: *mut c_void,
	description: *const InvokeQuorumLossDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("start_partition_quorum_loss", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		if !matches!(description.mode, QUORUM_LOSS_MODE_QUORUM_REPLICAS | QUORUM_LOSS_MODE_ALL_REPLICAS)
			|| description.quorum_loss_duration_ms == 0
		{
			return Err(E_INVALIDARG);
		}
		let selector = unsafe { read_selector(description.partition_selector) }?;
		Ok(state.start_command(
			description.operation_id.bytes,
			TEST_COMMAND_TYPE_QUORUM_LOSS,
			description.mode,
			&selector,
		))
	})
}

extern "C" fn begin_start_partition_restart(
	instance: *mut c_void,
	description: *const RestartPartitionDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("start_partition_restart", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		if !matches!(
			description.mode,
			RESTART_PARTITION_MODE_ALL_REPLICAS_OR_INSTANCES | RESTART_PARTITION_MODE_ONLY_ACTIVE_SECONDARIES
		) {
			return Err(E_INVALIDARG);
		}
		let selector = unsafe { read_selector(description.partition_selector) }?;
		Ok(state.start_command(
			description.operation_id.bytes,
			TEST_COMMAND_TYPE_RESTART_PARTITION,
			description.mode,
			&selector,
		))
	})
}

struct Progress {
	state: u32,
	service_name: String,
	partition_id: [u8; 16],
}

fn begin_progress(
	method: &'static str,
	command_type: u32,
	instance: *mut c_void,
	operation_id: *const GuidFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation(method, timeout_ms, callback, ctx_out, |state| {
		let operation_id = unsafe { operation_id.as_ref() }.ok_or(E_POINTER)?;
		Ok(state.progress(operation_id, command_type))
	})
}

extern "C" fn begin_get_partition_data_loss_progress(
	instance: *mut c_void,
	operation_id: *const GuidFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	begin_progress(
		"get_partition_data_loss_progress",
		TEST_COMMAND_TYPE_DATA_LOSS,
		instance,
		operation_id,
		timeout_ms,
		callback,
		ctx_out,
	)
}

extern "C" fn begin_get_partition_quorum_loss_progress(
	instance: *mut c_void,
	operation_id: *const GuidFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	begin_progress(
		"get_partition_quorum_loss_progress",
		TEST_COMMAND_TYPE_QUORUM_LOSS,
		instance,
		operation_id,
		timeout_ms,
		callback,
		ctx_out,
	)
}

extern "C" fn begin_get_partition_restart_progress(
	instance: *mut c_void,
	operation_id: *const GuidFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	begin_progress(
		"get_partition_restart_progress",
		TEST_COMMAND_TYPE_RESTART_PARTITION,
		instance,
		operation_id,
		timeout_ms,
		callback,
		ctx_out,
	)
}

extern "C" fn end_progress(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut PartitionProgressFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, progress: Progress| PartitionProgressFFI {
		state: progress.state,
		error_code: 0,
		selected_partition: operation.retain(SelectedPartitionFFI {
			service_name: operation.retain_text(&progress.service_name),
			partition_id: GuidFFI {
				bytes: progress.partition_id,
			},
		}),
	})
}

fn state_filter_bit(state: u32) -> u32 {
	match state {
		TEST_COMMAND_STATE_RUNNING => TEST_COMMAND_STATE_FILTER_RUNNING,
		TEST_COMMAND_STATE_ROLLING_BACK => TEST_COMMAND_STATE_FILTER_ROLLING_BACK,
		TEST_COMMAND_STATE_COMPLETED => TEST_COMMAND_STATE_FILTER_COMPLETED_SUCCESSFULLY,
		TEST_COMMAND_STATE_FAULTED => TEST_COMMAND_STATE_FILTER_FAILED,
		TEST_COMMAND_STATE_CANCELLED => TEST_COMMAND_STATE_FILTER_CANCELLED,
		TEST_COMMAND_STATE_FORCE_CANCELLED => TEST_COMMAND_STATE_FILTER_FORCE_CANCELLED,
		_ => 0,
	}
}

extern "C" fn begin_get_test_command_status_list(
	instance: *mut c_void,
	description: *const TestCommandListDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_test_command_status_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let commands = state.commands.lock().iter().map(|c| (c.operation_id, c.state, c.command_type)).collect::<Vec<_>>();
		let transitions = state
			.node_transitions
			.lock()
			.iter()
			.map(|t| (t.operation_id, t.state, TEST_COMMAND_TYPE_NODE_TRANSITION))
			.collect::<Vec<_>>();
		let statuses: Vec<([u8; 16], u32, u32)> = commands
			.into_iter()
			.chain(transitions)
			.filter(|(_, state, _)| state_filter_bit(*state) & description.state_filter != 0)
			.filter(|(_, _, command_type)| command_type & description.type_filter != 0)
			.collect();
		Ok(Outcome::with_output(statuses))
	})
}

extern "C" fn end_get_test_command_status_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut TestCommandStatusListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, statuses: Vec<([u8; 16], u32, u32)>| {
		let items: Vec<TestCommandStatusFFI> = statuses
			.into_iter()
			.map(|(operation_id, state, command_type)| TestCommandStatusFFI {
				operation_id: GuidFFI {
					bytes: operation_id,
				},
				state,
				command_type,
			})
			.collect();
		TestCommandStatusListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
		}
	})
}

extern "C" fn begin_cancel_test_command(
	instance: *mut c_void,
	description: *const CancelTestCommandDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("cancel_test_command", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let operation_id = description.operation_id.bytes;
		let cancelled = if description.force != 0 {
			TEST_COMMAND_STATE_FORCE_CANCELLED
		} else {
			TEST_COMMAND_STATE_CANCELLED
		};
		let cancel = |current: &mut u32| {
			if matches!(*current, TEST_COMMAND_STATE_RUNNING | TEST_COMMAND_STATE_ROLLING_BACK) {
				*current = cancelled;
			}
		};

		if let Some(command) = state.commands.lock().iter_mut().find(|c| c.operation_id == operation_id) {
			cancel(&mut command.state);
			return Ok(Outcome::ok());
		}
		if let Some(transition) = state.node_transitions.lock().iter_mut().find(|t| t.operation_id == operation_id) {
			cancel(&mut transition.state);
			return Ok(Outcome::ok());
		}
		Ok(Outcome::failed(FABRIC_E_KEY_NOT_FOUND))
	})
}

extern "C" fn begin_start_chaos(
	instance: *mut c_void,
	parameters: *const ChaosParametersFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("start_chaos", timeout_ms, callback, ctx_out, |state| {
		let parameters = unsafe { read_parameters(parameters) }?;

		let mut chaos = state.chaos.lock();
		if chaos.status == CHAOS_STATUS_RUNNING {
			return Ok(Outcome::failed(FABRIC_E_CHAOS_ALREADY_RUNNING));
		}
		chaos.status = CHAOS_STATUS_RUNNING;
		chaos.parameters = Some(parameters);
		chaos.events.push(ChaosEventRecord {
			kind: CHAOS_EVENT_STARTED,
			timestamp_utc_ms: state.next_timestamp(),
			reason: "Chaos started".to_string(),
		});
		Ok(Outcome::ok())
	})
}

extern "C" fn begin_stop_chaos(
	instance: *mut c_void,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("stop_chaos", timeout_ms, callback, ctx_out, |state| {
		let mut chaos = state.chaos.lock();
		if chaos.status == CHAOS_STATUS_RUNNING {
			chaos.status = CHAOS_STATUS_STOPPED;
			chaos.events.push(ChaosEventRecord {
				kind: CHAOS_EVENT_STOPPED,
				timestamp_utc_ms: state.next_timestamp(),
				reason: "Chaos stopped by user".to_string(),
			});
		}
		Ok(Outcome::ok())
	})
}

struct ReportPage {
	status: u32,
	events: Vec<ChaosEventRecord>,
	continuation_token: Option<String>,
}

extern "C" fn begin_get_chaos_report(
	instance: *mut c_void,
	description: *const ChaosReportDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_chaos_report", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let filter = unsafe { description.filter.as_ref() };
		let token = unsafe { read_text(description.continuation_token) };

		let start = match (&token, filter) {
			(Some(token), _) => token.parse::<usize>().map_err(|_| E_INVALIDARG)?,
			(None, Some(_)) => 0,
			(None, None) => return Err(E_INVALIDARG),
		};
		let in_range = |event: &ChaosEventRecord| {
			filter.is_none_or(|f| f.start_time_utc_ms <= event.timestamp_utc_ms && event.timestamp_utc_ms <= f.end_time_utc_ms)
		};

		let page_size = state.report_page_size.load(std::sync::atomic::Ordering::SeqCst);
		let chaos = state.chaos.lock();
		let mut events = Vec::new();
		let mut next = None;
		for (index, event) in chaos.events.iter().enumerate().skip(start) {
			if !in_range(event) {
				continue;
			}
			if events.len() == page_size {
				next = Some(index.to_string());
				break;
			}
			events.push(event.clone());
		}

		Ok(Outcome::with_output(ReportPage {
			status: chaos.status,
			events,
			continuation_token: next,
		}))
	})
}

extern "C" fn end_get_chaos_report(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ChaosReportFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: ReportPage| {
		let events: Vec<ChaosEventFFI> = page
			.events
			.iter()
			.map(|event| ChaosEventFFI {
				kind: event.kind,
				timestamp_utc_ms: event.timestamp_utc_ms,
				reason: operation.retain_text(&event.reason),
			})
			.collect();
		ChaosReportFFI {
			status: page.status,
			event_count: events.len(),
			events: operation.retain_slice(events),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}

struct ChaosSnapshot {
	status: u32,
	schedule_status: u32,
	parameters: Option<SimulatedChaosParameters>,
}

extern "C" fn begin_get_chaos(
	instance: *mut c_void,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_chaos", timeout_ms, callback, ctx_out, |state| {
		let chaos = state.chaos.lock();
		Ok(Outcome::with_output(ChaosSnapshot {
			status: chaos.status,
			schedule_status: chaos.schedule_status,
			parameters: chaos.parameters.clone(),
		}))
	})
}

extern "C" fn end_get_chaos(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ChaosDescriptionFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, snapshot: ChaosSnapshot| ChaosDescriptionFFI {
		status: snapshot.status,
		schedule_status: snapshot.schedule_status,
		parameters: match &snapshot.parameters {
			Some(parameters) => retain_parameters(operation, parameters),
			None => std::ptr::null(),
		},
	})
}

extern "C" fn begin_get_chaos_schedule(
	instance: *mut c_void,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_chaos_schedule", timeout_ms, callback, ctx_out, |state| {
		Ok(Outcome::with_output(state.schedule.lock().clone()))
	})
}

extern "C" fn end_get_chaos_schedule(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ChaosScheduleDescriptionFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, schedule: SimulatedChaosSchedule| {
		let parameters: Vec<ChaosNamedParametersFFI> = schedule
			.parameters
			.iter()
			.map(|(name, parameters)| ChaosNamedParametersFFI {
				name: operation.retain_text(name),
				parameters: retain_parameters(operation, parameters),
			})
			.collect();
		let jobs: Vec<ChaosScheduleJobFFI> = schedule
			.jobs
			.iter()
			.map(|job| ChaosScheduleJobFFI {
				parameters_name: operation.retain_text(&job.parameters_name),
				active_days: job.active_days,
				time_range_count: job.time_ranges.len(),
				time_ranges: operation.retain_slice(job.time_ranges.clone()),
			})
			.collect();
		ChaosScheduleDescriptionFFI {
			version: schedule.version,
			schedule: operation.retain(ChaosScheduleFFI {
				start_date_utc_ms: schedule.start_date_utc_ms,
				expiry_date_utc_ms: schedule.expiry_date_utc_ms,
				parameters_count: parameters.len(),
				parameters: operation.retain_slice(parameters),
				job_count: jobs.len(),
				jobs: operation.retain_slice(jobs),
			}),
		}
	})
}

fn schedule_status_at(schedule: &SimulatedChaosSchedule, now_ms: i64) -> u32 {
	if schedule.jobs.is_empty() {
		CHAOS_SCHEDULE_STATUS_STOPPED
	} else if now_ms < schedule.start_date_utc_ms {
		CHAOS_SCHEDULE_STATUS_PENDING
	} else if now_ms >= schedule.expiry_date_utc_ms {
		CHAOS_SCHEDULE_STATUS_EXPIRED
	} else {
		CHAOS_SCHEDULE_STATUS_ACTIVE
	}
}

extern "C" fn begin_set_chaos_schedule(
	instance: *mut c_void,
	description: *const ChaosScheduleDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("set_chaos_schedule", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let schedule = unsafe { description.schedule.as_ref() }.ok_or(E_POINTER)?;
		if schedule.expiry_date_utc_ms <= schedule.start_date_utc_ms {
			return Err(E_INVALIDARG);
		}

		let mut parameters = Vec::new();
		for named in unsafe { read_slice(schedule.parameters, schedule.parameters_count) }? {
			let name = unsafe { read_text(named.name) }.ok_or(E_POINTER)?;
			parameters.push((name, unsafe { read_parameters(named.parameters) }?));
		}
		let mut jobs = Vec::new();
		for job in unsafe { read_slice(schedule.jobs, schedule.job_count) }? {
			let parameters_name = unsafe { read_text(job.parameters_name) }.ok_or(E_POINTER)?;
			if !parameters.iter().any(|(name, _)| *name == parameters_name) {
				return Err(E_INVALIDARG);
			}
			jobs.push(SimulatedScheduleJob {
				parameters_name,
				active_days: job.active_days,
				time_ranges: unsafe { read_slice(job.time_ranges, job.time_range_count) }?.to_vec(),
			});
		}

		let mut stored = state.schedule.lock();
		if description.version != stored.version {
			return Ok(Outcome::failed(E_INVALIDARG));
		}
		*stored = SimulatedChaosSchedule {
			version: stored.version + 1,
			start_date_utc_ms: schedule.start_date_utc_ms,
			expiry_date_utc_ms: schedule.expiry_date_utc_ms,
			parameters,
			jobs,
		};
		state.chaos.lock().schedule_status = schedule_status_at(&stored, state.now());
		Ok(Outcome::ok())
	})
}

extern "C" fn begin_start_node_transition(
	instance: *mut c_void,
	description: *const NodeTransitionDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("start_node_transition", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		if !matches!(description.transition_type, NODE_TRANSITION_TYPE_START | NODE_TRANSITION_TYPE_STOP) {
			return Err(E_INVALIDARG);
		}
		let node_name = unsafe { read_text(description.node_name) }.ok_or(E_POINTER)?;
		let operation_id = description.operation_id.bytes;

		if state.operation_id_in_use(operation_id) {
			return Ok(Outcome::failed(FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS));
		}
		let instance_id = state.nodes.lock().iter().find(|n| n.name == node_name).map(|n| n.instance_id);
		match instance_id {
			None => return Ok(Outcome::failed(FABRIC_E_NODE_NOT_FOUND)),
			Some(instance_id) if instance_id != description.node_instance_id => {
				return Ok(Outcome::failed(FABRIC_E_INSTANCE_ID_MISMATCH));
			}
			Some(_) => {}
		}

		let mut transitions = state.node_transitions.lock();
		if transitions.iter().any(|t| t.node_name == node_name && t.state == TEST_COMMAND_STATE_RUNNING) {
			return Ok(Outcome::failed(FABRIC_E_NODE_TRANSITION_IN_PROGRESS));
		}
		transitions.push(SimulatedNodeTransition {
			operation_id,
			transition_type: description.transition_type,
			node_name,
			node_instance_id: description.node_instance_id,
			stop_duration_secs: description.stop_duration_secs,
			state: TEST_COMMAND_STATE_RUNNING,
			error_code: 0,
		});
		Ok(Outcome::ok())
	})
}

struct TransitionProgress {
	state: u32,
	error_code: i32,
	node_name: String,
	node_instance_id: u64,
}

impl ClusterState {
	/// Applies a running transition to its node
	fn finish_transition(&self, transition: &mut SimulatedNodeTransition) {
		let mut nodes = self.nodes.lock();
		let Some(node) = nodes.iter_mut().find(|n| n.name == transition.node_name) else {
			transition.state = TEST_COMMAND_STATE_FAULTED;
			transition.error_code = FABRIC_E_NODE_NOT_FOUND;
			return;
		};
		match transition.transition_type {
			NODE_TRANSITION_TYPE_STOP => {
				node.status = NODE_STATUS_DOWN;
				transition.state = TEST_COMMAND_STATE_COMPLETED;
			}
			_ if node.status == NODE_STATUS_UP => {
				transition.state = TEST_COMMAND_STATE_FAULTED;
				transition.error_code = FABRIC_E_NODE_IS_UP;
			}
			_ => {
				node.status = NODE_STATUS_UP;
				node.instance_id += 1;
				transition.state = TEST_COMMAND_STATE_COMPLETED;
			}
		}
	}
}

extern "C" fn begin_get_node_transition_progress(
	instance: *mut c_void,
	operation_id: *const GuidFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_node_transition_progress", timeout_ms, callback, ctx_out, |state| {
		let operation_id = unsafe { operation_id.as_ref() }.ok_or(E_POINTER)?;
		let mut transitions = state.node_transitions.lock();
		let Some(transition) = transitions.iter_mut().find(|t| t.operation_id == operation_id.bytes) else {
			return Ok(Outcome::failed(FABRIC_E_KEY_NOT_FOUND));
		};

		let progress = TransitionProgress {
			state: transition.state,
			error_code: transition.error_code,
			node_name: transition.node_name.clone(),
			node_instance_id: transition.node_instance_id,
		};
		if transition.state == TEST_COMMAND_STATE_RUNNING {
			state.finish_transition(transition);
		}
		Ok(Outcome::with_output(progress))
	})
}

extern "C" fn end_get_node_transition_progress(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut NodeTransitionProgressFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, progress: TransitionProgress| {
		NodeTransitionProgressFFI {
			state: progress.state,
			error_code: progress.error_code,
			node_name: operation.retain_text(&progress.node_name),
			node_instance_id: progress.node_instance_id,
		}
	})
}
