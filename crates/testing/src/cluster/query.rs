// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::ffi::{c_char, c_void};

use fabric_abi::{
	constants::{E_INVALIDARG, E_POINTER, FABRIC_E_APPLICATION_NOT_FOUND, FABRIC_E_PARTITION_NOT_FOUND},
	data::GuidFFI,
	operation::{AsyncCallbackFFI, AsyncOperationContextFFI},
	query::*,
};

use super::{
	Outcome, SimulatedApplication, SimulatedNode, SimulatedPartition, SimulatedReplica, SimulatedService,
	end_with_output, read_text, retain_pairs, state_of,
};
use crate::operation::ScriptedOperation;

pub(super) static VTABLE: QueryClientVTableFFI = QueryClientVTableFFI {
	begin_get_node_list,
	end_get_node_list,
	begin_get_partition_list,
	end_get_partition_list,
	begin_get_application_list,
	end_get_application_list,
	begin_get_service_list,
	end_get_service_list,
	begin_get_replica_list,
	end_get_replica_list,
	release: super::release_instance,
};

struct Page<T> {
	items: Vec<T>,
	continuation_token: Option<String>,
}

impl<T> Page<T> {
	/// Cuts one page out of `matching`. Tokens are the index of the next
	/// item and a `max_results` of 0 means no limit.
	unsafe fn of(matching: Vec<T>, continuation_token: *const c_char, max_results: u32) -> Result<Self, i32> {
		let start = match unsafe { read_text(continuation_token) } {
			Some(token) => token.parse::<usize>().map_err(|_| E_INVALIDARG)?,
			None => 0,
		};
		let total = matching.len();
		let limit = match max_results {
			0 => usize::MAX,
			max => max as usize,
		};
		let items: Vec<T> = matching.into_iter().skip(start).take(limit).collect();
		let next = start + items.len();
		Ok(Self {
			items,
			continuation_token: (next < total).then(|| next.to_string()),
		})
	}
}

fn status_matches(status: u32, filter: u32) -> bool {
	match filter {
		NODE_STATUS_FILTER_DEFAULT | NODE_STATUS_FILTER_ALL => true,
		filter => (1..=7).contains(&status) && filter & (1 << (status - 1)) != 0,
	}
}

extern "C" fn begin_get_node_list(
	instance: *mut c_void,
	description: *const NodeQueryDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_node_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let name = unsafe { read_text(description.node_name_filter) };
		let matching: Vec<SimulatedNode> = state
			.nodes
			.lock()
			.iter()
			.filter(|n| name.as_deref().is_none_or(|name| n.name == name))
			.filter(|n| status_matches(n.status, description.node_status_filter))
			.cloned()
			.collect();

		Ok(Outcome::with_output(unsafe {
			Page::of(matching, description.continuation_token, description.max_results)
		}?))
	})
}

extern "C" fn end_get_node_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut NodeListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: Page<SimulatedNode>| {
		let items: Vec<NodeQueryResultItemFFI> = page
			.items
			.iter()
			.map(|node| NodeQueryResultItemFFI {
				node_name: operation.retain_text(&node.name),
				ip_address_or_fqdn: operation.retain_text(&node.address),
				node_type: operation.retain_text(&node.node_type),
				code_version: operation.retain_text(&node.code_version),
				node_status: node.status,
				is_seed_node: u8::from(node.is_seed),
				upgrade_domain: operation.retain_text(&node.upgrade_domain),
				fault_domain: operation.retain_text(&node.fault_domain),
				health_state: node.health_state,
				node_up_time_secs: node.up_time_secs,
			})
			.collect();
		NodeListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}

extern "C" fn begin_get_partition_list(
	instance: *mut c_void,
	description: *const PartitionQueryDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_partition_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let service_name = unsafe { read_text(description.service_name) }.ok_or(E_POINTER)?;
		let id_filter = unsafe { description.partition_id_filter.as_ref() }.map(|id| id.bytes);

		let items: Vec<SimulatedPartition> = state
			.partitions
			.lock()
			.iter()
			.filter(|p| p.service_name == service_name)
			.filter(|p| id_filter.is_none_or(|id| p.id == id))
			.cloned()
			.collect();

		Ok(Outcome::with_output(Page {
			items,
			continuation_token: None,
		}))
	})
}

extern "C" fn end_get_partition_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut PartitionListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: Page<SimulatedPartition>| {
		let items: Vec<PartitionQueryResultItemFFI> = page
			.items
			.iter()
			.map(|partition| PartitionQueryResultItemFFI {
				partition_id: GuidFFI {
					bytes: partition.id,
				},
				service_kind: partition.service_kind,
				partition_scheme: partition.scheme,
				partition_name: operation.retain_opt_text(partition.name.as_deref()),
				low_key: partition.low_key,
				high_key: partition.high_key,
				partition_status: partition.status,
				health_state: partition.health_state,
				replica_count: partition.replica_count,
				min_replica_set_size: partition.min_replica_set_size,
			})
			.collect();
		PartitionListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}

extern "C" fn begin_get_application_list(
	instance: *mut c_void,
	description: *const ApplicationQueryDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_application_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let name = unsafe { read_text(description.application_name_filter) };
		let type_name = unsafe { read_text(description.application_type_name_filter) };

		let matching: Vec<SimulatedApplication> = state
			.applications
			.lock()
			.iter()
			.filter(|a| name.as_deref().is_none_or(|name| a.name == name))
			.filter(|a| type_name.as_deref().is_none_or(|type_name| a.type_name == type_name))
			.cloned()
			.collect();

		Ok(Outcome::with_output(unsafe {
			Page::of(matching, description.continuation_token, description.max_results)
		}?))
	})
}

extern "C" fn end_get_application_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ApplicationListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: Page<SimulatedApplication>| {
		let items: Vec<ApplicationQueryResultItemFFI> = page
			.items
			.iter()
			.map(|application| ApplicationQueryResultItemFFI {
				application_name: operation.retain_text(&application.name),
				application_type_name: operation.retain_text(&application.type_name),
				application_type_version: operation.retain_text(&application.type_version),
				status: application.status,
				health_state: application.health_state,
				parameters: retain_pairs(operation, &application.parameters),
			})
			.collect();
		ApplicationListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}

extern "C" fn begin_get_service_list(
	instance: *mut c_void,
	description: *const ServiceQueryDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_service_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let application_name = unsafe { read_text(description.application_name) }.ok_or(E_POINTER)?;
		let name = unsafe { read_text(description.service_name_filter) };

		if !state.applications.lock().iter().any(|a| a.name == application_name) {
			return Err(FABRIC_E_APPLICATION_NOT_FOUND);
		}
		let matching: Vec<SimulatedService> = state
			.services
			.lock()
			.iter()
			.filter(|s| s.application_name == application_name)
			.filter(|s| name.as_deref().is_none_or(|name| s.name == name))
			.cloned()
			.collect();

		Ok(Outcome::with_output(unsafe {
			Page::of(matching, description.continuation_token, description.max_results)
		}?))
	})
}

extern "C" fn end_get_service_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ServiceListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: Page<SimulatedService>| {
		let items: Vec<ServiceQueryResultItemFFI> = page
			.items
			.iter()
			.map(|service| ServiceQueryResultItemFFI {
				service_name: operation.retain_text(&service.name),
				service_type_name: operation.retain_text(&service.type_name),
				service_manifest_version: operation.retain_text(&service.manifest_version),
				service_kind: service.service_kind,
				has_persisted_state: u8::from(service.has_persisted_state),
				service_status: service.status,
				health_state: service.health_state,
			})
			.collect();
		ServiceListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}

extern "C" fn begin_get_replica_list(
	instance: *mut c_void,
	description: *const ReplicaQueryDescriptionFFI,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32 {
	let state = unsafe { state_of(instance) };
	state.begin_operation("get_replica_list", timeout_ms, callback, ctx_out, |state| {
		let description = unsafe { description.as_ref() }.ok_or(E_POINTER)?;
		let partition_id = description.partition_id.bytes;
		let id_filter = description.replica_or_instance_id_filter;

		if !state.partitions.lock().iter().any(|p| p.id == partition_id) {
			return Err(FABRIC_E_PARTITION_NOT_FOUND);
		}
		let matching: Vec<SimulatedReplica> = state
			.replicas
			.lock()
			.iter()
			.filter(|r| r.partition_id == partition_id)
			.filter(|r| id_filter == 0 || r.id == id_filter)
			.cloned()
			.collect();

		Ok(Outcome::with_output(unsafe {
			Page::of(matching, description.continuation_token, description.max_results)
		}?))
	})
}

extern "C" fn end_get_replica_list(
	_instance: *mut c_void,
	ctx: *mut AsyncOperationContextFFI,
	out: *mut ReplicaListFFI,
) -> i32 {
	end_with_output(ctx, out, |operation: &ScriptedOperation, page: Page<SimulatedReplica>| {
		let items: Vec<ReplicaQueryResultItemFFI> = page
			.items
			.iter()
			.map(|replica| ReplicaQueryResultItemFFI {
				service_kind: replica.service_kind,
				replica_or_instance_id: replica.id,
				replica_role: replica.role,
				replica_status: replica.status,
				health_state: replica.health_state,
				node_name: operation.retain_text(&replica.node_name),
				replica_address: operation.retain_text(&replica.address),
				last_in_build_duration_secs: replica.last_in_build_duration_secs,
			})
			.collect();
		ReplicaListFFI {
			count: items.len(),
			items: operation.retain_slice(items),
			continuation_token: operation.retain_opt_text(page.continuation_token.as_deref()),
		}
	})
}
