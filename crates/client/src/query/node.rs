// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{ops::BitOr, time::Duration};

use fabric_abi::query::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};

native_enum! {
	pub enum NodeStatus {
		Up = NODE_STATUS_UP,
		Down = NODE_STATUS_DOWN,
		Enabling = NODE_STATUS_ENABLING,
		Disabling = NODE_STATUS_DISABLING,
		Disabled = NODE_STATUS_DISABLED,
		Unknown = NODE_STATUS_UNKNOWN,
		Removed = NODE_STATUS_REMOVED,
	}
}

native_enum! {
	pub enum HealthState {
		Ok = HEALTH_STATE_OK,
		Warning = HEALTH_STATE_WARNING,
		Error = HEALTH_STATE_ERROR,
		Unknown = HEALTH_STATE_UNKNOWN,
	}
}

/// Bit set of [`NodeStatus`]es to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeStatusFilter(pub u32);

impl NodeStatusFilter {
	/// Whatever the runtime lists when no filter is given
	pub const DEFAULT: Self = Self(NODE_STATUS_FILTER_DEFAULT);
	pub const UP: Self = Self(NODE_STATUS_FILTER_UP);
	pub const DOWN: Self = Self(NODE_STATUS_FILTER_DOWN);
	pub const ENABLING: Self = Self(NODE_STATUS_FILTER_ENABLING);
	pub const DISABLING: Self = Self(NODE_STATUS_FILTER_DISABLING);
	pub const DISABLED: Self = Self(NODE_STATUS_FILTER_DISABLED);
	pub const UNKNOWN: Self = Self(NODE_STATUS_FILTER_UNKNOWN);
	pub const REMOVED: Self = Self(NODE_STATUS_FILTER_REMOVED);
	pub const ALL: Self = Self(NODE_STATUS_FILTER_ALL);
}

impl Default for NodeStatusFilter {
	fn default() -> Self {
		Self::DEFAULT
	}
}

impl BitOr for NodeStatusFilter {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeQueryDescription {
	pub node_name_filter: Option<String>,
	pub status_filter: NodeStatusFilter,
	pub continuation_token: Option<String>,
	/// Page size; `None` leaves it to the runtime
	pub max_results: Option<u32>,
}

impl NodeQueryDescription {
	pub fn with_node_name(mut self, name: impl Into<String>) -> Self {
		self.node_name_filter = Some(name.into());
		self
	}

	pub fn with_status_filter(mut self, filter: NodeStatusFilter) -> Self {
		self.status_filter = filter;
		self
	}

	pub fn with_continuation_token(mut self, token: impl Into<String>) -> Self {
		self.continuation_token = Some(token.into());
		self
	}

	pub fn with_max_results(mut self, max_results: u32) -> Self {
		self.max_results = Some(max_results);
		self
	}

	pub(crate) fn validate(&self) -> Result<()> {
		if self.max_results == Some(0) {
			return Err(InteropError::invalid_argument("max_results", "must be positive"));
		}
		Ok(())
	}
}

impl ToNative for NodeQueryDescription {
	type Native = NodeQueryDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<NodeQueryDescriptionFFI> {
		Ok(NodeQueryDescriptionFFI {
			node_name_filter: arena.pin_opt_str(self.node_name_filter.as_deref())?,
			node_status_filter: self.status_filter.0,
			continuation_token: arena.pin_opt_str(self.continuation_token.as_deref())?,
			max_results: self.max_results.unwrap_or(0),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
	pub name: String,
	pub ip_address_or_fqdn: String,
	pub node_type: String,
	pub code_version: String,
	pub status: NodeStatus,
	pub is_seed_node: bool,
	pub upgrade_domain: String,
	pub fault_domain: String,
	pub health_state: HealthState,
	pub up_time: Duration,
}

impl FromNative for Node {
	type Native = NodeQueryResultItemFFI;

	unsafe fn from_native(native: &NodeQueryResultItemFFI) -> Result<Self> {
		Ok(Self {
			name: unsafe { string_from_native(native.node_name, "node.name") }?,
			ip_address_or_fqdn: unsafe { string_from_native(native.ip_address_or_fqdn, "node.ip_address_or_fqdn") }?,
			node_type: unsafe { string_from_native(native.node_type, "node.node_type") }?,
			code_version: unsafe { string_from_native(native.code_version, "node.code_version") }?,
			status: NodeStatus::from_native_value(native.node_status)?,
			is_seed_node: unsafe { bool::from_native(&native.is_seed_node) }?,
			upgrade_domain: unsafe { string_from_native(native.upgrade_domain, "node.upgrade_domain") }?,
			fault_domain: unsafe { string_from_native(native.fault_domain, "node.fault_domain") }?,
			health_state: HealthState::from_native_value(native.health_state)?,
			up_time: Duration::from_secs(native.node_up_time_secs.max(0) as u64),
		})
	}
}

/// One page of nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeList {
	pub nodes: Vec<Node>,
	/// Set when more nodes remain
	pub continuation_token: Option<String>,
}

impl FromNative for NodeList {
	type Native = NodeListFFI;

	unsafe fn from_native(native: &NodeListFFI) -> Result<Self> {
		let nodes = unsafe { slice_from_native(native.items, native.count, "node_list") }?
			.iter()
			.map(|item| unsafe { Node::from_native(item) })
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			nodes,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "node_list.continuation_token")
			}?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_query_pins_nothing() {
		let arena = PinArena::open();
		let native = NodeQueryDescription::default().to_native(&arena).unwrap();
		assert!(native.node_name_filter.is_null());
		assert!(native.continuation_token.is_null());
		assert_eq!(native.node_status_filter, NODE_STATUS_FILTER_DEFAULT);
		assert_eq!(native.max_results, 0);
		assert_eq!(arena.stats().pinned, 0);
	}

	#[test]
	fn test_zero_page_size_is_rejected() {
		let err = NodeQueryDescription::default().with_max_results(0).validate().unwrap_err();
		assert!(err.is_invalid_argument());
	}

	#[test]
	fn test_unknown_health_state_passes_through() {
		assert_eq!(HealthState::from_native_value(HEALTH_STATE_UNKNOWN).unwrap(), HealthState::Unknown);
		assert!(HealthState::from_native_value(7).is_err());
	}

	#[test]
	fn test_missing_node_name_is_malformed() {
		let native = NodeQueryResultItemFFI {
			node_name: std::ptr::null(),
			ip_address_or_fqdn: c"10.0.0.1".as_ptr(),
			node_type: c"worker".as_ptr(),
			code_version: c"9.1".as_ptr(),
			node_status: NODE_STATUS_UP,
			is_seed_node: 0,
			upgrade_domain: c"ud0".as_ptr(),
			fault_domain: c"fd:/0".as_ptr(),
			health_state: HEALTH_STATE_OK,
			node_up_time_secs: 10,
		};
		let err = unsafe { Node::from_native(&native) }.unwrap_err();
		assert!(matches!(err, InteropError::MalformedResult(_)));
	}
}
