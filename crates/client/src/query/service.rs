// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use fabric_abi::query::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};

use super::{HealthState, ServiceKind, application::require_fabric_uri};

native_enum! {
	pub enum ServiceStatus {
		Active = SERVICE_STATUS_ACTIVE,
		Upgrading = SERVICE_STATUS_UPGRADING,
		Deleting = SERVICE_STATUS_DELETING,
		Creating = SERVICE_STATUS_CREATING,
		Failed = SERVICE_STATUS_FAILED,
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceQueryDescription {
	pub application_name: String,
	pub service_name_filter: Option<String>,
	pub continuation_token: Option<String>,
	/// Page size; `None` leaves it to the runtime
	pub max_results: Option<u32>,
}

impl ServiceQueryDescription {
	pub fn new(application_name: impl Into<String>) -> Self {
		Self {
			application_name: application_name.into(),
			service_name_filter: None,
			continuation_token: None,
			max_results: None,
		}
	}

	pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
		self.service_name_filter = Some(name.into());
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
		require_fabric_uri(&self.application_name, "application_name")?;
		if let Some(name) = &self.service_name_filter {
			require_fabric_uri(name, "service_name_filter")?;
		}
		if self.max_results == Some(0) {
			return Err(InteropError::invalid_argument("max_results", "must be positive"));
		}
		Ok(())
	}
}

impl ToNative for ServiceQueryDescription {
	type Native = ServiceQueryDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ServiceQueryDescriptionFFI> {
		Ok(ServiceQueryDescriptionFFI {
			application_name: arena.pin_str(&self.application_name)?.as_ptr(),
			service_name_filter: arena.pin_opt_str(self.service_name_filter.as_deref())?,
			continuation_token: arena.pin_opt_str(self.continuation_token.as_deref())?,
			max_results: self.max_results.unwrap_or(0),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
	pub name: String,
	pub type_name: String,
	pub manifest_version: String,
	pub kind: ServiceKind,
	/// Only set for stateful services
	pub has_persisted_state: Option<bool>,
	pub status: ServiceStatus,
	pub health_state: HealthState,
}

impl FromNative for Service {
	type Native = ServiceQueryResultItemFFI;

	unsafe fn from_native(native: &ServiceQueryResultItemFFI) -> Result<Self> {
		let kind = ServiceKind::from_native_value(native.service_kind)?;
		let has_persisted_state = match kind {
			ServiceKind::Stateful => Some(unsafe { bool::from_native(&native.has_persisted_state) }?),
			ServiceKind::Stateless => None,
		};
		Ok(Self {
			name: unsafe { string_from_native(native.service_name, "service.name") }?,
			type_name: unsafe { string_from_native(native.service_type_name, "service.type_name") }?,
			manifest_version: unsafe {
				string_from_native(native.service_manifest_version, "service.manifest_version")
			}?,
			kind,
			has_persisted_state,
			status: ServiceStatus::from_native_value(native.service_status)?,
			health_state: HealthState::from_native_value(native.health_state)?,
		})
	}
}

/// One page of services
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceList {
	pub services: Vec<Service>,
	pub continuation_token: Option<String>,
}

impl FromNative for ServiceList {
	type Native = ServiceListFFI;

	unsafe fn from_native(native: &ServiceListFFI) -> Result<Self> {
		let services = unsafe { slice_from_native(native.items, native.count, "service_list") }?
			.iter()
			.map(|item| unsafe { Service::from_native(item) })
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			services,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "service_list.continuation_token")
			}?,
		})
	}
}
