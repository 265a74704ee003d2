// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::collections::BTreeMap;

use fabric_abi::query::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};

use super::HealthState;

native_enum! {
	pub enum ApplicationStatus {
		Ready = APPLICATION_STATUS_READY,
		Upgrading = APPLICATION_STATUS_UPGRADING,
		Creating = APPLICATION_STATUS_CREATING,
		Deleting = APPLICATION_STATUS_DELETING,
		Failed = APPLICATION_STATUS_FAILED,
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationQueryDescription {
	pub application_name_filter: Option<String>,
	pub application_type_name_filter: Option<String>,
	pub continuation_token: Option<String>,
	/// Page size; `None` leaves it to the runtime
	pub max_results: Option<u32>,
}

impl ApplicationQueryDescription {
	pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
		self.application_name_filter = Some(name.into());
		self
	}

	pub fn with_application_type_name(mut self, type_name: impl Into<String>) -> Self {
		self.application_type_name_filter = Some(type_name.into());
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
		if let Some(name) = &self.application_name_filter {
			require_fabric_uri(name, "application_name_filter")?;
		}
		if self.max_results == Some(0) {
			return Err(InteropError::invalid_argument("max_results", "must be positive"));
		}
		Ok(())
	}
}

/// Application and service names live under the `fabric:/` scheme.
pub(super) fn require_fabric_uri(name: &str, argument: &str) -> Result<()> {
	match name.strip_prefix("fabric:/") {
		Some(rest) if !rest.is_empty() => Ok(()),
		_ => Err(InteropError::invalid_argument(argument, format!("'{name}' is not a fabric:/ name"))),
	}
}

impl ToNative for ApplicationQueryDescription {
	type Native = ApplicationQueryDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ApplicationQueryDescriptionFFI> {
		Ok(ApplicationQueryDescriptionFFI {
			application_name_filter: arena.pin_opt_str(self.application_name_filter.as_deref())?,
			application_type_name_filter: arena.pin_opt_str(self.application_type_name_filter.as_deref())?,
			continuation_token: arena.pin_opt_str(self.continuation_token.as_deref())?,
			max_results: self.max_results.unwrap_or(0),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
	pub name: String,
	pub type_name: String,
	pub type_version: String,
	pub status: ApplicationStatus,
	pub health_state: HealthState,
	/// Parameters overridden at creation
	pub parameters: BTreeMap<String, String>,
}

impl FromNative for Application {
	type Native = ApplicationQueryResultItemFFI;

	unsafe fn from_native(native: &ApplicationQueryResultItemFFI) -> Result<Self> {
		let parameters = match unsafe { native.parameters.as_ref() } {
			Some(pairs) => unsafe { BTreeMap::from_native(pairs) }?,
			None => BTreeMap::new(),
		};
		Ok(Self {
			name: unsafe { string_from_native(native.application_name, "application.name") }?,
			type_name: unsafe { string_from_native(native.application_type_name, "application.type_name") }?,
			type_version: unsafe {
				string_from_native(native.application_type_version, "application.type_version")
			}?,
			status: ApplicationStatus::from_native_value(native.status)?,
			health_state: HealthState::from_native_value(native.health_state)?,
			parameters,
		})
	}
}

/// One page of applications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationList {
	pub applications: Vec<Application>,
	pub continuation_token: Option<String>,
}

impl FromNative for ApplicationList {
	type Native = ApplicationListFFI;

	unsafe fn from_native(native: &ApplicationListFFI) -> Result<Self> {
		let applications = unsafe { slice_from_native(native.items, native.count, "application_list") }?
			.iter()
			.map(|item| unsafe { Application::from_native(item) })
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			applications,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "application_list.continuation_token")
			}?,
		})
	}
}
