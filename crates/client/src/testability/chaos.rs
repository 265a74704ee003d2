// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::BTreeMap,
	ptr,
	time::{Duration, SystemTime, UNIX_EPOCH},
};

use fabric_abi::testability::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native, token_from_native},
};
use serde::{Deserialize, Serialize};

use super::ChaosScheduleStatus;

native_enum! {
	pub enum ChaosStatus {
		Running = CHAOS_STATUS_RUNNING,
		Stopped = CHAOS_STATUS_STOPPED,
	}
}

native_enum! {
	pub enum ChaosEventKind {
		Started = CHAOS_EVENT_STARTED,
		ExecutingFaults = CHAOS_EVENT_EXECUTING_FAULTS,
		ValidationFailed = CHAOS_EVENT_VALIDATION_FAILED,
		TestError = CHAOS_EVENT_TEST_ERROR,
		Waiting = CHAOS_EVENT_WAITING,
		Stopped = CHAOS_EVENT_STOPPED,
	}
}

/// How a chaos run injects faults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosParameters {
	pub max_cluster_stabilization_timeout: Duration,
	pub max_concurrent_faults: u32,
	pub enable_move_replica_faults: bool,
	pub wait_time_between_faults: Duration,
	pub wait_time_between_iterations: Duration,
	/// `Duration::MAX` runs until stopped
	pub time_to_run: Duration,
	/// Free-form labels recorded with every chaos event
	pub context: BTreeMap<String, String>,
}

impl Default for ChaosParameters {
	fn default() -> Self {
		Self {
			max_cluster_stabilization_timeout: Duration::from_secs(60),
			max_concurrent_faults: 1,
			enable_move_replica_faults: true,
			wait_time_between_faults: Duration::from_secs(20),
			wait_time_between_iterations: Duration::from_secs(30),
			time_to_run: Duration::MAX,
			context: BTreeMap::new(),
		}
	}
}

impl ChaosParameters {
	pub fn with_max_concurrent_faults(mut self, faults: u32) -> Self {
		self.max_concurrent_faults = faults;
		self
	}

	pub fn with_time_to_run(mut self, time_to_run: Duration) -> Self {
		self.time_to_run = time_to_run;
		self
	}

	pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.context.insert(key.into(), value.into());
		self
	}

	pub(crate) fn validate(&self) -> Result<()> {
		if self.max_concurrent_faults == 0 {
			return Err(InteropError::invalid_argument("max_concurrent_faults", "must be at least 1"));
		}
		if self.time_to_run.is_zero() {
			return Err(InteropError::invalid_argument("time_to_run", "must be positive"));
		}
		Ok(())
	}
}

impl ToNative for ChaosParameters {
	type Native = ChaosParametersFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ChaosParametersFFI> {
		let context = if self.context.is_empty() {
			ptr::null()
		} else {
			arena.pin(&self.context)?.as_ptr()
		};

		Ok(ChaosParametersFFI {
			max_cluster_stabilization_timeout_secs: self.max_cluster_stabilization_timeout.as_secs(),
			max_concurrent_faults: self.max_concurrent_faults,
			enable_move_replica_faults: self.enable_move_replica_faults.to_native(arena)?,
			wait_time_between_faults_secs: self.wait_time_between_faults.as_secs(),
			wait_time_between_iterations_secs: self.wait_time_between_iterations.as_secs(),
			time_to_run_secs: self.time_to_run.as_secs(),
			context,
		})
	}
}

/// `time_to_run_secs` value meaning "until stopped"
const RUN_UNTIL_STOPPED_SECS: u64 = u64::MAX;

fn duration_from_secs(secs: u64) -> Duration {
	if secs == RUN_UNTIL_STOPPED_SECS {
		Duration::MAX
	} else {
		Duration::from_secs(secs)
	}
}

impl FromNative for ChaosParameters {
	type Native = ChaosParametersFFI;

	unsafe fn from_native(native: &ChaosParametersFFI) -> Result<Self> {
		let context = match unsafe { native.context.as_ref() } {
			Some(pairs) => unsafe { BTreeMap::from_native(pairs) }?,
			None => BTreeMap::new(),
		};
		Ok(Self {
			max_cluster_stabilization_timeout: Duration::from_secs(native.max_cluster_stabilization_timeout_secs),
			max_concurrent_faults: native.max_concurrent_faults,
			enable_move_replica_faults: native.enable_move_replica_faults != 0,
			wait_time_between_faults: Duration::from_secs(native.wait_time_between_faults_secs),
			wait_time_between_iterations: Duration::from_secs(native.wait_time_between_iterations_secs),
			time_to_run: duration_from_secs(native.time_to_run_secs),
			context,
		})
	}
}

/// Whether chaos runs, under which schedule state, and with which parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosDescription {
	pub status: ChaosStatus,
	pub schedule_status: ChaosScheduleStatus,
	/// Parameters of the most recent start; unset if chaos never ran
	pub parameters: Option<ChaosParameters>,
}

impl ChaosDescription {
	pub fn is_running(&self) -> bool {
		self.status == ChaosStatus::Running
	}
}

impl FromNative for ChaosDescription {
	type Native = ChaosDescriptionFFI;

	unsafe fn from_native(native: &ChaosDescriptionFFI) -> Result<Self> {
		let parameters = match unsafe { native.parameters.as_ref() } {
			Some(parameters) => Some(unsafe { ChaosParameters::from_native(parameters) }?),
			None => None,
		};
		Ok(Self {
			status: ChaosStatus::from_native_value(native.status)?,
			schedule_status: ChaosScheduleStatus::from_native_value(native.schedule_status)?,
			parameters,
		})
	}
}

pub(super) fn to_unix_millis(time: SystemTime, argument: &str) -> Result<i64> {
	let since_epoch = time
		.duration_since(UNIX_EPOCH)
		.map_err(|_| InteropError::invalid_argument(argument, "must not be before the unix epoch"))?;
	i64::try_from(since_epoch.as_millis()).map_err(|_| InteropError::invalid_argument(argument, "out of range"))
}

pub(super) fn from_unix_millis(millis: i64) -> Result<SystemTime> {
	u64::try_from(millis)
		.ok()
		.and_then(|millis| UNIX_EPOCH.checked_add(Duration::from_millis(millis)))
		.ok_or_else(|| InteropError::MalformedResult(format!("timestamp {millis} out of range")))
}

/// Time window of chaos events to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosReportFilter {
	pub start_time_utc: SystemTime,
	pub end_time_utc: SystemTime,
}

impl ChaosReportFilter {
	pub fn new(start_time_utc: SystemTime, end_time_utc: SystemTime) -> Self {
		Self {
			start_time_utc,
			end_time_utc,
		}
	}

	/// Every event up to now
	pub fn until_now() -> Self {
		Self::new(UNIX_EPOCH, SystemTime::now())
	}
}

impl ToNative for ChaosReportFilter {
	type Native = ChaosReportFilterFFI;

	fn to_native(&self, _arena: &PinArena) -> Result<ChaosReportFilterFFI> {
		let start_time_utc_ms = to_unix_millis(self.start_time_utc, "start_time_utc")?;
		let end_time_utc_ms = to_unix_millis(self.end_time_utc, "end_time_utc")?;
		if start_time_utc_ms > end_time_utc_ms {
			return Err(InteropError::invalid_argument("end_time_utc", "must not be before start_time_utc"));
		}
		Ok(ChaosReportFilterFFI {
			start_time_utc_ms,
			end_time_utc_ms,
		})
	}
}

/// Either the first page of a report or a follow-up page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosReportRequest {
	Filter(ChaosReportFilter),
	Continuation(String),
}

impl ChaosReportRequest {
	pub(crate) fn validate(&self) -> Result<()> {
		match self {
			Self::Continuation(token) if token.is_empty() => {
				Err(InteropError::invalid_argument("continuation_token", "must not be empty"))
			}
			_ => Ok(()),
		}
	}
}

impl From<ChaosReportFilter> for ChaosReportRequest {
	fn from(filter: ChaosReportFilter) -> Self {
		Self::Filter(filter)
	}
}

impl ToNative for ChaosReportRequest {
	type Native = ChaosReportDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ChaosReportDescriptionFFI> {
		Ok(match self {
			Self::Filter(filter) => ChaosReportDescriptionFFI {
				filter: arena.pin(filter)?.as_ptr(),
				continuation_token: ptr::null(),
			},
			Self::Continuation(token) => ChaosReportDescriptionFFI {
				filter: ptr::null(),
				continuation_token: arena.pin_str(token)?.as_ptr(),
			},
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosEvent {
	pub kind: ChaosEventKind,
	pub timestamp_utc: SystemTime,
	pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosReport {
	pub status: ChaosStatus,
	pub events: Vec<ChaosEvent>,
	/// Set when more events remain; pass back in [`ChaosReportRequest::Continuation`]
	pub continuation_token: Option<String>,
}

impl ChaosReport {
	pub fn next_request(&self) -> Option<ChaosReportRequest> {
		self.continuation_token.clone().map(ChaosReportRequest::Continuation)
	}
}

impl FromNative for ChaosReport {
	type Native = ChaosReportFFI;

	unsafe fn from_native(native: &ChaosReportFFI) -> Result<Self> {
		let events = unsafe { slice_from_native(native.events, native.event_count, "chaos_report.events") }?
			.iter()
			.map(|event| -> Result<ChaosEvent> {
				Ok(ChaosEvent {
					kind: ChaosEventKind::from_native_value(event.kind)?,
					timestamp_utc: from_unix_millis(event.timestamp_utc_ms)?,
					reason: unsafe { string_from_native(event.reason, "chaos_event.reason") }?,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			status: ChaosStatus::from_native_value(native.status)?,
			events,
			continuation_token: unsafe {
				token_from_native(native.continuation_token, "chaos_report.continuation_token")
			}?,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::ffi::CStr;

	use super::*;

	#[test]
	fn test_defaults_run_until_stopped() {
		let parameters = ChaosParameters::default();
		assert_eq!(parameters.max_concurrent_faults, 1);
		assert_eq!(parameters.time_to_run, Duration::MAX);
		assert!(parameters.validate().is_ok());
	}

	#[test]
	fn test_zero_concurrent_faults_is_rejected() {
		let err = ChaosParameters::default().with_max_concurrent_faults(0).validate().unwrap_err();
		assert!(matches!(err, InteropError::InvalidArgument { ref argument, .. } if argument == "max_concurrent_faults"));
	}

	#[test]
	fn test_empty_context_is_not_pinned() {
		let arena = PinArena::open();
		let native = ChaosParameters::default().to_native(&arena).unwrap();
		assert!(native.context.is_null());
		assert_eq!(native.time_to_run_secs, u64::MAX);
		assert_eq!(arena.stats().pinned, 0);
	}

	#[test]
	fn test_context_pairs_are_pinned() {
		let arena = PinArena::open();
		let native = ChaosParameters::default().with_context("run", "nightly").to_native(&arena).unwrap();
		let pairs = unsafe { &*native.context };
		assert_eq!(pairs.count, 1);
		let pair = unsafe { &*pairs.items };
		assert_eq!(unsafe { CStr::from_ptr(pair.key) }.to_str().unwrap(), "run");
		assert_eq!(unsafe { CStr::from_ptr(pair.value) }.to_str().unwrap(), "nightly");
	}

	#[test]
	fn test_inverted_window_is_rejected() {
		let arena = PinArena::open();
		let now = SystemTime::now();
		let filter = ChaosReportFilter::new(now, now - Duration::from_secs(1));
		assert!(filter.to_native(&arena).unwrap_err().is_invalid_argument());
	}

	#[test]
	fn test_empty_continuation_is_rejected() {
		assert!(ChaosReportRequest::Continuation(String::new()).validate().is_err());
		assert!(ChaosReportRequest::Continuation("3".to_string()).validate().is_ok());
	}

	#[test]
	fn test_report_copies_events() {
		let reason = c"chaos started";
		let events = [ChaosEventFFI {
			kind: CHAOS_EVENT_STARTED,
			timestamp_utc_ms: 1_500,
			reason: reason.as_ptr(),
		}];
		let native = ChaosReportFFI {
			status: CHAOS_STATUS_RUNNING,
			event_count: 1,
			events: events.as_ptr(),
			continuation_token: c"1".as_ptr(),
		};

		let report = unsafe { ChaosReport::from_native(&native) }.unwrap();
		assert_eq!(report.status, ChaosStatus::Running);
		assert_eq!(report.events[0].kind, ChaosEventKind::Started);
		assert_eq!(report.events[0].timestamp_utc, UNIX_EPOCH + Duration::from_millis(1_500));
		assert_eq!(report.events[0].reason, "chaos started");
		assert_eq!(report.next_request(), Some(ChaosReportRequest::Continuation("1".to_string())));
	}

	#[test]
	fn test_parameters_survive_the_native_layout() {
		let arena = PinArena::open();
		let parameters = ChaosParameters::default().with_max_concurrent_faults(3).with_context("run", "nightly");
		let native = parameters.to_native(&arena).unwrap();

		let copied = unsafe { ChaosParameters::from_native(&native) }.unwrap();
		assert_eq!(copied, parameters);
		assert_eq!(copied.time_to_run, Duration::MAX);
	}

	#[test]
	fn test_description_without_parameters() {
		let native = ChaosDescriptionFFI {
			status: CHAOS_STATUS_STOPPED,
			schedule_status: CHAOS_SCHEDULE_STATUS_PENDING,
			parameters: ptr::null(),
		};

		let description = unsafe { ChaosDescription::from_native(&native) }.unwrap();
		assert!(!description.is_running());
		assert_eq!(description.schedule_status, ChaosScheduleStatus::Pending);
		assert_eq!(description.parameters, None);
	}

	#[test]
	fn test_empty_token_means_last_page() {
		let native = ChaosReportFFI {
			status: CHAOS_STATUS_STOPPED,
			event_count: 0,
			events: ptr::null(),
			continuation_token: c"".as_ptr(),
		};

		let report = unsafe { ChaosReport::from_native(&native) }.unwrap();
		assert_eq!(report.continuation_token, None);
		assert_eq!(report.next_request(), None);
	}
}
