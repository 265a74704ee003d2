// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{collections::BTreeMap, ops::BitOr, time::SystemTime};

use fabric_abi::testability::*;
use fabric_interop::{
	FromNative, InteropError, PinArena, Result, ToNative,
	marshal::{slice_from_native, string_from_native},
};
use serde::{Deserialize, Serialize};

use super::{
	ChaosParameters,
	chaos::{from_unix_millis, to_unix_millis},
};

native_enum! {
	pub enum ChaosScheduleStatus {
		Stopped = CHAOS_SCHEDULE_STATUS_STOPPED,
		Active = CHAOS_SCHEDULE_STATUS_ACTIVE,
		Expired = CHAOS_SCHEDULE_STATUS_EXPIRED,
		/// The schedule's start date has not been reached yet
		Pending = CHAOS_SCHEDULE_STATUS_PENDING,
	}
}

/// Bit set of weekdays a schedule job runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaosScheduleActiveDays(pub u8);

impl ChaosScheduleActiveDays {
	pub const SUNDAY: Self = Self(CHAOS_SCHEDULE_DAY_SUNDAY);
	pub const MONDAY: Self = Self(CHAOS_SCHEDULE_DAY_MONDAY);
	pub const TUESDAY: Self = Self(CHAOS_SCHEDULE_DAY_TUESDAY);
	pub const WEDNESDAY: Self = Self(CHAOS_SCHEDULE_DAY_WEDNESDAY);
	pub const THURSDAY: Self = Self(CHAOS_SCHEDULE_DAY_THURSDAY);
	pub const FRIDAY: Self = Self(CHAOS_SCHEDULE_DAY_FRIDAY);
	pub const SATURDAY: Self = Self(CHAOS_SCHEDULE_DAY_SATURDAY);
	pub const WEEKDAYS: Self = Self(
		CHAOS_SCHEDULE_DAY_MONDAY
			| CHAOS_SCHEDULE_DAY_TUESDAY
			| CHAOS_SCHEDULE_DAY_WEDNESDAY
			| CHAOS_SCHEDULE_DAY_THURSDAY
			| CHAOS_SCHEDULE_DAY_FRIDAY,
	);
	pub const WEEKEND: Self = Self(CHAOS_SCHEDULE_DAY_SATURDAY | CHAOS_SCHEDULE_DAY_SUNDAY);
	pub const EVERY_DAY: Self = Self(0x7F);

	pub fn is_empty(self) -> bool {
		self.0 == 0
	}

	pub fn contains(self, days: Self) -> bool {
		self.0 & days.0 == days.0
	}
}

impl BitOr for ChaosScheduleActiveDays {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

/// Wall-clock time in UTC, minute precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChaosTimeOfDay {
	pub hour: u8,
	pub minute: u8,
}

impl ChaosTimeOfDay {
	pub const MIDNIGHT: Self = Self::new(0, 0);
	pub const END_OF_DAY: Self = Self::new(23, 59);

	pub const fn new(hour: u8, minute: u8) -> Self {
		Self {
			hour,
			minute,
		}
	}

	fn validate(&self, argument: &str) -> Result<()> {
		if self.hour > 23 || self.minute > 59 {
			return Err(InteropError::invalid_argument(
				argument,
				format!("{:02}:{:02} is not a time of day", self.hour, self.minute),
			));
		}
		Ok(())
	}

	fn to_native(self) -> ChaosTimeOfDayFFI {
		ChaosTimeOfDayFFI {
			hour: self.hour,
			minute: self.minute,
		}
	}

	fn from_native(native: ChaosTimeOfDayFFI) -> Result<Self> {
		let time = Self::new(native.hour, native.minute);
		time.validate("time_of_day").map_err(|e| InteropError::MalformedResult(e.to_string()))?;
		Ok(time)
	}
}

/// A window during the day; `end` before `start` wraps past midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaosTimeRange {
	pub start: ChaosTimeOfDay,
	pub end: ChaosTimeOfDay,
}

impl ChaosTimeRange {
	pub const WHOLE_DAY: Self = Self::new(ChaosTimeOfDay::MIDNIGHT, ChaosTimeOfDay::END_OF_DAY);

	pub const fn new(start: ChaosTimeOfDay, end: ChaosTimeOfDay) -> Self {
		Self {
			start,
			end,
		}
	}
}

/// Runs the named parameter set on the given days and times
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosScheduleJob {
	pub parameters_name: String,
	pub active_days: ChaosScheduleActiveDays,
	pub time_ranges: Vec<ChaosTimeRange>,
}

impl ChaosScheduleJob {
	pub fn new(parameters_name: impl Into<String>, active_days: ChaosScheduleActiveDays) -> Self {
		Self {
			parameters_name: parameters_name.into(),
			active_days,
			time_ranges: Vec::new(),
		}
	}

	pub fn with_time_range(mut self, range: ChaosTimeRange) -> Self {
		self.time_ranges.push(range);
		self
	}
}

impl ToNative for ChaosScheduleJob {
	type Native = ChaosScheduleJobFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ChaosScheduleJobFFI> {
		let ranges: Vec<ChaosTimeRangeFFI> = self
			.time_ranges
			.iter()
			.map(|range| ChaosTimeRangeFFI {
				start: range.start.to_native(),
				end: range.end.to_native(),
			})
			.collect();
		let time_range_count = ranges.len();
		Ok(ChaosScheduleJobFFI {
			parameters_name: arena.pin_str(&self.parameters_name)?.as_ptr(),
			active_days: self.active_days.0,
			time_range_count,
			time_ranges: arena.pin_slice(ranges).as_ptr(),
		})
	}
}

impl FromNative for ChaosScheduleJob {
	type Native = ChaosScheduleJobFFI;

	unsafe fn from_native(native: &ChaosScheduleJobFFI) -> Result<Self> {
		let time_ranges = unsafe {
			slice_from_native(native.time_ranges, native.time_range_count, "chaos_schedule_job.time_ranges")
		}?
		.iter()
		.map(|range| -> Result<ChaosTimeRange> {
			Ok(ChaosTimeRange::new(ChaosTimeOfDay::from_native(range.start)?, ChaosTimeOfDay::from_native(range.end)?))
		})
		.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			parameters_name: unsafe {
				string_from_native(native.parameters_name, "chaos_schedule_job.parameters_name")
			}?,
			active_days: ChaosScheduleActiveDays(native.active_days),
			time_ranges,
		})
	}
}

/// When and how chaos runs unattended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosSchedule {
	pub start_date: SystemTime,
	pub expiry_date: SystemTime,
	/// Parameter sets referenced by name from [`ChaosScheduleJob::parameters_name`]
	pub parameters: BTreeMap<String, ChaosParameters>,
	pub jobs: Vec<ChaosScheduleJob>,
}

impl ChaosSchedule {
	pub fn new(start_date: SystemTime, expiry_date: SystemTime) -> Self {
		Self {
			start_date,
			expiry_date,
			parameters: BTreeMap::new(),
			jobs: Vec::new(),
		}
	}

	pub fn with_parameters(mut self, name: impl Into<String>, parameters: ChaosParameters) -> Self {
		self.parameters.insert(name.into(), parameters);
		self
	}

	pub fn with_job(mut self, job: ChaosScheduleJob) -> Self {
		self.jobs.push(job);
		self
	}

	pub(crate) fn validate(&self) -> Result<()> {
		if self.expiry_date <= self.start_date {
			return Err(InteropError::invalid_argument("expiry_date", "must be after start_date"));
		}
		for (name, parameters) in &self.parameters {
			if name.is_empty() {
				return Err(InteropError::invalid_argument("parameters", "names must not be empty"));
			}
			parameters.validate()?;
		}
		for job in &self.jobs {
			if !self.parameters.contains_key(&job.parameters_name) {
				return Err(InteropError::invalid_argument(
					"jobs",
					format!("unknown parameters '{}'", job.parameters_name),
				));
			}
			if job.active_days.is_empty() {
				return Err(InteropError::invalid_argument("active_days", "at least one day is required"));
			}
			if job.time_ranges.is_empty() {
				return Err(InteropError::invalid_argument("time_ranges", "at least one range is required"));
			}
			for range in &job.time_ranges {
				range.start.validate("time_ranges")?;
				range.end.validate("time_ranges")?;
			}
		}
		Ok(())
	}
}

impl ToNative for ChaosSchedule {
	type Native = ChaosScheduleFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ChaosScheduleFFI> {
		let mut parameters = Vec::with_capacity(self.parameters.len());
		for (name, set) in &self.parameters {
			parameters.push(ChaosNamedParametersFFI {
				name: arena.pin_str(name)?.as_ptr(),
				parameters: arena.pin(set)?.as_ptr(),
			});
		}
		let jobs = self.jobs.iter().map(|job| job.to_native(arena)).collect::<Result<Vec<_>>>()?;

		let parameters_count = parameters.len();
		let job_count = jobs.len();
		Ok(ChaosScheduleFFI {
			start_date_utc_ms: to_unix_millis(self.start_date, "start_date")?,
			expiry_date_utc_ms: to_unix_millis(self.expiry_date, "expiry_date")?,
			parameters_count,
			parameters: arena.pin_slice(parameters).as_ptr(),
			job_count,
			jobs: arena.pin_slice(jobs).as_ptr(),
		})
	}
}

impl FromNative for ChaosSchedule {
	type Native = ChaosScheduleFFI;

	unsafe fn from_native(native: &ChaosScheduleFFI) -> Result<Self> {
		let mut parameters = BTreeMap::new();
		let named = unsafe { slice_from_native(native.parameters, native.parameters_count, "chaos_schedule.parameters") }?;
		for entry in named {
			let name = unsafe { string_from_native(entry.name, "chaos_schedule.parameters.name") }?;
			let Some(set) = (unsafe { entry.parameters.as_ref() }) else {
				return Err(InteropError::MalformedResult(format!("parameters '{name}' are null")));
			};
			parameters.insert(name, unsafe { ChaosParameters::from_native(set) }?);
		}

		let jobs = unsafe { slice_from_native(native.jobs, native.job_count, "chaos_schedule.jobs") }?
			.iter()
			.map(|job| unsafe { ChaosScheduleJob::from_native(job) })
			.collect::<Result<Vec<_>>>()?;

		Ok(Self {
			start_date: from_unix_millis(native.start_date_utc_ms)?,
			expiry_date: from_unix_millis(native.expiry_date_utc_ms)?,
			parameters,
			jobs,
		})
	}
}

/// A schedule together with the version it was stored under.
///
/// Setting a schedule succeeds only when `version` matches the stored one;
/// the stored version is then incremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosScheduleDescription {
	pub version: u32,
	pub schedule: ChaosSchedule,
}

impl ChaosScheduleDescription {
	pub fn new(version: u32, schedule: ChaosSchedule) -> Self {
		Self {
			version,
			schedule,
		}
	}

	pub(crate) fn validate(&self) -> Result<()> {
		self.schedule.validate()
	}
}

impl ToNative for ChaosScheduleDescription {
	type Native = ChaosScheduleDescriptionFFI;

	fn to_native(&self, arena: &PinArena) -> Result<ChaosScheduleDescriptionFFI> {
		Ok(ChaosScheduleDescriptionFFI {
			version: self.version,
			schedule: arena.pin(&self.schedule)?.as_ptr(),
		})
	}
}

impl FromNative for ChaosScheduleDescription {
	type Native = ChaosScheduleDescriptionFFI;

	unsafe fn from_native(native: &ChaosScheduleDescriptionFFI) -> Result<Self> {
		let Some(schedule) = (unsafe { native.schedule.as_ref() }) else {
			return Err(InteropError::MalformedResult("chaos schedule is null".to_string()));
		};
		Ok(Self {
			version: native.version,
			schedule: unsafe { ChaosSchedule::from_native(schedule) }?,
		})
	}
}
