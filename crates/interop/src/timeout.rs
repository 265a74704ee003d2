// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::time::Duration;

use fabric_abi::constants::INFINITE_TIMEOUT_MS;

use crate::error::{InteropError, Result};

/// Converts a timeout into the millisecond value native entry points expect.
///
/// `Duration::MAX` means "no timeout" and maps to [`INFINITE_TIMEOUT_MS`].
/// Finite durations that do not fit below that sentinel are rejected. The
/// native runtime interprets the value; the bridge never enforces it.
pub fn to_milliseconds(timeout: Duration, argument: &str) -> Result<u32> {
	if timeout == Duration::MAX {
		return Ok(INFINITE_TIMEOUT_MS);
	}

	let millis = timeout.as_millis();
	if millis >= INFINITE_TIMEOUT_MS as u128 {
		return Err(InteropError::invalid_argument(
			argument,
			format!("{timeout:?} exceeds the largest finite timeout of {} ms", INFINITE_TIMEOUT_MS - 1),
		));
	}

	Ok(millis as u32)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncates_to_whole_milliseconds() {
		assert_eq!(to_milliseconds(Duration::from_micros(1_999), "timeout").unwrap(), 1);
		assert_eq!(to_milliseconds(Duration::from_secs(60), "timeout").unwrap(), 60_000);
		assert_eq!(to_milliseconds(Duration::ZERO, "timeout").unwrap(), 0);
	}

	#[test]
	fn test_max_duration_is_infinite() {
		assert_eq!(to_milliseconds(Duration::MAX, "timeout").unwrap(), INFINITE_TIMEOUT_MS);
	}

	#[test]
	fn test_too_large_is_rejected() {
		let err = to_milliseconds(Duration::from_millis(u32::MAX as u64), "quorumLossDuration").unwrap_err();
		match err {
			InteropError::InvalidArgument {
				argument,
				..
			} => assert_eq!(argument, "quorumLossDuration"),
			other => panic!("unexpected error: {other}"),
		}
	}
}
