// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use fabric_abi::constants::{
	E_ABORT, E_FAIL, E_INVALIDARG, E_NOTIMPL, E_POINTER, FABRIC_E_CHAOS_ALREADY_RUNNING, FABRIC_E_KEY_NOT_FOUND, FABRIC_E_NOT_READY,
	FABRIC_E_OBJECT_CLOSED, FABRIC_E_OPERATION_NOT_COMPLETE, FABRIC_E_PARTITION_NOT_FOUND,
	FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS, FABRIC_E_TIMEOUT, succeeded,
};
use fabric_runtime::ApartmentError;

pub type Result<T> = std::result::Result<T, InteropError>;

/// HRESULT-shaped result code reported by the native runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeErrorCode(pub i32);

impl NativeErrorCode {
	pub fn is_success(&self) -> bool {
		succeeded(self.0)
	}

	/// Symbolic name of well-known codes
	pub fn name(&self) -> Option<&'static str> {
		Some(match self.0 {
			E_ABORT => "E_ABORT",
			E_NOTIMPL => "E_NOTIMPL",
			E_POINTER => "E_POINTER",
			E_INVALIDARG => "E_INVALIDARG",
			E_FAIL => "E_FAIL",
			FABRIC_E_TIMEOUT => "FABRIC_E_TIMEOUT",
			FABRIC_E_OPERATION_NOT_COMPLETE => "FABRIC_E_OPERATION_NOT_COMPLETE",
			FABRIC_E_OBJECT_CLOSED => "FABRIC_E_OBJECT_CLOSED",
			FABRIC_E_PARTITION_NOT_FOUND => "FABRIC_E_PARTITION_NOT_FOUND",
			FABRIC_E_NOT_READY => "FABRIC_E_NOT_READY",
			FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS => "FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS",
			FABRIC_E_KEY_NOT_FOUND => "FABRIC_E_KEY_NOT_FOUND",
			FABRIC_E_CHAOS_ALREADY_RUNNING => "FABRIC_E_CHAOS_ALREADY_RUNNING",
			_ => return None,
		})
	}
}

impl Display for NativeErrorCode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "{:#010x} ({})", self.0 as u32, name),
			None => write!(f, "{:#010x}", self.0 as u32),
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum InteropError {
	/// Rejected before any native call was made
	#[error("invalid argument `{argument}`: {reason}")]
	InvalidArgument {
		argument: String,
		reason: String,
	},

	#[error("{operation} timed out")]
	Timeout {
		operation: String,
	},

	#[error("{operation} was cancelled")]
	Cancelled {
		operation: String,
	},

	#[error("{operation} failed with native error {code}")]
	Native {
		operation: String,
		code: NativeErrorCode,
	},

	/// A native result structure did not have the promised shape
	#[error("malformed native result: {0}")]
	MalformedResult(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error(transparent)]
	Apartment(#[from] ApartmentError),
}

impl InteropError {
	pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::InvalidArgument {
			argument: argument.into(),
			reason: reason.into(),
		}
	}

	/// Maps a failed native result code onto the error taxonomy.
	///
	/// Cancellation and timeout keep their own variants; every other code is
	/// passed through unchanged as [`InteropError::Native`].
	pub fn from_hresult(hr: i32, operation: &str) -> Self {
		match hr {
			E_ABORT => Self::Cancelled {
				operation: operation.to_string(),
			},
			FABRIC_E_TIMEOUT => Self::Timeout {
				operation: operation.to_string(),
			},
			code => Self::Native {
				operation: operation.to_string(),
				code: NativeErrorCode(code),
			},
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}

	pub fn is_invalid_argument(&self) -> bool {
		matches!(self, Self::InvalidArgument { .. })
	}

	/// Native result code carried by this error, if it came from the native side
	pub fn native_code(&self) -> Option<NativeErrorCode> {
		match self {
			Self::Native {
				code,
				..
			} => Some(*code),
			Self::Timeout {
				..
			} => Some(NativeErrorCode(FABRIC_E_TIMEOUT)),
			Self::Cancelled {
				..
			} => Some(NativeErrorCode(E_ABORT)),
			_ => None,
		}
	}
}

/// Turns a native result code into `Ok(())` or the matching error.
pub fn check_hresult(hr: i32, operation: &str) -> Result<()> {
	if succeeded(hr) {
		Ok(())
	} else {
		Err(InteropError::from_hresult(hr, operation))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_abort_maps_to_cancelled() {
		let err = InteropError::from_hresult(E_ABORT, "FaultAnalysisService.InvokeDataLossAsync");
		assert!(err.is_cancelled());
		assert_eq!(err.native_code(), Some(NativeErrorCode(E_ABORT)));
	}

	#[test]
	fn test_timeout_is_distinguished() {
		let err = InteropError::from_hresult(FABRIC_E_TIMEOUT, "GetNodeList");
		assert!(err.is_timeout());
		assert_eq!(err.to_string(), "GetNodeList timed out");
	}

	#[test]
	fn test_other_codes_pass_through() {
		let err = InteropError::from_hresult(FABRIC_E_PARTITION_NOT_FOUND, "RestartPartition");
		match err {
			InteropError::Native {
				code,
				..
			} => assert_eq!(code, NativeErrorCode(FABRIC_E_PARTITION_NOT_FOUND)),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[test]
	fn test_check_hresult_accepts_positive_codes() {
		assert!(check_hresult(0, "op").is_ok());
		assert!(check_hresult(1, "op").is_ok());
		assert!(check_hresult(E_FAIL, "op").is_err());
	}

	#[test]
	fn test_display_known_and_unknown_codes() {
		assert_eq!(NativeErrorCode(E_ABORT).to_string(), "0x80004004 (E_ABORT)");
		assert_eq!(NativeErrorCode(0x8000_1234_u32 as i32).to_string(), "0x80001234");
	}
}
