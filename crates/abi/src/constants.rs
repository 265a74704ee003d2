// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! Result codes and well-known values shared with the native runtime.
//!
//! Result codes are HRESULT-shaped `i32` values: zero or positive on success,
//! negative on failure.

/// Operation succeeded
pub const S_OK: i32 = 0;

/// Operation was aborted (cancelled)
pub const E_ABORT: i32 = 0x8000_4004_u32 as i32;

/// The entry point is not implemented
pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;

/// A required pointer argument was null
pub const E_POINTER: i32 = 0x8000_4003_u32 as i32;

/// An argument was invalid
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// Unspecified failure
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// The supplied timeout expired before the operation finished
pub const FABRIC_E_TIMEOUT: i32 = 0x8007_05B4_u32 as i32;

/// End was called on a context that has not completed yet
pub const FABRIC_E_OPERATION_NOT_COMPLETE: i32 = 0x8007_1BC4_u32 as i32;

/// The native client object has been closed
pub const FABRIC_E_OBJECT_CLOSED: i32 = 0x8007_1BFE_u32 as i32;

/// The selected partition does not exist
pub const FABRIC_E_PARTITION_NOT_FOUND: i32 = 0x8007_1BD6_u32 as i32;

/// The named application does not exist
pub const FABRIC_E_APPLICATION_NOT_FOUND: i32 = 0x8007_1BDD_u32 as i32;

/// The service is not ready to serve the request
pub const FABRIC_E_NOT_READY: i32 = 0x8007_1BDC_u32 as i32;

/// A test command with the same operation id already exists
pub const FABRIC_E_TEST_COMMAND_OPERATION_ID_ALREADY_EXISTS: i32 = 0x8007_1C4D_u32 as i32;

/// No entry exists for the given key, such as an unknown operation id
pub const FABRIC_E_KEY_NOT_FOUND: i32 = 0x8007_1BE9_u32 as i32;

/// Chaos was asked to start while it is already running
pub const FABRIC_E_CHAOS_ALREADY_RUNNING: i32 = 0x8007_1C5A_u32 as i32;

/// The named node does not exist
pub const FABRIC_E_NODE_NOT_FOUND: i32 = 0x8007_1BD3_u32 as i32;

/// The node is already up
pub const FABRIC_E_NODE_IS_UP: i32 = 0x8007_1BD4_u32 as i32;

/// The node instance id does not match the running instance
pub const FABRIC_E_INSTANCE_ID_MISMATCH: i32 = 0x8007_1C3F_u32 as i32;

/// Another transition is already running against the node
pub const FABRIC_E_NODE_TRANSITION_IN_PROGRESS: i32 = 0x8007_1C62_u32 as i32;

/// Timeout value meaning "no timeout"
pub const INFINITE_TIMEOUT_MS: u32 = u32::MAX;

/// Helper to check whether a result code reports success
#[inline]
pub const fn succeeded(hr: i32) -> bool {
	hr >= 0
}
