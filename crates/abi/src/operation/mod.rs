// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! The native asynchronous begin/end convention
//!
//! Every asynchronous native entry point comes as a pair:
//!
//! ```text
//! BeginX(instance, args..., timeout_ms, callback, ctx_out) -> HRESULT
//! EndX(instance, ctx, [out]) -> HRESULT
//! ```
//!
//! `BeginX` schedules the work and writes an [`AsyncOperationContextFFI`]
//! into `ctx_out`. The runtime invokes `callback` exactly once for every
//! successful `BeginX`, possibly before `BeginX` returns and on any thread.
//! When `BeginX` fails, `callback` is never invoked and `ctx_out` is left
//! untouched.
//!
//! `EndX` must be called exactly once per context after it has completed. A
//! context that completed while `BeginX` was still running reports
//! `completed_synchronously`; the caller may then call `EndX` right away.

use core::ffi::c_void;

/// Opaque handle to one in-flight native operation.
///
/// COM-style layout: implementations embed this header as their first field.
#[repr(C)]
pub struct AsyncOperationContextFFI {
	pub vtable: *const AsyncOperationVTableFFI,
}

/// Function table of an operation context
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AsyncOperationVTableFFI {
	/// Returns 1 once the operation has completed, 0 otherwise
	pub is_completed: extern "C" fn(ctx: *const AsyncOperationContextFFI) -> u8,

	/// Returns 1 if the operation completed before `BeginX` returned
	pub completed_synchronously: extern "C" fn(ctx: *const AsyncOperationContextFFI) -> u8,

	/// Requests cancellation of the operation
	///
	/// Optional. Cancellation is advisory: the operation still completes
	/// through the regular callback, typically with `E_ABORT`.
	///
	/// # Returns
	/// - 0 if the request was accepted, negative error code otherwise
	pub cancel: Option<extern "C" fn(ctx: *mut AsyncOperationContextFFI) -> i32>,

	/// Releases the caller's reference to the context
	///
	/// # Safety
	/// - Must be called exactly once per context handed out by `BeginX`
	/// - The context must not be used afterwards
	pub release: extern "C" fn(ctx: *mut AsyncOperationContextFFI),
}

/// Completion callback registered with `BeginX`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct AsyncCallbackFFI {
	/// Invoked once with `state` and the completed context
	pub invoke: extern "C" fn(state: *mut c_void, ctx: *mut AsyncOperationContextFFI),

	/// Caller-owned state handed back to `invoke`
	pub state: *mut c_void,
}

/// Begin entry point without a request
pub type BeginFn = extern "C" fn(
	instance: *mut c_void,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32;

/// Begin entry point taking a request description
pub type BeginWithDescriptionFn<D> = extern "C" fn(
	instance: *mut c_void,
	description: *const D,
	timeout_ms: u32,
	callback: AsyncCallbackFFI,
	ctx_out: *mut *mut AsyncOperationContextFFI,
) -> i32;

/// End entry point without output
pub type EndFn = extern "C" fn(instance: *mut c_void, ctx: *mut AsyncOperationContextFFI) -> i32;

/// End entry point filling an output structure
pub type EndWithOutputFn<O> =
	extern "C" fn(instance: *mut c_void, ctx: *mut AsyncOperationContextFFI, output: *mut O) -> i32;
