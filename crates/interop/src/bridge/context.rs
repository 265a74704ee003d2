// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::ptr::{self, NonNull};

use fabric_abi::{
	constants::E_NOTIMPL,
	operation::{AsyncOperationContextFFI, AsyncOperationVTableFFI},
};
use tracing::{error, trace};

use crate::error::{NativeErrorCode, Result, check_hresult};

/// Owned reference to a native operation context
///
/// Move-only. The native reference is released when the value is dropped,
/// which happens after `EndX` has run and its output has been copied out.
pub struct OperationContext {
	raw: NonNull<AsyncOperationContextFFI>,
	vtable: AsyncOperationVTableFFI,
}

// SAFETY: native operation contexts are free-threaded; every vtable entry may
// be called from any thread.
unsafe impl Send for OperationContext {}
unsafe impl Sync for OperationContext {}

impl OperationContext {
	/// Calls a native `BeginX` entry point and takes ownership of the context
	/// it produces.
	///
	/// `f` receives the `ctx_out` pointer and returns the native result code.
	/// A failed code is returned as an error without touching `ctx_out`. A
	/// successful call that produces no context is fatal: the callback it
	/// registered can no longer be accounted for.
	pub fn begin(operation: &str, f: impl FnOnce(*mut *mut AsyncOperationContextFFI) -> i32) -> Result<Self> {
		let mut raw: *mut AsyncOperationContextFFI = ptr::null_mut();
		let hr = f(&mut raw);
		check_hresult(hr, operation)?;

		match unsafe { Self::from_raw(raw) } {
			Some(context) => Ok(context),
			None => {
				error!(operation, "begin succeeded without producing a context");
				panic!("{operation}: begin succeeded without producing a context");
			}
		}
	}

	/// Wraps a raw context, taking over the caller's reference.
	///
	/// Returns `None` for a null pointer.
	///
	/// # Safety
	/// `raw` must be null or a live context with a valid vtable whose
	/// reference is not released elsewhere.
	pub unsafe fn from_raw(raw: *mut AsyncOperationContextFFI) -> Option<Self> {
		let raw = NonNull::new(raw)?;
		let vtable = unsafe { *raw.as_ref().vtable };
		Some(Self {
			raw,
			vtable,
		})
	}

	pub fn as_ptr(&self) -> *mut AsyncOperationContextFFI {
		self.raw.as_ptr()
	}

	pub fn is_completed(&self) -> bool {
		(self.vtable.is_completed)(self.raw.as_ptr()) != 0
	}

	pub fn completed_synchronously(&self) -> bool {
		(self.vtable.completed_synchronously)(self.raw.as_ptr()) != 0
	}

	pub fn supports_cancel(&self) -> bool {
		self.vtable.cancel.is_some()
	}

	/// Forwards a cancellation request to the native operation.
	///
	/// Advisory only; the operation still completes through its callback.
	/// Fails with `E_NOTIMPL` when the context has no cancel entry.
	pub fn cancel(&self) -> std::result::Result<(), NativeErrorCode> {
		let Some(cancel) = self.vtable.cancel else {
			return Err(NativeErrorCode(E_NOTIMPL));
		};
		match cancel(self.raw.as_ptr()) {
			hr if hr >= 0 => Ok(()),
			hr => Err(NativeErrorCode(hr)),
		}
	}
}

impl Drop for OperationContext {
	fn drop(&mut self) {
		trace!(context = ?self.raw, "releasing operation context");
		(self.vtable.release)(self.raw.as_ptr());
	}
}

impl std::fmt::Debug for OperationContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OperationContext").field("raw", &self.raw).finish()
	}
}

#[cfg(test)]
mod tests {
	use fabric_abi::constants::{E_FAIL, S_OK};
	use fabric_testing::{Completion, ScriptedOperation};

	use super::*;

	#[test]
	fn test_begin_failure_leaves_no_context() {
		let operation = ScriptedOperation::failing(E_FAIL);
		let err = OperationContext::begin("GetNodeList", |out| operation.begin_raw(out)).unwrap_err();

		assert_eq!(err.native_code(), Some(NativeErrorCode(E_FAIL)));
		assert_eq!(operation.counters().releases(), 0);
	}

	#[test]
	fn test_drop_releases_exactly_once() {
		let operation = ScriptedOperation::new(Completion::Manual);
		let context = OperationContext::begin("GetNodeList", |out| operation.begin_raw(out)).unwrap();

		assert!(!context.is_completed());
		assert!(!context.completed_synchronously());
		drop(context);

		assert_eq!(operation.counters().releases(), 1);
	}

	#[test]
	fn test_inline_completion_is_synchronous() {
		let operation = ScriptedOperation::new(Completion::Inline);
		let context = OperationContext::begin("GetNodeList", |out| operation.begin_raw(out)).unwrap();

		assert!(context.is_completed());
		assert!(context.completed_synchronously());
	}

	#[test]
	fn test_cancel_without_native_support() {
		let operation = ScriptedOperation::new(Completion::Manual).without_cancel();
		let context = OperationContext::begin("GetNodeList", |out| operation.begin_raw(out)).unwrap();

		assert!(!context.supports_cancel());
		assert_eq!(context.cancel(), Err(NativeErrorCode(E_NOTIMPL)));

		operation.complete(S_OK);
	}

	#[test]
	fn test_cancel_is_forwarded() {
		let operation = ScriptedOperation::new(Completion::Manual);
		let context = OperationContext::begin("GetNodeList", |out| operation.begin_raw(out)).unwrap();

		assert!(context.supports_cancel());
		assert_eq!(context.cancel(), Ok(()));
		assert_eq!(operation.counters().cancels(), 1);
	}
}
