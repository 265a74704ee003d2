// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! In-process native operation contexts with scripted completion

use std::{
	any::Any,
	ffi::{CString, c_char, c_void},
	ptr,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use fabric_abi::{
	constants::{E_ABORT, E_FAIL, E_INVALIDARG, FABRIC_E_OPERATION_NOT_COMPLETE, S_OK},
	operation::{AsyncCallbackFFI, AsyncOperationContextFFI, AsyncOperationVTableFFI},
};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// When a scripted operation completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
	/// During begin, before it returns; reported as synchronous
	Inline,
	/// On a separate native thread after the delay
	Deferred(Duration),
	/// When the test calls [`ScriptedOperation::complete`]
	Manual,
}

#[derive(Debug, Clone, Copy)]
struct Script {
	completion: Completion,
	result: i32,
	reject: Option<i32>,
	cancellable: bool,
	cancel_completes: bool,
}

/// Counters observed on one or more operations
#[derive(Debug, Clone, Default)]
pub struct CallbackCounters {
	inner: Arc<CounterCells>,
}

#[derive(Debug, Default)]
struct CounterCells {
	begins: AtomicUsize,
	callbacks: AtomicUsize,
	cancels: AtomicUsize,
	ends: AtomicUsize,
	releases: AtomicUsize,
}

impl CallbackCounters {
	pub fn begins(&self) -> usize {
		self.inner.begins.load(Ordering::SeqCst)
	}

	pub fn callbacks(&self) -> usize {
		self.inner.callbacks.load(Ordering::SeqCst)
	}

	pub fn cancels(&self) -> usize {
		self.inner.cancels.load(Ordering::SeqCst)
	}

	pub fn ends(&self) -> usize {
		self.inner.ends.load(Ordering::SeqCst)
	}

	pub fn releases(&self) -> usize {
		self.inner.releases.load(Ordering::SeqCst)
	}
}

struct PendingCallback {
	invoke: extern "C" fn(state: *mut c_void, ctx: *mut AsyncOperationContextFFI),
	state: usize,
}

/// Memory owned by the native side of an operation.
///
/// Output structures filled by end point into it; it lives as long as the
/// operation context.
struct Retained {
	_value: Box<dyn Any>,
}

// SAFETY: retained values are only read through raw pointers handed to the
// caller, never through this wrapper.
unsafe impl Send for Retained {}

struct Shared {
	script: Mutex<Script>,
	counters: CallbackCounters,
	begun: AtomicBool,
	completed: AtomicBool,
	synchronous: AtomicBool,
	result: AtomicI32,
	callback: Mutex<Option<PendingCallback>>,
	// the native side's own reference, dropped once the callback ran
	native: Mutex<Option<Arc<NativeContext>>>,
	context: AtomicUsize,
	output: Mutex<Option<Box<dyn Any + Send>>>,
	retained: Mutex<Vec<Retained>>,
	begin_thread: Mutex<Option<String>>,
	end_thread: Mutex<Option<String>>,
}

#[repr(C)]
struct NativeContext {
	header: AsyncOperationContextFFI,
	shared: Arc<Shared>,
}

// SAFETY: the header only points at immutable static vtables.
unsafe impl Send for NativeContext {}
unsafe impl Sync for NativeContext {}

static VTABLE: AsyncOperationVTableFFI = AsyncOperationVTableFFI {
	is_completed: native_is_completed,
	completed_synchronously: native_completed_synchronously,
	cancel: Some(native_cancel),
	release: native_release,
};

static VTABLE_WITHOUT_CANCEL: AsyncOperationVTableFFI = AsyncOperationVTableFFI {
	is_completed: native_is_completed,
	completed_synchronously: native_completed_synchronously,
	cancel: None,
	release: native_release,
};

/// A native operation whose behaviour is scripted by the test.
///
/// Clones share the same operation. Each operation can be begun once.
#[derive(Clone)]
pub struct ScriptedOperation {
	shared: Arc<Shared>,
}

impl ScriptedOperation {
	pub fn new(completion: Completion) -> Self {
		Self::with_counters(completion, CallbackCounters::default())
	}

	/// Shares `counters` with other operations, for counting across a batch.
	pub fn with_counters(completion: Completion, counters: CallbackCounters) -> Self {
		Self {
			shared: Arc::new(Shared {
				script: Mutex::new(Script {
					completion,
					result: S_OK,
					reject: None,
					cancellable: true,
					cancel_completes: true,
				}),
				counters,
				begun: AtomicBool::new(false),
				completed: AtomicBool::new(false),
				synchronous: AtomicBool::new(false),
				result: AtomicI32::new(S_OK),
				callback: Mutex::new(None),
				native: Mutex::new(None),
				context: AtomicUsize::new(0),
				output: Mutex::new(None),
				retained: Mutex::new(Vec::new()),
				begin_thread: Mutex::new(None),
				end_thread: Mutex::new(None),
			}),
		}
	}

	/// An operation whose begin fails with `hr`
	pub fn failing(hr: i32) -> Self {
		let operation = Self::new(Completion::Manual);
		operation.shared.script.lock().reject = Some(hr);
		operation
	}

	/// Result code end reports after a scripted completion
	pub fn with_result(self, hr: i32) -> Self {
		self.shared.script.lock().result = hr;
		self
	}

	/// Leaves the cancel entry out of the context's vtable
	pub fn without_cancel(self) -> Self {
		self.shared.script.lock().cancellable = false;
		self
	}

	/// Accepts cancel requests without completing the operation
	pub fn ignoring_cancel(self) -> Self {
		self.shared.script.lock().cancel_completes = false;
		self
	}

	/// Output made available to end, see [`take_output`](Self::take_output)
	pub fn set_output(&self, output: Box<dyn Any + Send>) {
		*self.shared.output.lock() = Some(output);
	}

	pub fn take_output<T: Any + Send>(&self) -> Option<T> {
		let output = self.shared.output.lock().take()?;
		output.downcast::<T>().ok().map(|b| *b)
	}

	pub fn counters(&self) -> CallbackCounters {
		self.shared.counters.clone()
	}

	pub fn is_completed(&self) -> bool {
		self.shared.completed.load(Ordering::Acquire)
	}

	/// Result code the operation completed with
	pub fn result(&self) -> Option<i32> {
		self.is_completed().then(|| self.shared.result.load(Ordering::Acquire))
	}

	/// Name of the thread begin was called on
	pub fn begin_thread(&self) -> Option<String> {
		self.shared.begin_thread.lock().clone()
	}

	/// Name of the thread end was called on
	pub fn end_thread(&self) -> Option<String> {
		self.shared.end_thread.lock().clone()
	}

	/// Recovers the operation behind a context it produced.
	///
	/// # Safety
	/// `ctx` must be a live context produced by [`begin`](Self::begin).
	pub unsafe fn from_context(ctx: *const AsyncOperationContextFFI) -> Self {
		Self {
			shared: unsafe { shared_of(ctx) }.clone(),
		}
	}

	/// Native `BeginX` behaviour.
	///
	/// Returns the scripted failure without touching `ctx_out` and without
	/// ever invoking `callback`, or writes a new context to `ctx_out` and
	/// schedules the completion.
	pub fn begin(&self, callback: AsyncCallbackFFI, ctx_out: *mut *mut AsyncOperationContextFFI) -> i32 {
		let shared = &self.shared;
		shared.counters.inner.begins.fetch_add(1, Ordering::SeqCst);
		*shared.begin_thread.lock() = thread::current().name().map(str::to_string);

		let script = *shared.script.lock();
		if let Some(hr) = script.reject {
			debug!(hr, "scripted begin failure");
			return hr;
		}
		if ctx_out.is_null() {
			return E_INVALIDARG;
		}
		if shared.begun.swap(true, Ordering::SeqCst) {
			panic!("scripted operation begun twice");
		}

		let vtable = if script.cancellable {
			&VTABLE as *const AsyncOperationVTableFFI
		} else {
			&VTABLE_WITHOUT_CANCEL as *const AsyncOperationVTableFFI
		};
		let native = Arc::new(NativeContext {
			header: AsyncOperationContextFFI {
				vtable,
			},
			shared: shared.clone(),
		});

		*shared.callback.lock() = Some(PendingCallback {
			invoke: callback.invoke,
			state: callback.state as usize,
		});
		*shared.native.lock() = Some(native.clone());

		let raw = Arc::into_raw(native) as *mut AsyncOperationContextFFI;
		shared.context.store(raw as usize, Ordering::SeqCst);
		unsafe { *ctx_out = raw };

		match script.completion {
			Completion::Inline => {
				shared.synchronous.store(true, Ordering::SeqCst);
				self.complete(script.result);
			}
			Completion::Deferred(delay) => {
				let operation = self.clone();
				let spawned = thread::Builder::new().name("native-completion".to_string()).spawn(move || {
					thread::sleep(delay);
					operation.complete(script.result);
				});
				if spawned.is_err() {
					self.complete(E_FAIL);
				}
			}
			Completion::Manual => {}
		}

		S_OK
	}

	/// Begin with a completion callback that does nothing
	pub fn begin_raw(&self, ctx_out: *mut *mut AsyncOperationContextFFI) -> i32 {
		self.begin(
			AsyncCallbackFFI {
				invoke: ignore_completion,
				state: ptr::null_mut(),
			},
			ctx_out,
		)
	}

	/// Completes the operation with `hr` and invokes its callback on the
	/// calling thread.
	///
	/// Returns false when the operation was not begun or already completed.
	pub fn complete(&self, hr: i32) -> bool {
		let shared = &self.shared;
		let Some(native) = shared.native.lock().take() else {
			return false;
		};
		let pending = shared.callback.lock().take();

		shared.result.store(hr, Ordering::SeqCst);
		shared.completed.store(true, Ordering::SeqCst);
		trace!(hr, "scripted operation completed");

		if let Some(pending) = pending {
			shared.counters.inner.callbacks.fetch_add(1, Ordering::SeqCst);
			(pending.invoke)(pending.state as *mut c_void, Arc::as_ptr(&native) as *mut AsyncOperationContextFFI);
		}
		true
	}

	/// Native `EndX` behaviour
	pub fn end(&self, ctx: *mut AsyncOperationContextFFI) -> i32 {
		let shared = &self.shared;
		shared.counters.inner.ends.fetch_add(1, Ordering::SeqCst);
		*shared.end_thread.lock() = thread::current().name().map(str::to_string);

		if ctx as usize != shared.context.load(Ordering::SeqCst) {
			return E_INVALIDARG;
		}
		if !shared.completed.load(Ordering::Acquire) {
			return FABRIC_E_OPERATION_NOT_COMPLETE;
		}
		shared.result.load(Ordering::Acquire)
	}

	/// Keeps `value` alive for as long as the context and returns its address.
	pub fn retain<T: 'static>(&self, value: T) -> *const T {
		let boxed = Box::new(value);
		let ptr: *const T = &*boxed;
		self.shared.retained.lock().push(Retained {
			_value: boxed,
		});
		ptr
	}

	/// Retains a NUL-terminated copy of `text`
	pub fn retain_text(&self, text: &str) -> *const c_char {
		match CString::new(text) {
			Ok(text) => {
				let ptr = text.as_ptr();
				self.shared.retained.lock().push(Retained {
					_value: Box::new(text),
				});
				ptr
			}
			Err(_) => ptr::null(),
		}
	}

	pub fn retain_opt_text(&self, text: Option<&str>) -> *const c_char {
		text.map_or(ptr::null(), |text| self.retain_text(text))
	}

	/// Retains an array, returning null for an empty one
	pub fn retain_slice<T: 'static>(&self, items: Vec<T>) -> *const T {
		if items.is_empty() {
			return ptr::null();
		}
		let boxed = items.into_boxed_slice();
		let ptr = boxed.as_ptr();
		self.shared.retained.lock().push(Retained {
			_value: Box::new(boxed),
		});
		ptr
	}
}

extern "C" fn ignore_completion(_state: *mut c_void, _ctx: *mut AsyncOperationContextFFI) {}

unsafe fn shared_of<'a>(ctx: *const AsyncOperationContextFFI) -> &'a Arc<Shared> {
	unsafe { &(*(ctx as *const NativeContext)).shared }
}

extern "C" fn native_is_completed(ctx: *const AsyncOperationContextFFI) -> u8 {
	u8::from(unsafe { shared_of(ctx) }.completed.load(Ordering::Acquire))
}

extern "C" fn native_completed_synchronously(ctx: *const AsyncOperationContextFFI) -> u8 {
	u8::from(unsafe { shared_of(ctx) }.synchronous.load(Ordering::Acquire))
}

extern "C" fn native_cancel(ctx: *mut AsyncOperationContextFFI) -> i32 {
	let operation = unsafe { ScriptedOperation::from_context(ctx) };
	operation.shared.counters.inner.cancels.fetch_add(1, Ordering::SeqCst);

	let cancel_completes = operation.shared.script.lock().cancel_completes;
	if cancel_completes && !operation.is_completed() {
		// cancellation is acknowledged from a native thread, like a real runtime
		let spawned = thread::Builder::new().name("native-cancel".to_string()).spawn(move || {
			operation.complete(E_ABORT);
		});
		if spawned.is_err() {
			return E_FAIL;
		}
	}
	S_OK
}

extern "C" fn native_release(ctx: *mut AsyncOperationContextFFI) {
	let native = unsafe { Arc::from_raw(ctx as *const NativeContext) };
	native.shared.counters.inner.releases.fetch_add(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_failing_begin_never_writes_context() {
		let operation = ScriptedOperation::failing(E_INVALIDARG);
		let mut ctx: *mut AsyncOperationContextFFI = ptr::null_mut();

		assert_eq!(operation.begin_raw(&mut ctx), E_INVALIDARG);
		assert!(ctx.is_null());
		assert_eq!(operation.counters().callbacks(), 0);
	}

	#[test]
	fn test_end_before_completion_is_rejected() {
		let operation = ScriptedOperation::new(Completion::Manual);
		let mut ctx: *mut AsyncOperationContextFFI = ptr::null_mut();
		assert_eq!(operation.begin_raw(&mut ctx), S_OK);

		assert_eq!(operation.end(ctx), FABRIC_E_OPERATION_NOT_COMPLETE);
		assert!(operation.complete(S_OK));
		assert!(!operation.complete(S_OK));
		assert_eq!(operation.end(ctx), S_OK);

		native_release(ctx);
		assert_eq!(operation.counters().releases(), 1);
	}

	#[test]
	fn test_inline_completion_invokes_callback_once() {
		let operation = ScriptedOperation::new(Completion::Inline).with_result(E_FAIL);
		let mut ctx: *mut AsyncOperationContextFFI = ptr::null_mut();
		operation.begin_raw(&mut ctx);

		assert_eq!(operation.counters().callbacks(), 1);
		assert_eq!(native_completed_synchronously(ctx), 1);
		assert_eq!(operation.result(), Some(E_FAIL));

		native_release(ctx);
	}
}
