// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Completion callback handed to native `BeginX` entry points

use std::{
	ffi::c_void,
	future::poll_fn,
	process,
	sync::{
		Arc,
		atomic::{AtomicU8, AtomicUsize, Ordering},
	},
	task::Poll,
};

use fabric_abi::operation::{AsyncCallbackFFI, AsyncOperationContextFFI};
use futures_util::task::AtomicWaker;
use tracing::{error, trace, warn};

const PENDING: u8 = 0;
const SIGNALLED: u8 = 1;

/// Single-assignment completion flag.
///
/// Written once from the native callback thread, awaited by the task driving
/// the operation.
#[derive(Debug)]
pub(crate) struct CompletionCell {
	state: AtomicU8,
	waker: AtomicWaker,
}

impl CompletionCell {
	fn new() -> Self {
		Self {
			state: AtomicU8::new(PENDING),
			waker: AtomicWaker::new(),
		}
	}

	fn signal(&self) {
		if self.state.swap(SIGNALLED, Ordering::AcqRel) == SIGNALLED {
			error!("completion callback invoked twice");
			process::abort();
		}
		self.waker.wake();
	}

	pub(crate) fn is_signalled(&self) -> bool {
		self.state.load(Ordering::Acquire) == SIGNALLED
	}

	pub(crate) async fn wait(&self) {
		poll_fn(|cx| {
			if self.is_signalled() {
				return Poll::Ready(());
			}
			self.waker.register(cx.waker());
			if self.is_signalled() {
				Poll::Ready(())
			} else {
				Poll::Pending
			}
		})
		.await
	}
}

/// Source of [`AsyncCallbackFFI`] values for one operation.
///
/// Each registration hands one strong reference of the completion cell to
/// the native side, which the callback consumes. When begin fails the native
/// side never invokes the callback, and [`abandon`](Self::abandon) takes the
/// references back.
pub struct CompletionCallback {
	cell: Arc<CompletionCell>,
	registered: AtomicUsize,
}

impl CompletionCallback {
	pub(crate) fn new() -> Self {
		Self {
			cell: Arc::new(CompletionCell::new()),
			registered: AtomicUsize::new(0),
		}
	}

	/// Produces the callback to pass to a native `BeginX` entry point.
	pub fn register(&self) -> AsyncCallbackFFI {
		let state = Arc::into_raw(self.cell.clone()) as *mut c_void;
		self.registered.fetch_add(1, Ordering::Relaxed);
		AsyncCallbackFFI {
			invoke: completion_trampoline,
			state,
		}
	}

	pub fn registrations(&self) -> usize {
		self.registered.load(Ordering::Relaxed)
	}

	pub fn is_completed(&self) -> bool {
		self.cell.is_signalled()
	}

	pub(crate) fn cell(&self) -> Arc<CompletionCell> {
		self.cell.clone()
	}

	/// Reclaims the references of a callback the native side will not invoke.
	pub(crate) fn abandon(&self) {
		let mut leaked = self.registered.swap(0, Ordering::AcqRel);
		if leaked == 0 {
			return;
		}

		if self.cell.is_signalled() {
			// the native side invoked the callback for a failed begin and
			// already consumed one reference
			warn!("completion callback invoked for a failed begin");
			leaked -= 1;
		}

		let raw = Arc::as_ptr(&self.cell);
		for _ in 0..leaked {
			unsafe { Arc::decrement_strong_count(raw) };
		}
		trace!(leaked, "completion callback abandoned");
	}
}

extern "C" fn completion_trampoline(state: *mut c_void, _ctx: *mut AsyncOperationContextFFI) {
	if state.is_null() {
		error!("completion callback invoked without state");
		process::abort();
	}

	let cell = unsafe { Arc::from_raw(state as *const CompletionCell) };
	cell.signal();
}

#[cfg(test)]
mod tests {
	use std::{ptr, thread, time::Duration};

	use super::*;

	#[test]
	fn test_invoke_consumes_the_registered_reference() {
		let callback = CompletionCallback::new();
		let ffi = callback.register();
		assert_eq!(Arc::strong_count(&callback.cell), 2);

		(ffi.invoke)(ffi.state, ptr::null_mut());

		assert!(callback.is_completed());
		assert_eq!(Arc::strong_count(&callback.cell), 1);
	}

	#[test]
	fn test_abandon_reclaims_references() {
		let callback = CompletionCallback::new();
		callback.register();
		callback.register();
		assert_eq!(Arc::strong_count(&callback.cell), 3);

		callback.abandon();

		assert_eq!(Arc::strong_count(&callback.cell), 1);
		assert_eq!(callback.registrations(), 0);
		assert!(!callback.is_completed());
	}

	#[tokio::test]
	async fn test_wait_resumes_after_signal_from_another_thread() {
		let callback = CompletionCallback::new();
		let cell = callback.cell();
		let ffi = callback.register();
		let invoke = ffi.invoke;
		let state = ffi.state as usize;

		thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			invoke(state as *mut c_void, ptr::null_mut());
		});

		cell.wait().await;
		assert!(cell.is_signalled());
	}

	#[tokio::test]
	async fn test_wait_returns_immediately_when_already_signalled() {
		let callback = CompletionCallback::new();
		let ffi = callback.register();
		(ffi.invoke)(ffi.state, ptr::null_mut());

		callback.cell().wait().await;
	}
}
