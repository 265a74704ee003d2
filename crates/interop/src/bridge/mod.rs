// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Turns native begin/end operations into cancellable futures
//!
//! [`AsyncBridge::invoke`] drives one operation through
//! [`OperationState`]:
//!
//! 1. begin runs on the apartment with a fresh [`CompletionCallback`]
//! 2. the driver waits for the callback, unless the context reports that it
//!    completed synchronously
//! 3. end runs on the apartment exactly once, consuming the context
//!
//! Cancellation is forwarded to the native context and never resolves the
//! future early: the result is always whatever end reports.

mod completion;
mod context;
mod state;

use std::{panic::resume_unwind, sync::Arc};

pub use completion::CompletionCallback;
use completion::CompletionCell;
pub use context::OperationContext;
use fabric_runtime::{Apartment, ApartmentConfig, ApartmentError};
pub use state::{HandleSlot, OperationState, OperationTracker};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::error::{InteropError, Result};

/// Bridges native asynchronous operations onto the tokio runtime.
///
/// Cheap to clone; clones share the apartment.
#[derive(Clone)]
pub struct AsyncBridge {
	apartment: Apartment,
}

impl AsyncBridge {
	pub fn new(config: &ApartmentConfig) -> Result<Self> {
		Ok(Self::with_apartment(Apartment::new(config)?))
	}

	pub fn with_apartment(apartment: Apartment) -> Self {
		Self {
			apartment,
		}
	}

	pub fn apartment(&self) -> &Apartment {
		&self.apartment
	}

	/// Runs one native operation to completion.
	///
	/// `begin` receives the operation's [`CompletionCallback`] and must hand
	/// [`CompletionCallback::register`] to the native `BeginX` entry point.
	/// `end` receives the completed context and must call `EndX` and copy
	/// its output before returning.
	///
	/// The operation is driven by a spawned task. Dropping the returned
	/// future does not abandon it: end still runs exactly once.
	pub async fn invoke<T, B, E>(&self, begin: B, end: E, cancel: &CancellationToken, operation: &str) -> Result<T>
	where
		T: Send + 'static,
		B: FnOnce(&CompletionCallback) -> Result<OperationContext> + Send + 'static,
		E: FnOnce(OperationContext) -> Result<T> + Send + 'static,
	{
		let driver = self.clone().drive(begin, end, cancel.clone(), operation.to_string());

		match tokio::spawn(driver).await {
			Ok(result) => result,
			Err(e) if e.is_panic() => resume_unwind(e.into_panic()),
			Err(_) => Err(InteropError::Apartment(ApartmentError::Closed)),
		}
	}

	#[instrument(name = "interop::invoke", level = "debug", skip_all, fields(operation = %operation))]
	async fn drive<T, B, E>(self, begin: B, end: E, cancel: CancellationToken, operation: String) -> Result<T>
	where
		T: Send + 'static,
		B: FnOnce(&CompletionCallback) -> Result<OperationContext> + Send + 'static,
		E: FnOnce(OperationContext) -> Result<T> + Send + 'static,
	{
		let mut tracker = OperationTracker::new(operation.as_str());
		let callback = CompletionCallback::new();
		let cell = callback.cell();

		tracker.advance(OperationState::Started);

		// a panic inside begin leaves the callback references with the native
		// side; they are leaked rather than reclaimed
		let begun = self
			.apartment
			.run(move || {
				let begun = begin(&callback).map(|context| {
					let synchronous = context.completed_synchronously();
					(context, synchronous)
				});
				(callback, begun)
			})
			.await;
		let (callback, begun) = match begun {
			Ok(begun) => begun,
			Err(ApartmentError::Panicked(message)) => {
				error!(panic = %message, "begin panicked");
				panic!("{operation}: begin panicked: {message}");
			}
			Err(e) => return Err(e.into()),
		};

		let (context, synchronous) = match begun {
			Ok(begun) => begun,
			Err(e) => {
				callback.abandon();
				debug!(error = %e, "begin failed");
				return Err(e);
			}
		};

		if callback.registrations() == 0 && !synchronous {
			error!("begin registered no completion callback");
			panic!("{operation}: begin registered no completion callback");
		}

		let mut slot = HandleSlot::default();
		if synchronous {
			tracker.advance(OperationState::CompletedSynchronously);
			slot.complete(context);
		} else {
			tracker.advance(OperationState::AwaitingCallback);
			let context = self.await_completion(&cell, context, &cancel, &operation).await;
			slot.complete(context);
		}
		tracker.advance(OperationState::Completed);

		let context = slot.take();
		let result = self.apartment.run_admitted(move || end(context)).await;
		tracker.advance(OperationState::Finalized);

		match result {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(e)) => {
				debug!(error = %e, "end failed");
				Err(e)
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn await_completion(
		&self,
		cell: &CompletionCell,
		context: OperationContext,
		cancel: &CancellationToken,
		operation: &str,
	) -> OperationContext {
		let context = Arc::new(context);
		let mut cancel_requested = false;

		loop {
			tokio::select! {
				biased;
				_ = cell.wait() => break,
				_ = cancel.cancelled(), if !cancel_requested => {
					cancel_requested = true;
					self.request_cancel(&context, operation).await;
				}
			}
		}

		match Arc::into_inner(context) {
			Some(context) => context,
			None => {
				error!(operation, "operation context still shared after completion");
				panic!("{operation}: operation context still shared after completion");
			}
		}
	}

	async fn request_cancel(&self, context: &Arc<OperationContext>, operation: &str) {
		if !context.supports_cancel() {
			warn!(operation, "native operation does not support cancellation, waiting for completion");
			return;
		}

		let context = context.clone();
		match self.apartment.run_admitted(move || context.cancel()).await {
			Ok(Ok(())) => debug!(operation, "cancellation requested"),
			Ok(Err(code)) => warn!(operation, %code, "native cancel failed, waiting for completion"),
			Err(e) => warn!(operation, error = %e, "could not dispatch cancel, waiting for completion"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use fabric_abi::constants::{E_ABORT, E_FAIL, FABRIC_E_TIMEOUT};
	use fabric_runtime::is_apartment_thread;
	use fabric_testing::{Completion, ScriptedOperation};

	use super::*;
	use crate::error::check_hresult;

	fn bridge() -> AsyncBridge {
		AsyncBridge::new(&ApartmentConfig::default().with_threads(2).with_thread_name_prefix("bridge-test")).unwrap()
	}

	async fn run(bridge: &AsyncBridge, operation: &ScriptedOperation, cancel: &CancellationToken) -> Result<u32> {
		let begin_op = operation.clone();
		let end_op = operation.clone();
		bridge.invoke(
			move |callback| {
				OperationContext::begin("Test", |out| begin_op.begin(callback.register(), out))
			},
			move |context| {
				check_hresult(end_op.end(context.as_ptr()), "Test")?;
				Ok(42)
			},
			cancel,
			"Test",
		)
		.await
	}

	#[tokio::test]
	async fn test_synchronous_completion() {
		let bridge = bridge();
		let operation = ScriptedOperation::new(Completion::Inline);

		let value = run(&bridge, &operation, &CancellationToken::new()).await.unwrap();

		assert_eq!(value, 42);
		let counters = operation.counters();
		assert_eq!(counters.callbacks(), 1);
		assert_eq!(counters.ends(), 1);
		assert_eq!(counters.releases(), 1);
	}

	#[tokio::test]
	async fn test_deferred_completion() {
		let bridge = bridge();
		let operation = ScriptedOperation::new(Completion::Deferred(Duration::from_millis(20)));

		assert_eq!(run(&bridge, &operation, &CancellationToken::new()).await.unwrap(), 42);
		assert_eq!(operation.counters().ends(), 1);
	}

	#[tokio::test]
	async fn test_begin_failure_skips_end() {
		let bridge = bridge();
		let operation = ScriptedOperation::failing(E_FAIL);

		let err = run(&bridge, &operation, &CancellationToken::new()).await.unwrap_err();

		assert!(matches!(err, InteropError::Native { .. }));
		let counters = operation.counters();
		assert_eq!(counters.callbacks(), 0);
		assert_eq!(counters.ends(), 0);
	}

	#[tokio::test]
	async fn test_native_timeout() {
		let bridge = bridge();
		let operation = ScriptedOperation::new(Completion::Deferred(Duration::from_millis(5))).with_result(FABRIC_E_TIMEOUT);

		let err = run(&bridge, &operation, &CancellationToken::new()).await.unwrap_err();
		assert!(err.is_timeout());
	}

	#[tokio::test]
	async fn test_cancel_waits_for_native_completion() {
		let bridge = bridge();
		let operation = ScriptedOperation::new(Completion::Manual);
		let cancel = CancellationToken::new();
		cancel.cancel();

		let err = run(&bridge, &operation, &cancel).await.unwrap_err();

		assert!(err.is_cancelled());
		assert_eq!(operation.counters().cancels(), 1);
		assert_eq!(operation.result(), Some(E_ABORT));
	}

	#[tokio::test]
	async fn test_begin_and_end_run_on_apartment() {
		let bridge = bridge();
		let (tx, rx) = std::sync::mpsc::channel();
		let tx_end = tx.clone();

		let value = bridge
			.invoke(
				move |callback| {
					tx.send(is_apartment_thread()).unwrap();
					let operation = ScriptedOperation::new(Completion::Inline);
					OperationContext::begin("Test", |out| operation.begin(callback.register(), out))
				},
				move |_context| {
					tx_end.send(is_apartment_thread()).unwrap();
					Ok(())
				},
				&CancellationToken::new(),
				"Test",
			)
			.await;

		assert!(value.is_ok());
		assert!(rx.recv().unwrap());
		assert!(rx.recv().unwrap());
	}
}
