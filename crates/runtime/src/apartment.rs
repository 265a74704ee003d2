// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Native apartment pool implementation using rayon.

use std::{
	any::Any,
	cell::Cell,
	panic::{AssertUnwindSafe, catch_unwind},
	sync::Arc,
};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tracing::{debug, trace};

use crate::config::ApartmentConfig;

thread_local! {
	static IN_APARTMENT: Cell<bool> = const { Cell::new(false) };
}

/// Returns true when the calling thread is an apartment worker.
pub fn is_apartment_thread() -> bool {
	IN_APARTMENT.with(|flag| flag.get())
}

#[derive(Debug, thiserror::Error)]
pub enum ApartmentError {
	#[error("failed to build apartment pool: {0}")]
	Build(String),

	#[error("apartment is shut down")]
	Closed,

	#[error("apartment task panicked: {0}")]
	Panicked(String),
}

struct Inner {
	pool: ThreadPool,
	permits: Arc<Semaphore>,
}

/// A pool of threads that satisfy the native runtime's threading model.
///
/// Wraps a dedicated rayon [`ThreadPool`] whose workers are marked as
/// apartment threads, with a [`Semaphore`] limiting the number of closures
/// queued or running at once.
#[derive(Clone)]
pub struct Apartment {
	inner: Arc<Inner>,
}

impl Apartment {
	pub fn new(config: &ApartmentConfig) -> Result<Self, ApartmentError> {
		let prefix = config.thread_name_prefix.clone();
		let pool = ThreadPoolBuilder::new()
			.num_threads(config.threads.max(1))
			.thread_name(move |i| format!("{prefix}-{i}"))
			.start_handler(|_| IN_APARTMENT.with(|flag| flag.set(true)))
			.build()
			.map_err(|e| ApartmentError::Build(e.to_string()))?;

		debug!(threads = pool.current_num_threads(), max_in_flight = config.max_in_flight, "apartment started");

		Ok(Self {
			inner: Arc::new(Inner {
				pool,
				permits: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
			}),
		})
	}

	/// Runs `f` on an apartment thread and resolves with its return value.
	///
	/// Waiting for a free slot and for the closure itself suspends the caller
	/// instead of blocking it. A panic inside `f` is caught on the worker and
	/// reported as [`ApartmentError::Panicked`].
	pub async fn run<R, F>(&self, f: F) -> Result<R, ApartmentError>
	where
		R: Send + 'static,
		F: FnOnce() -> R + Send + 'static,
	{
		let permit = self.inner.permits.clone().acquire_owned().await.map_err(|_| ApartmentError::Closed)?;
		self.dispatch(Some(permit), f).await
	}

	/// Runs `f` on an apartment thread without going through admission.
	///
	/// For work that belongs to something [`run`](Self::run) already
	/// admitted, such as finishing a native operation that has begun. It is
	/// accepted after [`shutdown`](Self::shutdown).
	pub async fn run_admitted<R, F>(&self, f: F) -> Result<R, ApartmentError>
	where
		R: Send + 'static,
		F: FnOnce() -> R + Send + 'static,
	{
		self.dispatch(None, f).await
	}

	async fn dispatch<R, F>(&self, permit: Option<OwnedSemaphorePermit>, f: F) -> Result<R, ApartmentError>
	where
		R: Send + 'static,
		F: FnOnce() -> R + Send + 'static,
	{
		let (tx, rx) = oneshot::channel();

		self.inner.pool.spawn(move || {
			let _permit = permit; // released when the closure returns
			let result = catch_unwind(AssertUnwindSafe(f));
			if tx.send(result).is_err() {
				trace!("apartment result dropped, caller went away");
			}
		});

		match rx.await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(panic)) => Err(ApartmentError::Panicked(panic_message(panic))),
			Err(_) => Err(ApartmentError::Closed),
		}
	}

	/// Stops admitting new closures. Closures already admitted still run, and
	/// [`run_admitted`](Self::run_admitted) keeps working.
	pub fn shutdown(&self) {
		self.inner.permits.close();
		debug!("apartment shut down");
	}

	pub fn is_shutdown(&self) -> bool {
		self.inner.permits.is_closed()
	}

	pub fn threads(&self) -> usize {
		self.inner.pool.current_num_threads()
	}
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
	if let Some(s) = panic.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = panic.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}
