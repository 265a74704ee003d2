// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{ffi::c_void, sync::Arc, time::Duration};

use fabric_abi::operation::{AsyncOperationContextFFI, BeginFn, BeginWithDescriptionFn, EndFn, EndWithOutputFn};
use fabric_interop::{
	AsyncBridge, CancellationToken, ClientConfig, FromNative, OperationContext, Result, ToNative, check_hresult,
	to_milliseconds, with_arena,
};

use crate::native::{NativeClient, NativeVTable};

/// Everything one client needs to issue native calls
pub(crate) struct Channel<V: NativeVTable> {
	bridge: AsyncBridge,
	config: Arc<ClientConfig>,
	native: Arc<NativeClient<V>>,
}

impl<V: NativeVTable> Clone for Channel<V> {
	fn clone(&self) -> Self {
		Self {
			bridge: self.bridge.clone(),
			config: self.config.clone(),
			native: self.native.clone(),
		}
	}
}

impl<V: NativeVTable> Channel<V> {
	pub(crate) fn new(bridge: AsyncBridge, config: Arc<ClientConfig>, native: NativeClient<V>) -> Self {
		Self {
			bridge,
			config,
			native: Arc::new(native),
		}
	}

	pub(crate) fn config(&self) -> &ClientConfig {
		&self.config
	}

	pub(crate) fn vtable(&self) -> &V {
		self.native.vtable()
	}

	/// Pins `request`, hands it to `begin` and finishes with `end`.
	///
	/// The arena is closed as soon as `begin` returns; `end` runs once the
	/// operation has completed and owns copying the output.
	pub(crate) async fn invoke<D, T, E>(
		&self,
		operation: &'static str,
		request: D,
		timeout: Duration,
		cancel: &CancellationToken,
		begin: BeginWithDescriptionFn<D::Native>,
		end: E,
	) -> Result<T>
	where
		D: ToNative + Send + 'static,
		T: Send + 'static,
		E: FnOnce(*mut c_void, *mut AsyncOperationContextFFI) -> Result<T> + Send + 'static,
	{
		let timeout_ms = to_milliseconds(timeout, "timeout")?;
		let begin_client = self.native.clone();
		let end_client = self.native.clone();

		self.bridge
			.invoke(
				move |callback| {
					with_arena(|arena| {
						let description = arena.pin(&request)?;
						OperationContext::begin(operation, |ctx_out| {
							begin(
								begin_client.instance(),
								description.as_ptr(),
								timeout_ms,
								callback.register(),
								ctx_out,
							)
						})
					})
				},
				move |context| end(end_client.instance(), context.as_ptr()),
				cancel,
				operation,
			)
			.await
	}

	/// Like [`Channel::invoke`] for entry points that take no request.
	pub(crate) async fn invoke_bare<T, E>(
		&self,
		operation: &'static str,
		timeout: Duration,
		cancel: &CancellationToken,
		begin: BeginFn,
		end: E,
	) -> Result<T>
	where
		T: Send + 'static,
		E: FnOnce(*mut c_void, *mut AsyncOperationContextFFI) -> Result<T> + Send + 'static,
	{
		let timeout_ms = to_milliseconds(timeout, "timeout")?;
		let begin_client = self.native.clone();
		let end_client = self.native.clone();

		self.bridge
			.invoke(
				move |callback| {
					OperationContext::begin(operation, |ctx_out| {
						begin(begin_client.instance(), timeout_ms, callback.register(), ctx_out)
					})
				},
				move |context| end(end_client.instance(), context.as_ptr()),
				cancel,
				operation,
			)
			.await
	}
}

/// `EndX` for operations without output
pub(crate) fn finish(
	end: EndFn,
	operation: &'static str,
) -> impl FnOnce(*mut c_void, *mut AsyncOperationContextFFI) -> Result<()> + Send + 'static {
	move |instance, context| check_hresult(end(instance, context), operation)
}

/// `EndX` filling an output structure that is copied into `T` before the
/// context goes away
pub(crate) fn finish_with<T>(
	end: EndWithOutputFn<T::Native>,
	empty: fn() -> T::Native,
	operation: &'static str,
) -> impl FnOnce(*mut c_void, *mut AsyncOperationContextFFI) -> Result<T> + Send + 'static
where
	T: FromNative + Send + 'static,
	T::Native: 'static,
{
	move |instance, context| {
		let mut output = empty();
		check_hresult(end(instance, context, &mut output), operation)?;
		unsafe { T::from_native(&output) }
	}
}
