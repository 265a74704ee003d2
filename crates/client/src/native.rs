// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	ffi::c_void,
	fmt::{self, Debug, Formatter},
	ptr::NonNull,
};

use fabric_abi::{query::QueryClientVTableFFI, testability::TestManagementClientVTableFFI};
use tracing::trace;

/// Function table of a native client instance
pub trait NativeVTable: Copy + Send + Sync + 'static {
	/// Label used in logs
	const NAME: &'static str;

	fn release(&self) -> extern "C" fn(instance: *mut c_void);
}

impl NativeVTable for TestManagementClientVTableFFI {
	const NAME: &'static str = "test_management";

	fn release(&self) -> extern "C" fn(instance: *mut c_void) {
		self.release
	}
}

impl NativeVTable for QueryClientVTableFFI {
	const NAME: &'static str = "query";

	fn release(&self) -> extern "C" fn(instance: *mut c_void) {
		self.release
	}
}

/// Owned reference to a native client instance
///
/// The instance is released through its table when the value is dropped.
/// Shared between in-flight operations behind an `Arc`, so it outlives every
/// context obtained from it.
pub struct NativeClient<V: NativeVTable> {
	vtable: V,
	instance: NonNull<c_void>,
}

// SAFETY: native client instances are free-threaded.
unsafe impl<V: NativeVTable> Send for NativeClient<V> {}
unsafe impl<V: NativeVTable> Sync for NativeClient<V> {}

pub type NativeTestManagementClient = NativeClient<TestManagementClientVTableFFI>;
pub type NativeQueryClient = NativeClient<QueryClientVTableFFI>;

impl<V: NativeVTable> NativeClient<V> {
	/// Takes over the caller's reference to a native instance.
	///
	/// Returns `None` when either pointer is null.
	///
	/// # Safety
	/// `vtable` must point at a valid function table for `instance`, and the
	/// caller's reference to `instance` must not be released elsewhere.
	pub unsafe fn from_raw(vtable: *const V, instance: *mut c_void) -> Option<Self> {
		let vtable = unsafe { vtable.as_ref() }.copied()?;
		let instance = NonNull::new(instance)?;
		Some(Self {
			vtable,
			instance,
		})
	}

	pub fn vtable(&self) -> &V {
		&self.vtable
	}

	pub fn instance(&self) -> *mut c_void {
		self.instance.as_ptr()
	}
}

impl<V: NativeVTable> Drop for NativeClient<V> {
	fn drop(&mut self) {
		trace!(client = V::NAME, "releasing native client");
		(self.vtable.release())(self.instance.as_ptr());
	}
}

impl<V: NativeVTable> Debug for NativeClient<V> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("NativeClient").field("kind", &V::NAME).field("instance", &self.instance).finish()
	}
}
