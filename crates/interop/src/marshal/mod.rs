// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Conversions between managed values and native layouts
//!
//! Requests go out through [`ToNative`], which pins everything the native
//! layout points at into the caller's [`PinArena`]. Results come back through
//! [`FromNative`], which copies out of native memory before the operation
//! context that owns it is released.

mod scalar;
mod text;

pub use text::{opt_string_from_native, slice_from_native, string_from_native, token_from_native};

use crate::{arena::PinArena, error::Result};

/// Converts a managed value into its native layout.
pub trait ToNative {
	type Native: 'static;

	fn to_native(&self, arena: &PinArena) -> Result<Self::Native>;
}

/// Builds a managed value from a native layout.
pub trait FromNative: Sized {
	type Native;

	/// # Safety
	/// Every pointer reachable from `native` must be null or valid for reads
	/// for the duration of the call.
	unsafe fn from_native(native: &Self::Native) -> Result<Self>;
}
