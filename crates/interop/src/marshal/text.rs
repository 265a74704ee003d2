// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::{
	collections::{BTreeMap, HashMap},
	ffi::{CStr, c_char},
	slice,
};

use fabric_abi::data::{StringListFFI, StringPairFFI, StringPairListFFI};

use super::{FromNative, ToNative};
use crate::{
	arena::PinArena,
	error::{InteropError, Result},
};

/// Copies a required native string.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
pub unsafe fn string_from_native(ptr: *const c_char, field: &str) -> Result<String> {
	if ptr.is_null() {
		return Err(InteropError::MalformedResult(format!("`{field}` is null")));
	}
	unsafe { CStr::from_ptr(ptr) }
		.to_str()
		.map(str::to_string)
		.map_err(|e| InteropError::MalformedResult(format!("`{field}` is not valid UTF-8: {e}")))
}

/// Copies an optional native string, null meaning absent.
///
/// # Safety
/// Same as [`string_from_native`].
pub unsafe fn opt_string_from_native(ptr: *const c_char, field: &str) -> Result<Option<String>> {
	if ptr.is_null() {
		return Ok(None);
	}
	unsafe { string_from_native(ptr, field) }.map(Some)
}

/// Copies a paging continuation token. Null and empty both mean the last
/// page was returned.
///
/// # Safety
/// Same as [`string_from_native`].
pub unsafe fn token_from_native(ptr: *const c_char, field: &str) -> Result<Option<String>> {
	Ok(unsafe { opt_string_from_native(ptr, field) }?.filter(|token| !token.is_empty()))
}

/// Views a native `(items, count)` array.
///
/// # Safety
/// When `count` is non-zero, `items` must point at `count` initialized values
/// that stay valid for `'a`.
pub unsafe fn slice_from_native<'a, T>(items: *const T, count: usize, field: &str) -> Result<&'a [T]> {
	if count == 0 {
		return Ok(&[]);
	}
	if items.is_null() {
		return Err(InteropError::MalformedResult(format!("`{field}` is null but has {count} items")));
	}
	Ok(unsafe { slice::from_raw_parts(items, count) })
}

impl ToNative for str {
	type Native = *const c_char;

	fn to_native(&self, arena: &PinArena) -> Result<*const c_char> {
		Ok(arena.pin_str(self)?.as_ptr())
	}
}

impl ToNative for String {
	type Native = *const c_char;

	fn to_native(&self, arena: &PinArena) -> Result<*const c_char> {
		self.as_str().to_native(arena)
	}
}

impl ToNative for Option<String> {
	type Native = *const c_char;

	fn to_native(&self, arena: &PinArena) -> Result<*const c_char> {
		arena.pin_opt_str(self.as_deref())
	}
}

impl FromNative for String {
	type Native = *const c_char;

	unsafe fn from_native(native: &*const c_char) -> Result<String> {
		unsafe { string_from_native(*native, "string") }
	}
}

impl FromNative for Option<String> {
	type Native = *const c_char;

	unsafe fn from_native(native: &*const c_char) -> Result<Option<String>> {
		unsafe { opt_string_from_native(*native, "string") }
	}
}

impl ToNative for [String] {
	type Native = StringListFFI;

	fn to_native(&self, arena: &PinArena) -> Result<StringListFFI> {
		let items = self.iter().map(|s| s.to_native(arena)).collect::<Result<Vec<_>>>()?;
		let count = items.len();
		Ok(StringListFFI {
			count,
			items: arena.pin_slice(items).as_ptr(),
		})
	}
}

impl ToNative for Vec<String> {
	type Native = StringListFFI;

	fn to_native(&self, arena: &PinArena) -> Result<StringListFFI> {
		self.as_slice().to_native(arena)
	}
}

impl FromNative for Vec<String> {
	type Native = StringListFFI;

	unsafe fn from_native(native: &StringListFFI) -> Result<Vec<String>> {
		let items = unsafe { slice_from_native(native.items, native.count, "items") }?;
		items.iter().map(|item| unsafe { string_from_native(*item, "items") }).collect()
	}
}

fn pin_pairs<'a>(
	pairs: impl ExactSizeIterator<Item = (&'a String, &'a String)>,
	arena: &PinArena,
) -> Result<StringPairListFFI> {
	let mut items = Vec::with_capacity(pairs.len());
	for (key, value) in pairs {
		items.push(StringPairFFI {
			key: key.to_native(arena)?,
			value: value.to_native(arena)?,
		});
	}

	if items.is_empty() {
		return Ok(StringPairListFFI::empty());
	}

	let count = items.len();
	Ok(StringPairListFFI {
		count,
		items: arena.pin_slice(items).as_ptr(),
	})
}

impl ToNative for BTreeMap<String, String> {
	type Native = StringPairListFFI;

	fn to_native(&self, arena: &PinArena) -> Result<StringPairListFFI> {
		pin_pairs(self.iter(), arena)
	}
}

impl ToNative for HashMap<String, String> {
	type Native = StringPairListFFI;

	fn to_native(&self, arena: &PinArena) -> Result<StringPairListFFI> {
		pin_pairs(self.iter(), arena)
	}
}

impl FromNative for BTreeMap<String, String> {
	type Native = StringPairListFFI;

	unsafe fn from_native(native: &StringPairListFFI) -> Result<Self> {
		let pairs = unsafe { slice_from_native(native.items, native.count, "pairs") }?;
		pairs.iter()
			.map(|pair| -> Result<(String, String)> {
				let key = unsafe { string_from_native(pair.key, "key") }?;
				let value = unsafe { string_from_native(pair.value, "value") }?;
				Ok((key, value))
			})
			.collect()
	}
}
