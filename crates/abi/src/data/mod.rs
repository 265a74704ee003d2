// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! FFI-safe primitive layouts shared by requests and results

use core::ffi::c_char;

/// Borrowed byte buffer
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferFFI {
	/// Pointer to the first byte, null when empty
	pub ptr: *const u8,
	/// Number of bytes
	pub len: usize,
}

impl BufferFFI {
	pub const fn empty() -> Self {
		Self {
			ptr: core::ptr::null(),
			len: 0,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.ptr.is_null() || self.len == 0
	}
}

/// 128-bit identifier in RFC 4122 byte order
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuidFFI {
	pub bytes: [u8; 16],
}

/// List of NUL-terminated UTF-8 strings
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringListFFI {
	pub count: usize,
	pub items: *const *const c_char,
}

impl StringListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
		}
	}
}

/// Key/value pair of NUL-terminated UTF-8 strings
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringPairFFI {
	pub key: *const c_char,
	pub value: *const c_char,
}

/// List of key/value pairs
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringPairListFFI {
	pub count: usize,
	pub items: *const StringPairFFI,
}

impl StringPairListFFI {
	pub const fn empty() -> Self {
		Self {
			count: 0,
			items: core::ptr::null(),
		}
	}
}
