// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use fabric_abi::data::GuidFFI;
use uuid::Uuid;

use super::{FromNative, ToNative};
use crate::{arena::PinArena, error::Result};

macro_rules! impl_identity {
	($($t:ty),*) => {
		$(
			impl ToNative for $t {
				type Native = $t;

				fn to_native(&self, _arena: &PinArena) -> Result<$t> {
					Ok(*self)
				}
			}

			impl FromNative for $t {
				type Native = $t;

				unsafe fn from_native(native: &$t) -> Result<$t> {
					Ok(*native)
				}
			}
		)*
	};
}

impl_identity!(u8, u16, u32, u64, i16, i32, i64, f32, f64, usize);

impl ToNative for bool {
	type Native = u8;

	fn to_native(&self, _arena: &PinArena) -> Result<u8> {
		Ok(u8::from(*self))
	}
}

impl FromNative for bool {
	type Native = u8;

	unsafe fn from_native(native: &u8) -> Result<bool> {
		Ok(*native != 0)
	}
}

impl ToNative for Uuid {
	type Native = GuidFFI;

	fn to_native(&self, _arena: &PinArena) -> Result<GuidFFI> {
		Ok(GuidFFI {
			bytes: *self.as_bytes(),
		})
	}
}

impl FromNative for Uuid {
	type Native = GuidFFI;

	unsafe fn from_native(native: &GuidFFI) -> Result<Uuid> {
		Ok(Uuid::from_bytes(native.bytes))
	}
}
