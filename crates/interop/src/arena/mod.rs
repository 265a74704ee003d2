// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Scoped pinning of request data for native calls
//!
//! Native `BeginX` entry points only read their inputs while the call is
//! running; the runtime copies whatever it needs for the asynchronous part.
//! A [`PinArena`] therefore only has to keep data at stable addresses until
//! `BeginX` returns. Every value pinned into an arena is copied into storage
//! owned by the arena, and every region is released exactly once when the
//! arena closes.
//!
//! Handles returned by the arena ([`Pinned`]) borrow it, so the arena cannot
//! be closed while any handle is still in scope.

use std::{
	any::Any,
	cell::{Cell, RefCell},
	ffi::{CString, c_char},
	marker::PhantomData,
	ptr,
	sync::atomic::{AtomicU64, Ordering},
};

use fabric_abi::data::BufferFFI;
use tracing::{error, trace};

use crate::{
	error::{InteropError, Result},
	marshal::ToNative,
};

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static LIVE_REGIONS: Cell<usize> = const { Cell::new(0) };
}

/// Number of regions pinned and not yet released on the calling thread.
///
/// Arenas are not `Send`, so every pin and release of an arena happens on
/// the thread that opened it.
pub fn live_regions() -> usize {
	LIVE_REGIONS.with(|live| live.get())
}

/// Identifies one pinned region of one arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionToken {
	arena: u64,
	index: usize,
}

/// Pin and release counters of an arena
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
	pub pinned: usize,
	pub released: usize,
	pub bytes: usize,
}

struct Region {
	// owned storage; its heap allocation never moves while the region is live
	_storage: Box<dyn Any>,
}

/// Stable address of a pinned value, valid while the arena is open.
#[derive(Debug)]
pub struct Pinned<'arena, T> {
	ptr: *const T,
	len: usize,
	token: RegionToken,
	_arena: PhantomData<&'arena PinArena>,
}

impl<'arena, T> Pinned<'arena, T> {
	pub fn as_ptr(&self) -> *const T {
		self.ptr
	}

	/// Number of `T` elements at the address
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn token(&self) -> RegionToken {
		self.token
	}
}

impl<'arena> Pinned<'arena, u8> {
	pub fn as_buffer(&self) -> BufferFFI {
		BufferFFI {
			ptr: self.ptr,
			len: self.len,
		}
	}
}

impl<T> Clone for Pinned<'_, T> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<T> Copy for Pinned<'_, T> {}

/// Scoped set of pinned regions
pub struct PinArena {
	id: u64,
	regions: RefCell<Vec<Region>>,
	closed: Cell<bool>,
	stats: Cell<ArenaStats>,
}

impl PinArena {
	pub fn open() -> Self {
		Self {
			id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
			regions: RefCell::new(Vec::new()),
			closed: Cell::new(false),
			stats: Cell::new(ArenaStats::default()),
		}
	}

	/// Pins text as a NUL-terminated UTF-8 string.
	///
	/// Fails when the text contains an interior NUL byte.
	pub fn pin_str(&self, value: &str) -> Result<Pinned<'_, c_char>> {
		let text = CString::new(value).map_err(|e| {
			InteropError::invalid_argument("text", format!("interior NUL byte at offset {}", e.nul_position()))
		})?;
		let ptr = text.as_ptr();
		let len = text.as_bytes_with_nul().len();
		Ok(self.register(Box::new(text), ptr, len, len))
	}

	/// Pins an optional string, null when absent.
	pub fn pin_opt_str(&self, value: Option<&str>) -> Result<*const c_char> {
		match value {
			Some(value) => Ok(self.pin_str(value)?.as_ptr()),
			None => Ok(ptr::null()),
		}
	}

	/// Pins an opaque byte buffer.
	pub fn pin_bytes(&self, bytes: &[u8]) -> Pinned<'_, u8> {
		self.pin_slice(bytes.to_vec())
	}

	/// Pins a native record; the returned address points at the moved value.
	pub fn pin_record<T: 'static>(&self, record: T) -> Pinned<'_, T> {
		let boxed = Box::new(record);
		let ptr: *const T = &*boxed;
		self.register(boxed, ptr, 1, size_of::<T>())
	}

	/// Pins a contiguous array of native records. Empty arrays pin to null.
	pub fn pin_slice<T: 'static>(&self, items: Vec<T>) -> Pinned<'_, T> {
		let boxed: Box<[T]> = items.into_boxed_slice();
		let len = boxed.len();
		let ptr = if len == 0 {
			ptr::null()
		} else {
			boxed.as_ptr()
		};
		self.register(Box::new(boxed), ptr, len, len * size_of::<T>())
	}

	/// Converts a value into its native layout and pins the result.
	///
	/// Values whose native layout points at other data pin that data into
	/// this same arena.
	pub fn pin<T: ToNative + ?Sized>(&self, value: &T) -> Result<Pinned<'_, T::Native>> {
		let native = value.to_native(self)?;
		Ok(self.pin_record(native))
	}

	/// Returns true while the region behind `token` is pinned in this arena.
	pub fn is_pinned(&self, token: RegionToken) -> bool {
		token.arena == self.id && !self.closed.get() && token.index < self.regions.borrow().len()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.get()
	}

	pub fn stats(&self) -> ArenaStats {
		self.stats.get()
	}

	/// Releases every pinned region. Closing a closed arena does nothing.
	pub fn close(&mut self) {
		if self.closed.replace(true) {
			return;
		}

		let released = {
			let mut regions = self.regions.borrow_mut();
			let count = regions.len();
			regions.clear();
			count
		};

		LIVE_REGIONS.with(|live| live.set(live.get() - released));

		let mut stats = self.stats.get();
		stats.released += released;
		self.stats.set(stats);

		trace!(arena = self.id, released, bytes = stats.bytes, "arena closed");
	}

	fn register<T>(&self, storage: Box<dyn Any>, ptr: *const T, len: usize, bytes: usize) -> Pinned<'_, T> {
		if self.closed.get() {
			error!(arena = self.id, "pin on a closed arena");
			panic!("pin on a closed arena");
		}

		let index = {
			let mut regions = self.regions.borrow_mut();
			regions.push(Region {
				_storage: storage,
			});
			regions.len() - 1
		};

		LIVE_REGIONS.with(|live| live.set(live.get() + 1));

		let mut stats = self.stats.get();
		stats.pinned += 1;
		stats.bytes += bytes;
		self.stats.set(stats);

		Pinned {
			ptr,
			len,
			token: RegionToken {
				arena: self.id,
				index,
			},
			_arena: PhantomData,
		}
	}
}

impl Default for PinArena {
	fn default() -> Self {
		Self::open()
	}
}

impl Drop for PinArena {
	fn drop(&mut self) {
		self.close();
	}
}

/// Opens an arena, runs `f` with it and closes it on every exit path.
///
/// When `f` fails, everything it pinned is released before the error is
/// returned.
pub fn with_arena<R>(f: impl FnOnce(&PinArena) -> Result<R>) -> Result<R> {
	let mut arena = PinArena::open();
	let result = f(&arena);
	arena.close();
	result
}

#[cfg(test)]
mod tests {
	use std::ffi::CStr;

	use fabric_abi::data::GuidFFI;

	use super::*;

	#[test]
	fn test_pinned_text_is_nul_terminated() {
		let arena = PinArena::open();
		let pinned = arena.pin_str("fabric:/app/svc").unwrap();

		let text = unsafe { CStr::from_ptr(pinned.as_ptr()) };
		assert_eq!(text.to_str().unwrap(), "fabric:/app/svc");
		assert_eq!(pinned.len(), "fabric:/app/svc".len() + 1);
	}

	#[test]
	fn test_interior_nul_is_rejected() {
		let arena = PinArena::open();
		let err = arena.pin_str("bad\0name").unwrap_err();
		assert!(err.is_invalid_argument());
		assert_eq!(arena.stats().pinned, 0);
	}

	#[test]
	fn test_addresses_stay_stable_while_pinning_more() {
		let arena = PinArena::open();
		let first = arena.pin_record(GuidFFI {
			bytes: [7; 16],
		});
		let address = first.as_ptr();

		for i in 0..256 {
			arena.pin_str(&format!("value-{i}")).unwrap();
		}

		assert_eq!(first.as_ptr(), address);
		assert_eq!(unsafe { (*address).bytes }, [7; 16]);
	}

	#[test]
	fn test_close_releases_every_region() {
		let mut arena = PinArena::open();
		let tokens = [
			arena.pin_str("a").unwrap().token(),
			arena.pin_bytes(&[1, 2, 3]).token(),
			arena.pin_record(42u64).token(),
		];

		assert!(tokens.iter().all(|t| arena.is_pinned(*t)));

		arena.close();

		assert!(tokens.iter().all(|t| !arena.is_pinned(*t)));
		assert_eq!(
			arena.stats(),
			ArenaStats {
				pinned: 3,
				released: 3,
				bytes: 2 + 3 + 8,
			}
		);
	}

	#[test]
	fn test_close_is_idempotent() {
		let mut arena = PinArena::open();
		arena.pin_str("x").unwrap();

		arena.close();
		arena.close();

		assert_eq!(arena.stats().released, 1);
		assert_eq!(live_regions(), 0);
	}

	#[test]
	fn test_tokens_are_arena_specific() {
		let first = PinArena::open();
		let second = PinArena::open();
		let token = first.pin_record(1u32).token();

		assert!(first.is_pinned(token));
		assert!(!second.is_pinned(token));
	}

	#[test]
	fn test_empty_slice_pins_to_null() {
		let arena = PinArena::open();
		let pinned = arena.pin_slice::<u64>(Vec::new());

		assert!(pinned.as_ptr().is_null());
		assert!(pinned.is_empty());
		assert!(arena.pin_bytes(&[]).as_buffer().is_empty());
	}

	#[test]
	fn test_with_arena_releases_on_error() {
		let result: Result<()> = with_arena(|arena| {
			arena.pin_str("one")?;
			arena.pin_str("two")?;
			assert_eq!(live_regions(), 2);
			arena.pin_str("th\0ree")?;
			Ok(())
		});

		assert!(result.unwrap_err().is_invalid_argument());
		assert_eq!(live_regions(), 0);
	}

	#[test]
	fn test_drop_releases() {
		{
			let arena = PinArena::open();
			arena.pin_bytes(b"payload");
			assert_eq!(live_regions(), 1);
		}
		assert_eq!(live_regions(), 0);
	}

	#[test]
	#[should_panic(expected = "pin on a closed arena")]
	fn test_pin_after_close_is_fatal() {
		let mut arena = PinArena::open();
		arena.close();
		arena.pin_record(1u8);
	}
}
