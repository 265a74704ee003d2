// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Bridge between managed async code and the native begin/end convention
//!
//! Two pieces work together on every native call:
//!
//! - [`arena::PinArena`] keeps request data at stable addresses while the
//!   native `BeginX` entry point reads it, and releases it right after.
//! - [`bridge::AsyncBridge`] runs `BeginX` on the apartment, waits for the
//!   completion callback without blocking, forwards cancellation, and runs
//!   `EndX` exactly once.

pub mod arena;
pub mod bridge;
pub mod config;
pub mod error;
pub mod marshal;
pub mod timeout;

pub use arena::{ArenaStats, PinArena, Pinned, RegionToken, with_arena};
pub use bridge::{AsyncBridge, CompletionCallback, OperationContext, OperationState};
pub use config::ClientConfig;
pub use error::{InteropError, NativeErrorCode, Result, check_hresult};
pub use marshal::{FromNative, ToNative};
pub use timeout::to_milliseconds;
pub use tokio_util::sync::CancellationToken;
