// SPDX-License-Identifier: MIT
// Copyright (c) 2025 ReifyDB

//! C ABI definitions for the native cluster runtime
//!
//! This crate describes the stable C calling convention exposed by the native
//! cluster runtime: the asynchronous begin/end operation contract, the FFI-safe
//! request and result layouts, and the function tables of the native
//! test-management and query clients. It contains no behaviour.

pub mod constants;
pub mod data;
pub mod operation;
pub mod query;
pub mod testability;

pub use constants::*;
pub use data::*;
pub use operation::*;
