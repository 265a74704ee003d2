// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Execution contexts for crossing into the native runtime.
//!
//! The native runtime only accepts calls from threads of a specific kind (the
//! multi-threaded apartment). [`Apartment`] is a dedicated worker pool whose
//! threads satisfy that requirement; async code hops onto it with
//! [`Apartment::run`] before touching native entry points.

pub mod apartment;
pub mod config;

pub use apartment::{Apartment, ApartmentError, is_apartment_thread};
pub use config::ApartmentConfig;
