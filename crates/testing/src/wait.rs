// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Polling waits for conditions driven by native threads

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::trace;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `condition` until it holds.
///
/// # Panics
/// Panics with `message` when `timeout` elapses first.
pub async fn wait_for_condition<F>(condition: F, timeout: Duration, poll_interval: Duration, message: &str)
where
	F: Fn() -> bool,
{
	let start = Instant::now();
	let mut polls = 0u64;

	while !condition() {
		if start.elapsed() > timeout {
			panic!("Timeout after {:?}: {}", timeout, message);
		}
		polls += 1;
		sleep(poll_interval).await;
	}
	trace!(polls, elapsed = ?start.elapsed(), message, "condition met");
}

pub async fn wait_for<F>(condition: F, message: &str)
where
	F: Fn() -> bool,
{
	wait_for_condition(condition, DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL, message).await;
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc,
			atomic::{AtomicBool, Ordering},
		},
		thread,
	};

	use super::*;

	#[tokio::test]
	async fn test_wait_for_flag_set_by_another_thread() {
		let flag = Arc::new(AtomicBool::new(false));
		let setter = flag.clone();

		thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			setter.store(true, Ordering::SeqCst);
		});

		wait_for(|| flag.load(Ordering::SeqCst), "flag should be set").await;
	}

	#[tokio::test]
	#[should_panic(expected = "Timeout after")]
	async fn test_wait_for_timeout() {
		wait_for_condition(|| false, Duration::from_millis(10), Duration::from_millis(1), "never").await;
	}
}
