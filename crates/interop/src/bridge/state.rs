// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::fmt::{self, Display, Formatter};

use tracing::{debug, error};

/// Lifecycle of one bridged native operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
	NotStarted,
	/// Begin is running on the apartment
	Started,
	/// The context reported completion before begin returned
	CompletedSynchronously,
	AwaitingCallback,
	Completed,
	/// End has run; terminal
	Finalized,
}

impl OperationState {
	pub fn can_advance_to(self, next: OperationState) -> bool {
		use OperationState::*;

		matches!(
			(self, next),
			(NotStarted, Started)
				| (Started, CompletedSynchronously)
				| (Started, AwaitingCallback)
				| (CompletedSynchronously, Completed)
				| (AwaitingCallback, Completed)
				| (Completed, Finalized)
		)
	}

	pub fn is_terminal(self) -> bool {
		self == OperationState::Finalized
	}
}

impl Display for OperationState {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let name = match self {
			OperationState::NotStarted => "not_started",
			OperationState::Started => "started",
			OperationState::CompletedSynchronously => "completed_synchronously",
			OperationState::AwaitingCallback => "awaiting_callback",
			OperationState::Completed => "completed",
			OperationState::Finalized => "finalized",
		};
		f.write_str(name)
	}
}

/// Enforces the [`OperationState`] transitions of one operation.
///
/// An invalid transition is a programming fault and panics.
#[derive(Debug)]
pub struct OperationTracker {
	operation: String,
	state: OperationState,
}

impl OperationTracker {
	pub fn new(operation: impl Into<String>) -> Self {
		Self {
			operation: operation.into(),
			state: OperationState::NotStarted,
		}
	}

	pub fn state(&self) -> OperationState {
		self.state
	}

	pub fn advance(&mut self, next: OperationState) {
		if !self.state.can_advance_to(next) {
			error!(operation = %self.operation, from = %self.state, to = %next, "invalid operation transition");
			panic!("{}: invalid operation transition {} -> {}", self.operation, self.state, next);
		}
		debug!(operation = %self.operation, from = %self.state, to = %next, "operation transition");
		self.state = next;
	}
}

/// Holder of a native handle that may be consumed exactly once
#[derive(Debug)]
pub enum HandleSlot<C> {
	Pending,
	Completed(C),
	Consumed,
}

impl<C> Default for HandleSlot<C> {
	fn default() -> Self {
		HandleSlot::Pending
	}
}

impl<C> HandleSlot<C> {
	pub fn complete(&mut self, handle: C) {
		match self {
			HandleSlot::Pending => *self = HandleSlot::Completed(handle),
			HandleSlot::Completed(_) => panic!("operation handle completed twice"),
			HandleSlot::Consumed => panic!("operation handle completed after it was consumed"),
		}
	}

	/// Takes the completed handle, leaving the slot consumed.
	pub fn take(&mut self) -> C {
		match std::mem::replace(self, HandleSlot::Consumed) {
			HandleSlot::Completed(handle) => handle,
			HandleSlot::Pending => {
				*self = HandleSlot::Pending;
				panic!("operation handle consumed before completion")
			}
			HandleSlot::Consumed => {
				error!("operation handle consumed twice");
				panic!("operation handle consumed twice")
			}
		}
	}

	pub fn is_consumed(&self) -> bool {
		matches!(self, HandleSlot::Consumed)
	}
}
