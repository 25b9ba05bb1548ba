//! Retry timer collaborator trait.
//!
//! Per spec §4.5/§6 the engine never sleeps or owns a clock itself; it
//! asks a collaborator to arm/disarm a single retransmit timer and is
//! told, via [`RetryTimer::poll_expired`], when it has fired. Ported
//! from the exponential-backoff shape of gPXE's `retry_timer` (doubling
//! up to a ceiling, reset to the floor on progress) and restated as a
//! Rust trait boundary the way `jonasjelonek-tftp` keeps its socket
//! read-timeout logic out of the packet/option modules.

use std::time::Duration;

/// A single-shot, restartable retransmit timer.
///
/// Exactly one timer is ever armed per `Request`; starting a new one
/// implicitly cancels whatever was previously pending.
pub trait RetryTimer {
	/// Arm the timer for the next backoff interval (caller-defined
	/// policy; the engine only needs "has it fired").
	fn start(&mut self);

	/// Arm the timer at its initial (non-backed-off) interval. Used
	/// after any successful receive, so a run of timeouts doesn't
	/// leave the next genuine retry artificially delayed.
	fn start_at_floor(&mut self);

	/// Disarm the timer; a no-op if it is already stopped.
	fn stop(&mut self);

	/// Non-blocking check: has the armed timer fired since it was last
	/// started? Calling this clears the fired flag.
	fn poll_expired(&mut self) -> bool;
}

/// A real-clock exponential-backoff timer, doubling the interval on
/// each `start()` up to `ceiling`, used by the demo binary.
///
/// Additionally tracks consecutive expiries since the last
/// `start_at_floor()` (i.e. since the last sign of progress), so the
/// demo binary's poll loop can derive spec §4.5's `expired(fail)`
/// bool via [`Self::poll_expired_fail`] once `max_retries` consecutive
/// timeouts have occurred without progress, matching the teacher's
/// `DEFAULT_RETRANSMIT_TRIES` retry ceiling.
pub struct BackoffTimer {
	floor: Duration,
	ceiling: Duration,
	current: Duration,
	deadline: Option<std::time::Instant>,
	max_retries: u32,
	retries: u32,
}

impl BackoffTimer {
	pub fn new(floor: Duration, ceiling: Duration, max_retries: u32) -> Self {
		Self {
			floor,
			ceiling,
			current: floor,
			deadline: None,
			max_retries,
			retries: 0,
		}
	}

	/// Poll for expiry and, if expired, report whether the retry
	/// budget is now exhausted (spec §4.5 `fail`). Returns `None` if
	/// the timer has not yet fired.
	pub fn poll_expired_fail(&mut self) -> Option<bool> {
		if self.poll_expired() {
			self.retries += 1;
			Some(self.retries > self.max_retries)
		} else {
			None
		}
	}
}

impl RetryTimer for BackoffTimer {
	fn start(&mut self) {
		self.deadline = Some(std::time::Instant::now() + self.current);
		self.current = (self.current * 2).min(self.ceiling);
	}

	fn start_at_floor(&mut self) {
		self.retries = 0;
		self.current = self.floor;
		self.deadline = Some(std::time::Instant::now() + self.current);
		self.current = (self.current * 2).min(self.ceiling);
	}

	fn stop(&mut self) {
		self.deadline = None;
	}

	fn poll_expired(&mut self) -> bool {
		match self.deadline {
			Some(d) if std::time::Instant::now() >= d => {
				self.deadline = None;
				true
			}
			_ => false,
		}
	}
}
