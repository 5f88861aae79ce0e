//! Request pacing shared by every store call.
//!
//! A client owns exactly one [`RateLimiter`], chosen once at construction by
//! [`rate_limiter`]: a [`FixedRateLimiter`] when a positive rate is configured, otherwise
//! an [`UnlimitedRateLimiter`]. Each API call awaits [`RateLimiter::acquire`] once before
//! touching the network.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::{self, Instant};
// self
use crate::_prelude::*;

/// Boxed future returned by [`RateLimiter::acquire`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Gate that spaces outbound calls.
pub trait RateLimiter
where
	Self: Send + Sync,
{
	/// Resolves once the caller may issue its next request.
	fn acquire(&self) -> AcquireFuture<'_>;
}

/// Selects the limiter for a configured rate (requests per second).
pub fn rate_limiter(rate: i64) -> Arc<dyn RateLimiter> {
	match u32::try_from(rate) {
		Ok(per_second) if per_second > 0 => Arc::new(FixedRateLimiter::new(per_second)),
		_ => Arc::new(UnlimitedRateLimiter),
	}
}

/// Limiter that never waits.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlimitedRateLimiter;
impl RateLimiter for UnlimitedRateLimiter {
	fn acquire(&self) -> AcquireFuture<'_> {
		Box::pin(async {})
	}
}

/// Pacer that hands out one permit every `1 / rate` seconds.
///
/// Permits are reserved in lock order: each caller claims the next free slot while holding
/// the mutex, then sleeps until that slot outside the lock. `async-lock`'s mutex is fair, so
/// concurrent callers are served roughly FIFO and none starves. There is no burst credit;
/// an idle limiter grants its next permit immediately and paces from there.
#[derive(Debug)]
pub struct FixedRateLimiter {
	interval: StdDuration,
	next_slot: AsyncMutex<Option<Instant>>,
}
impl FixedRateLimiter {
	/// Creates a pacer for `per_second` permits per second.
	pub fn new(per_second: u32) -> Self {
		let per_second = per_second.max(1);

		Self {
			interval: StdDuration::from_secs(1) / per_second,
			next_slot: AsyncMutex::new(None),
		}
	}

	/// Spacing enforced between permits.
	pub fn interval(&self) -> StdDuration {
		self.interval
	}

	async fn reserve(&self) -> Instant {
		let mut next = self.next_slot.lock().await;
		let now = Instant::now();
		let slot = match *next {
			Some(at) if at > now => at,
			_ => now,
		};

		*next = Some(slot + self.interval);

		slot
	}
}
impl RateLimiter for FixedRateLimiter {
	fn acquire(&self) -> AcquireFuture<'_> {
		Box::pin(async move {
			let slot = self.reserve().await;
			let now = Instant::now();

			if slot > now {
				let wait_ms = u64::try_from((slot - now).as_millis()).unwrap_or(u64::MAX);

				tracing::debug!(wait_ms, "Waiting for rate limit permit.");

				time::sleep_until(slot).await;
			}
		})
	}
}
