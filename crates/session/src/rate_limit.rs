use dashmap::DashMap;
use dealroom_core::UserId;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{SessionError, SessionResult};

/// Sliding-window limiter for outbound chat messages
///
/// Each user keeps the instants of accepted messages inside the window.
/// Rejected messages are not recorded.
pub struct MessageRateLimiter {
    limit: usize,
    window: Duration,
    buckets: DashMap<UserId, VecDeque<Instant>>,
}

impl MessageRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            buckets: DashMap::new(),
        }
    }

    /// Record a message, or reject it with the time until a slot frees up
    pub fn check(&self, user_id: UserId) -> SessionResult<()> {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(user_id).or_default();
        prune(&mut bucket, now, self.window);

        if bucket.len() >= self.limit {
            let oldest = bucket.front().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(SessionError::RateLimited { retry_after });
        }

        bucket.push_back(now);
        Ok(())
    }

    /// Messages currently counted against the user
    pub fn in_window(&self, user_id: UserId) -> usize {
        let now = Instant::now();
        self.buckets
            .get_mut(&user_id)
            .map(|mut bucket| {
                prune(&mut bucket, now, self.window);
                bucket.len()
            })
            .unwrap_or(0)
    }

    /// Drop the user's bucket once nothing in it counts any more
    pub fn purge(&self, user_id: UserId) {
        let now = Instant::now();
        let window = self.window;
        self.buckets.remove_if(&user_id, |_, bucket| {
            bucket
                .back()
                .is_none_or(|newest| now.duration_since(*newest) >= window)
        });
    }
}

fn prune(bucket: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = bucket.front() {
        if now.duration_since(*oldest) >= window {
            bucket.pop_front();
        } else {
            break;
        }
    }
}
