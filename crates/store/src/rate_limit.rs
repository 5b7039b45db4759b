//! Per-sender inbound rate limiting: fixed window with a cap, then an
//! absolute cooldown. Memory-only; a restart clears it.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Decision for one inbound unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Blocked {
        /// Remaining cooldown.
        wait: Duration,
    },
}

impl RateDecision {
    /// User-facing wait in whole minutes, rounded up, never zero.
    pub fn wait_minutes(&self) -> u64 {
        match self {
            Self::Allowed => 0,
            Self::Blocked { wait } => wait.as_secs().div_ceil(60).max(1),
        }
    }
}

struct Record {
    count: u32,
    window_started: Instant,
    blocked_until: Option<Instant>,
}

/// Sliding-window counter + cooldown per sender.
pub struct RateLimiter {
    records: Mutex<HashMap<i64, Record>>,
    window: Duration,
    cap: u32,
    cooldown: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration, cap: u32, cooldown: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            window,
            cap,
            cooldown,
        }
    }

    /// Count one inbound unit from `sender` and decide.
    ///
    /// An active cooldown blocks regardless of elapsed window resets; once it
    /// expires the window restarts from the blocked sender's next message.
    pub fn check(&self, sender: i64) -> RateDecision {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = records.entry(sender).or_insert(Record {
            count: 0,
            window_started: now,
            blocked_until: None,
        });

        if let Some(until) = record.blocked_until {
            if now < until {
                return RateDecision::Blocked { wait: until - now };
            }
            record.blocked_until = None;
            record.count = 0;
            record.window_started = now;
        }

        if now.duration_since(record.window_started) >= self.window {
            record.count = 0;
            record.window_started = now;
        }

        record.count += 1;
        if record.count > self.cap {
            record.blocked_until = Some(now + self.cooldown);
            return RateDecision::Blocked {
                wait: self.cooldown,
            };
        }

        RateDecision::Allowed
    }

    /// Drop records that are idle past their window and not cooling down.
    pub fn evict_idle(&self) {
        let now = Instant::now();
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.retain(|_, r| {
            r.blocked_until.is_some_and(|until| now < until)
                || now.duration_since(r.window_started) < self.window
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(60), 30, Duration::from_secs(300))
    }

    #[test]
    fn cap_allows_exactly_thirty() {
        let rl = limiter();
        for _ in 0..30 {
            assert_eq!(rl.check(1), RateDecision::Allowed);
        }
        // The 31st message within the window is blocked with a positive wait.
        match rl.check(1) {
            RateDecision::Blocked { wait } => assert!(wait > Duration::ZERO),
            RateDecision::Allowed => panic!("31st message must be blocked"),
        }
    }

    #[test]
    fn cooldown_outlives_window_resets() {
        let rl = limiter();
        for _ in 0..31 {
            rl.check(1);
        }
        // Simulate the window having long expired while the cooldown holds.
        {
            let mut records = rl.records.lock().unwrap();
            let r = records.get_mut(&1).unwrap();
            r.window_started = Instant::now() - Duration::from_secs(120);
        }
        assert!(matches!(rl.check(1), RateDecision::Blocked { .. }));
    }

    #[test]
    fn expired_cooldown_restarts_the_window() {
        let rl = limiter();
        for _ in 0..31 {
            rl.check(1);
        }
        {
            let mut records = rl.records.lock().unwrap();
            let r = records.get_mut(&1).unwrap();
            r.blocked_until = Some(Instant::now() - Duration::from_secs(1));
        }
        assert_eq!(rl.check(1), RateDecision::Allowed);
    }

    #[test]
    fn window_reset_clears_the_count() {
        let rl = limiter();
        for _ in 0..30 {
            rl.check(1);
        }
        {
            let mut records = rl.records.lock().unwrap();
            let r = records.get_mut(&1).unwrap();
            r.window_started = Instant::now() - Duration::from_secs(61);
        }
        assert_eq!(rl.check(1), RateDecision::Allowed);
    }

    #[test]
    fn senders_are_independent() {
        let rl = limiter();
        for _ in 0..31 {
            rl.check(1);
        }
        assert_eq!(rl.check(2), RateDecision::Allowed);
    }

    #[test]
    fn wait_minutes_rounds_up_and_is_positive() {
        let blocked = RateDecision::Blocked {
            wait: Duration::from_secs(61),
        };
        assert_eq!(blocked.wait_minutes(), 2);
        let brief = RateDecision::Blocked {
            wait: Duration::from_secs(5),
        };
        assert_eq!(brief.wait_minutes(), 1);
    }

    #[test]
    fn evict_idle_keeps_cooling_senders() {
        let rl = limiter();
        for _ in 0..31 {
            rl.check(1);
        }
        rl.check(2);
        {
            let mut records = rl.records.lock().unwrap();
            records.get_mut(&2).unwrap().window_started = Instant::now() - Duration::from_secs(120);
        }
        rl.evict_idle();
        let records = rl.records.lock().unwrap();
        assert!(records.contains_key(&1), "cooling sender kept");
        assert!(!records.contains_key(&2), "idle sender evicted");
    }
}
