//! 计时

use std::cell::Cell;
use std::time::{Duration, Instant};

/// 计时源
pub trait Clock {
    /// 自任意固定起点以来的时间
    fn now(&self) -> Duration;

    /// 从 `start` 到现在经过的时间
    fn since(&self, start: Duration) -> Duration {
        self.now().saturating_sub(start)
    }
}

/// 单调时钟
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// 手动步进时钟：每次读取时间前进固定步长，用于确定性测试
#[derive(Debug)]
pub struct SteppingClock {
    step: Duration,
    current: Cell<Duration>,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            current: Cell::new(Duration::ZERO),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Duration {
        let now = self.current.get() + self.step;
        self.current.set(now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepping_clock() {
        let clock = SteppingClock::new(Duration::from_millis(5));
        let start = clock.now();
        assert_eq!(clock.since(start), Duration::from_millis(5));
        assert_eq!(clock.since(start), Duration::from_millis(10));
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
