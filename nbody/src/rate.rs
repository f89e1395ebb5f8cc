use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::constants::RATE_WINDOW;

/// Rolling average of tick rate over the last `RATE_WINDOW` samples.
pub struct RateCounter {
    last_update: Instant,
    last_tick: u64,
    samples: VecDeque<(u64, Duration)>,
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCounter {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            last_tick: 0,
            samples: VecDeque::with_capacity(RATE_WINDOW),
        }
    }

    /// Record that the simulation has reached `tick` now.
    pub fn tick(&mut self, tick: u64) {
        let now = Instant::now();
        self.push(tick, now - self.last_update);
        self.last_update = now;
    }

    /// Record `tick` after an explicit elapsed duration.
    pub fn push(&mut self, tick: u64, elapsed: Duration) {
        let ticks = tick.saturating_sub(self.last_tick);
        self.last_tick = tick;
        if self.samples.len() == RATE_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back((ticks, elapsed));
    }

    /// Ticks per second over the window. Zero when no time has been recorded.
    pub fn rate(&self) -> f64 {
        let total_time: f64 = self.samples.iter().map(|(_, d)| d.as_secs_f64()).sum();
        if total_time == 0.0 {
            return 0.0;
        }
        let total_ticks: u64 = self.samples.iter().map(|(t, _)| t).sum();
        total_ticks as f64 / total_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_counter_reports_zero() {
        assert_eq!(RateCounter::new().rate(), 0.0);
    }

    #[test]
    fn averages_over_window() {
        let mut counter = RateCounter::new();
        counter.push(10, Duration::from_millis(500));
        counter.push(30, Duration::from_millis(500));
        assert!((counter.rate() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn old_samples_fall_out() {
        let mut counter = RateCounter::new();
        counter.push(1000, Duration::from_millis(1));
        let mut tick = 1000;
        for _ in 0..RATE_WINDOW {
            tick += 1;
            counter.push(tick, Duration::from_secs(1));
        }
        assert!((counter.rate() - 1.0).abs() < 1e-9);
    }
}
