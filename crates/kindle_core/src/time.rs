//! Simulation time
//!
//! Fixed tick rate for the frame loop, plus the accumulate-and-fire timer
//! scripts use for periodic work.

use std::time::Duration;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;

/// Seconds per tick for a given rate. A rate of zero falls back to the default.
pub fn tick_seconds(rate_hz: u32) -> f32 {
    let rate = if rate_hz == 0 { TICK_RATE_HZ } else { rate_hz };
    1.0 / rate as f32
}

/// Simulation time tracker
#[derive(Debug, Default)]
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self, dt: f32) {
        self.tick_count += 1;
        self.accumulated_time += Duration::from_secs_f32(dt.max(0.0));
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

/// Accumulates elapsed time and fires once for every whole period crossed.
///
/// The remainder carries over: two ticks of 0.6 with a period of 1.0 fire
/// once on the second tick and leave 0.2 accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTimer {
    period: f32,
    accumulated: f32,
}

impl IntervalTimer {
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(f32::EPSILON),
            accumulated: 0.0,
        }
    }

    /// Add `dt` and return how many periods elapsed.
    pub fn tick(&mut self, dt: f32) -> u32 {
        self.accumulated += dt;
        if self.accumulated <= self.period {
            return 0;
        }
        let accumulated = self.accumulated as f64;
        let period = self.period as f64;
        let mut fired = (accumulated / period).floor();
        // Landing exactly on a multiple leaves that last period unfired.
        if fired * period >= accumulated {
            fired -= 1.0;
        }
        self.accumulated = (accumulated - fired * period).max(0.0) as f32;
        fired as u32
    }

    pub fn remainder(&self) -> f32 {
        self.accumulated
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_carries_remainder() {
        let mut timer = IntervalTimer::new(1.0);
        assert_eq!(timer.tick(0.6), 0);
        assert_eq!(timer.tick(0.6), 1);
        assert!((timer.remainder() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn interval_fires_per_whole_period() {
        let mut timer = IntervalTimer::new(1.0);
        assert_eq!(timer.tick(3.5), 3);
        assert!((timer.remainder() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn interval_needs_to_pass_the_period() {
        let mut timer = IntervalTimer::new(1.0);
        assert_eq!(timer.tick(0.5), 0);
        assert_eq!(timer.tick(0.5), 0);
        assert_eq!(timer.tick(0.25), 1);
    }

    #[test]
    fn simulation_time_advances() {
        let mut time = SimulationTime::new();
        time.advance_tick(tick_seconds(TICK_RATE_HZ));
        time.advance_tick(tick_seconds(0));
        assert_eq!(time.tick_count(), 2);
        assert!((time.total_time().as_secs_f32() - 2.0 / 60.0).abs() < 1e-4);
    }

    #[test]
    fn interval_handles_huge_accumulation() {
        let mut timer = IntervalTimer::new(1.0);
        assert_eq!(timer.tick(3.0e7), 29_999_999);
        assert!(timer.remainder() <= timer.period());
        assert_eq!(timer.tick(0.5), 1);
        assert!((timer.remainder() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn interval_exact_multiple_keeps_one_period() {
        let mut timer = IntervalTimer::new(1.0);
        assert_eq!(timer.tick(2.0), 1);
        assert_eq!(timer.remainder(), 1.0);
    }
}
