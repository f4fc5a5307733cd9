//! Fixed-timestep frame loop.
//!
//! Simulation runs at a fixed rate decoupled from rendering through an
//! accumulator; the render callback receives the interpolation alpha between the
//! last two simulation states.

use std::time::Instant;
use tracing::warn;

/// Default simulation timestep: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame time fed into the accumulator. Longer frames are clamped and the
/// simulation slows down instead of running dozens of catch-up steps.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Fixed-timestep loop state.
pub struct GameLoop {
    step: f64,
    previous_time: Instant,
    accumulator: f64,
    total_sim_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl GameLoop {
    /// A 60 Hz loop starting now.
    pub fn new() -> Self {
        Self::with_rate(60)
    }

    /// A loop stepping `rate` times per simulated second. A rate of zero falls
    /// back to 60 Hz.
    pub fn with_rate(rate: u32) -> Self {
        let step = if rate == 0 { FIXED_DT } else { 1.0 / rate as f64 };
        Self {
            step,
            previous_time: Instant::now(),
            accumulator: 0.0,
            total_sim_time: 0.0,
            frame_count: 0,
            update_count: 0,
        }
    }

    /// Seconds per simulation step.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Run one frame timed by the wall clock.
    pub fn tick<E>(
        &mut self,
        update_fn: impl FnMut(f64, f64) -> Result<(), E>,
        render_fn: impl FnMut(f64) -> Result<(), E>,
    ) -> Result<(), E> {
        let current_time = Instant::now();
        let frame_time = current_time
            .duration_since(self.previous_time)
            .as_secs_f64();
        self.previous_time = current_time;
        self.advance(frame_time, update_fn, render_fn)
    }

    /// Run one frame that took `frame_time` seconds.
    ///
    /// - `update_fn(step, total_sim_time)` runs zero or more times at the fixed rate.
    /// - `render_fn(alpha)` runs exactly once with `alpha` in `[0.0, 1.0)`.
    ///
    /// An error from either callback ends the frame and is returned.
    pub fn advance<E>(
        &mut self,
        frame_time: f64,
        mut update_fn: impl FnMut(f64, f64) -> Result<(), E>,
        mut render_fn: impl FnMut(f64) -> Result<(), E>,
    ) -> Result<(), E> {
        self.begin_frame(frame_time);
        while let Some((step, sim_time)) = self.next_step() {
            update_fn(step, sim_time)?;
        }
        render_fn(self.alpha())?;
        self.end_frame();
        Ok(())
    }

    /// Add `frame_time` seconds to the accumulator.
    pub fn begin_frame(&mut self, frame_time: f64) {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }
        self.accumulator += frame_time;
    }

    /// Consume one due simulation step, returning the step length and the
    /// simulated time it starts at.
    pub fn next_step(&mut self) -> Option<(f64, f64)> {
        if self.accumulator < self.step {
            return None;
        }
        let start = self.total_sim_time;
        self.total_sim_time += self.step;
        self.accumulator -= self.step;
        self.update_count += 1;
        Some((self.step, start))
    }

    /// Close the frame, returning the interpolation alpha.
    pub fn end_frame(&mut self) -> f64 {
        self.frame_count += 1;
        self.alpha()
    }

    /// Interpolation alpha without running a frame.
    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / self.step
        } else {
            0.0
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Simulated seconds so far.
    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}
