//! Fixed-timestep game loop.
//!
//! The [`GameLoop`] decouples simulation rate from display rate. The host
//! calls [`GameLoop::frame`] once per display callback with its clock
//! reading; the loop:
//!
//! 1. Measures `delta = now - last`, clamped to `max_frame_delta` so a stall
//!    (a backgrounded window, a debugger pause) does not cause an unbounded
//!    catch-up burst.
//! 2. Adds it to the accumulator.
//! 3. While the accumulator holds at least one `fixed_dt`, runs exactly one
//!    simulation step and subtracts `fixed_dt`.
//!
//! The caller renders once afterwards. Because every step consumes exactly
//! `fixed_dt` of simulated time, the same sequence of steps produces the same
//! state no matter how the host's callbacks were spaced.
//!
//! # Example
//!
//! ```
//! use ember_engine::tick::GameLoop;
//!
//! let mut game_loop = GameLoop::new(1.0 / 64.0, 0.25);
//! game_loop.start(0.0);
//!
//! let mut steps = 0;
//! let report = game_loop.frame(0.0625, |_dt| steps += 1);
//!
//! assert_eq!(report.steps, 4);
//! assert_eq!(steps, 4);
//! assert_eq!(game_loop.tick_count(), 4);
//! ```

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::EngineConfig;

// ---------------------------------------------------------------------------
// LoopState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Stopped,
    Running,
    Paused,
}

// ---------------------------------------------------------------------------
// FrameReport / TickDiagnostics
// ---------------------------------------------------------------------------

/// What one host callback did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Fixed steps run during this callback.
    pub steps: u32,
    /// Seconds added to the accumulator (after clamping).
    pub delta: f64,
    /// Whether the raw delta exceeded `max_frame_delta`.
    pub clamped: bool,
    /// Leftover accumulator as a fraction of `fixed_dt`, in `[0, 1)`.
    pub alpha: f64,
}

/// Timing diagnostics for the last callback.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time of each fixed step, in execution order.
    pub step_times: Vec<Duration>,
    /// Total time spent inside [`GameLoop::frame`].
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// GameLoop
// ---------------------------------------------------------------------------

/// Accumulator-driven fixed-timestep driver.
///
/// The loop owns time only. The step body is supplied per callback, so the
/// caller decides what a simulation step does (the [`Engine`] runs the
/// active scene and physics).
///
/// [`Engine`]: crate::engine::Engine
#[derive(Debug)]
pub struct GameLoop {
    fixed_dt: f64,
    max_frame_delta: f64,
    accumulator: f64,
    last_time: Option<f64>,
    tick_counter: u64,
    state: LoopState,
    last_diagnostics: TickDiagnostics,
}

impl GameLoop {
    /// # Panics
    ///
    /// Panics if `fixed_dt` is not positive and finite, or if
    /// `max_frame_delta` is not positive.
    pub fn new(fixed_dt: f64, max_frame_delta: f64) -> Self {
        assert!(
            fixed_dt > 0.0 && fixed_dt.is_finite(),
            "fixed_dt must be positive and finite, got {fixed_dt}"
        );
        assert!(
            max_frame_delta > 0.0,
            "max_frame_delta must be positive, got {max_frame_delta}"
        );
        Self {
            fixed_dt,
            max_frame_delta,
            accumulator: 0.0,
            last_time: None,
            tick_counter: 0,
            state: LoopState::Stopped,
            last_diagnostics: TickDiagnostics::default(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.fixed_dt, config.max_frame_delta)
    }

    // -- control ------------------------------------------------------------

    /// Begin running with `now` as the reference time. No-op while running.
    pub fn start(&mut self, now: f64) {
        if self.state == LoopState::Running {
            return;
        }
        self.state = LoopState::Running;
        self.last_time = Some(now);
        self.accumulator = 0.0;
        debug!(fixed_dt = self.fixed_dt, "game loop started");
    }

    /// Stop scheduling steps and drop any accumulated time.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            debug!(ticks = self.tick_counter, "game loop stopped");
        }
        self.state = LoopState::Stopped;
        self.last_time = None;
        self.accumulator = 0.0;
    }

    pub fn pause(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
            debug!(ticks = self.tick_counter, "game loop paused");
        }
    }

    /// Resume from a pause. Time spent paused is not simulated.
    pub fn resume(&mut self, now: f64) {
        if self.state == LoopState::Paused {
            self.state = LoopState::Running;
            self.last_time = Some(now);
            debug!(ticks = self.tick_counter, "game loop resumed");
        }
    }

    // -- stepping -----------------------------------------------------------

    /// Handle one host callback at time `now` (seconds), running `step` once
    /// per due fixed step. Returns an empty report unless running.
    ///
    /// A clock that goes backwards contributes no time.
    pub fn frame<F>(&mut self, now: f64, mut step: F) -> FrameReport
    where
        F: FnMut(f64),
    {
        if self.state != LoopState::Running {
            return FrameReport {
                alpha: self.alpha(),
                ..FrameReport::default()
            };
        }

        let frame_start = Instant::now();
        let last = self.last_time.replace(now).unwrap_or(now);
        let raw = (now - last).max(0.0);
        let clamped = raw > self.max_frame_delta;
        let delta = raw.min(self.max_frame_delta);
        self.accumulator += delta;

        let mut steps = 0;
        let mut step_times = Vec::new();
        while self.accumulator >= self.fixed_dt {
            let step_start = Instant::now();
            step(self.fixed_dt);
            self.accumulator -= self.fixed_dt;
            self.tick_counter += 1;
            steps += 1;
            step_times.push(step_start.elapsed());
        }

        if clamped {
            debug!(raw_delta = raw, max = self.max_frame_delta, "frame delta clamped");
        }
        self.last_diagnostics = TickDiagnostics {
            step_times,
            total_time: frame_start.elapsed(),
        };

        FrameReport {
            steps,
            delta,
            clamped,
            alpha: self.alpha(),
        }
    }

    /// Run exactly one step outside the accumulator, whatever the state.
    /// Used by tools and tests that drive the simulation directly.
    pub fn step_once<F>(&mut self, step: F)
    where
        F: FnOnce(f64),
    {
        let step_start = Instant::now();
        step(self.fixed_dt);
        self.tick_counter += 1;
        let elapsed = step_start.elapsed();
        self.last_diagnostics = TickDiagnostics {
            step_times: vec![elapsed],
            total_time: elapsed,
        };
    }

    // -- accessors ----------------------------------------------------------

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated seconds: `ticks * fixed_dt`, computed by multiplication so
    /// it does not drift with accumulated rounding.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    pub fn max_frame_delta(&self) -> f64 {
        self.max_frame_delta
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn alpha(&self) -> f64 {
        self.accumulator / self.fixed_dt
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 64.0;

    fn running(now: f64) -> GameLoop {
        let mut game_loop = GameLoop::new(DT, 0.25);
        game_loop.start(now);
        game_loop
    }

    // -- 1. Construction ----------------------------------------------------

    #[test]
    fn new_loop_is_stopped_at_zero() {
        let game_loop = GameLoop::new(DT, 0.25);
        assert_eq!(game_loop.state(), LoopState::Stopped);
        assert_eq!(game_loop.tick_count(), 0);
        assert_eq!(game_loop.sim_time(), 0.0);
    }

    #[test]
    fn from_config_uses_60hz_default() {
        let game_loop = GameLoop::from_config(&EngineConfig::default());
        assert!((game_loop.fixed_dt() - 1.0 / 60.0).abs() < f64::EPSILON);
        assert_eq!(game_loop.max_frame_delta(), 0.25);
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn zero_dt_panics() {
        let _ = GameLoop::new(0.0, 0.25);
    }

    #[test]
    #[should_panic(expected = "fixed_dt must be positive")]
    fn infinity_dt_panics() {
        let _ = GameLoop::new(f64::INFINITY, 0.25);
    }

    // -- 2. Accumulation ----------------------------------------------------

    #[test]
    fn partial_frames_accumulate() {
        let mut game_loop = running(0.0);
        let mut steps = 0;

        let first = game_loop.frame(DT / 2.0, |_| steps += 1);
        assert_eq!(first.steps, 0);
        assert_eq!(first.alpha, 0.5);

        let second = game_loop.frame(DT, |_| steps += 1);
        assert_eq!(second.steps, 1);
        assert_eq!(second.alpha, 0.0);
        assert_eq!(steps, 1);
    }

    #[test]
    fn steps_receive_fixed_dt() {
        let mut game_loop = running(1.0);
        let mut seen = Vec::new();
        game_loop.frame(1.0 + 3.0 * DT, |dt| seen.push(dt));
        assert_eq!(seen, vec![DT, DT, DT]);
        assert_eq!(game_loop.sim_time(), 3.0 * DT);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut game_loop = running(0.0);
        let report = game_loop.frame(5.0, |_| {});
        assert!(report.clamped);
        assert_eq!(report.delta, 0.25);
        assert_eq!(report.steps, 16);
        assert_eq!(game_loop.last_diagnostics().step_times.len(), 16);
    }

    #[test]
    fn backwards_clock_adds_nothing() {
        let mut game_loop = running(10.0);
        let report = game_loop.frame(9.0, |_| {});
        assert_eq!(report.steps, 0);
        assert_eq!(report.delta, 0.0);
    }

    // -- 3. State control ---------------------------------------------------

    #[test]
    fn stopped_and_paused_loops_do_not_step() {
        let mut game_loop = GameLoop::new(DT, 0.25);
        assert_eq!(game_loop.frame(1.0, |_| panic!("stopped")).steps, 0);

        game_loop.start(0.0);
        game_loop.pause();
        assert_eq!(game_loop.frame(0.125, |_| panic!("paused")).steps, 0);
        assert_eq!(game_loop.state(), LoopState::Paused);
    }

    #[test]
    fn resume_skips_paused_time() {
        let mut game_loop = running(0.0);
        game_loop.pause();
        game_loop.resume(100.0);
        let report = game_loop.frame(100.0 + DT, |_| {});
        assert_eq!(report.steps, 1);
        assert!(!report.clamped);
    }

    #[test]
    fn stop_discards_accumulator() {
        let mut game_loop = running(0.0);
        game_loop.frame(DT / 2.0, |_| {});
        assert!(game_loop.accumulator() > 0.0);
        game_loop.stop();
        assert_eq!(game_loop.accumulator(), 0.0);
        assert_eq!(game_loop.state(), LoopState::Stopped);
    }

    #[test]
    fn step_once_ignores_state() {
        let mut game_loop = GameLoop::new(DT, 0.25);
        let mut ran = false;
        game_loop.step_once(|dt| ran = dt == DT);
        assert!(ran);
        assert_eq!(game_loop.tick_count(), 1);
    }

    // -- 4. Determinism -----------------------------------------------------

    #[test]
    fn callback_spacing_does_not_change_step_count() {
        let mut coarse = running(0.0);
        let mut fine = running(0.0);
        coarse.frame(0.25, |_| {});
        for i in 1..=32 {
            fine.frame(i as f64 * DT / 2.0, |_| {});
        }
        assert_eq!(coarse.tick_count(), 16);
        assert_eq!(fine.tick_count(), 16);
        assert_eq!(coarse.sim_time(), fine.sim_time());
    }
}
