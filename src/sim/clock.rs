//! Fixed timestep clock
//!
//! Frame deltas go into an accumulator; each whole step runs one
//! update + render pair. Updates stop once the session reaches a terminal
//! phase, but rendering continues so the final frame is always shown.

use super::error::SimError;
use super::input::{InputMapper, IntentSet};
use super::session::{Phase, Rules, Session, Snapshot};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS};

/// Anything the clock can drive
pub trait Simulation {
    fn phase(&self) -> Phase;
    fn update(&mut self, intent: &IntentSet) -> Result<(), SimError>;
    fn snapshot(&self) -> Snapshot;
}

impl<R: Rules> Simulation for Session<R> {
    fn phase(&self) -> Phase {
        Session::phase(self)
    }

    fn update(&mut self, intent: &IntentSet) -> Result<(), SimError> {
        Session::update(self, intent)
    }

    fn snapshot(&self) -> Snapshot {
        Session::snapshot(self)
    }
}

#[derive(Debug, Clone)]
pub struct Clock {
    /// Seconds per tick
    step: f32,
    max_substeps: u32,
    max_frame_dt: f32,
    accumulator: f32,
    running: bool,
    ticks: u64,
}

impl Clock {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT.max(step),
            accumulator: 0.0,
            running: true,
            ticks: 0,
        }
    }

    pub fn with_limits(mut self, max_substeps: u32, max_frame_dt: f32) -> Self {
        self.max_substeps = max_substeps.max(1);
        self.max_frame_dt = max_frame_dt.max(self.step);
        self
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop driving the simulation. There is no in-flight work to unwind.
    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Feed a frame delta and run as many whole ticks as it covers (capped).
    /// Returns the number of ticks run.
    pub fn advance<S: Simulation>(
        &mut self,
        frame_dt: f32,
        sim: &mut S,
        input: &mut InputMapper,
        mut render: impl FnMut(&Snapshot),
    ) -> Result<u32, SimError> {
        if !self.running {
            return Ok(0);
        }
        self.accumulator += frame_dt.clamp(0.0, self.max_frame_dt);

        let mut substeps = 0;
        while self.accumulator >= self.step && substeps < self.max_substeps {
            self.accumulator -= self.step;
            self.tick(sim, input, &mut render)?;
            substeps += 1;
        }
        Ok(substeps)
    }

    /// Run exactly one update + render pair. An update error stops the clock
    /// and is returned.
    pub fn tick<S: Simulation>(
        &mut self,
        sim: &mut S,
        input: &mut InputMapper,
        mut render: impl FnMut(&Snapshot),
    ) -> Result<(), SimError> {
        if !self.running {
            return Ok(());
        }
        if sim.phase() == Phase::Playing {
            let intent = input.sample_intent();
            if let Err(e) = sim.update(&intent) {
                self.stop();
                return Err(e);
            }
        }
        render(&sim.snapshot());
        self.ticks += 1;
        Ok(())
    }
}
