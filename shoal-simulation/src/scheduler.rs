//! Tick scheduler: the only component with ordering responsibility.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use rayon::prelude::*;

use glam::Vec3;
use shoal_config::SchoolConfig;
use shoal_core::{RandomStreams, Transform};

use crate::feed::RenderFeed;
use crate::grid::SpatialHashGrid;
use crate::school::SchoolState;
use crate::steer::steer_agent;
use crate::SimulationError;

/// Agents handed to one unit of parallel work.
const DISPATCH_BATCH: usize = 8;

/// Phases of one tick, strictly sequential. `Dispatch` fans the update step
/// out across the worker pool and `Await` is the barrier after it: the
/// parallel-for only returns once every batch has completed, so `Publish`
/// can never observe a half-written store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    SyncAgentStore,
    RebuildGrid,
    Dispatch,
    Await,
    Publish,
    Throttle,
}

/// Owns the agent store, the grid and the school state, and drives the
/// per-tick phase machine from a single control thread.
pub struct TickScheduler {
    school: SchoolState,
    streams: RandomStreams,
    tick_interval: Duration,
    /// Previous-tick transforms: shared read-only during dispatch.
    previous: Vec<Transform>,
    /// Current-tick transforms: disjoint per-slot writes during dispatch.
    current: Vec<Transform>,
    grid: SpatialHashGrid,
    feed: RenderFeed,
    phase: TickPhase,
    ticks: u64,
    elapsed_seconds: f32,
}

impl TickScheduler {
    /// Validate the configuration and allocate both agent buffers up front.
    /// All agents start at the school's home position with identity
    /// orientation and unit scale.
    pub fn new(config: &SchoolConfig) -> Result<Self, SimulationError> {
        config.validate()?;

        let seed_transform = Transform::from_position(Vec3::from(config.home_position));
        let mut current = Vec::new();
        current.try_reserve_exact(config.population)?;
        current.resize(config.population, seed_transform);

        let mut previous = Vec::new();
        previous.try_reserve_exact(config.population)?;
        previous.resize(config.population, seed_transform);

        let feed = RenderFeed::new(&current);
        debug!(
            "scheduler ready: {} agents, tick interval {:?}",
            config.population,
            Duration::from_secs_f32(config.tick_interval)
        );

        Ok(Self {
            school: SchoolState::from_config(config),
            streams: RandomStreams::new(config.random_seed),
            tick_interval: Duration::from_secs_f32(config.tick_interval),
            previous,
            current,
            grid: SpatialHashGrid::new(config.cell_size),
            feed,
            phase: TickPhase::Idle,
            ticks: 0,
            elapsed_seconds: 0.0,
        })
    }

    /// Clonable handle for the render path.
    pub fn feed(&self) -> RenderFeed {
        self.feed.clone()
    }

    pub fn population(&self) -> usize {
        self.current.len()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn school(&self) -> &SchoolState {
        &self.school
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    fn set_phase(&mut self, phase: TickPhase) {
        trace!("tick {}: {:?}", self.ticks, phase);
        self.phase = phase;
    }

    /// Advance the simulation by one tick with an explicit delta time.
    ///
    /// Exposed separately from [`run`](Self::run) so tests and benchmarks
    /// can drive the phase machine deterministically.
    pub fn tick(&mut self, delta_time: f32) {
        self.set_phase(TickPhase::SyncAgentStore);
        self.elapsed_seconds += delta_time;
        self.school.advance(self.elapsed_seconds);
        self.previous.copy_from_slice(&self.current);

        self.set_phase(TickPhase::RebuildGrid);
        self.grid.rebuild(&self.previous);

        self.set_phase(TickPhase::Dispatch);
        let school = &self.school;
        let previous = &self.previous;
        let grid = &self.grid;
        let streams = self.streams;
        let tick = self.ticks;
        self.current
            .par_chunks_mut(DISPATCH_BATCH)
            .enumerate()
            .for_each(|(batch, slots)| {
                let base = batch * DISPATCH_BATCH;
                for (offset, slot) in slots.iter_mut().enumerate() {
                    let index = base + offset;
                    let mut rng = streams.agent_rng(tick, index);
                    *slot = steer_agent(index, previous, grid, school, delta_time, &mut rng);
                }
            });
        // The parallel-for has returned: every batch is done.
        self.set_phase(TickPhase::Await);

        self.set_phase(TickPhase::Publish);
        self.feed.publish(&self.current);

        self.ticks += 1;
    }

    /// Drive the tick loop until `shutdown` is raised or `max_ticks` have
    /// run, throttled to the configured tick interval. Delta time is
    /// wall-clock between dispatches, independent of the render cadence.
    ///
    /// `on_tick` receives each tick's busy duration (throttle excluded).
    pub fn run(
        &mut self,
        shutdown: &AtomicBool,
        max_ticks: Option<u64>,
        mut on_tick: impl FnMut(Duration),
    ) {
        let sleeper = spin_sleep::SpinSleeper::default();
        let mut last_start = Instant::now();

        while !shutdown.load(Ordering::Relaxed) {
            if let Some(limit) = max_ticks {
                if self.ticks >= limit {
                    break;
                }
            }

            let start = Instant::now();
            let delta_time = start.duration_since(last_start).as_secs_f32();
            last_start = start;

            let tick_index = self.ticks;
            self.tick(delta_time);

            let spent = start.elapsed();
            on_tick(spent);
            if spent > self.tick_interval {
                warn!(
                    "tick {} overran its interval: {:?} > {:?}",
                    tick_index, spent, self.tick_interval
                );
            }

            self.set_phase(TickPhase::Throttle);
            if let Some(remaining) = self.tick_interval.checked_sub(spent) {
                sleeper.sleep(remaining);
            }
        }

        // No dispatch can be in flight here: the parallel-for inside `tick`
        // is synchronous, so shutdown always lands on a completed tick and
        // the store and grid may be dropped safely.
        self.set_phase(TickPhase::Idle);
        debug!("scheduler stopped after {} ticks", self.ticks);
    }
}
