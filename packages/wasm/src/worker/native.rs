//! Threaded run loop for native hosts.
//!
//! The simulation lives on its own named thread. Commands go in over one
//! channel, ticks come out over another, and a [`FrameClock`] paces the
//! steps. Physics state never leaves the thread.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::message::{Command, Event, LoadRequest};
use crate::error::{Result, SimulationError};
use crate::simulation::{Simulation, SimulationConfig};

/// Paces the run loop.
pub trait FrameClock: Send + 'static {
    /// Block until the next step is due.
    fn wait_for_frame(&mut self);

    /// Forget pacing history; the next frame is due immediately.
    fn reset(&mut self) {}

    /// Change the time between frames.
    fn set_interval(&mut self, _interval: Duration) {}
}

/// Fixed-interval pacing.
///
/// A late frame pushes the schedule back instead of being made up, so a
/// stalled host never produces a burst of catch-up steps.
#[derive(Debug, Clone)]
pub struct IntervalClock {
    interval: Duration,
    next: Option<Instant>,
}

impl IntervalClock {
    /// Tick every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// Tick once per configured time step.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.clone().sanitized().frame_interval())
    }
}

impl FrameClock for IntervalClock {
    fn wait_for_frame(&mut self) {
        let now = Instant::now();
        let due = self.next.unwrap_or(now);
        if due > now {
            thread::sleep(due - now);
        }
        self.next = Some(due.max(now) + self.interval);
    }

    fn reset(&mut self) {
        self.next = None;
    }

    fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

/// Running flag shared between the handle and the loop.
///
/// Commands are sent and drained while holding it, and a step is emitted
/// while holding it, so once [`SimulationWorker::stop`] returns no further
/// tick is produced.
#[derive(Default)]
struct RunGate {
    running: Mutex<bool>,
}

impl RunGate {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to a simulation running on its own thread.
///
/// Dropping the handle shuts the thread down and joins it.
pub struct SimulationWorker {
    commands: Option<Sender<Command>>,
    gate: Arc<RunGate>,
    thread: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Start a worker paced at the configured time step.
    ///
    /// Returns the handle and the stream of outbound events.
    pub fn spawn(config: SimulationConfig) -> Result<(Self, Receiver<Event>)> {
        let clock = IntervalClock::from_config(&config);
        Self::spawn_with_clock(config, clock)
    }

    /// Start a worker with a custom clock.
    pub fn spawn_with_clock<C: FrameClock>(
        config: SimulationConfig,
        clock: C,
    ) -> Result<(Self, Receiver<Event>)> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let gate = Arc::new(RunGate::default());

        let thread = thread::Builder::new().name("force-simulation".into()).spawn({
            let gate = Arc::clone(&gate);
            move || run(Simulation::new(config), command_rx, event_tx, gate, clock)
        })?;

        let worker = Self {
            commands: Some(command_tx),
            gate,
            thread: Some(thread),
        };
        Ok((worker, event_rx))
    }

    /// Load a dataset from scratch and start stepping.
    pub fn init(&self, request: LoadRequest) -> Result<()> {
        self.start(Command::Init(request))
    }

    /// Replace the dataset and keep (or start) stepping.
    pub fn update(&self, request: LoadRequest) -> Result<()> {
        self.start(Command::Update(request))
    }

    /// Halt the loop.
    ///
    /// Idempotent. No tick is emitted after this returns until the next
    /// `init` or `update`.
    pub fn stop(&self) -> Result<()> {
        let mut running = self.gate.lock();
        *running = false;
        self.send(Command::Stop)
    }

    /// Dispatch a decoded command.
    pub fn post(&self, command: Command) -> Result<()> {
        match command {
            Command::Stop => self.stop(),
            command => self.start(command),
        }
    }

    /// Whether the loop is currently stepping.
    pub fn is_running(&self) -> bool {
        *self.gate.lock()
    }

    fn start(&self, command: Command) -> Result<()> {
        let mut running = self.gate.lock();
        self.send(command)?;
        *running = true;
        Ok(())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or(SimulationError::Disconnected)?
            .send(command)
            .map_err(|_| SimulationError::Disconnected)
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        *self.gate.lock() = false;
        // disconnecting the channel ends the loop
        self.commands.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("simulation thread panicked");
            }
        }
    }
}

fn run<C: FrameClock>(
    mut sim: Simulation,
    commands: Receiver<Command>,
    events: Sender<Event>,
    gate: Arc<RunGate>,
    mut clock: C,
) {
    loop {
        if !*gate.lock() {
            // idle: nothing to step until the driver speaks
            let Ok(command) = commands.recv() else {
                break;
            };
            let _running = gate.lock();
            apply(&mut sim, command, &mut clock);
            continue;
        }

        {
            let running = gate.lock();
            loop {
                match commands.try_recv() {
                    Ok(command) => apply(&mut sim, command, &mut clock),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if *running {
                sim.tick();
                if events.send(Event::Tick(sim.snapshot())).is_err() {
                    tracing::debug!("tick receiver dropped; ending simulation loop");
                    return;
                }
            }
        }

        clock.wait_for_frame();
    }
    tracing::debug!("simulation loop finished");
}

fn apply<C: FrameClock>(sim: &mut Simulation, command: Command, clock: &mut C) {
    match command {
        Command::Init(request) => {
            if let Some(config) = request.config {
                sim.set_config(config);
                clock.set_interval(sim.config().frame_interval());
            }
            sim.initialize(&request.data, request.width, request.height);
            clock.reset();
            tracing::debug!(nodes = sim.node_count(), links = sim.link_count(), "simulation started");
        }
        Command::Update(request) => {
            if let Some(config) = request.config {
                sim.set_config(config);
                clock.set_interval(sim.config().frame_interval());
            }
            sim.replace_dataset(&request.data, request.width, request.height);
            clock.reset();
            tracing::debug!(nodes = sim.node_count(), links = sim.link_count(), "simulation updated");
        }
        Command::Stop => tracing::debug!(steps = sim.steps(), "simulation stopped"),
    }
}
