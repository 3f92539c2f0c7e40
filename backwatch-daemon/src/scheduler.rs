//! Debounce Scheduler: coalesce a burst of change notifications into one
//! deferred sync pass.
//!
//! [`DebounceState`] is the whole decision logic, driven by an injected clock.
//! [`DebounceScheduler`] owns one actor task that feeds it notifications and
//! timer expiries, and runs passes on the blocking pool so intake never waits
//! on rsync or git.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use backwatch_sync::{SyncExecutor, SyncResult};

use crate::error::DaemonError;

/// Something that can run one synchronization pass to completion.
pub trait SyncPass: Send + Sync + 'static {
    fn sync_once(&self) -> SyncResult;
}

impl SyncPass for SyncExecutor {
    fn sync_once(&self) -> SyncResult {
        SyncExecutor::sync_once(self)
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A pass is pending; `generation` identifies this arm cycle's trigger.
    Armed { deadline: Instant, generation: u64 },
}

/// What a timer expiry turned out to mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Quiet period elapsed: run a pass now.
    Fire,
    /// A newer notification re-armed the machine; this trigger does nothing.
    Stale,
    /// Quiet period elapsed while a pass is still running; one re-run is queued.
    Coalesced,
}

#[derive(Debug)]
pub struct DebounceState {
    interval: Duration,
    phase: Phase,
    generation: u64,
    in_flight: bool,
    rerun_pending: bool,
}

impl DebounceState {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            phase: Phase::Idle,
            generation: 0,
            in_flight: false,
            rerun_pending: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Arm, or push the deadline of the live arm cycle out to `now + interval`.
    ///
    /// The previous trigger is superseded: its generation no longer matches.
    pub fn on_notification(&mut self, now: Instant) -> Phase {
        self.generation += 1;
        self.phase = Phase::Armed {
            deadline: now + self.interval,
            generation: self.generation,
        };
        self.phase
    }

    /// Decide what the trigger scheduled for `generation` does at `now`.
    pub fn on_trigger(&mut self, generation: u64, now: Instant) -> TriggerDecision {
        match self.phase {
            Phase::Armed {
                deadline,
                generation: live,
            } if live == generation && now >= deadline => {
                self.phase = Phase::Idle;
                if self.in_flight {
                    self.rerun_pending = true;
                    TriggerDecision::Coalesced
                } else {
                    self.in_flight = true;
                    TriggerDecision::Fire
                }
            }
            _ => TriggerDecision::Stale,
        }
    }

    /// Mark the running pass finished. Returns `true` when a coalesced re-run
    /// should start immediately.
    ///
    /// If the machine was re-armed meanwhile, the queued re-run is dropped:
    /// the armed trigger will cover it once activity is quiet again.
    pub fn on_pass_finished(&mut self) -> bool {
        self.in_flight = false;
        if !std::mem::take(&mut self.rerun_pending) {
            return false;
        }
        if self.phase == Phase::Idle {
            self.in_flight = true;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Observable scheduler transitions, mainly for tests and status reporting.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Armed { deadline: Instant },
    Fired { at: Instant },
    Coalesced { at: Instant },
    PassFinished { result: SyncResult },
}

#[derive(Debug)]
enum Command {
    Notify(PathBuf),
    Shutdown,
}

/// Cloneable intake side of a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Report that something under `path` changed. Never blocks.
    pub fn notify(&self, path: PathBuf) -> Result<(), DaemonError> {
        self.tx
            .send(Command::Notify(path))
            .map_err(|_| DaemonError::ChannelClosed("scheduler intake"))
    }
}

pub struct DebounceScheduler {
    handle: SchedulerHandle,
    task: JoinHandle<()>,
}

impl DebounceScheduler {
    pub fn spawn(interval: Duration, pass: Arc<dyn SyncPass>) -> Self {
        Self::spawn_inner(interval, pass, None)
    }

    /// Like [`spawn`](Self::spawn), also returning a stream of [`SchedulerEvent`]s.
    pub fn spawn_with_events(
        interval: Duration,
        pass: Arc<dyn SyncPass>,
    ) -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (Self::spawn_inner(interval, pass, Some(events_tx)), events_rx)
    }

    fn spawn_inner(
        interval: Duration,
        pass: Arc<dyn SyncPass>,
        events: Option<mpsc::UnboundedSender<SchedulerEvent>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor {
            state: DebounceState::new(interval),
            pass,
            events,
        };
        let task = tokio::spawn(actor.run(rx));
        Self {
            handle: SchedulerHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn notify(&self, path: PathBuf) -> Result<(), DaemonError> {
        self.handle.notify(path)
    }

    /// Stop intake and join the actor. A pass already running is not
    /// interrupted; it finishes on the blocking pool.
    pub async fn shutdown(self) -> Result<(), DaemonError> {
        let _ = self.handle.tx.send(Command::Shutdown);
        self.task.await.map_err(|err| DaemonError::Join {
            task: "scheduler",
            message: err.to_string(),
        })
    }
}

struct Actor {
    state: DebounceState,
    pass: Arc<dyn SyncPass>,
    events: Option<mpsc::UnboundedSender<SchedulerEvent>>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut running: Option<JoinHandle<SyncResult>> = None;

        loop {
            let armed = match self.state.phase() {
                Phase::Armed {
                    deadline,
                    generation,
                } => Some((deadline, generation)),
                Phase::Idle => None,
            };

            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Notify(path)) => {
                        if let Phase::Armed { deadline, .. } = self.state.on_notification(Instant::now()) {
                            tracing::debug!(target: "scheduler", path = %path.display(), "change noted; sync deferred");
                            self.emit(SchedulerEvent::Armed { deadline });
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = sleep_until_armed(armed), if armed.is_some() => {
                    let Some((_, generation)) = armed else { continue };
                    let now = Instant::now();
                    match self.state.on_trigger(generation, now) {
                        TriggerDecision::Fire => {
                            tracing::info!(
                                target: "scheduler",
                                "quiet for {:?}; starting sync pass",
                                self.state.interval()
                            );
                            self.emit(SchedulerEvent::Fired { at: now });
                            running = Some(self.start_pass());
                        }
                        TriggerDecision::Coalesced => {
                            tracing::info!(target: "scheduler", "sync pass still running; queued one re-run");
                            self.emit(SchedulerEvent::Coalesced { at: now });
                        }
                        TriggerDecision::Stale => {}
                    }
                }
                joined = wait_for_pass(&mut running), if running.is_some() => {
                    running = None;
                    match joined {
                        Ok(result) => self.emit(SchedulerEvent::PassFinished { result }),
                        Err(err) => tracing::error!(target: "scheduler", error = %err, "sync pass panicked"),
                    }
                    if self.state.on_pass_finished() {
                        let now = Instant::now();
                        tracing::info!(target: "scheduler", "running queued sync pass");
                        self.emit(SchedulerEvent::Fired { at: now });
                        running = Some(self.start_pass());
                    }
                }
            }
        }

        if running.is_some() {
            tracing::info!(target: "scheduler", "sync pass still running at shutdown; leaving it to finish");
        }
    }

    fn start_pass(&self) -> JoinHandle<SyncResult> {
        let pass = self.pass.clone();
        tokio::task::spawn_blocking(move || pass.sync_once())
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

async fn sleep_until_armed(armed: Option<(Instant, u64)>) {
    match armed {
        Some((deadline, _)) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_for_pass(
    running: &mut Option<JoinHandle<SyncResult>>,
) -> Result<SyncResult, JoinError> {
    match running {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
