//! Generic monitoring agent
//!
//! An agent pairs a [`Collector`] with a [`Processor`] and runs them on a schedule in its own task.
//!
//! ```text
//!            ┌────────────────────────────────────────────────────────┐
//!            │                                                        │
//!            ▼                                                        │
//! collect() ─┬─ Ok ──> process() ─> wait until cycle start + interval ─┤
//!            │                                                        │
//!            └─ Err ─> log ───────> wait error backoff ───────────────┘
//!                                        ▲
//!                                        └── Commands (CollectNow, UpdateInterval, GetStats, Stop)
//! ```
//!
//! A failed cycle never ends the loop. `stop()` is observed by the wait; an in-flight cycle always
//! runs to completion first.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, instrument, trace, warn};

use crate::{config::Config, error::CollectionError, monitors::collector::Collector};

use super::messages::{AgentCommand, AgentState, AgentStats};

/// The "store" half of an agent cycle. Runs only for successful collections.
#[async_trait]
pub trait Processor<T: Send + 'static>: Send + 'static {
    async fn process(&mut self, output: T);
}

/// Timing of an agent's cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Time between the starts of two successful cycles
    pub interval: Duration,

    /// Time to wait after a failed cycle
    pub error_backoff: Duration,
}

impl Schedule {
    pub fn new(interval: Duration, error_backoff: Duration) -> Self {
        Self {
            interval,
            error_backoff,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(5))
    }
}

impl From<&Config> for Schedule {
    fn from(config: &Config) -> Self {
        Self::new(config.interval(), config.backoff())
    }
}

/// A configured agent that has not been started yet
pub struct Agent<C, P> {
    name: String,
    collector: C,
    processor: P,
    schedule: Schedule,
    state: Arc<watch::Sender<AgentState>>,
}

impl<C, P> Agent<C, P>
where
    C: Collector,
    P: Processor<C::Output>,
{
    pub fn new(name: impl Into<String>, collector: C, processor: P, schedule: Schedule) -> Self {
        let (state, _) = watch::channel(AgentState::Stopped);

        Self {
            name: name.into(),
            collector,
            processor,
            schedule,
            state: Arc::new(state),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observe the lifecycle state. Available before the agent is started.
    pub fn state_watch(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Spawn the agent loop and return a handle to control it
    ///
    /// The first cycle starts immediately.
    pub fn start(self) -> AgentHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        self.state.send_replace(AgentState::Running);

        let handle = AgentHandle {
            name: self.name.clone(),
            sender: cmd_tx,
            state: self.state.clone(),
        };

        let actor = AgentActor {
            name: self.name,
            collector: self.collector,
            processor: self.processor,
            schedule: self.schedule,
            command_rx: cmd_rx,
            state: self.state,
            stats: AgentStats::default(),
        };

        tokio::spawn(actor.run());

        handle
    }
}

/// Type-erased start, so agents with different collectors can be launched together
pub trait Launch: Send {
    fn name(&self) -> &str;

    fn launch(self: Box<Self>) -> AgentHandle;
}

impl<C, P> Launch for Agent<C, P>
where
    C: Collector,
    P: Processor<C::Output>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn launch(self: Box<Self>) -> AgentHandle {
        (*self).start()
    }
}

/// Upper bound on a single wait, about thirty years
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `start + delay`, capped so huge intervals cannot overflow the clock
fn deadline_after(start: Instant, delay: Duration) -> Instant {
    start
        .checked_add(delay.min(FAR_FUTURE))
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}

enum Flow {
    Continue,
    Stop,
}

struct AgentActor<C, P> {
    name: String,
    collector: C,
    processor: P,
    schedule: Schedule,
    command_rx: mpsc::Receiver<AgentCommand>,
    state: Arc<watch::Sender<AgentState>>,
    stats: AgentStats,
}

impl<C, P> AgentActor<C, P>
where
    C: Collector,
    P: Processor<C::Output>,
{
    #[instrument(skip(self), fields(agent = %self.name))]
    async fn run(mut self) {
        debug!("starting agent");

        loop {
            if *self.state.borrow() != AgentState::Running {
                break;
            }

            let started = Instant::now();
            let deadline = match self.cycle().await {
                Ok(()) => deadline_after(started, self.schedule.interval),
                Err(_) => deadline_after(Instant::now(), self.schedule.error_backoff),
            };

            if let Flow::Stop = self.wait(deadline).await {
                break;
            }
        }

        debug!("agent stopped");
    }

    /// Wait for the deadline while serving commands
    async fn wait(&mut self, deadline: Instant) -> Flow {
        let sleep = sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,

                command = self.command_rx.recv() => match command {
                    Some(AgentCommand::CollectNow { respond_to }) => {
                        debug!("received CollectNow command");
                        let result = self.cycle().await;
                        let _ = respond_to.send(result);
                    }

                    Some(AgentCommand::UpdateInterval { interval }) => {
                        debug!("updating interval to {interval:?}");
                        self.schedule.interval = interval;
                    }

                    Some(AgentCommand::GetStats { respond_to }) => {
                        let _ = respond_to.send(self.stats.clone());
                    }

                    Some(AgentCommand::Stop) => {
                        debug!("received stop command");
                        return Flow::Stop;
                    }

                    None => {
                        warn!("command channel closed, shutting down");
                        return Flow::Stop;
                    }
                }
            }
        }
    }

    async fn cycle(&mut self) -> Result<(), CollectionError> {
        match self.collector.collect().await {
            Ok(output) => {
                self.processor.process(output).await;
                self.stats.record_success();
                trace!("cycle {} completed", self.stats.completed_cycles);
                Ok(())
            }
            Err(e) => {
                error!("collection failed: {e}");
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }
}

impl<C, P> Drop for AgentActor<C, P> {
    fn drop(&mut self) {
        self.state.send_replace(AgentState::Stopped);
    }
}

/// Handle for controlling a running agent
///
/// Cheap to clone; all clones control the same agent.
#[derive(Clone)]
pub struct AgentHandle {
    name: String,
    sender: mpsc::Sender<AgentCommand>,
    state: Arc<watch::Sender<AgentState>>,
}

impl AgentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Signal the agent to stop. Returns without waiting for the in-flight cycle.
    ///
    /// Calling this on an agent that is not running has no effect.
    pub async fn stop(&self) {
        let signalled = self.state.send_if_modified(|state| {
            if *state == AgentState::Running {
                *state = AgentState::Stopping;
                true
            } else {
                false
            }
        });

        if signalled && self.sender.send(AgentCommand::Stop).await.is_err() {
            trace!("agent {} already exited", self.name);
        }
    }

    /// Resolve once the agent loop has exited
    pub async fn stopped(&self) {
        let mut state = self.state.subscribe();
        // The sender lives in `self`, so this cannot fail while we wait.
        let _ = state.wait_for(|state| *state == AgentState::Stopped).await;
    }

    /// Wait up to `timeout` for the agent loop to exit. Returns whether it did.
    pub async fn wait_stopped(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.stopped()).await.is_ok()
    }

    /// Run one cycle now and return its outcome
    pub async fn collect_now(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AgentCommand::CollectNow { respond_to: tx })
            .await
            .context("failed to send CollectNow command")?;

        rx.await.context("failed to receive response")??;
        Ok(())
    }

    pub async fn update_interval(&self, interval: Duration) -> anyhow::Result<()> {
        self.sender
            .send(AgentCommand::UpdateInterval { interval })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn stats(&self) -> anyhow::Result<AgentStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(AgentCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }
}
