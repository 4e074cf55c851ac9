//! Background simulation loop at a fixed wall-clock cadence.
//!
//! [`RealtimeWorld`] owns a tick thread that advances a shared
//! [`SeedingEngine`] by `sim_seconds_per_tick` every `tick_interval`.
//! Injection requests are queued on a bounded channel and applied at the
//! next tick boundary; queries read the engine's snapshots directly and
//! never wait for the tick thread.
//!
//! ```text
//! Host thread(s)                  Tick thread
//!     |                               |
//!     |--submit()-------------------->| park_timeout(interval)
//!     |   [request_tx: bounded(N)]    | request_rx.try_recv()
//!     |<--receipts via reply_tx-------| engine.submit(request)
//!     |                               | engine.update(sim_seconds)
//!     |--rainfall() / status()        |
//!     |   engine.snapshot()           |
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use cumulus_core::{HazardStatus, InjectionReceipt, InjectionRequest, Position};
use tracing::{info, warn};

use crate::config::{ConfigError, EngineConfig, RealtimeConfig};
use crate::engine::{EngineSnapshot, SeedingEngine};
use crate::tick_thread::{InjectionBatch, TickThreadState, TickThreadStats};

// ── Error types ──────────────────────────────────────────────────

/// Error submitting injections to the tick thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitError {
    /// The tick thread has shut down.
    Shutdown,
    /// The request channel is full (back-pressure).
    ChannelFull,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "tick thread has shut down"),
            Self::ChannelFull => write!(f, "injection request channel full"),
        }
    }
}

impl std::error::Error for SubmitError {}

// ── ShutdownReport ───────────────────────────────────────────────

/// Report from [`RealtimeWorld::shutdown`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Total time spent shutting down.
    pub total_ms: u64,
    /// Whether the tick thread was joined successfully.
    pub tick_joined: bool,
    /// Ticks completed by the thread.
    pub ticks: u64,
    /// Ticks whose update returned an error.
    pub failed_ticks: u64,
    /// Injection requests applied.
    pub requests: u64,
}

// ── PendingReceipts ──────────────────────────────────────────────

/// Receipts for a submitted batch, delivered at the next tick boundary.
#[derive(Debug)]
pub struct PendingReceipts {
    reply_rx: Receiver<Vec<InjectionReceipt>>,
}

impl PendingReceipts {
    /// Block until the tick thread has applied the batch.
    pub fn wait(self) -> Result<Vec<InjectionReceipt>, SubmitError> {
        self.reply_rx.recv().map_err(|_| SubmitError::Shutdown)
    }

    /// Block for at most `timeout`. `Ok(None)` if the batch is still
    /// queued.
    pub fn wait_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<Vec<InjectionReceipt>>, SubmitError> {
        match self.reply_rx.recv_timeout(timeout) {
            Ok(receipts) => Ok(Some(receipts)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SubmitError::Shutdown),
        }
    }
}

// ── RealtimeWorld ────────────────────────────────────────────────

/// A [`SeedingEngine`] advanced by a background thread.
pub struct RealtimeWorld {
    engine: Arc<SeedingEngine>,
    request_tx: Option<Sender<InjectionBatch>>,
    shutdown_flag: Arc<AtomicBool>,
    tick_thread: Option<JoinHandle<TickThreadStats>>,
    config: RealtimeConfig,
}

impl RealtimeWorld {
    /// Initialise an engine and start its tick thread.
    pub fn new(engine_config: EngineConfig, config: RealtimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = SeedingEngine::init(engine_config)?;
        Self::with_engine(Arc::new(engine), config)
    }

    /// Start a tick thread driving an existing engine.
    ///
    /// Other holders of `engine` keep full access; their writes interleave
    /// with the tick thread's under the engine's writer mutex.
    pub fn with_engine(
        engine: Arc<SeedingEngine>,
        config: RealtimeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let (request_tx, request_rx) = crossbeam_channel::bounded(config.request_queue_capacity);

        let state = TickThreadState::new(
            Arc::clone(&engine),
            request_rx,
            Arc::clone(&shutdown_flag),
            config.tick_interval,
            config.sim_seconds_per_tick,
        );
        let tick_thread = thread::Builder::new()
            .name("cumulus-tick".into())
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        info!(
            tick_interval_ms = config.tick_interval.as_millis() as u64,
            sim_seconds_per_tick = config.sim_seconds_per_tick,
            "realtime driver started"
        );
        Ok(Self {
            engine,
            request_tx: Some(request_tx),
            shutdown_flag,
            tick_thread: Some(tick_thread),
            config,
        })
    }

    /// Queue a batch of injections for the next tick boundary.
    ///
    /// Never blocks. The receipts arrive through the returned handle.
    pub fn submit(&self, requests: Vec<InjectionRequest>) -> Result<PendingReceipts, SubmitError> {
        let request_tx = self.request_tx.as_ref().ok_or(SubmitError::Shutdown)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let batch = InjectionBatch {
            requests,
            reply: reply_tx,
        };
        request_tx.try_send(batch).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::ChannelFull,
            TrySendError::Disconnected(_) => SubmitError::Shutdown,
        })?;
        Ok(PendingReceipts { reply_rx })
    }

    /// Queue one injection and wait for its receipt.
    ///
    /// Blocks until the next tick boundary, at most one `tick_interval`.
    pub fn add_injection(
        &self,
        position: Position,
        intensity: f32,
        lift_km: f32,
    ) -> Result<InjectionReceipt, SubmitError> {
        let pending = self.submit(vec![InjectionRequest::new(position, intensity, lift_km)])?;
        pending
            .wait()?
            .into_iter()
            .next()
            .ok_or(SubmitError::Shutdown)
    }

    /// The shared engine.
    pub fn engine(&self) -> &Arc<SeedingEngine> {
        &self.engine
    }

    /// Driver settings.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.engine.snapshot()
    }

    /// Aggregate rainfall, mm.
    pub fn rainfall(&self) -> f32 {
        self.engine.rainfall()
    }

    /// Resources remaining.
    pub fn resources(&self) -> u32 {
        self.engine.resources()
    }

    /// Hazard status.
    pub fn status(&self) -> HazardStatus {
        self.engine.status()
    }

    /// Hazard status label.
    pub fn status_label(&self) -> &'static str {
        self.engine.status_label()
    }

    /// `true` exactly when the status is critical.
    pub fn is_emergency(&self) -> bool {
        self.engine.is_emergency()
    }

    /// Reset the engine in place. The tick thread keeps running.
    pub fn reset(&self) {
        self.engine.reset();
    }

    /// Whether the tick thread is still running.
    pub fn is_running(&self) -> bool {
        self.tick_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop and join the tick thread.
    ///
    /// Requests still queued are dropped; their submitters see
    /// [`SubmitError::Shutdown`]. Calling this again is a no-op.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let Some(handle) = self.tick_thread.take() else {
            return ShutdownReport {
                tick_joined: true,
                ..ShutdownReport::default()
            };
        };
        let start = Instant::now();

        self.shutdown_flag.store(true, Ordering::Release);
        self.request_tx.take();
        handle.thread().unpark();

        let (tick_joined, stats) = match handle.join() {
            Ok(stats) => (true, stats),
            Err(_) => {
                warn!("tick thread panicked");
                (false, TickThreadStats::default())
            }
        };
        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            tick_joined,
            ticks: stats.ticks,
            failed_ticks: stats.failed_ticks,
            requests: stats.requests,
        };
        info!(
            ticks = report.ticks,
            failed_ticks = report.failed_ticks,
            total_ms = report.total_ms,
            "realtime driver stopped"
        );
        report
    }
}

impl fmt::Debug for RealtimeWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeWorld")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for RealtimeWorld {
    fn drop(&mut self) {
        self.shutdown();
    }
}
