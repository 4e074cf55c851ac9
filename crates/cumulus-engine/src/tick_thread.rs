//! Tick thread state and main loop for the realtime driver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use cumulus_core::{InjectionReceipt, InjectionRequest};
use tracing::warn;

use crate::engine::SeedingEngine;

/// A batch of injection requests with a channel for the receipts.
pub(crate) struct InjectionBatch {
    pub requests: Vec<InjectionRequest>,
    pub reply: Sender<Vec<InjectionReceipt>>,
}

/// Counters returned by the tick thread when it exits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TickThreadStats {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub requests: u64,
}

/// State held by the tick thread's main loop.
pub(crate) struct TickThreadState {
    engine: Arc<SeedingEngine>,
    request_rx: Receiver<InjectionBatch>,
    shutdown_flag: Arc<AtomicBool>,
    tick_interval: Duration,
    sim_seconds_per_tick: f64,
    stats: TickThreadStats,
}

impl TickThreadState {
    pub fn new(
        engine: Arc<SeedingEngine>,
        request_rx: Receiver<InjectionBatch>,
        shutdown_flag: Arc<AtomicBool>,
        tick_interval: Duration,
        sim_seconds_per_tick: f64,
    ) -> Self {
        Self {
            engine,
            request_rx,
            shutdown_flag,
            tick_interval,
            sim_seconds_per_tick,
            stats: TickThreadStats::default(),
        }
    }

    /// Main loop. Runs until `shutdown_flag` is set.
    ///
    /// Each iteration waits out the tick interval, applies every queued
    /// injection, then advances the engine by one tick.
    pub fn run(mut self) -> TickThreadStats {
        let mut tick_start = Instant::now();
        loop {
            if !self.wait_until(tick_start + self.tick_interval) {
                break;
            }
            tick_start = Instant::now();

            self.drain_requests();

            match self.engine.update(self.sim_seconds_per_tick) {
                Ok(_) => self.stats.ticks += 1,
                Err(e) => {
                    self.stats.failed_ticks += 1;
                    warn!(error = %e, "realtime tick failed");
                }
            }
        }
        self.stats
    }

    /// Park until `deadline`. Returns `false` if shutdown was requested.
    ///
    /// `park_timeout` rather than `sleep`, so `unpark()` from shutdown
    /// wakes the thread immediately.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.shutdown_flag.load(Ordering::Acquire) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::park_timeout(deadline - now);
        }
    }

    fn drain_requests(&mut self) {
        while let Ok(batch) = self.request_rx.try_recv() {
            self.stats.requests += batch.requests.len() as u64;
            let receipts = batch
                .requests
                .into_iter()
                .map(|r| self.engine.submit(r))
                .collect();
            // The submitter may have dropped its receiver.
            let _ = batch.reply.send(receipts);
        }
    }
}
