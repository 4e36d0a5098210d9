//! Fan-out of the sample stream to its consumers.
//!
//! One task owns the decision of how each incoming sample reaches the UI,
//! the metrics engine, and the exporter without letting any consumer slow
//! the others: channel deliveries are non-blocking (full buffer = drop),
//! while the engine and exporter are updated synchronously for every
//! sample.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::exporter::PingExporter;
use crate::metrics::{Engine, Stats};
use crate::sample::Sample;

/// Fans out samples to the UI, the metrics engine, and the exporter.
pub struct Distributor {
    engine: Arc<Engine>,
    exporter: Option<Arc<PingExporter>>,
    ui_tx: mpsc::Sender<Sample>,
    stats_tx: mpsc::Sender<Stats>,
}

impl Distributor {
    pub fn new(
        engine: Arc<Engine>,
        exporter: Option<Arc<PingExporter>>,
        ui_tx: mpsc::Sender<Sample>,
        stats_tx: mpsc::Sender<Stats>,
    ) -> Self {
        Self { engine, exporter, ui_tx, stats_tx }
    }

    /// Consume samples until the inbound channel closes.
    ///
    /// Returning drops the outbound senders, which closes each consumer
    /// channel exactly once.
    pub async fn run(self, mut samples: mpsc::Receiver<Sample>) {
        while let Some(sample) = samples.recv().await {
            // UI display freshness is best-effort; a full buffer means the
            // sample simply doesn't reach the scroll-back.
            if let Err(TrySendError::Full(_)) = self.ui_tx.try_send(sample) {
                debug!("ui channel full, dropping sample");
            }

            // Every sample is accounted for in the aggregates.
            self.engine.add(sample);
            let stats = self.engine.stats();

            if let Err(TrySendError::Full(_)) = self.stats_tx.try_send(stats.clone()) {
                debug!("stats channel full, dropping snapshot");
            }

            // Export is push-based and always current-value; the freshly
            // computed snapshot supersedes whatever was there.
            if let Some(ref exporter) = self.exporter {
                exporter.update(&stats);
            }
        }

        debug!("sample stream closed, stopping fan-out");
    }
}
