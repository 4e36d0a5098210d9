//! Application orchestration.
//!
//! Wires the pipeline together: the ping runner feeds the sample channel,
//! the distributor fans out to the UI channels, the metrics engine, and
//! the optional exporter, and the TUI runs on the main task until the
//! user quits or the pipeline ends.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::distributor::Distributor;
use crate::errors::MonitorError;
use crate::exporter::PingExporter;
use crate::metrics::{Engine, Stats};
use crate::parser::Platform;
use crate::runner::Runner;
use crate::tui::{TuiController, TuiState};

/// How long shutdown waits for background tasks before giving up.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Orchestrates all components of pingmon.
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the monitor until the user quits; returns the final statistics.
    pub async fn run(self) -> Result<Stats, MonitorError> {
        let engine = Arc::new(Engine::new());

        let exporter = match self.config.exporter_addr {
            Some(addr) => Some(PingExporter::install(addr, &self.config.target)?),
            None => None,
        };

        let (sample_tx, sample_rx) = mpsc::channel(self.config.sample_buffer);
        let (ui_tx, ui_rx) = mpsc::channel(self.config.ui_buffer);
        let (stats_tx, stats_rx) = mpsc::channel(self.config.stats_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = Runner::new(
            self.config.target.clone(),
            self.config.interval,
            Platform::current(),
        );
        let runner_task = tokio::spawn(runner.run(sample_tx, shutdown_rx));

        let distributor = Distributor::new(engine.clone(), exporter, ui_tx, stats_tx);
        let distributor_task = tokio::spawn(distributor.run(sample_rx));

        let mut state =
            TuiState::new(self.config.target.clone(), self.config.history_size);
        let ui_result = {
            let mut controller = TuiController::new()?;
            let result = tokio::select! {
                result = controller.run(&mut state, ui_rx, stats_rx) => result,
                _ = tokio::signal::ctrl_c() => Ok(()),
            };
            // Leave the alternate screen before anything prints to stdio.
            controller.restore();
            result
        };

        let _ = shutdown_tx.send(true);

        let runner_result =
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, runner_task).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!("ping runner task failed: {e}");
                    Ok(())
                }
                Err(_) => {
                    warn!("ping runner did not stop within {SHUTDOWN_TIMEOUT:?}");
                    Ok(())
                }
            };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, distributor_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("distributor task failed: {e}"),
            Err(_) => warn!("distributor did not stop within {SHUTDOWN_TIMEOUT:?}"),
        }

        // A runner failure (ping missing, abnormal exit) is the story worth
        // telling over a secondary UI teardown error.
        runner_result?;
        ui_result?;

        Ok(engine.stats())
    }
}
