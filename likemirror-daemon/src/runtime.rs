use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use likemirror_sync::{CycleReport, Orchestrator};

use crate::error::{io_err, DaemonError};
use crate::last_cycle::{self, outcome_label};

/// One unit of scheduled work. Runs on the blocking pool.
pub trait SyncCycle: Send + Sync + 'static {
    fn run_cycle(&self) -> CycleReport;
}

impl SyncCycle for Orchestrator {
    fn run_cycle(&self) -> CycleReport {
        Orchestrator::run_cycle(self)
    }
}

#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub interval: Duration,
    /// Where to write `last_cycle.json`; `None` disables the record.
    pub state_dir: Option<PathBuf>,
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking<C: SyncCycle>(cycle: Arc<C>, options: DaemonOptions) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(cycle, options))
}

/// Run cycles until ctrl-c.
pub async fn run<C: SyncCycle>(cycle: Arc<C>, options: DaemonOptions) -> Result<(), DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    tracing::info!(
        interval_secs = options.interval.as_secs(),
        "likemirror daemon started"
    );

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result = scheduler_task(cycle, options, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err.to_string())),
                    }
                }
            }
        })
    };

    let (scheduler_result, signal_result) = tokio::join!(scheduler_handle, signal_handle);
    handle_join("scheduler", scheduler_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("likemirror daemon stopped");
    Ok(())
}

/// Run a cycle immediately, then once per interval. Cycles never overlap: a
/// cycle that outlasts the interval swallows the ticks it missed. Shutdown is
/// observed between cycles; a running cycle is allowed to finish.
pub(crate) async fn scheduler_task<C: SyncCycle>(
    cycle: Arc<C>,
    options: DaemonOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(options.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let cycle = cycle.clone();
                match tokio::task::spawn_blocking(move || cycle.run_cycle()).await {
                    Ok(report) => on_cycle_finished(&report, options.state_dir.as_deref()),
                    // A panicking cycle must not take the daemon down.
                    Err(err) => tracing::error!(error = %err, "sync cycle aborted"),
                }
            }
        }
    }
    Ok(())
}

fn on_cycle_finished(report: &CycleReport, state_dir: Option<&std::path::Path>) {
    tracing::info!(
        outcome = outcome_label(report.outcome),
        listed = report.listed,
        candidates = report.candidates,
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        duration_ms = report.duration_ms as u64,
        "sync cycle complete"
    );
    for failure in &report.failed {
        tracing::warn!(
            id = %failure.id,
            title = %failure.title,
            kind = failure.kind,
            reason = %failure.reason,
            "track failed"
        );
    }

    if let Some(dir) = state_dir {
        if let Err(err) = last_cycle::record(dir, report) {
            tracing::warn!(error = %err, "could not record last cycle");
        }
    }
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            reason: err.to_string(),
        }),
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
/// Records emitted through the `log` facade are captured as well.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
