//! `likemirror daemon` — periodic cycles in the foreground until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use likemirror_core::Config;
use likemirror_daemon::{init_tracing, start_blocking, DaemonOptions};

#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Minutes between cycle starts; overrides the configured interval.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_minutes: Option<u64>,

    /// Log as JSON lines instead of human-readable text.
    #[arg(long)]
    pub log_json: bool,
}

impl DaemonArgs {
    pub fn run(self) -> Result<()> {
        let config = Config::load().context("failed to load configuration")?;
        init_tracing(self.log_json);

        let interval = self
            .interval_minutes
            .map(|minutes| Duration::from_secs(minutes * 60))
            .unwrap_or(config.interval);
        let options = DaemonOptions {
            interval,
            state_dir: Some(config.state_dir.clone()),
        };

        let orchestrator = Arc::new(super::build_orchestrator(&config));
        start_blocking(orchestrator, options).context("daemon exited with error")?;
        Ok(())
    }
}
