//! `likemirror requeue` — give failed tracks another attempt.

use anyhow::{Context, Result};
use clap::Args;

use likemirror_core::TrackId;
use likemirror_sync::{StateStore, SyncState};

#[derive(Args, Debug)]
pub struct RequeueArgs {
    /// Track ids to remove from the failed record.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub ids: Vec<String>,

    /// Clear the whole failed record.
    #[arg(long)]
    pub all: bool,
}

impl RequeueArgs {
    pub fn run(self) -> Result<()> {
        let state_dir = likemirror_core::config::state_dir()
            .context("failed to resolve the state directory")?;
        let store = StateStore::new(state_dir);
        let mut state = SyncState::load_from(&store);

        let requeued = if self.all {
            state.requeue_all()
        } else {
            let ids: Vec<TrackId> = self.ids.into_iter().map(TrackId::from).collect();
            let requeued = state.requeue(&ids);
            for id in ids.iter().filter(|id| !requeued.contains(id)) {
                println!("  ·  {id} is not in the failed record");
            }
            requeued.len()
        };

        if requeued == 0 {
            println!("✓ nothing to requeue");
            return Ok(());
        }

        state
            .save_to(&store)
            .with_context(|| format!("failed to save state in {}", store.dir().display()))?;
        println!("✓ requeued {requeued} track(s); they will be retried on the next cycle");
        Ok(())
    }
}
