pub mod daemon;
pub mod requeue;
pub mod status;
pub mod sync;

use likemirror_core::Config;
use likemirror_remote::{DropboxStore, SoundCloudLikes, UreqFetcher};
use likemirror_sync::{Orchestrator, SyncSettings};

/// Wire the production adapters into an [`Orchestrator`].
pub(crate) fn build_orchestrator(config: &Config) -> Orchestrator {
    let http = UreqFetcher::new();
    Orchestrator::new(
        SyncSettings::from_config(config),
        Box::new(SoundCloudLikes::new(http.clone(), config.soundcloud.clone())),
        Box::new(http),
        Box::new(DropboxStore::new(config.dropbox_token.clone())),
    )
}
