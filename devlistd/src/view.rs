use std::sync::Arc;
use std::thread;
use tokio::sync::watch;
use shared::edit::{EditSink, ListMirror};
use shared::types::Device;
use crate::store::hash;

/// Messages from the presenter to the view thread
#[derive(Debug)]
pub enum ViewMessage {
    Remove(usize),
    Add(usize, Device),
    Update(usize, Device),
    Move(usize, usize),
    /// End of a reconciliation pass; carries the fingerprint of the expected rows
    Commit(String),
    Shutdown,
}

/// What the view currently shows
#[derive(Debug, Clone, Default)]
pub struct RenderedList {
    pub rows: Arc<Vec<Device>>,
    pub fingerprint: String,
}

/// Spawn the view thread. It owns the rendered rows and publishes them after every pass.
pub fn spawn(
    rx: flume::Receiver<ViewMessage>,
    rendered_tx: watch::Sender<RenderedList>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut mirror: ListMirror<Device> = ListMirror::default();

        while let Ok(msg) = rx.recv() {
            match msg {
                ViewMessage::Remove(position) => {
                    tracing::debug!("Row {} removed", position);
                    mirror.on_remove_at(position);
                }
                ViewMessage::Add(position, device) => {
                    tracing::debug!("Row {} added: {}", position, device.display_name());
                    mirror.on_add_at(position, &device);
                }
                ViewMessage::Update(position, device) => {
                    tracing::debug!("Row {} updated: {}", position, device.display_name());
                    mirror.on_update_at(position, &device);
                }
                ViewMessage::Move(from, to) => {
                    tracing::debug!("Row {} moved to {}", from, to);
                    mirror.on_move_at(from, to);
                }
                ViewMessage::Commit(fingerprint) => {
                    if mirror.rejected() > 0 {
                        tracing::warn!("{} edits referenced rows outside the list", mirror.rejected());
                    }
                    let actual = hash::compute_hash(mirror.rows());
                    if actual != fingerprint {
                        tracing::warn!("Rendered rows diverged from presenter ({} != {})", actual, fingerprint);
                    }
                    let _ = rendered_tx.send(RenderedList {
                        rows: Arc::new(mirror.rows().to_vec()),
                        fingerprint: actual,
                    });
                }
                ViewMessage::Shutdown => {
                    tracing::info!("View thread shutting down");
                    break;
                }
            }
        }
    })
}
