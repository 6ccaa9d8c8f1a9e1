use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use anyhow::{bail, Result};
use shared::edit::EditSink;
use shared::filter::{self, DeviceFilter, SortOrder};
use shared::reconcile::{reconcile, ReconcileSummary};
use shared::types::Device;
use crate::store::hash;
use crate::store_manager::Snapshot;
use crate::view::ViewMessage;

/// Forwards edits to the view thread, remembering if it went away
struct ChannelSink<'a> {
    tx: &'a flume::Sender<ViewMessage>,
    disconnected: bool,
}

impl<'a> ChannelSink<'a> {
    fn new(tx: &'a flume::Sender<ViewMessage>) -> Self {
        Self { tx, disconnected: false }
    }

    fn send(&mut self, msg: ViewMessage) {
        if self.tx.send(msg).is_err() {
            self.disconnected = true;
        }
    }
}

impl EditSink<Device> for ChannelSink<'_> {
    fn on_remove_at(&mut self, position: usize) {
        self.send(ViewMessage::Remove(position));
    }

    fn on_add_at(&mut self, position: usize, item: &Device) {
        self.send(ViewMessage::Add(position, item.clone()));
    }

    fn on_update_at(&mut self, position: usize, item: &Device) {
        self.send(ViewMessage::Update(position, item.clone()));
    }

    fn on_move_at(&mut self, from: usize, to: usize) {
        self.send(ViewMessage::Move(from, to));
    }
}

/// Keeps the list the view renders and brings it up to date one pass at a time.
pub struct Presenter {
    rows: Vec<Device>,
    order: SortOrder,
    committed: Option<String>,
    view_tx: flume::Sender<ViewMessage>,
}

impl Presenter {
    pub fn new(order: SortOrder, view_tx: flume::Sender<ViewMessage>) -> Self {
        Self {
            rows: Vec::new(),
            order,
            committed: None,
            view_tx,
        }
    }

    /// Run one reconciliation pass against a store snapshot
    pub fn present(&mut self, snapshot: &[Device], filter: &DeviceFilter) -> Result<ReconcileSummary> {
        let target = filter::present(snapshot, filter, self.order);
        let fingerprint = hash::compute_hash(&target);
        if self.committed.as_deref() == Some(fingerprint.as_str()) {
            return Ok(ReconcileSummary::default());
        }

        let mut sink = ChannelSink::new(&self.view_tx);
        let summary = match reconcile(&mut self.rows, &target, &mut sink) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!("Reconciliation failed, resynchronising list: {}", e);
                resync(&mut self.rows, &target, &mut sink)
            }
        };

        sink.send(ViewMessage::Commit(fingerprint.clone()));
        if sink.disconnected {
            bail!("View thread is gone");
        }

        if !summary.is_empty() {
            tracing::debug!(
                "Reconciled {} rows: {} removed, {} added, {} updated, {} moved",
                self.rows.len(),
                summary.removed,
                summary.added,
                summary.updated,
                summary.moved
            );
        }
        self.committed = Some(fingerprint);
        Ok(summary)
    }

    pub fn shutdown(&self) {
        let _ = self.view_tx.send(ViewMessage::Shutdown);
    }
}

/// Rebuild the view from scratch: drop every row, then add the target in order.
/// Used after a failed pass, when the working list can no longer be trusted.
fn resync<S: EditSink<Device>>(rows: &mut Vec<Device>, target: &[Device], sink: &mut S) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for position in (0..rows.len()).rev() {
        sink.on_remove_at(position);
        summary.removed += 1;
    }
    rows.clear();

    for (position, device) in target.iter().enumerate() {
        rows.push(device.clone());
        sink.on_add_at(position, device);
        summary.added += 1;
    }

    summary
}

/// Presenter event loop - reconciles on every snapshot or filter change
pub async fn run(
    mut presenter: Presenter,
    mut snapshot_rx: watch::Receiver<Snapshot>,
    mut filter_rx: watch::Receiver<DeviceFilter>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let snapshot = snapshot_rx.borrow_and_update().clone();
        let filter = filter_rx.borrow_and_update().clone();
        presenter.present(&snapshot, &filter)?;

        tokio::select! {
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    tracing::info!("Snapshot source closed");
                    break;
                }
            }
            changed = filter_rx.changed() => {
                if changed.is_err() {
                    tracing::info!("Filter source closed");
                    break;
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Presenter shutting down");
                break;
            }
        }
    }

    presenter.shutdown();
    Ok(())
}
