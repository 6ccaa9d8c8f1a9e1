use std::sync::Arc;
use std::thread;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use anyhow::Result;
use shared::types::{CommunicationPath, Device};
use crate::config::StoreConfig;
use crate::store::device_store::{DeviceStore, StoredDevice};
pub use crate::feed::reader::FeedEvent;

/// Immutable copy of the device list handed to readers
pub type Snapshot = Arc<Vec<Device>>;

/// Commands sent to the store thread
pub enum StoreCommand {
    Upsert(Device, oneshot::Sender<bool>),
    Remove(CommunicationPath, oneshot::Sender<bool>),
    GetAll(oneshot::Sender<Snapshot>),
    GetByUuid(String, oneshot::Sender<Vec<StoredDevice>>),
    Expire(oneshot::Sender<usize>),
    Shutdown,
}

/// Handle to interact with the device store
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    /// Spawn the store thread. Every change to the list is published on `snapshot_tx`.
    pub fn spawn(mut store: DeviceStore, snapshot_tx: watch::Sender<Snapshot>) -> Self {
        let (tx, mut rx) = mpsc::channel::<StoreCommand>(256);

        let publish = |store: &DeviceStore, snapshot_tx: &watch::Sender<Snapshot>| {
            let _ = snapshot_tx.send(Arc::new(store.devices()));
        };

        thread::spawn(move || {
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    StoreCommand::Upsert(device, reply) => {
                        let changed = store.upsert(device, Utc::now());
                        if changed {
                            publish(&store, &snapshot_tx);
                        }
                        let _ = reply.send(changed);
                    }
                    StoreCommand::Remove(path, reply) => {
                        let removed = store.remove(&path);
                        if removed {
                            publish(&store, &snapshot_tx);
                        }
                        let _ = reply.send(removed);
                    }
                    StoreCommand::GetAll(reply) => {
                        let _ = reply.send(Arc::new(store.devices()));
                    }
                    StoreCommand::GetByUuid(uuid, reply) => {
                        let _ = reply.send(store.by_uuid(&uuid));
                    }
                    StoreCommand::Expire(reply) => {
                        let expired = store.expire(Utc::now());
                        if expired > 0 {
                            tracing::info!("Expired {} device announcements, {} remain", expired, store.len());
                            publish(&store, &snapshot_tx);
                        }
                        let _ = reply.send(expired);
                    }
                    StoreCommand::Shutdown => {
                        tracing::info!("Store thread shutting down");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }

    /// Insert or refresh a device. Returns true if the list changed.
    pub async fn upsert(&self, device: Device) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Upsert(device, reply)).await?;
        Ok(rx.await?)
    }

    /// Remove a device entry. Returns true if it was present.
    pub async fn remove(&self, path: CommunicationPath) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Remove(path, reply)).await?;
        Ok(rx.await?)
    }

    /// Get the full device list
    pub async fn get_all(&self) -> Result<Snapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::GetAll(reply)).await?;
        Ok(rx.await?)
    }

    /// Get every entry of a device by uuid
    pub async fn get_by_uuid(&self, uuid: String) -> Result<Vec<StoredDevice>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::GetByUuid(uuid, reply)).await?;
        Ok(rx.await?)
    }

    /// Drop expired announcements
    pub async fn expire(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(StoreCommand::Expire(reply)).await?;
        Ok(rx.await?)
    }

    /// Shutdown the store thread
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(StoreCommand::Shutdown).await?;
        Ok(())
    }
}

/// Store manager event loop - bridges feed events to the store
pub async fn run(
    store: StoreHandle,
    mut rx: mpsc::Receiver<FeedEvent>,
    config: StoreConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut expiry_interval = tokio::time::interval(
        std::time::Duration::from_secs(config.expiry_interval_secs)
    );

    loop {
        tokio::select! {
            Some(event) = rx.recv() => {
                match event {
                    FeedEvent::Announce { device } => {
                        let path = device.path();
                        match store.upsert(device).await {
                            Ok(true) => tracing::debug!("Device {} changed", path),
                            Ok(false) => {}
                            Err(e) => tracing::error!("Failed to upsert device: {}", e),
                        }
                    }
                    FeedEvent::Vanish { path } => {
                        match store.remove(path.clone()).await {
                            Ok(true) => tracing::debug!("Device {} vanished", path),
                            Ok(false) => tracing::debug!("Vanish for unknown device {}", path),
                            Err(e) => tracing::error!("Failed to remove device: {}", e),
                        }
                    }
                }
            }
            _ = expiry_interval.tick() => {
                if let Err(e) = store.expire().await {
                    tracing::error!("Failed to expire devices: {}", e);
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Store manager shutting down");
                break;
            }
        }
    }

    Ok(())
}
