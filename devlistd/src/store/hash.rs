use sha2::{Sha256, Digest};
use shared::types::Device;

/// Computes a SHA-256 fingerprint of a device list.
/// Order is significant: the same devices in another order render differently.
pub fn compute_hash(devices: &[Device]) -> String {
    let mut hasher = Sha256::new();
    for device in devices {
        // Device only holds strings, numbers and vectors, so this cannot fail
        if let Ok(json) = serde_json::to_vec(device) {
            hasher.update(&json);
        }
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
