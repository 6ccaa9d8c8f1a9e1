use chrono::{DateTime, Duration, Utc};
use shared::protocol::MAX_EXPIRATION_SECS;
use shared::types::{CommunicationPath, Device};

/// A device together with the bookkeeping the store keeps about it.
#[derive(Debug, Clone)]
pub struct StoredDevice {
    pub device: Device,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Ordered in-memory store of announced devices, keyed by communication path.
/// New paths are appended, re-announcements keep their position.
pub struct DeviceStore {
    entries: Vec<StoredDevice>,
    default_expiration_secs: u64,
}

impl DeviceStore {
    pub fn new(default_expiration_secs: u64) -> Self {
        Self {
            entries: Vec::new(),
            default_expiration_secs,
        }
    }

    /// Insert or refresh a device. Returns true if the list content changed.
    pub fn upsert(&mut self, device: Device, now: DateTime<Utc>) -> bool {
        let expires_at = self.expires_at(&device, now);
        let path = device.path();

        match self.entries.iter_mut().find(|e| e.device.has_path(&path)) {
            Some(entry) => {
                entry.last_seen = now;
                entry.expires_at = expires_at;
                if entry.device == device {
                    return false;
                }
                entry.device = device;
                true
            }
            None => {
                self.entries.push(StoredDevice {
                    device,
                    first_seen: now,
                    last_seen: now,
                    expires_at,
                });
                true
            }
        }
    }

    /// Remove the entry with the given path. Returns true if one was removed.
    pub fn remove(&mut self, path: &CommunicationPath) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !e.device.has_path(path));
        self.entries.len() != before
    }

    /// All entries of one device, across interfaces and routers
    pub fn by_uuid(&self, uuid: &str) -> Vec<StoredDevice> {
        self.entries
            .iter()
            .filter(|e| e.device.uuid() == uuid)
            .cloned()
            .collect()
    }

    /// Current device list in store order
    pub fn devices(&self) -> Vec<Device> {
        self.entries.iter().map(|e| e.device.clone()).collect()
    }

    /// Drop every entry whose announcement has expired. Returns how many were dropped.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            let alive = e.expires_at > now;
            if !alive {
                tracing::debug!("Announcement of {} expired", e.device.path());
            }
            alive
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Expiry of an announcement seen at `now`, capped at `MAX_EXPIRATION_SECS`
    fn expires_at(&self, device: &Device, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = match device.expiration {
            0 => self.default_expiration_secs,
            secs => secs,
        };
        if secs > MAX_EXPIRATION_SECS {
            tracing::warn!(
                "Announcement of {} asks for {}s, capping at {}s",
                device.path(),
                secs,
                MAX_EXPIRATION_SECS
            );
        }

        i64::try_from(secs.min(MAX_EXPIRATION_SECS))
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::{DeviceInfo, Interface, Ipv4Entry, NetSettings};

    fn test_device(uuid: &str, interface: &str) -> Device {
        Device {
            api_version: Some("1.0".to_string()),
            device: DeviceInfo {
                uuid: uuid.to_string(),
                name: Some("bench".to_string()),
                device_type: Some("MX410B".to_string()),
                family_type: None,
                firmware_version: None,
                hardware_id: None,
                is_router: false,
            },
            net_settings: NetSettings {
                interface: Interface {
                    name: interface.to_string(),
                    interface_type: None,
                    description: None,
                    ipv4: vec![Ipv4Entry {
                        address: "172.19.2.2".to_string(),
                        netmask: "255.255.0.0".to_string(),
                    }],
                    ipv6: Vec::new(),
                    configuration_methods: Vec::new(),
                },
                default_gateway: None,
            },
            router: None,
            services: Vec::new(),
            expiration: 10,
        }
    }

    #[test]
    fn test_upsert_detects_changes() {
        let mut store = DeviceStore::new(30);
        let now = Utc::now();
        let mut device = test_device("A", "eth0");

        assert!(store.upsert(device.clone(), now), "First insert should report change");
        assert!(!store.upsert(device.clone(), now), "Identical upsert should not report change");

        device.net_settings.interface.ipv4[0].address = "172.19.2.3".to_string();
        assert!(store.upsert(device, now), "Modified device should report change");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut store = DeviceStore::new(30);
        let now = Utc::now();

        store.upsert(test_device("A", "eth0"), now);
        store.upsert(test_device("B", "eth0"), now);
        store.upsert(test_device("A", "eth1"), now);

        let mut renamed = test_device("A", "eth0");
        renamed.device.name = Some("renamed".to_string());
        store.upsert(renamed, now);

        let order: Vec<String> = store.devices().iter().map(|d| d.path().to_string()).collect();
        assert_eq!(order, vec!["A/eth0", "B/eth0", "A/eth1"]);
        assert_eq!(store.by_uuid("A").len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut store = DeviceStore::new(30);
        let device = test_device("A", "eth0");
        store.upsert(device.clone(), Utc::now());

        assert!(store.remove(&device.path()));
        assert!(!store.remove(&device.path()));
        assert!(store.by_uuid("A").is_empty());
    }

    #[test]
    fn test_expire_uses_announced_or_default_lifetime() {
        let mut store = DeviceStore::new(60);
        let now = Utc::now();

        let short = test_device("A", "eth0");
        let mut defaulted = test_device("B", "eth0");
        defaulted.expiration = 0;

        store.upsert(short, now);
        store.upsert(defaulted, now);

        assert_eq!(store.expire(now + Duration::seconds(5)), 0);
        assert_eq!(store.expire(now + Duration::seconds(11)), 1);
        assert_eq!(store.devices()[0].uuid(), "B");
        assert_eq!(store.expire(now + Duration::seconds(61)), 1);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_huge_expiration_is_capped() {
        let mut store = DeviceStore::new(30);
        let now = Utc::now();
        let cap = Duration::seconds(MAX_EXPIRATION_SECS as i64);

        let mut large = test_device("A", "eth0");
        large.expiration = 1_000_000_000_000_000;
        let mut max = test_device("B", "eth0");
        max.expiration = u64::MAX;

        assert!(store.upsert(large, now));
        assert!(store.upsert(max, now));

        assert_eq!(store.expire(now), 0, "capped announcements must not expire at once");
        assert_eq!(store.by_uuid("A")[0].expires_at, now + cap);
        assert_eq!(store.by_uuid("B")[0].expires_at, now + cap);
        assert_eq!(store.expire(now + cap - Duration::seconds(1)), 0);
        assert_eq!(store.expire(now + cap), 2);
    }

    #[test]
    fn test_huge_default_expiration_is_capped() {
        let mut store = DeviceStore::new(u64::MAX);
        let now = Utc::now();
        let mut device = test_device("A", "eth0");
        device.expiration = 0;

        store.upsert(device, now);

        let cap = Duration::seconds(MAX_EXPIRATION_SECS as i64);
        assert_eq!(store.by_uuid("A")[0].expires_at, now + cap);
        assert_eq!(store.expire(now + Duration::seconds(60)), 0);
    }

    #[test]
    fn test_refresh_extends_lifetime() {
        let mut store = DeviceStore::new(60);
        let now = Utc::now();
        let device = test_device("A", "eth0");

        store.upsert(device.clone(), now);
        store.upsert(device.clone(), now + Duration::seconds(8));

        assert_eq!(store.expire(now + Duration::seconds(12)), 0);
        let entry = &store.by_uuid("A")[0];
        assert_eq!(entry.first_seen, now);
        assert_eq!(entry.last_seen, now + Duration::seconds(8));
    }
}
