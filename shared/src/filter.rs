use serde::{Serialize, Deserialize};
use crate::types::Device;

/// Case-insensitive search over the fields a user can see in the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    needle: String,
}

impl DeviceFilter {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.trim().to_lowercase(),
        }
    }

    pub fn query(&self) -> &str {
        &self.needle
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, device: &Device) -> bool {
        if self.needle.is_empty() {
            return true;
        }

        let info = &device.device;
        let interface = &device.net_settings.interface;

        let fields = [
            Some(info.uuid.as_str()),
            info.name.as_deref(),
            info.device_type.as_deref(),
            info.family_type.as_deref(),
            info.firmware_version.as_deref(),
            info.hardware_id.as_deref(),
            Some(interface.name.as_str()),
        ];

        fields.iter().flatten().any(|f| self.contains(f))
            || interface.ipv4.iter().any(|a| self.contains(&a.address))
            || interface.ipv6.iter().any(|a| self.contains(&a.address))
    }

    fn contains(&self, field: &str) -> bool {
        field.to_lowercase().contains(&self.needle)
    }
}

/// Ordering of rows in the rendered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Order in which devices were first announced
    #[default]
    Announced,
    Uuid,
    Name,
}

impl SortOrder {
    pub fn apply(self, devices: &mut [Device]) {
        match self {
            SortOrder::Announced => {}
            SortOrder::Uuid => devices.sort_by_cached_key(|d| d.path()),
            SortOrder::Name => {
                devices.sort_by_cached_key(|d| (d.display_name().to_lowercase(), d.path()))
            }
        }
    }
}

/// Builds the list the consumer should render from a store snapshot.
pub fn present(snapshot: &[Device], filter: &DeviceFilter, order: SortOrder) -> Vec<Device> {
    let mut rows: Vec<Device> = snapshot
        .iter()
        .filter(|d| filter.matches(d))
        .cloned()
        .collect();
    order.apply(&mut rows);
    rows
}
