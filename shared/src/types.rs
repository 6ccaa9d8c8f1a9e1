use std::fmt;
use serde::{Serialize, Deserialize};

/// One observed device announcement.
/// This is the canonical data model used by the store, the reconciler and the API.
/// Field names follow the HBM announce parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Announce API version, e.g. "1.0"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub device: DeviceInfo,

    pub net_settings: NetSettings,

    /// Router the device was announced through, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<RouterInfo>,

    #[serde(default)]
    pub services: Vec<ServiceInfo>,

    /// Seconds the announcement stays valid. 0 means "use the configured default".
    #[serde(default)]
    pub expiration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub is_router: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetSettings {
    pub interface: Interface,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_gateway: Option<DefaultGateway>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    /// Interface name, e.g. "eth0". Part of the communication path.
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub interface_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ipv4: Vec<Ipv4Entry>,
    #[serde(default)]
    pub ipv6: Vec<Ipv6Entry>,
    #[serde(default)]
    pub configuration_methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Entry {
    pub address: String,
    pub netmask: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Entry {
    pub address: String,
    pub prefix: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultGateway {
    pub ipv4_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterInfo {
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(rename = "type")]
    pub service_type: String,
    pub port: u16,
}

/// Identity of a device in the list: the route over which it was heard.
/// The same device seen on two interfaces, or behind two routers, is two entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPath {
    pub device_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_uuid: Option<String>,
    pub interface_name: String,
}

impl fmt::Display for CommunicationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device_uuid)?;
        if let Some(router) = &self.router_uuid {
            write!(f, "@{}", router)?;
        }
        write!(f, "/{}", self.interface_name)
    }
}

/// Identity used by the reconciler to tell "same entry, maybe changed" from
/// "different entry". Must be coarser than `PartialEq`.
pub trait PathIdentity {
    fn same_path(&self, other: &Self) -> bool;
}

impl Device {
    pub fn uuid(&self) -> &str {
        &self.device.uuid
    }

    pub fn interface_name(&self) -> &str {
        &self.net_settings.interface.name
    }

    pub fn router_uuid(&self) -> Option<&str> {
        self.router.as_ref().map(|r| r.uuid.as_str())
    }

    /// Name shown in the list, falling back to the uuid for unnamed devices
    pub fn display_name(&self) -> &str {
        self.device.name.as_deref().unwrap_or(&self.device.uuid)
    }

    pub fn path(&self) -> CommunicationPath {
        CommunicationPath {
            device_uuid: self.device.uuid.clone(),
            router_uuid: self.router.as_ref().map(|r| r.uuid.clone()),
            interface_name: self.net_settings.interface.name.clone(),
        }
    }

    /// Compares against a path without allocating one for `self`
    pub fn has_path(&self, path: &CommunicationPath) -> bool {
        self.uuid() == path.device_uuid
            && self.router_uuid() == path.router_uuid.as_deref()
            && self.interface_name() == path.interface_name
    }
}

impl PathIdentity for Device {
    fn same_path(&self, other: &Self) -> bool {
        same_communication_path(self, other)
    }
}

pub fn same_communication_path(a: &Device, b: &Device) -> bool {
    a.uuid() == b.uuid()
        && a.router_uuid() == b.router_uuid()
        && a.interface_name() == b.interface_name()
}

/// Full value equality over every announced field.
pub fn content_equals(a: &Device, b: &Device) -> bool {
    a == b
}
