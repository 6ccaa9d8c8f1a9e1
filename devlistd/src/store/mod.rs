pub mod device_store;
pub mod hash;
