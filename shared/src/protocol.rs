/// API path prefix
pub const API_PREFIX: &str = "/v1";

/// Expiration applied to announcements that carry none, in seconds
pub const DEFAULT_EXPIRATION_SECS: u64 = 30;


/// Longest lifetime the store grants an announcement, in seconds
pub const MAX_EXPIRATION_SECS: u64 = 24 * 60 * 60;
