//! `serde(default = "...")` helpers for [`crate::EngineConfig`] and its fields.

/// `10^18`, mirroring `common::UNIT`. Kept as a plain literal (rather than
/// importing `common::UNIT`) so a config file can override it independently
/// of the compiled-in constant, should a future instrument need a different
/// scale.
pub fn default_unit_scale() -> u128 {
    1_000_000_000_000_000_000
}

pub fn default_store_type() -> String {
    "memory".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}
