pub mod notification_logger;
pub mod ping;

use serde::de::DeserializeOwned;

/// Read a plugin's config table; a missing (`null`) table means defaults.
fn plugin_config<T: DeserializeOwned + Default>(value: &serde_json::Value) -> anyhow::Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value.clone())?)
}
