use serde_json::json;

use crate::{
    ducoapi::{DeviceApi, CONFIG_NODES_PATH},
    Error, Result,
};

pub const SET_VENTILATION_STATE: &str = "SetVentilationState";

/// Compact single field update: `{"<key>":{"Val":<rounded value>}}`
pub fn set_value_payload(key: &str, value: f64) -> Result<String> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(Error::InvalidValue {
            key: key.to_string(),
            value,
        });
    }

    let mut payload = serde_json::Map::new();
    payload.insert(key.to_string(), json!({ "Val": rounded as i64 }));
    Ok(serde_json::to_string(&payload)?)
}

pub async fn set_value<A: DeviceApi + ?Sized>(api: &A, node_id: u16, key: &str, value: f64) -> Result<()> {
    let path = format!("{}/{}", CONFIG_NODES_PATH, node_id);
    let result = async {
        let payload = set_value_payload(key, value)?;
        api.raw_patch(&path, payload).await
    }
    .await;

    match result {
        Ok(_) => {
            log::info!("Successfully set value for node {node_id}, key {key} to {value}");
            Ok(())
        }
        Err(err) => {
            log::error!("Failed to set value for node {node_id}, key {key} ({path}): {err}");
            Err(err)
        }
    }
}

pub async fn set_ventilation_state<A: DeviceApi + ?Sized>(
    api: &A,
    node_id: u16,
    option: &str,
    action: &str,
) -> Result<()> {
    match api.change_action_node(action, option, node_id).await {
        Ok(()) => {
            log::info!("Successfully set action {action} for node {node_id} to {option}");
            Ok(())
        }
        Err(err) => {
            log::error!("Failed to set action {action} for node {node_id}: {err}");
            Err(err)
        }
    }
}
