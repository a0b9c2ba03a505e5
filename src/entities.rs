use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::{
    catalog::{self, SensorDescription, GLOBAL_SENSORS},
    commands::{self, SET_VENTILATION_STATE},
    coordinator::CoordinatorState,
    ducoapi::DeviceApi,
    fieldaccess,
    normalize::SensorValue,
    snapshot::{self, Snapshot},
    Error, Result,
};

pub const MANUFACTURER: &str = "Ducobox";

/// `00:1A:2B:3C:4D:5E` -> `001a2b3c4d5e`
pub fn device_id_from_mac(mac: &str) -> String {
    mac.chars()
        .filter(|c| *c != ':' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

impl DeviceInfo {
    fn board(snapshot: &Snapshot, device_id: &str) -> DeviceInfo {
        let info = &snapshot.info;
        let box_name = fieldaccess::lookup_str(info, &["General", "Board", "BoxName", "Val"]).unwrap_or("Unknown Model");
        let box_subtype = fieldaccess::lookup_str(info, &["General", "Board", "BoxSubTypeName", "Val"]).unwrap_or("");
        let sw_version = fieldaccess::lookup_str(info, &["General", "Board", "SwVersionBox", "Val"])
            .unwrap_or("Unknown Version");

        DeviceInfo {
            identifier: device_id.to_string(),
            name: device_id.to_string(),
            manufacturer: MANUFACTURER,
            model: format!("{box_name} {box_subtype}").replace('_', " ").trim().to_string(),
            sw_version: Some(sw_version.to_string()),
            via_device: None,
        }
    }

    fn node(board: &DeviceInfo, snapshot: &Snapshot, node_id: u16) -> DeviceInfo {
        let node_type = snapshot.mappings.node_type(node_id);
        let node_name = match snapshot.mappings.name(node_id) {
            Some(name) => name.to_string(),
            None => format!("{node_id}:{node_type}"),
        };

        DeviceInfo {
            identifier: format!("{}-{}", board.identifier, node_id),
            name: format!("{}:{}", board.identifier, node_name),
            manufacturer: MANUFACTURER,
            model: node_type.to_string(),
            sw_version: None,
            via_device: Some(board.identifier.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorScope {
    Board,
    Node(u16),
}

/// A read only reading bound to one catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct SensorEntity {
    pub unique_id: String,
    pub name: String,
    pub device: String,
    pub scope: SensorScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<&'static str>,
    #[serde(skip)]
    description: &'static SensorDescription,
    #[serde(rename = "state")]
    last_value: Option<SensorValue>,
}

impl SensorEntity {
    fn new(description: &'static SensorDescription, device: &DeviceInfo, scope: SensorScope) -> SensorEntity {
        SensorEntity {
            unique_id: format!("{}-{}", device.identifier, description.key),
            name: format!("{} {}", device.name, description.name),
            device: device.identifier.clone(),
            scope,
            unit: description.unit,
            device_class: description.device_class.map(Into::into),
            state_class: description.state_class.map(Into::into),
            description,
            last_value: None,
        }
    }

    pub fn key(&self) -> &'static str {
        self.description.key
    }

    /// Evaluates the reading against `snapshot`, `None` when the field is not reported.
    pub fn native_value(&self, snapshot: &Snapshot) -> Option<SensorValue> {
        match self.scope {
            SensorScope::Board => self.description.value(&snapshot.info),
            SensorScope::Node(node_id) => snapshot
                .node(node_id)
                .and_then(|node| self.description.value(&node.data)),
        }
    }

    pub fn available(&self, state: &CoordinatorState) -> bool {
        state.last_update_success
    }

    /// Re-evaluates the reading when the last poll succeeded, returns true if the value changed.
    /// The last known value is kept while polling fails.
    pub fn update(&mut self, state: &CoordinatorState) -> bool {
        let snapshot = match (&state.snapshot, state.last_update_success) {
            (Some(snapshot), true) => snapshot,
            _ => return false,
        };

        let value = self.native_value(snapshot);
        if value != self.last_value {
            self.last_value = value;
            return true;
        }

        false
    }

    pub fn state(&self) -> Option<&SensorValue> {
        self.last_value.as_ref()
    }
}

/// A writable numeric node configuration field.
#[derive(Debug, Clone, Serialize)]
pub struct NumberEntity {
    pub unique_id: String,
    pub name: String,
    pub device: String,
    pub node_id: u16,
    pub key: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl NumberEntity {
    /// Config fields that carry `Val`, `Min`, `Max` and `Inc` are writable.
    fn from_config_field(device: &DeviceInfo, node_id: u16, key: &str, field: &Value) -> Option<NumberEntity> {
        let bound = |name: &str| fieldaccess::lookup(field, &[name]);
        let (val, min, max, inc) = (bound("Val")?, bound("Min")?, bound("Max")?, bound("Inc")?);

        match (val.as_f64(), min.as_f64(), max.as_f64(), inc.as_f64()) {
            (Some(value), Some(min), Some(max), Some(step)) => Some(NumberEntity {
                unique_id: format!("{}-{}", device.identifier, key),
                name: format!("{} {}", device.name, key),
                device: device.identifier.clone(),
                node_id,
                key: key.to_string(),
                value: value.trunc(),
                min: min.trunc(),
                max: max.trunc(),
                step: step.trunc(),
            }),
            _ => {
                log::warn!("Node {node_id}: config field '{key}' has non numeric bounds: {field}");
                None
            }
        }
    }

    /// The value is updated locally before the board confirms it and is not restored on failure.
    /// Values outside the bounds reported by the board are rejected without a request.
    pub async fn set_native_value<A: DeviceApi + ?Sized>(&mut self, api: &A, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidValue {
                key: self.key.clone(),
                value,
            });
        }

        if !(self.min..=self.max).contains(&value) {
            return Err(Error::OutOfRange {
                key: self.key.clone(),
                value,
                min: self.min,
                max: self.max,
            });
        }

        self.value = value;
        commands::set_value(api, self.node_id, &self.key, value).await
    }

    /// Takes over the value the board reports in the latest snapshot.
    pub fn handle_update(&mut self, snapshot: &Snapshot) {
        if let Some(value) = snapshot
            .config_node(self.node_id)
            .and_then(|node| fieldaccess::lookup(node, &[self.key.as_str(), "Val"]))
            .and_then(Value::as_f64)
        {
            self.value = value;
        }
    }
}

/// Selects one of the options of a node action, the selection is not read back from the board.
#[derive(Debug, Clone, Serialize)]
pub struct SelectEntity {
    pub unique_id: String,
    pub name: String,
    pub device: String,
    pub node_id: u16,
    pub action: String,
    pub options: Vec<String>,
    pub current_option: Option<String>,
}

impl SelectEntity {
    fn from_action(device: &DeviceInfo, node_id: u16, name: &str, action: &Value) -> SelectEntity {
        let options = fieldaccess::lookup(action, &["Enum"])
            .and_then(Value::as_array)
            .map(|values| values.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();

        SelectEntity {
            unique_id: format!("{}-{}", device.identifier, name),
            name: format!("{} Ventilation State", device.name),
            device: device.identifier.clone(),
            node_id,
            action: name.to_string(),
            options,
            current_option: None,
        }
    }

    pub async fn select_option<A: DeviceApi + ?Sized>(&mut self, api: &A, option: &str) -> Result<()> {
        if !self.options.iter().any(|opt| opt == option) {
            return Err(Error::InvalidOption {
                action: self.action.clone(),
                option: option.to_string(),
            });
        }

        self.current_option = Some(option.to_string());
        commands::set_ventilation_state(api, self.node_id, option, &self.action).await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntitySet {
    pub board: DeviceInfo,
    pub nodes: Vec<DeviceInfo>,
    pub sensors: Vec<SensorEntity>,
    pub numbers: Vec<NumberEntity>,
    pub selects: Vec<SelectEntity>,
}

impl EntitySet {
    pub fn len(&self) -> usize {
        self.sensors.len() + self.numbers.len() + self.selects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sensor(&self, unique_id: &str) -> Option<&SensorEntity> {
        self.sensors.iter().find(|sensor| sensor.unique_id == unique_id)
    }

    pub fn number_mut(&mut self, unique_id: &str) -> Option<&mut NumberEntity> {
        self.numbers.iter_mut().find(|number| number.unique_id == unique_id)
    }

    pub fn select_mut(&mut self, node_id: u16) -> Option<&mut SelectEntity> {
        self.selects.iter_mut().find(|select| select.node_id == node_id)
    }

    /// Updates every entity from the coordinator state, returns the sensors that changed.
    pub fn update(&mut self, state: &CoordinatorState) -> Vec<&SensorEntity> {
        if let (Some(snapshot), true) = (&state.snapshot, state.last_update_success) {
            for number in self.numbers.iter_mut() {
                number.handle_update(snapshot);
            }
        }

        self.sensors
            .iter_mut()
            .filter_map(|sensor| if sensor.update(state) { Some(&*sensor) } else { None })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum SetupOutcome {
    /// The board did not report its MAC address yet, setup should be retried later.
    NotReady,
    Ready(EntitySet),
}

pub fn build_entities(snapshot: &Snapshot) -> SetupOutcome {
    let Some(mac) = snapshot.mac_address() else {
        log::warn!("No MAC address reported by the board, not adding entities");
        return SetupOutcome::NotReady;
    };

    let device_id = device_id_from_mac(mac);
    let board = DeviceInfo::board(snapshot, &device_id);
    let mut node_devices: BTreeMap<u16, DeviceInfo> = BTreeMap::new();
    let mut node_device = |node_id: u16| {
        node_devices
            .entry(node_id)
            .or_insert_with(|| DeviceInfo::node(&board, snapshot, node_id))
            .clone()
    };

    let mut sensors: Vec<SensorEntity> = GLOBAL_SENSORS
        .iter()
        .map(|desc| SensorEntity::new(desc, &board, SensorScope::Board))
        .collect();

    for node in &snapshot.nodes {
        let descriptions = catalog::node_sensors(&node.type_tag);
        if descriptions.is_empty() {
            log::info!("Node {} of type '{}' has no supported sensors", node.id, node.type_tag);
            continue;
        }

        let device = node_device(node.id);
        sensors.extend(
            descriptions
                .iter()
                .map(|desc| SensorEntity::new(desc, &device, SensorScope::Node(node.id))),
        );
    }

    let mut numbers = Vec::new();
    for config_node in snapshot.config_nodes() {
        let Ok(node_id) = snapshot::node_id(config_node) else {
            log::warn!("Skipping config node without id: {config_node}");
            continue;
        };

        let Some(fields) = config_node.as_object() else {
            continue;
        };

        let device = node_device(node_id);
        numbers.extend(
            fields
                .iter()
                .filter_map(|(key, field)| NumberEntity::from_config_field(&device, node_id, key, field)),
        );
    }

    let mut selects = Vec::new();
    for action_node in snapshot.action_nodes() {
        let Ok(node_id) = snapshot::node_id(action_node) else {
            log::warn!("Skipping action node without id: {action_node}");
            continue;
        };

        let actions = fieldaccess::lookup(action_node, &["Actions"])
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if let Some(action) = actions
            .iter()
            .find(|action| fieldaccess::lookup_str(action, &["Action"]) == Some(SET_VENTILATION_STATE))
        {
            let device = node_device(node_id);
            selects.push(SelectEntity::from_action(&device, node_id, SET_VENTILATION_STATE, action));
        }
    }

    SetupOutcome::Ready(EntitySet {
        board,
        nodes: node_devices.into_values().collect(),
        sensors,
        numbers,
        selects,
    })
}
