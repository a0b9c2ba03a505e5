use std::str::FromStr;

use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    fieldaccess,
    normalize::{Normalizer, SensorValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Pressure,
    SignalStrength,
    Duration,
    Humidity,
    Co2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

pub mod unit {
    pub const CELSIUS: &str = "°C";
    pub const PASCAL: &str = "Pa";
    pub const RPM: &str = "rpm";
    pub const DBM: &str = "dBm";
    pub const SECONDS: &str = "s";
    pub const DAYS: &str = "d";
    pub const PERCENTAGE: &str = "%";
    pub const PPM: &str = "ppm";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum NodeType {
    #[strum(serialize = "BOX")]
    Box,
    #[strum(serialize = "UCCO2")]
    CO2RoomSensor,
    #[strum(serialize = "BSRH")]
    HumidityBoxSensor,
    #[strum(serialize = "VLVRH")]
    HumidityControlValve,
    #[strum(serialize = "VLVCO2")]
    CO2ControlValve,
    #[strum(serialize = "VLVCO2RH")]
    CO2RHControlValve,
    #[strum(serialize = "VLV")]
    SensorlessControlValve,
    #[strum(serialize = "SWITCH")]
    SwitchSensor,
    #[strum(serialize = "UCBAT")]
    RemoteControlBattery,
    #[strum(serialize = "UCRH")]
    HumidityRoomSensor,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    pub path: &'static [&'static str],
    pub normalizer: Normalizer,
}

impl SensorDescription {
    const fn new(key: &'static str, name: &'static str, path: &'static [&'static str]) -> Self {
        SensorDescription {
            key,
            name,
            unit: None,
            device_class: None,
            state_class: None,
            path,
            normalizer: Normalizer::PassThrough,
        }
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    const fn device_class(mut self, class: DeviceClass) -> Self {
        self.device_class = Some(class);
        self
    }

    const fn state_class(mut self, class: StateClass) -> Self {
        self.state_class = Some(class);
        self
    }

    const fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    const fn measurement(self) -> Self {
        self.state_class(StateClass::Measurement)
    }

    /// Resolves the description against `root` (the info tree or a node record).
    pub fn value(&self, root: &Value) -> Option<SensorValue> {
        self.normalizer.normalize(fieldaccess::lookup(root, self.path))
    }
}

// Oda = outdoor -> box, Sup = box -> house, Eta = house -> box, Eha = box -> outdoor
pub static GLOBAL_SENSORS: [SensorDescription; 12] = [
    SensorDescription::new("TempOda", "Outdoor Temperature", &["Ventilation", "Sensor", "TempOda", "Val"])
        .unit(unit::CELSIUS)
        .device_class(DeviceClass::Temperature)
        .measurement()
        .normalizer(Normalizer::Temperature),
    SensorDescription::new("TempSup", "Supply Temperature", &["Ventilation", "Sensor", "TempSup", "Val"])
        .unit(unit::CELSIUS)
        .device_class(DeviceClass::Temperature)
        .measurement()
        .normalizer(Normalizer::Temperature),
    SensorDescription::new("TempEta", "Extract Temperature", &["Ventilation", "Sensor", "TempEta", "Val"])
        .unit(unit::CELSIUS)
        .device_class(DeviceClass::Temperature)
        .measurement()
        .normalizer(Normalizer::Temperature),
    SensorDescription::new("TempEha", "Exhaust Temperature", &["Ventilation", "Sensor", "TempEha", "Val"])
        .unit(unit::CELSIUS)
        .device_class(DeviceClass::Temperature)
        .measurement()
        .normalizer(Normalizer::Temperature),
    SensorDescription::new("SpeedSup", "Supply Fan Speed", &["Ventilation", "Fan", "SpeedSup", "Val"])
        .unit(unit::RPM)
        .measurement(),
    SensorDescription::new("SpeedEha", "Exhaust Fan Speed", &["Ventilation", "Fan", "SpeedEha", "Val"])
        .unit(unit::RPM)
        .measurement(),
    SensorDescription::new("PressSup", "Supply Pressure", &["Ventilation", "Fan", "PressSup", "Val"])
        .unit(unit::PASCAL)
        .device_class(DeviceClass::Pressure)
        .measurement()
        .normalizer(Normalizer::Pressure),
    SensorDescription::new("PressEha", "Exhaust Pressure", &["Ventilation", "Fan", "PressEha", "Val"])
        .unit(unit::PASCAL)
        .device_class(DeviceClass::Pressure)
        .measurement()
        .normalizer(Normalizer::Pressure),
    SensorDescription::new("RssiWifi", "Wi-Fi Signal Strength", &["General", "Lan", "RssiWifi", "Val"])
        .unit(unit::DBM)
        .device_class(DeviceClass::SignalStrength)
        .measurement(),
    SensorDescription::new("UpTime", "Device Uptime", &["General", "Board", "UpTime", "Val"])
        .unit(unit::SECONDS)
        .device_class(DeviceClass::Duration)
        .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        "TimeFilterRemain",
        "Filter Time Remaining",
        &["HeatRecovery", "General", "TimeFilterRemain", "Val"],
    )
    .unit(unit::DAYS)
    .device_class(DeviceClass::Duration)
    .measurement(),
    SensorDescription::new("BypassPos", "Bypass Position", &["HeatRecovery", "Bypass", "Pos", "Val"])
        .unit(unit::PERCENTAGE)
        .measurement()
        .normalizer(Normalizer::BypassPosition),
];

const STATE: SensorDescription = SensorDescription::new("State", "Ventilation State", &["Ventilation", "State", "Val"]);
const MODE: SensorDescription = SensorDescription::new("Mode", "Ventilation Mode", &["Ventilation", "Mode", "Val"]);
const FLOW_LEVEL_TARGET: SensorDescription =
    SensorDescription::new("FlowLvlTgt", "Flow Level Target", &["Ventilation", "FlowLvlTgt", "Val"])
        .unit(unit::PERCENTAGE);
const TIME_STATE_REMAIN: SensorDescription =
    SensorDescription::new("TimeStateRemain", "Time State Remaining", &["Ventilation", "TimeStateRemain", "Val"])
        .unit(unit::SECONDS);
const TIME_STATE_END: SensorDescription =
    SensorDescription::new("TimeStateEnd", "Time State End", &["Ventilation", "TimeStateEnd", "Val"])
        .unit(unit::SECONDS);
// node sensors already report degrees celsius
const TEMP: SensorDescription = SensorDescription::new("Temp", "Temperature", &["Sensor", "Temp", "Val"])
    .unit(unit::CELSIUS)
    .device_class(DeviceClass::Temperature);
const RH: SensorDescription = SensorDescription::new("Rh", "Relative Humidity", &["Sensor", "Rh", "Val"])
    .unit(unit::PERCENTAGE)
    .device_class(DeviceClass::Humidity);
const IAQ_RH: SensorDescription =
    SensorDescription::new("IaqRh", "Humidity Air Quality", &["Sensor", "IaqRh", "Val"]).unit(unit::PERCENTAGE);
const CO2: SensorDescription = SensorDescription::new("Co2", "CO₂", &["Sensor", "Co2", "Val"])
    .unit(unit::PPM)
    .device_class(DeviceClass::Co2);
const IAQ_CO2: SensorDescription =
    SensorDescription::new("IaqCo2", "CO₂ Air Quality", &["Sensor", "IaqCo2", "Val"]).unit(unit::PERCENTAGE);

static BOX_SENSORS: [SensorDescription; 8] = [
    MODE,
    STATE,
    FLOW_LEVEL_TARGET,
    TIME_STATE_REMAIN,
    TIME_STATE_END,
    TEMP,
    RH,
    IAQ_RH,
];
static UCCO2_SENSORS: [SensorDescription; 3] = [TEMP, CO2, IAQ_CO2];
static BSRH_SENSORS: [SensorDescription; 3] = [TEMP, RH, IAQ_RH];
static VLVRH_SENSORS: [SensorDescription; 8] = [
    STATE,
    TIME_STATE_REMAIN,
    TIME_STATE_END,
    MODE,
    FLOW_LEVEL_TARGET,
    IAQ_RH,
    RH,
    TEMP,
];
static VLVCO2_SENSORS: [SensorDescription; 8] = [
    STATE,
    TIME_STATE_REMAIN,
    TIME_STATE_END,
    MODE,
    FLOW_LEVEL_TARGET,
    CO2,
    IAQ_CO2,
    TEMP,
];
static VLVCO2RH_SENSORS: [SensorDescription; 10] = [
    STATE,
    TIME_STATE_REMAIN,
    TIME_STATE_END,
    MODE,
    FLOW_LEVEL_TARGET,
    CO2,
    IAQ_CO2,
    RH,
    IAQ_RH,
    TEMP,
];
static VLV_SENSORS: [SensorDescription; 3] = [STATE, MODE, FLOW_LEVEL_TARGET];
static SWITCH_SENSORS: [SensorDescription; 2] = [STATE, MODE];
static UCBAT_SENSORS: [SensorDescription; 4] = [STATE, TIME_STATE_REMAIN, TIME_STATE_END, MODE];
static UCRH_SENSORS: [SensorDescription; 8] = [
    STATE,
    TIME_STATE_REMAIN,
    TIME_STATE_END,
    MODE,
    FLOW_LEVEL_TARGET,
    IAQ_RH,
    RH,
    TEMP,
];

impl NodeType {
    pub fn sensors(&self) -> &'static [SensorDescription] {
        match self {
            NodeType::Box => &BOX_SENSORS,
            NodeType::CO2RoomSensor => &UCCO2_SENSORS,
            NodeType::HumidityBoxSensor => &BSRH_SENSORS,
            NodeType::HumidityControlValve => &VLVRH_SENSORS,
            NodeType::CO2ControlValve => &VLVCO2_SENSORS,
            NodeType::CO2RHControlValve => &VLVCO2RH_SENSORS,
            NodeType::SensorlessControlValve => &VLV_SENSORS,
            NodeType::SwitchSensor => &SWITCH_SENSORS,
            NodeType::RemoteControlBattery => &UCBAT_SENSORS,
            NodeType::HumidityRoomSensor => &UCRH_SENSORS,
        }
    }
}

/// Sensors for a node type tag, unknown tags have no sensors.
pub fn node_sensors(type_tag: &str) -> &'static [SensorDescription] {
    match NodeType::from_str(type_tag) {
        Ok(node_type) => node_type.sensors(),
        Err(_) => {
            log::debug!("No sensors defined for node type '{type_tag}'");
            &[]
        }
    }
}
