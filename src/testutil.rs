use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    ducoapi::{self, DeviceApi},
    snapshot::Snapshot,
    Error, Result,
};

pub fn fixture(data: &[u8]) -> Value {
    serde_json::from_slice(data).unwrap()
}

/// In memory board serving the fixtures from `test/data`.
pub struct MockApi {
    pub base_url: String,
    pub info: Mutex<Value>,
    pub nodes: Mutex<Value>,
    pub config_nodes: Mutex<Value>,
    pub action_nodes: Mutex<Value>,
    pub failing_path: Mutex<Option<String>>,
    pub requests: Mutex<Vec<String>>,
    pub patches: Mutex<Vec<(String, String)>>,
    pub actions: Mutex<Vec<(String, String, u16)>>,
}

impl MockApi {
    pub fn new() -> Self {
        MockApi::with_base_url("https://192.168.1.20")
    }

    pub fn with_base_url(base_url: &str) -> Self {
        MockApi {
            base_url: base_url.to_string(),
            info: Mutex::new(fixture(include_bytes!("../test/data/info.json"))),
            nodes: Mutex::new(fixture(include_bytes!("../test/data/info_nodes.json"))),
            config_nodes: Mutex::new(fixture(include_bytes!("../test/data/config_nodes.json"))),
            action_nodes: Mutex::new(fixture(include_bytes!("../test/data/action_nodes.json"))),
            failing_path: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, path: &str) {
        *self.failing_path.lock().unwrap() = Some(path.to_string());
    }

    pub fn recover(&self) {
        *self.failing_path.lock().unwrap() = None;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, path: &str) -> Result<()> {
        self.requests.lock().unwrap().push(path.to_string());
        if self.failing_path.lock().unwrap().as_deref() == Some(path) {
            return Err(Error::Runtime(format!("Connection refused: {path}")));
        }

        Ok(())
    }
}

#[async_trait]
impl DeviceApi for MockApi {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_info(&self) -> Result<Value> {
        self.request(ducoapi::INFO_PATH)?;
        Ok(self.info.lock().unwrap().clone())
    }

    async fn get_nodes(&self) -> Result<Vec<Value>> {
        self.request(ducoapi::INFO_NODES_PATH)?;
        ducoapi::parse_node_list(self.nodes.lock().unwrap().clone())
    }

    async fn raw_get(&self, path: &str) -> Result<Value> {
        self.request(path)?;
        match path {
            ducoapi::CONFIG_NODES_PATH => Ok(self.config_nodes.lock().unwrap().clone()),
            ducoapi::ACTION_NODES_PATH => Ok(self.action_nodes.lock().unwrap().clone()),
            _ => Err(Error::Runtime(format!("Not found: {path}"))),
        }
    }

    async fn raw_patch(&self, path: &str, body: String) -> Result<Value> {
        self.request(path)?;
        self.patches.lock().unwrap().push((path.to_string(), body));
        Ok(Value::Null)
    }

    async fn change_action_node(&self, action: &str, value: &str, node_id: u16) -> Result<()> {
        self.request(&format!("{}/{}", ducoapi::ACTION_NODES_PATH, node_id))?;
        self.actions
            .lock()
            .unwrap()
            .push((action.to_string(), value.to_string(), node_id));
        Ok(())
    }
}

pub fn fixture_snapshot() -> Snapshot {
    Snapshot::new(
        fixture(include_bytes!("../test/data/info.json")),
        ducoapi::parse_node_list(fixture(include_bytes!("../test/data/info_nodes.json"))).unwrap(),
        fixture(include_bytes!("../test/data/config_nodes.json")),
        fixture(include_bytes!("../test/data/action_nodes.json")),
    )
}
