use std::collections::BTreeMap;

use serde_json::Value;

use crate::{fieldaccess, Error, Result};

pub const UNKNOWN_NODE_TYPE: &str = "Unknown";

/// One node as returned by `/info/nodes`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: u16,
    pub type_tag: String,
    pub data: Value,
}

impl NodeRecord {
    /// `"{id}:{type}"`
    pub fn display_name(&self) -> String {
        format!("{}:{}", self.id, self.type_tag)
    }
}

impl TryFrom<Value> for NodeRecord {
    type Error = Error;

    fn try_from(data: Value) -> Result<Self> {
        let id = node_id(&data)?;
        let type_tag = fieldaccess::lookup_str(&data, &["General", "Type", "Val"])
            .unwrap_or(UNKNOWN_NODE_TYPE)
            .to_string();

        Ok(NodeRecord { id, type_tag, data })
    }
}

/// Reads the `Node` field that identifies a node in every node listing.
pub fn node_id(node: &Value) -> Result<u16> {
    let id = fieldaccess::lookup(node, &["Node"])
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::Runtime(format!("Invalid node id in {node}")))?;

    u16::try_from(id).map_err(|_| Error::Runtime(format!("Node id out of range: {id}")))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMappings {
    pub id_to_name: BTreeMap<u16, String>,
    pub id_to_type: BTreeMap<u16, String>,
}

impl NodeMappings {
    pub fn from_nodes(nodes: &[NodeRecord]) -> Self {
        let mut mappings = NodeMappings::default();
        for node in nodes {
            mappings.id_to_name.insert(node.id, node.display_name());
            mappings.id_to_type.insert(node.id, node.type_tag.clone());
        }

        mappings
    }

    pub fn name(&self, node_id: u16) -> Option<&str> {
        self.id_to_name.get(&node_id).map(String::as_str)
    }

    pub fn node_type(&self, node_id: u16) -> &str {
        self.id_to_type
            .get(&node_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_NODE_TYPE)
    }
}

/// Everything fetched during one successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub info: Value,
    pub nodes: Vec<NodeRecord>,
    pub config_nodes: Value,
    pub action_nodes: Value,
    pub mappings: NodeMappings,
}

impl Snapshot {
    /// Node records without a usable id are skipped, the other nodes are still published.
    pub fn new(info: Value, nodes: Vec<Value>, config_nodes: Value, action_nodes: Value) -> Self {
        let nodes: Vec<NodeRecord> = nodes
            .into_iter()
            .filter_map(|node| match NodeRecord::try_from(node) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!("Skipping node: {err}");
                    None
                }
            })
            .collect();
        let mappings = NodeMappings::from_nodes(&nodes);

        Snapshot {
            info,
            nodes,
            config_nodes,
            action_nodes,
            mappings,
        }
    }

    pub fn node(&self, node_id: u16) -> Option<&NodeRecord> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    /// The board MAC address, absent until the board reports its LAN info.
    pub fn mac_address(&self) -> Option<&str> {
        fieldaccess::lookup_str(&self.info, &["General", "Lan", "Mac", "Val"]).filter(|mac| !mac.is_empty())
    }

    pub fn config_node(&self, node_id: u16) -> Option<&Value> {
        listed_nodes(&self.config_nodes).find(|node| node_id_matches(node, node_id))
    }

    pub fn config_nodes(&self) -> impl Iterator<Item = &Value> {
        listed_nodes(&self.config_nodes)
    }

    pub fn action_nodes(&self) -> impl Iterator<Item = &Value> {
        listed_nodes(&self.action_nodes)
    }
}

fn listed_nodes(tree: &Value) -> impl Iterator<Item = &Value> {
    fieldaccess::lookup(tree, &["Nodes"])
        .and_then(Value::as_array)
        .map(|nodes| nodes.iter())
        .unwrap_or_default()
}

fn node_id_matches(node: &Value, node_id: u16) -> bool {
    self::node_id(node).map(|id| id == node_id).unwrap_or(false)
}
