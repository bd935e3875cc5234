//! Inventory graph: the current-state report: one node for the agent,
//! one node per managed file, and an association from the agent to each file.

use serde::{Deserialize, Serialize};

use super::desired::KeyValuePair;
use super::file::Inventory;

/// Display name of the agent's root node.
pub const AGENT_NAME: &str = "File Update Agent";
/// Parameter key carrying the scope on the root node.
pub const PARAM_DOMAIN: &str = "domain";
/// Parameter key carrying the source locator on file nodes.
pub const PARAM_DOWNLOAD_URL: &str = "download_url";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Application,
    Data,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoftwareNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub parameters: Vec<KeyValuePair>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Association {
    pub source_id: String,
    pub target_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryGraph {
    pub software_nodes: Vec<SoftwareNode>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl InventoryGraph {
    /// Build the two-level graph for `inventory` under `scope`.
    pub fn build(scope: &str, inventory: &Inventory) -> InventoryGraph {
        let root = SoftwareNode {
            id: format!("{}-update-agent", scope),
            name: Some(AGENT_NAME.to_string()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            parameters: vec![KeyValuePair::new(PARAM_DOMAIN, scope)],
            node_type: NodeType::Application,
        };

        let mut software_nodes = Vec::with_capacity(inventory.len() + 1);
        let mut associations = Vec::with_capacity(inventory.len());
        for file in inventory.files() {
            let id = format!("{}:{}", scope, file.name);
            associations.push(Association {
                source_id: root.id.clone(),
                target_id: id.clone(),
            });
            software_nodes.push(SoftwareNode {
                id,
                name: None,
                version: None,
                parameters: vec![KeyValuePair::new(PARAM_DOWNLOAD_URL, file.source_locator)],
                node_type: NodeType::Data,
            });
        }
        software_nodes.insert(0, root);

        InventoryGraph {
            software_nodes,
            associations,
        }
    }
}
