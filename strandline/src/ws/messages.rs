use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use strandline_core::{Node, NodeId, PointerDelta};

/// A request from a client, received as a JSON text frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    AddNode {
        prev: Option<NodeId>,
    },
    RemoveNode {
        #[serde(rename = "nodeId")]
        node_id: NodeId,
    },
}

/// The name of the client operation that produced a [`ServerMessage::Error`],
/// used by the client to know which in-flight request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    AddNode,
    RemoveNode,
}

/// A notification sent to one or all clients, serialized as a JSON text frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once per new attach, to that connection only.
    Nodes { nodes: Vec<Node> },
    /// Broadcast to every connection, including the originator.
    NodeAdded {
        #[serde(rename = "createdNode")]
        created_node: Node,
        #[serde(rename = "updatedNodes")]
        updated_nodes: HashMap<NodeId, PointerDelta>,
    },
    /// Broadcast to every connection, including the originator.
    NodeRemoved {
        #[serde(rename = "deletedNodeId")]
        deleted_node_id: NodeId,
        #[serde(rename = "updatedNodes")]
        updated_nodes: HashMap<NodeId, PointerDelta>,
    },
    /// Sent to the originating connection only.
    Error { message: String, operation: Operation },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_at_head_parses_null_prev() {
        let parsed: ClientMessage = json::from_str(r#"{"type": "addNode", "prev": null}"#).unwrap();
        assert!(matches!(parsed, ClientMessage::AddNode { prev: None }));
    }

    #[test]
    fn remove_node_uses_camel_case_node_id() {
        let id = NodeId::new_v4();
        let text = format!(r#"{{"type": "removeNode", "nodeId": "{id}"}}"#);
        let parsed: ClientMessage = json::from_str(&text).unwrap();
        match parsed {
            ClientMessage::RemoveNode { node_id } => assert_eq!(node_id, id),
            other => panic!("expected RemoveNode, got {other:?}"),
        }
    }

    #[test]
    fn node_added_serializes_with_tagged_camel_case_fields() {
        let message = ServerMessage::NodeAdded {
            created_node: Node::new(NodeId::new_v4(), None, None),
            updated_nodes: HashMap::new(),
        };
        let value = json::to_value(&message).unwrap();
        assert_eq!(value["type"], "nodeAdded");
        assert!(value.get("createdNode").is_some());
        assert!(value.get("updatedNodes").is_some());
    }

    #[test]
    fn error_message_carries_the_failed_operation() {
        let message = ServerMessage::Error {
            message: "reference node was deleted".to_string(),
            operation: Operation::AddNode,
        };
        let value = json::to_value(&message).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["operation"], "addNode");
    }
}
