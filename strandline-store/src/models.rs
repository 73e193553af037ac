use diesel::prelude::*;
use uuid::Uuid;

use strandline_core::Node;

use crate::schema::nodes;

/// A complete row of the `nodes` table, as stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Queryable, Identifiable, AsChangeset)]
#[diesel(table_name = nodes)]
pub struct NodeRow {
    pub id: Uuid,
    pub prev: Option<Uuid>,
    pub next: Option<Uuid>,
    pub version: i64,
}

impl From<NodeRow> for Node {
    fn from(row: NodeRow) -> Self {
        Node {
            id: row.id,
            prev: row.prev,
            next: row.next,
            version: row.version,
        }
    }
}

/// A freshly constructed node, not yet assigned a primary key by the database (the
/// id is client-generated, but this mirrors the teacher's `New*` split between
/// a complete row and the subset needed to insert one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Insertable)]
#[diesel(table_name = nodes)]
pub struct NewNodeRow {
    pub id: Uuid,
    pub prev: Option<Uuid>,
    pub next: Option<Uuid>,
    pub version: i64,
}

impl From<Node> for NewNodeRow {
    fn from(node: Node) -> Self {
        NewNodeRow {
            id: node.id,
            prev: node.prev,
            next: node.next,
            version: node.version,
        }
    }
}
