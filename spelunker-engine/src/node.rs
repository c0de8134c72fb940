use serde::{Deserialize, Serialize};

pub type NodeId = String;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A room of the labyrinth as the server describes it.
///
/// Field names follow the wire format (`xid`, `col`, `pos`, `see`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "xid")]
    pub id: NodeId,
    #[serde(rename = "col")]
    pub color: String,
    #[serde(rename = "pos")]
    pub position: Position,
    #[serde(rename = "see")]
    pub neighbors: Vec<NodeId>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, color: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            color: color.into(),
            position: Position { x, y },
            neighbors: Vec::new(),
        }
    }

    pub fn with_neighbors<I, S>(mut self, neighbors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.neighbors = neighbors.into_iter().map(Into::into).collect();
        self
    }
}
