// Reconstruction of a labyrinth's shape from the rooms discovered in a run

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use serde::Serialize;
use spelunker_engine::{Node, NodeId};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A passage leading to a room that was never discovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingEdge {
    pub from: NodeId,
    pub to: NodeId,
}

pub struct GraphMap {
    graph: DiGraph<Node, ()>,
    index: HashMap<NodeId, NodeIndex>,
    dangling: Vec<DanglingEdge>,
}

impl GraphMap {
    /// Builds the map; a room seen twice keeps its first description.
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for node in nodes {
            if index.contains_key(&node.id) {
                continue;
            }
            let id = node.id.clone();
            let idx = graph.add_node(node);
            index.insert(id, idx);
        }

        let mut dangling = Vec::new();
        let sources: Vec<NodeIndex> = graph.node_indices().collect();
        for source in sources {
            let neighbors = graph[source].neighbors.clone();
            for target in neighbors {
                match index.get(&target) {
                    Some(&target_idx) => {
                        graph.update_edge(source, target_idx, ());
                    }
                    None => dangling.push(DanglingEdge {
                        from: graph[source].id.clone(),
                        to: target,
                    }),
                }
            }
        }

        Self {
            graph,
            index,
            dangling,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Discovered rooms reachable in one step from `id`.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<&str> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| self.graph[edge.target()].id.as_str())
            .collect();
        neighbors.sort_unstable();
        neighbors
    }

    pub fn dangling_edges(&self) -> &[DanglingEdge] {
        &self.dangling
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut positions = self.nodes().map(|node| node.position);
        let first = positions.next()?;
        let start = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(positions.fold(start, |b, p| Bounds {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    /// Room count per color, most common first.
    pub fn colors(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for node in self.nodes() {
            *counts.entry(node.color.as_str()).or_insert(0) += 1;
        }
        let mut colors: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(color, count)| (color.to_string(), count))
            .collect();
        colors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        colors
    }

    /// True when every room on the map can be walked to from `entrance`.
    pub fn is_reachable_from(&self, entrance: &str) -> bool {
        let Some(&start) = self.index.get(entrance) else {
            return false;
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut seen = 0;
        while bfs.next(&self.graph).is_some() {
            seen += 1;
        }
        seen == self.graph.node_count()
    }

    /// Whole-number scale at which every room fits a `width` x `height` canvas.
    ///
    /// Coordinates below 1 are treated as 1 and the scale never drops below 1.
    pub fn fit_scale(&self, width: f64, height: f64) -> f64 {
        let (max_x, max_y) = self
            .nodes()
            .fold((1.0_f64, 1.0_f64), |(mx, my), node| {
                (mx.max(node.position.x), my.max(node.position.y))
            });
        let size = (width / (max_x + 1.0)).min(height / (max_y + 1.0));
        size.floor().max(1.0)
    }
}
