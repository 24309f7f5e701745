//! Bounded subgraph extraction for network rendering
//!
//! BFS from any starting node, collecting every node and edge encountered
//! within the depth bound into a renderer-friendly node/edge list. Unlike the
//! path finder this keeps the whole frontier, and it classifies each hop as
//! `up` (toward owners) or `down` (toward properties) so the traversal can be
//! restricted to one direction. Entity-principal hops carry no up/down meaning
//! here and are never followed.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::{NodeKey, NodeType};
use crate::store::GraphSource;

pub const DEFAULT_NETWORK_DEPTH: u32 = 3;
pub const NETWORK_DEPTH_LIMIT: u32 = 5;

/// Which way to walk the ownership hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Both,
}

/// Up/down classification of a single hop. Hops with no hierarchy meaning
/// (entity to principal and back) classify to `None` and are skipped.
fn hop_direction(from: NodeType, to: NodeType) -> Option<Direction> {
    match (from, to) {
        (NodeType::Property, NodeType::Entity) => Some(Direction::Up),
        (NodeType::Entity, NodeType::Company) => Some(Direction::Up),
        (NodeType::Company, NodeType::Principal) => Some(Direction::Up),
        (NodeType::Entity, NodeType::Property) => Some(Direction::Down),
        (NodeType::Company, NodeType::Entity) => Some(Direction::Down),
        (NodeType::Principal, NodeType::Company) => Some(Direction::Down),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkParams {
    pub start_type: NodeType,
    pub start_id: i64,
    #[serde(default = "default_network_depth")]
    pub max_depth: u32,
    #[serde(default)]
    pub direction: Direction,
}

fn default_network_depth() -> u32 {
    DEFAULT_NETWORK_DEPTH
}

impl NetworkParams {
    pub fn validate(&self) -> GraphResult<()> {
        if self.start_id <= 0 {
            return Err(GraphError::validation("start_id must be positive"));
        }
        if !(1..=NETWORK_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(GraphError::validation(format!(
                "max_depth must be between 1 and {}, got {}",
                NETWORK_DEPTH_LIMIT, self.max_depth
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub max_depth_reached: u32,
    pub nodes_by_type: HashMap<NodeType, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkReport {
    pub graph: NetworkGraph,
    pub statistics: NetworkStatistics,
    pub parameters: NetworkParams,
}

/// Subgraph extractor over any [`GraphSource`].
pub struct NetworkTraverser<S> {
    source: S,
}

impl<S: GraphSource> NetworkTraverser<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn traverse(&self, params: &NetworkParams) -> GraphResult<NetworkReport> {
        params.validate()?;

        let start_key = NodeKey::new(params.start_type, params.start_id);
        let start_name = self
            .source
            .resolve_node(params.start_type, params.start_id)
            .await?
            .ok_or_else(|| GraphError::not_found(params.start_type.as_str(), params.start_id))?;

        let mut nodes: Vec<NetworkNode> = vec![NetworkNode {
            id: start_key.to_string(),
            node_type: params.start_type,
            name: start_name,
            depth: 0,
        }];
        let mut edges: Vec<NetworkEdge> = Vec::new();
        let mut seen_edges: HashSet<NetworkEdge> = HashSet::new();
        let mut visited: HashSet<NodeKey> = HashSet::from([start_key]);
        let mut queue: VecDeque<(NodeKey, u32)> = VecDeque::from([(start_key, 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= params.max_depth {
                continue;
            }

            let neighbors = self.source.neighbors(current.node_type, current.id).await?;

            for neighbor in neighbors {
                let Some(hop) = hop_direction(current.node_type, neighbor.node_type) else {
                    continue;
                };
                if params.direction != Direction::Both && hop != params.direction {
                    continue;
                }

                let key = neighbor.key();
                let Some(name) = self.source.resolve_node(neighbor.node_type, neighbor.id).await?
                else {
                    continue;
                };

                let edge = NetworkEdge {
                    source: current.to_string(),
                    target: key.to_string(),
                    relationship: neighbor.relationship,
                };
                if seen_edges.insert(edge.clone()) {
                    edges.push(edge);
                }

                if visited.insert(key) {
                    nodes.push(NetworkNode {
                        id: key.to_string(),
                        node_type: neighbor.node_type,
                        name,
                        depth: depth + 1,
                    });
                    queue.push_back((key, depth + 1));
                }
            }
        }

        let max_depth_reached = nodes.iter().map(|n| n.depth).max().unwrap_or(0);
        let mut nodes_by_type: HashMap<NodeType, usize> = HashMap::new();
        for node in &nodes {
            *nodes_by_type.entry(node.node_type).or_insert(0) += 1;
        }

        debug!(
            start = %start_key,
            nodes = nodes.len(),
            edges = edges.len(),
            max_depth_reached,
            "network traversal complete"
        );

        let statistics = NetworkStatistics {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            max_depth_reached,
            nodes_by_type,
        };

        Ok(NetworkReport {
            graph: NetworkGraph { nodes, edges },
            statistics,
            parameters: params.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_principal_hops_have_no_direction() {
        assert_eq!(hop_direction(NodeType::Entity, NodeType::Principal), None);
        assert_eq!(hop_direction(NodeType::Principal, NodeType::Entity), None);
    }

    #[test]
    fn hierarchy_hops_classify() {
        assert_eq!(
            hop_direction(NodeType::Property, NodeType::Entity),
            Some(Direction::Up)
        );
        assert_eq!(
            hop_direction(NodeType::Company, NodeType::Principal),
            Some(Direction::Up)
        );
        assert_eq!(
            hop_direction(NodeType::Principal, NodeType::Company),
            Some(Direction::Down)
        );
        assert_eq!(
            hop_direction(NodeType::Entity, NodeType::Property),
            Some(Direction::Down)
        );
    }

    #[test]
    fn depth_and_id_validation() {
        let base = NetworkParams {
            start_type: NodeType::Company,
            start_id: 7,
            max_depth: 3,
            direction: Direction::Both,
        };
        assert!(base.validate().is_ok());

        let mut p = base.clone();
        p.max_depth = 0;
        assert!(p.validate().is_err());

        let mut p = base.clone();
        p.max_depth = 6;
        assert!(p.validate().is_err());

        let mut p = base;
        p.start_id = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn direction_defaults_to_both() {
        let p: NetworkParams =
            serde_json::from_str(r#"{"start_type":"company","start_id":3}"#).unwrap();
        assert_eq!(p.direction, Direction::Both);
        assert_eq!(p.max_depth, DEFAULT_NETWORK_DEPTH);
    }
}
