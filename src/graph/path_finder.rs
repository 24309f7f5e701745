//! Breadth-first shortest-path search across the heterogeneous graph
//!
//! Finds the shortest path (by hop count) between any two nodes, routing all
//! graph access through [`GraphSource`] so temporal and merged-company
//! filtering apply uniformly. Ties are broken by FIFO discovery order, which
//! is deterministic because the expander enumerates neighbors in a stable
//! order.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::{NodeKey, NodeType};
use crate::store::GraphSource;

pub const DEFAULT_MAX_DEPTH: u32 = 6;
pub const MAX_DEPTH_LIMIT: u32 = 10;

/// Parameters for a shortest-path search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSearchParams {
    pub source_type: NodeType,
    pub source_id: i64,
    pub target_type: NodeType,
    pub target_id: i64,
    /// Maximum hop count, 1..=10. A target found while expanding a node at
    /// depth `max_depth - 1` is still reachable.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

impl PathSearchParams {
    pub fn validate(&self) -> GraphResult<()> {
        if self.source_id <= 0 || self.target_id <= 0 {
            return Err(GraphError::validation(
                "source_id and target_id must be positive",
            ));
        }
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(GraphError::validation(format!(
                "max_depth must be between 1 and {}, got {}",
                MAX_DEPTH_LIMIT, self.max_depth
            )));
        }
        Ok(())
    }
}

/// One endpoint of the search, resolved to its display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEndpoint {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub id: i64,
    pub name: String,
}

/// A node on the discovered path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    pub step: usize,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub id: i64,
    pub name: String,
}

/// A traversed edge, labeled with its direction-specific relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEdge {
    pub step: usize,
    pub from: String,
    pub to: String,
    pub relationship: String,
}

/// Outcome of a shortest-path search. `found: false` with an exploration
/// count is a successful negative result, distinct from a not-found endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSearchResult {
    pub found: bool,
    pub path_length: Option<usize>,
    pub source: PathEndpoint,
    pub target: PathEndpoint,
    pub path: Vec<PathNode>,
    pub edges: Vec<PathEdge>,
    pub nodes_explored: usize,
}

/// BFS shortest-path search over any [`GraphSource`].
pub struct PathFinder<S> {
    source: S,
}

impl<S: GraphSource> PathFinder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn shortest_path(&self, params: &PathSearchParams) -> GraphResult<PathSearchResult> {
        params.validate()?;

        let source_key = NodeKey::new(params.source_type, params.source_id);
        let target_key = NodeKey::new(params.target_type, params.target_id);

        // Both endpoints must resolve before any expansion work starts.
        let source_name = self
            .source
            .resolve_node(params.source_type, params.source_id)
            .await?
            .ok_or_else(|| GraphError::not_found(params.source_type.as_str(), params.source_id))?;
        let target_name = self
            .source
            .resolve_node(params.target_type, params.target_id)
            .await?
            .ok_or_else(|| GraphError::not_found(params.target_type.as_str(), params.target_id))?;

        let source_endpoint = PathEndpoint {
            node_type: params.source_type,
            id: params.source_id,
            name: source_name.clone(),
        };
        let target_endpoint = PathEndpoint {
            node_type: params.target_type,
            id: params.target_id,
            name: target_name.clone(),
        };

        if source_key == target_key {
            return Ok(PathSearchResult {
                found: true,
                path_length: Some(0),
                path: vec![PathNode {
                    step: 0,
                    node_type: params.source_type,
                    id: params.source_id,
                    name: source_name,
                }],
                edges: Vec::new(),
                nodes_explored: 1,
                source: source_endpoint,
                target: target_endpoint,
            });
        }

        let mut visited: HashSet<NodeKey> = HashSet::from([source_key]);
        let mut parent: HashMap<NodeKey, (NodeKey, String)> = HashMap::new();
        let mut names: HashMap<NodeKey, String> = HashMap::from([(source_key, source_name)]);
        let mut queue: VecDeque<(NodeKey, u32)> = VecDeque::from([(source_key, 0)]);

        let mut found = false;

        'search: while let Some((current, depth)) = queue.pop_front() {
            // Depth pruning: stop expanding this node, not the whole search.
            if depth >= params.max_depth {
                continue;
            }

            let neighbors = self.source.neighbors(current.node_type, current.id).await?;

            for neighbor in neighbors {
                let key = neighbor.key();
                if !visited.insert(key) {
                    continue;
                }

                let name = self
                    .source
                    .resolve_node(neighbor.node_type, neighbor.id)
                    .await?
                    .unwrap_or_else(|| key.to_string());
                names.insert(key, name);
                parent.insert(key, (current, neighbor.relationship));

                if key == target_key {
                    found = true;
                    break 'search;
                }

                queue.push_back((key, depth + 1));
            }
        }

        let nodes_explored = visited.len();

        if !found {
            debug!(
                source = %source_key,
                target = %target_key,
                max_depth = params.max_depth,
                nodes_explored,
                "no path found"
            );
            return Ok(PathSearchResult {
                found: false,
                path_length: None,
                path: Vec::new(),
                edges: Vec::new(),
                nodes_explored,
                source: source_endpoint,
                target: target_endpoint,
            });
        }

        // Walk the parent map backward from the target, prepending as we go.
        let mut path: Vec<(NodeKey, String)> = Vec::new();
        let mut edges: Vec<PathEdge> = Vec::new();
        let mut current = target_key;

        while current != source_key {
            let name = names.get(&current).cloned().unwrap_or_else(|| current.to_string());
            path.insert(0, (current, name));
            let (parent_key, relationship) = parent
                .get(&current)
                .cloned()
                .ok_or_else(|| GraphError::validation("path reconstruction lost a parent link"))?;
            edges.insert(
                0,
                PathEdge {
                    step: 0,
                    from: parent_key.to_string(),
                    to: current.to_string(),
                    relationship,
                },
            );
            current = parent_key;
        }
        let source_display = names.get(&source_key).cloned().unwrap_or_default();
        path.insert(0, (source_key, source_display));

        let path_nodes: Vec<PathNode> = path
            .into_iter()
            .enumerate()
            .map(|(step, (key, name))| PathNode {
                step,
                node_type: key.node_type,
                id: key.id,
                name,
            })
            .collect();
        let path_edges: Vec<PathEdge> = edges
            .into_iter()
            .enumerate()
            .map(|(idx, mut edge)| {
                edge.step = idx + 1;
                edge
            })
            .collect();

        debug!(
            source = %source_key,
            target = %target_key,
            path_length = path_nodes.len() - 1,
            nodes_explored,
            "path found"
        );

        Ok(PathSearchResult {
            found: true,
            path_length: Some(path_nodes.len() - 1),
            path: path_nodes,
            edges: path_edges,
            nodes_explored,
            source: source_endpoint,
            target: target_endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: u32) -> PathSearchParams {
        PathSearchParams {
            source_type: NodeType::Property,
            source_id: 1,
            target_type: NodeType::Principal,
            target_id: 2,
            max_depth,
        }
    }

    #[test]
    fn rejects_out_of_range_depth() {
        assert!(params(0).validate().is_err());
        assert!(params(11).validate().is_err());
        assert!(params(1).validate().is_ok());
        assert!(params(10).validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_ids() {
        let mut p = params(6);
        p.source_id = 0;
        assert!(p.validate().is_err());

        let mut p = params(6);
        p.target_id = -4;
        assert!(p.validate().is_err());
    }

    #[test]
    fn default_depth_deserializes_when_omitted() {
        let p: PathSearchParams = serde_json::from_str(
            r#"{"source_type":"property","source_id":1,"target_type":"principal","target_id":9}"#,
        )
        .unwrap();
        assert_eq!(p.max_depth, DEFAULT_MAX_DEPTH);
    }
}
