//! Traversal behavior over an in-memory fixture graph
//!
//! Exercises the path finder and network traverser through the `GraphSource`
//! seam, with no database: a small ownership graph built by hand, plus an
//! expansion counter to check that no node is expanded twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use snf_atlas::error::GraphResult;
use snf_atlas::graph::{
    Direction, NetworkParams, NetworkTraverser, PathFinder, PathSearchParams,
};
use snf_atlas::model::{Neighbor, NodeKey, NodeType};
use snf_atlas::store::GraphSource;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Default)]
struct FixtureGraph {
    names: HashMap<NodeKey, String>,
    adjacency: HashMap<NodeKey, Vec<Neighbor>>,
    expansions: AtomicUsize,
}

impl FixtureGraph {
    fn node(&mut self, node_type: NodeType, id: i64, name: &str) -> &mut Self {
        self.names
            .insert(NodeKey::new(node_type, id), name.to_string());
        self
    }

    fn edge(
        &mut self,
        from: (NodeType, i64),
        to: (NodeType, i64),
        relationship: &str,
    ) -> &mut Self {
        self.adjacency
            .entry(NodeKey::new(from.0, from.1))
            .or_default()
            .push(Neighbor::new(to.0, to.1, relationship));
        self
    }

    /// Undirected convenience: adds both hop labels.
    fn link(
        &mut self,
        a: (NodeType, i64),
        b: (NodeType, i64),
        forward: &str,
        backward: &str,
    ) -> &mut Self {
        self.edge(a, b, forward).edge(b, a, backward)
    }
}

#[async_trait]
impl GraphSource for FixtureGraph {
    async fn resolve_node(&self, node_type: NodeType, id: i64) -> GraphResult<Option<String>> {
        Ok(self.names.get(&NodeKey::new(node_type, id)).cloned())
    }

    async fn neighbors(&self, node_type: NodeType, id: i64) -> GraphResult<Vec<Neighbor>> {
        self.expansions.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .adjacency
            .get(&NodeKey::new(node_type, id))
            .cloned()
            .unwrap_or_default())
    }
}

struct SharedGraph(Arc<FixtureGraph>);

#[async_trait]
impl GraphSource for SharedGraph {
    async fn resolve_node(&self, node_type: NodeType, id: i64) -> GraphResult<Option<String>> {
        self.0.resolve_node(node_type, id).await
    }

    async fn neighbors(&self, node_type: NodeType, id: i64) -> GraphResult<Vec<Neighbor>> {
        self.0.neighbors(node_type, id).await
    }
}

/// P1 -> E1 -> C1 -> Q1, the canonical property-to-principal chain.
fn ownership_chain() -> FixtureGraph {
    let mut g = FixtureGraph::default();
    g.node(NodeType::Property, 1, "Maple Grove Care Center")
        .node(NodeType::Entity, 1, "Maple Grove Operations LLC")
        .node(NodeType::Company, 1, "Cascade Health Holdings")
        .node(NodeType::Principal, 1, "D. Rosen");
    g.link(
        (NodeType::Property, 1),
        (NodeType::Entity, 1),
        "property_owner",
        "property_owner",
    );
    g.link(
        (NodeType::Entity, 1),
        (NodeType::Company, 1),
        "parent_company",
        "has_entity",
    );
    g.link(
        (NodeType::Company, 1),
        (NodeType::Principal, 1),
        "officer",
        "officer",
    );
    g
}

fn path_params(
    source: (NodeType, i64),
    target: (NodeType, i64),
    max_depth: u32,
) -> PathSearchParams {
    PathSearchParams {
        source_type: source.0,
        source_id: source.1,
        target_type: target.0,
        target_id: target.1,
        max_depth,
    }
}

#[tokio::test]
async fn finds_property_to_principal_chain() {
    init_tracing();
    let finder = PathFinder::new(ownership_chain());

    let result = finder
        .shortest_path(&path_params(
            (NodeType::Property, 1),
            (NodeType::Principal, 1),
            6,
        ))
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.path_length, Some(3));
    assert_eq!(result.path.len(), 4);
    assert_eq!(result.path[0].name, "Maple Grove Care Center");
    assert_eq!(result.path[3].name, "D. Rosen");

    assert_eq!(result.edges.len(), 3);
    assert_eq!(result.edges[0].step, 1);
    assert_eq!(result.edges[0].from, "property_1");
    assert_eq!(result.edges[0].to, "entity_1");
    assert_eq!(result.edges[0].relationship, "property_owner");
    assert_eq!(result.edges[1].relationship, "parent_company");
    assert_eq!(result.edges[2].relationship, "officer");
}

#[tokio::test]
async fn reverse_search_uses_reverse_hop_labels() {
    init_tracing();
    let finder = PathFinder::new(ownership_chain());

    let result = finder
        .shortest_path(&path_params(
            (NodeType::Principal, 1),
            (NodeType::Property, 1),
            6,
        ))
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.path_length, Some(3));
    // Each hop carries its direction-specific label: walking company to
    // entity is "has_entity", not the forward "parent_company".
    assert_eq!(result.edges[0].from, "principal_1");
    assert_eq!(result.edges[0].relationship, "officer");
    assert_eq!(result.edges[1].from, "company_1");
    assert_eq!(result.edges[1].to, "entity_1");
    assert_eq!(result.edges[1].relationship, "has_entity");
    assert_eq!(result.edges[2].to, "property_1");
    assert_eq!(result.edges[2].relationship, "property_owner");
}

#[tokio::test]
async fn depth_bound_turns_reachable_into_not_found() {
    init_tracing();
    let finder = PathFinder::new(ownership_chain());

    let result = finder
        .shortest_path(&path_params(
            (NodeType::Property, 1),
            (NodeType::Principal, 1),
            1,
        ))
        .await
        .unwrap();

    assert!(!result.found);
    assert_eq!(result.path_length, None);
    assert!(result.path.is_empty());
    assert!(result.edges.is_empty());
    // One hop reaches E1 only: visited is {P1, E1}.
    assert_eq!(result.nodes_explored, 2);
    // Endpoints still resolve on a negative result.
    assert_eq!(result.source.name, "Maple Grove Care Center");
    assert_eq!(result.target.name, "D. Rosen");
}

#[tokio::test]
async fn same_node_is_a_zero_length_path() {
    init_tracing();
    let finder = PathFinder::new(ownership_chain());

    let result = finder
        .shortest_path(&path_params(
            (NodeType::Entity, 1),
            (NodeType::Entity, 1),
            6,
        ))
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.path_length, Some(0));
    assert_eq!(result.path.len(), 1);
    assert!(result.edges.is_empty());
    assert_eq!(result.nodes_explored, 1);
}

#[tokio::test]
async fn unknown_endpoint_is_an_error_not_a_negative_result() {
    init_tracing();
    let finder = PathFinder::new(ownership_chain());

    let err = finder
        .shortest_path(&path_params(
            (NodeType::Property, 99),
            (NodeType::Principal, 1),
            6,
        ))
        .await
        .unwrap_err();
    assert!(err.is_client_error(), "got {err}");

    let err = finder
        .shortest_path(&path_params(
            (NodeType::Property, 1),
            (NodeType::Principal, 99),
            6,
        ))
        .await
        .unwrap_err();
    assert!(err.is_client_error(), "got {err}");
}

#[tokio::test]
async fn cycles_do_not_revisit_nodes() {
    init_tracing();
    // Two entities under one company, both owning the same property: plenty
    // of cycles back toward the source.
    let mut g = FixtureGraph::default();
    g.node(NodeType::Property, 1, "Riverbend")
        .node(NodeType::Entity, 1, "Riverbend Ops I")
        .node(NodeType::Entity, 2, "Riverbend Ops II")
        .node(NodeType::Company, 1, "Riverbend Holdings")
        .node(NodeType::Principal, 1, "S. Alvarez");
    g.link(
        (NodeType::Property, 1),
        (NodeType::Entity, 1),
        "property_owner",
        "property_owner",
    );
    g.link(
        (NodeType::Property, 1),
        (NodeType::Entity, 2),
        "operator",
        "operator",
    );
    g.link(
        (NodeType::Entity, 1),
        (NodeType::Company, 1),
        "parent_company",
        "has_entity",
    );
    g.link(
        (NodeType::Entity, 2),
        (NodeType::Company, 1),
        "parent_company",
        "has_entity",
    );
    g.link(
        (NodeType::Company, 1),
        (NodeType::Principal, 1),
        "owner",
        "owner",
    );

    let finder = PathFinder::new(g);
    let result = finder
        .shortest_path(&path_params(
            (NodeType::Property, 1),
            (NodeType::Principal, 1),
            6,
        ))
        .await
        .unwrap();

    assert!(result.found);
    assert_eq!(result.path_length, Some(3));
    // FIFO tie-break: E1 enumerates before E2, so the path goes through it.
    assert_eq!(result.path[1].name, "Riverbend Ops I");
    // 5 nodes total; nothing gets counted twice.
    assert!(result.nodes_explored <= 5);
}

#[tokio::test]
async fn each_node_is_expanded_at_most_once() {
    init_tracing();
    let mut g = ownership_chain();
    // No path out of the chain to this target: forces a full exhaustive search.
    g.node(NodeType::Principal, 50, "Unreachable");
    let g = Arc::new(g);

    let finder = PathFinder::new(SharedGraph(g.clone()));
    let result = finder
        .shortest_path(&path_params(
            (NodeType::Property, 1),
            (NodeType::Principal, 50),
            10,
        ))
        .await
        .unwrap();

    assert!(!result.found);
    assert_eq!(result.nodes_explored, 4);
    // 4 reachable nodes, so at most 4 expansion calls despite the cycles.
    assert!(g.expansions.load(Ordering::Relaxed) <= 4);
}

#[tokio::test]
async fn network_collects_full_neighborhood() {
    init_tracing();
    let traverser = NetworkTraverser::new(ownership_chain());

    let report = traverser
        .traverse(&NetworkParams {
            start_type: NodeType::Property,
            start_id: 1,
            max_depth: 3,
            direction: Direction::Both,
        })
        .await
        .unwrap();

    assert_eq!(report.statistics.total_nodes, 4);
    assert_eq!(report.statistics.max_depth_reached, 3);
    assert_eq!(
        report.statistics.nodes_by_type.get(&NodeType::Principal),
        Some(&1)
    );
    assert_eq!(report.graph.nodes[0].id, "property_1");
    assert_eq!(report.graph.nodes[0].depth, 0);
    // Forward hops plus the re-traversed reverse hops, deduplicated.
    assert!(report
        .graph
        .edges
        .iter()
        .any(|e| e.source == "entity_1" && e.target == "company_1"));
}

#[tokio::test]
async fn upward_traversal_never_descends() {
    init_tracing();
    // A company with a sibling entity below and a principal above.
    let mut g = FixtureGraph::default();
    g.node(NodeType::Entity, 1, "Ops I")
        .node(NodeType::Entity, 2, "Ops II")
        .node(NodeType::Company, 1, "Holdings")
        .node(NodeType::Principal, 1, "T. Okafor");
    g.link(
        (NodeType::Entity, 1),
        (NodeType::Company, 1),
        "parent_company",
        "has_entity",
    );
    g.link(
        (NodeType::Entity, 2),
        (NodeType::Company, 1),
        "parent_company",
        "has_entity",
    );
    g.link(
        (NodeType::Company, 1),
        (NodeType::Principal, 1),
        "owner",
        "owner",
    );

    let traverser = NetworkTraverser::new(g);
    let report = traverser
        .traverse(&NetworkParams {
            start_type: NodeType::Entity,
            start_id: 1,
            max_depth: 5,
            direction: Direction::Up,
        })
        .await
        .unwrap();

    // Up from E1: company, then principal. Never the sibling entity.
    assert_eq!(report.statistics.total_nodes, 3);
    assert!(report
        .graph
        .nodes
        .iter()
        .all(|n| n.id != "entity_2"));
    assert_eq!(report.statistics.max_depth_reached, 2);
}

#[tokio::test]
async fn network_drops_entity_principal_hops() {
    init_tracing();
    // An entity-level role edge: visible to the path finder, invisible here.
    let mut g = FixtureGraph::default();
    g.node(NodeType::Entity, 1, "Ops I")
        .node(NodeType::Principal, 1, "J. Lin");
    g.link(
        (NodeType::Entity, 1),
        (NodeType::Principal, 1),
        "manager",
        "manager",
    );

    let traverser = NetworkTraverser::new(g);
    let report = traverser
        .traverse(&NetworkParams {
            start_type: NodeType::Entity,
            start_id: 1,
            max_depth: 3,
            direction: Direction::Both,
        })
        .await
        .unwrap();

    assert_eq!(report.statistics.total_nodes, 1);
    assert!(report.graph.edges.is_empty());
}

#[tokio::test]
async fn tombstoned_companies_are_dead_ends() {
    init_tracing();
    // Company 9 has edges on both sides but no resolvable record, the shape
    // a merged tombstone presents through the storage seam. Nothing beyond
    // it may surface, and no edge may touch it.
    let mut g = FixtureGraph::default();
    g.node(NodeType::Entity, 1, "Ops I")
        .node(NodeType::Entity, 2, "Ops II");
    g.edge(
        (NodeType::Entity, 1),
        (NodeType::Company, 9),
        "parent_company",
    );
    g.edge((NodeType::Company, 9), (NodeType::Entity, 2), "has_entity");

    let traverser = NetworkTraverser::new(g);
    let report = traverser
        .traverse(&NetworkParams {
            start_type: NodeType::Entity,
            start_id: 1,
            max_depth: 5,
            direction: Direction::Both,
        })
        .await
        .unwrap();

    assert_eq!(report.statistics.total_nodes, 1);
    assert!(report.graph.edges.is_empty());
    assert!(report.graph.nodes.iter().all(|n| n.id != "entity_2"));
}

#[tokio::test]
async fn network_rejects_unknown_start() {
    init_tracing();
    let traverser = NetworkTraverser::new(ownership_chain());

    let err = traverser
        .traverse(&NetworkParams {
            start_type: NodeType::Company,
            start_id: 404,
            max_depth: 3,
            direction: Direction::Both,
        })
        .await
        .unwrap_err();
    assert!(err.is_client_error(), "got {err}");
}
