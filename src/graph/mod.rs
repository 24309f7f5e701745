//! Graph analytics over the ownership store
//!
//! Query components layered on the storage seam: shortest-path search,
//! centrality ranking, relationship-strength scoring, hierarchy aggregation,
//! ownership-chain tracing, and bounded subgraph extraction. All of them are
//! read-only request handlers; per-call state (visited sets, frontier queues)
//! is allocated fresh for each invocation.

pub mod centrality;
pub mod hierarchy;
pub mod network;
pub mod ownership;
pub mod path_finder;
pub mod relationship;

pub use centrality::{CentralityMetric, CentralityParams, CentralityRanker, CentralityReport, Tier};
pub use hierarchy::{HierarchyBuilder, HierarchyLevel, HierarchyParams, HierarchyReport};
pub use network::{Direction, NetworkParams, NetworkReport, NetworkTraverser};
pub use ownership::{OwnershipChainReport, OwnershipTraceParams, OwnershipTracer};
pub use path_finder::{PathFinder, PathSearchParams, PathSearchResult};
pub use relationship::{
    RelationshipParams, RelationshipScorer, RelationshipStrength, RelationshipType,
};
