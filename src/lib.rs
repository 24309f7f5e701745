//! snf-atlas - Beneficial-ownership graph engine for skilled nursing facilities
//!
//! Models the ownership universe as a heterogeneous graph of properties,
//! operating entities, parent companies, and principals, and answers
//! traversal and aggregation questions over it: shortest ownership paths,
//! network centrality rankings, pairwise relationship strength, portfolio
//! hierarchies, per-property ownership chains, and bounded subgraph
//! extraction for rendering.
//!
//! Edges are temporal (an open `end_date` means active) and companies merged
//! away carry a `[MERGED]` name marker that removes them from every lookup
//! and traversal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snf_atlas::graph::{PathFinder, PathSearchParams};
//! use snf_atlas::model::NodeType;
//! use snf_atlas::store::DatabaseManager;
//!
//! # async fn run() -> snf_atlas::error::GraphResult<()> {
//! let db = DatabaseManager::from_env().await?;
//! let finder = db.path_finder();
//! let result = finder
//!     .shortest_path(&PathSearchParams {
//!         source_type: NodeType::Property,
//!         source_id: 42,
//!         target_type: NodeType::Principal,
//!         target_id: 7,
//!         max_depth: 6,
//!     })
//!     .await?;
//! println!("found: {} in {:?} hops", result.found, result.path_length);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod store;

pub use error::{GraphError, GraphResult};
pub use graph::{
    CentralityParams, CentralityRanker, HierarchyBuilder, HierarchyParams, NetworkParams,
    NetworkTraverser, OwnershipTraceParams, OwnershipTracer, PathFinder, PathSearchParams,
    RelationshipParams, RelationshipScorer,
};
pub use model::{NodeKey, NodeType};
pub use store::{DatabaseConfig, DatabaseManager, GraphSource, PgGraphSource};
