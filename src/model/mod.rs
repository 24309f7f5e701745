//! Core graph model: node typing, composite keys, and temporal validity
//!
//! Every table in the ownership store keys its rows by a plain integer, so a
//! node is only unique as a `(type, id)` pair. `NodeKey` is that pair and is
//! the visited-set key for every traversal in the crate.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Name prefix marking a company record as a post-merge tombstone.
pub const MERGED_MARKER: &str = "[MERGED]";

/// The closed set of node types in the ownership graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A physical facility (keyed by internal id, externally by CCN).
    Property,
    /// A legal holding vehicle (OpCo, PropCo, lender entity, ...).
    Entity,
    /// A parent/portfolio company owning one or more entities.
    Company,
    /// A natural person.
    Principal,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Property => "property",
            NodeType::Entity => "entity",
            NodeType::Company => "company",
            NodeType::Principal => "principal",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "property" => Ok(NodeType::Property),
            "entity" => Ok(NodeType::Entity),
            "company" => Ok(NodeType::Company),
            "principal" => Ok(NodeType::Principal),
            other => Err(GraphError::validation(format!(
                "unknown node type '{}', expected property|entity|company|principal",
                other
            ))),
        }
    }
}

/// Composite node identity. Ids are not unique across types, so all visited
/// sets and parent maps key on this pair, rendered `"{type}_{id}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub node_type: NodeType,
    pub id: i64,
}

impl NodeKey {
    pub fn new(node_type: NodeType, id: i64) -> Self {
        Self { node_type, id }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.node_type, self.id)
    }
}

/// Legal-entity classification as recorded in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Opco,
    Propco,
    Management,
    Holding,
    Lender,
    Buyer,
    Seller,
    Borrower,
    Other,
}

impl EntityKind {
    /// Parse the store's free-text column; unrecognized values fold to `Other`.
    pub fn from_column(value: &str) -> Self {
        match value {
            "opco" => EntityKind::Opco,
            "propco" => EntityKind::Propco,
            "management" => EntityKind::Management,
            "holding" => EntityKind::Holding,
            "lender" => EntityKind::Lender,
            "buyer" => EntityKind::Buyer,
            "seller" => EntityKind::Seller,
            "borrower" => EntityKind::Borrower,
            _ => EntityKind::Other,
        }
    }
}

/// Parent-company classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyKind {
    Ownership,
    Operating,
    OwnerOperator,
    Lending,
    Reit,
    Other,
}

impl CompanyKind {
    pub fn from_column(value: &str) -> Self {
        match value {
            "ownership" => CompanyKind::Ownership,
            "operating" => CompanyKind::Operating,
            "owner_operator" => CompanyKind::OwnerOperator,
            "lending" => CompanyKind::Lending,
            "reit" => CompanyKind::Reit,
            _ => CompanyKind::Other,
        }
    }
}

/// Tombstone status for company records. Merged companies are historical
/// aliases and never appear in lookups, expansions, or rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Merged,
}

impl CompanyStatus {
    /// The store records the merge as a name marker; this is the one place
    /// that string convention is interpreted.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(MERGED_MARKER) {
            CompanyStatus::Merged
        } else {
            CompanyStatus::Active
        }
    }
}

/// Validity window of a time-scoped edge, `[effective_date, end_date)`.
///
/// The shared predicate for "does this edge participate in traversal" lives
/// here rather than being restated per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub effective_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Validity {
    pub fn new(effective_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            effective_date,
            end_date,
        }
    }

    /// An edge is active iff its window has not closed.
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }

    /// Point-in-time check: effective on or before `as_of`, not yet ended.
    pub fn is_active_at(&self, as_of: NaiveDate) -> bool {
        let started = match self.effective_date {
            Some(d) => d <= as_of,
            None => true,
        };
        let ended = match self.end_date {
            Some(d) => d <= as_of,
            None => false,
        };
        started && !ended
    }
}

/// One directed hop out of a node, as produced by the neighbor expander.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub node_type: NodeType,
    pub id: i64,
    /// Direction-specific relationship label (`property_owner`, `parent_company`,
    /// `has_entity`, a principal role, ...).
    pub relationship: String,
}

impl Neighbor {
    pub fn new(node_type: NodeType, id: i64, relationship: impl Into<String>) -> Self {
        Self {
            node_type,
            id,
            relationship: relationship.into(),
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.node_type, self.id)
    }
}
