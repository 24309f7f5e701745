//! The storage seam: node resolution and typed neighbor enumeration
//!
//! Every traversal component routes its graph access through [`GraphSource`]
//! so that temporal filtering and merged-company exclusion are enforced in one
//! place and cannot be bypassed at a new call site. Expansion queries fetch
//! the raw validity columns and the shared [`Validity::is_active`] predicate
//! decides participation; each query orders by target id so enumeration order
//! (and therefore BFS tie-breaking) is stable across runs.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::debug;

use crate::error::GraphResult;
use crate::model::{Neighbor, NodeType, Validity};

/// Read access to the ownership graph: the two operations every traversal
/// component is built from.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Resolve a node to its display name. `None` means the node does not
    /// exist (merged companies are reported as absent).
    async fn resolve_node(&self, node_type: NodeType, id: i64) -> GraphResult<Option<String>>;

    /// One directed hop out of a node, honoring temporal validity and
    /// merged-company exclusion.
    async fn neighbors(&self, node_type: NodeType, id: i64) -> GraphResult<Vec<Neighbor>>;
}

/// Postgres-backed [`GraphSource`].
#[derive(Clone)]
pub struct PgGraphSource {
    pool: PgPool,
    include_historical: bool,
}

/// Row shape for time-scoped expansion queries.
type TemporalEdgeRow = (i64, String, Option<NaiveDate>, Option<NaiveDate>);

impl PgGraphSource {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            include_historical: false,
        }
    }

    /// Opt in to closed-window edges. Default traversals see active edges only.
    pub fn with_historical(mut self) -> Self {
        self.include_historical = true;
        self
    }

    fn keep(&self, validity: &Validity) -> bool {
        self.include_historical || validity.is_active()
    }

    fn collect_temporal(&self, node_type: NodeType, rows: Vec<TemporalEdgeRow>) -> Vec<Neighbor> {
        rows.into_iter()
            .filter(|(_, _, effective, end)| self.keep(&Validity::new(*effective, *end)))
            .map(|(id, relationship, _, _)| Neighbor::new(node_type, id, relationship))
            .collect()
    }

    async fn property_neighbors(&self, id: i64) -> GraphResult<Vec<Neighbor>> {
        let rows: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT entity_id, relationship_type, effective_date, end_date
            FROM property_entity_relationships
            WHERE property_master_id = $1
            ORDER BY entity_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.collect_temporal(NodeType::Entity, rows))
    }

    async fn entity_neighbors(&self, id: i64) -> GraphResult<Vec<Neighbor>> {
        let mut neighbors = Vec::new();

        // Entity -> Property
        let properties: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT property_master_id, relationship_type, effective_date, end_date
            FROM property_entity_relationships
            WHERE entity_id = $1
            ORDER BY property_master_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(self.collect_temporal(NodeType::Property, properties));

        // Entity -> Company (implicit ownership edge, never time-scoped)
        let parent: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT e.company_id
            FROM entities e
            JOIN companies c ON c.id = e.company_id
            WHERE e.id = $1 AND c.company_name NOT LIKE '[MERGED]%'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some((company_id,)) = parent {
            neighbors.push(Neighbor::new(NodeType::Company, company_id, "parent_company"));
        }

        // Entity -> Principal (role edges)
        let principals: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT principal_id, role, effective_date, end_date
            FROM principal_entity_relationships
            WHERE entity_id = $1
            ORDER BY principal_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(self.collect_temporal(NodeType::Principal, principals));

        Ok(neighbors)
    }

    async fn company_neighbors(&self, id: i64) -> GraphResult<Vec<Neighbor>> {
        // Merged companies are absent as a traversal source, not just as a
        // target; resolve_node already encodes the tombstone filter.
        if self.resolve_node(NodeType::Company, id).await?.is_none() {
            return Ok(Vec::new());
        }

        let mut neighbors = Vec::new();

        // Company -> Entity (one-to-many, never time-scoped)
        let entities: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM entities
            WHERE company_id = $1
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(
            entities
                .into_iter()
                .map(|(entity_id,)| Neighbor::new(NodeType::Entity, entity_id, "has_entity")),
        );

        // Company -> Principal (role edges at company granularity)
        let principals: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT principal_id, role, effective_date, end_date
            FROM principal_company_relationships
            WHERE company_id = $1
            ORDER BY principal_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(self.collect_temporal(NodeType::Principal, principals));

        Ok(neighbors)
    }

    async fn principal_neighbors(&self, id: i64) -> GraphResult<Vec<Neighbor>> {
        let mut neighbors = Vec::new();

        // Principal -> Company, skipping merged tombstones
        let companies: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT pcr.company_id, pcr.role, pcr.effective_date, pcr.end_date
            FROM principal_company_relationships pcr
            JOIN companies c ON c.id = pcr.company_id
            WHERE pcr.principal_id = $1
              AND c.company_name NOT LIKE '[MERGED]%'
            ORDER BY pcr.company_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(self.collect_temporal(NodeType::Company, companies));

        // Principal -> Entity
        let entities: Vec<TemporalEdgeRow> = sqlx::query_as(
            r#"
            SELECT entity_id, role, effective_date, end_date
            FROM principal_entity_relationships
            WHERE principal_id = $1
            ORDER BY entity_id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        neighbors.extend(self.collect_temporal(NodeType::Entity, entities));

        Ok(neighbors)
    }
}

#[async_trait]
impl GraphSource for PgGraphSource {
    async fn resolve_node(&self, node_type: NodeType, id: i64) -> GraphResult<Option<String>> {
        let row: Option<(String,)> = match node_type {
            NodeType::Property => {
                sqlx::query_as("SELECT facility_name FROM property_master WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            NodeType::Entity => {
                sqlx::query_as("SELECT entity_name FROM entities WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            NodeType::Company => {
                // Merged companies are tombstones: absent from all lookups.
                sqlx::query_as(
                    r#"
                    SELECT company_name FROM companies
                    WHERE id = $1 AND company_name NOT LIKE '[MERGED]%'
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            NodeType::Principal => {
                sqlx::query_as("SELECT full_name FROM principals WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(row.map(|(name,)| name))
    }

    async fn neighbors(&self, node_type: NodeType, id: i64) -> GraphResult<Vec<Neighbor>> {
        let neighbors = match node_type {
            NodeType::Property => self.property_neighbors(id).await?,
            NodeType::Entity => self.entity_neighbors(id).await?,
            NodeType::Company => self.company_neighbors(id).await?,
            NodeType::Principal => self.principal_neighbors(id).await?,
        };

        debug!(
            node = %crate::model::NodeKey::new(node_type, id),
            count = neighbors.len(),
            "expanded neighbors"
        );
        Ok(neighbors)
    }
}
