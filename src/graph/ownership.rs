//! Ownership-chain trace: Property → Owner Entity → Company → Principals
//!
//! A per-property view of who owns the real estate. Principals are combined
//! from both granularities for display: entity-level role records take
//! precedence, and company-level duplicates of an already-listed principal
//! are suppressed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::graph::hierarchy::PropertySummary;

/// Parameters for an ownership trace. One of the two identifiers is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnershipTraceParams {
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub ccn: Option<String>,
}

impl OwnershipTraceParams {
    pub fn validate(&self) -> GraphResult<()> {
        match (&self.property_id, &self.ccn) {
            (None, None) => Err(GraphError::validation(
                "either property_id or ccn must be provided",
            )),
            (Some(id), _) if *id <= 0 => {
                Err(GraphError::validation("property_id must be positive"))
            }
            (_, Some(ccn)) if self.property_id.is_none() && ccn.trim().is_empty() => {
                Err(GraphError::validation("ccn must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Granularity at which a principal role was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleLevel {
    Entity,
    Company,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalRole {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub ownership_percentage: Option<Decimal>,
    pub relationship_level: RoleLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntity {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCompany {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
}

/// One owner entity with its parent company and combined principal list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipLink {
    pub entity: ChainEntity,
    pub company: ChainCompany,
    pub principals: Vec<PrincipalRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipChainReport {
    pub property: PropertySummary,
    pub ownership_chain: Vec<OwnershipLink>,
}

/// Combine entity-level and company-level principal records: entity-level
/// entries win, company-level duplicates of a seen principal are dropped.
pub(crate) fn combine_principals(
    entity_level: Vec<PrincipalRole>,
    company_level: Vec<PrincipalRole>,
) -> Vec<PrincipalRole> {
    let mut seen: std::collections::HashSet<i64> =
        entity_level.iter().map(|p| p.id).collect();
    let mut combined = entity_level;
    for principal in company_level {
        if seen.insert(principal.id) {
            combined.push(principal);
        }
    }
    combined
}

/// Ownership-chain trace service.
pub struct OwnershipTracer {
    pool: PgPool,
}

type OwnerEntityRow = (i64, String, Option<String>, i64, String, Option<String>);
type PrincipalRow = (i64, String, String, Option<Decimal>);

impl OwnershipTracer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn trace(&self, params: &OwnershipTraceParams) -> GraphResult<OwnershipChainReport> {
        params.validate()?;

        let property = self
            .fetch_property(params.property_id, params.ccn.as_deref())
            .await?;

        let owner_entities: Vec<OwnerEntityRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.entity_name, e.entity_type,
                   c.id AS company_id, c.company_name, c.company_type
            FROM property_entity_relationships per
            JOIN entities e ON e.id = per.entity_id
            JOIN companies c ON c.id = e.company_id
            WHERE per.property_master_id = $1
              AND per.relationship_type = 'property_owner'
              AND per.end_date IS NULL
              AND c.company_name NOT LIKE '[MERGED]%'
            ORDER BY e.id
            "#,
        )
        .bind(property.id)
        .fetch_all(&self.pool)
        .await?;

        let mut chain = Vec::with_capacity(owner_entities.len());
        for (entity_id, entity_name, entity_kind, company_id, company_name, company_kind) in
            owner_entities
        {
            let entity_level = self.entity_principals(entity_id).await?;
            let company_level = self.company_principals(company_id).await?;
            let principals = combine_principals(entity_level, company_level);

            chain.push(OwnershipLink {
                entity: ChainEntity {
                    id: entity_id,
                    name: entity_name,
                    kind: entity_kind,
                },
                company: ChainCompany {
                    id: company_id,
                    name: company_name,
                    kind: company_kind,
                },
                principals,
            });
        }

        debug!(
            property = property.id,
            owners = chain.len(),
            "traced ownership chain"
        );

        Ok(OwnershipChainReport {
            property,
            ownership_chain: chain,
        })
    }

    async fn fetch_property(
        &self,
        property_id: Option<i64>,
        ccn: Option<&str>,
    ) -> GraphResult<PropertySummary> {
        let row: Option<(i64, String, String, String, String)> = if let Some(id) = property_id {
            sqlx::query_as(
                "SELECT id, ccn, facility_name, city, state FROM property_master WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, ccn, facility_name, city, state FROM property_master WHERE ccn = $1",
            )
            .bind(ccn)
            .fetch_optional(&self.pool)
            .await?
        };

        let (id, ccn, facility_name, city, state) = row.ok_or_else(|| {
            let identifier = property_id
                .map(|id| id.to_string())
                .or_else(|| ccn.map(|c| c.to_string()))
                .unwrap_or_default();
            GraphError::not_found("property", identifier)
        })?;

        Ok(PropertySummary {
            id,
            ccn,
            facility_name,
            location: format!("{}, {}", city, state),
        })
    }

    async fn entity_principals(&self, entity_id: i64) -> GraphResult<Vec<PrincipalRole>> {
        let rows: Vec<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.full_name, pner.role, pner.ownership_percentage
            FROM principal_entity_relationships pner
            JOIN principals p ON p.id = pner.principal_id
            WHERE pner.entity_id = $1 AND pner.end_date IS NULL
            ORDER BY pner.ownership_percentage DESC NULLS LAST, p.full_name
            "#,
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, role, ownership_percentage)| PrincipalRole {
                id,
                name,
                role,
                ownership_percentage,
                relationship_level: RoleLevel::Entity,
            })
            .collect())
    }

    async fn company_principals(&self, company_id: i64) -> GraphResult<Vec<PrincipalRole>> {
        let rows: Vec<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.full_name, pcr.role, pcr.ownership_percentage
            FROM principal_company_relationships pcr
            JOIN principals p ON p.id = pcr.principal_id
            WHERE pcr.company_id = $1 AND pcr.end_date IS NULL
            ORDER BY pcr.ownership_percentage DESC NULLS LAST, p.full_name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, role, ownership_percentage)| PrincipalRole {
                id,
                name,
                role,
                ownership_percentage,
                relationship_level: RoleLevel::Company,
            })
            .collect())
    }
}
