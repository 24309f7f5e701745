//! Multi-level ownership hierarchy aggregation
//!
//! Walks upward from a property, entity, or company through the ownership
//! layers to the principal-level ultimate beneficial owners. Levels are
//! numbered from 0 at whichever starting point was supplied; the UBO set is a
//! union-by-id across company-level and entity-level role records, with no
//! granularity preference.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// Cap on sibling entities and sibling properties surfaced per request.
const SIBLING_LIMIT: i64 = 50;

/// Parameters for a hierarchy query. Exactly one starting point is honored:
/// a property (by id or CCN) wins over an entity, which wins over a company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HierarchyParams {
    #[serde(default)]
    pub property_id: Option<i64>,
    #[serde(default)]
    pub ccn: Option<String>,
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub include_siblings: bool,
}

impl HierarchyParams {
    pub fn validate(&self) -> GraphResult<()> {
        if self.property_id.is_none()
            && self.ccn.is_none()
            && self.entity_id.is_none()
            && self.company_id.is_none()
        {
            return Err(GraphError::validation(
                "at least one of property_id, ccn, entity_id, company_id is required",
            ));
        }
        for (name, id) in [
            ("property_id", self.property_id),
            ("entity_id", self.entity_id),
            ("company_id", self.company_id),
        ] {
            if let Some(id) = id {
                if id <= 0 {
                    return Err(GraphError::validation(format!("{} must be positive", name)));
                }
            }
        }
        if let Some(ccn) = &self.ccn {
            if ccn.trim().is_empty() {
                return Err(GraphError::validation("ccn must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub id: i64,
    pub ccn: String,
    pub facility_name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
    pub relationship: String,
    pub company_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UboRecord {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub ownership_percentage: Option<Decimal>,
}

/// One level of the ownership chain, 0-based from the starting point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HierarchyLevel {
    Property {
        level: usize,
        property: PropertySummary,
    },
    Entity {
        level: usize,
        entity: EntityNode,
    },
    Entities {
        level: usize,
        count: usize,
        entities: Vec<EntityNode>,
    },
    Company {
        level: usize,
        company: CompanySummary,
    },
    Companies {
        level: usize,
        count: usize,
        companies: Vec<CompanySummary>,
    },
    Principals {
        level: usize,
        count: usize,
        ultimate_beneficial_owners: Vec<UboRecord>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingEntities {
    pub sibling_entities: Vec<EntitySummary>,
    pub sibling_properties: Vec<PropertySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchySummary {
    pub total_levels: usize,
    pub start_point: String,
    pub companies_found: usize,
    pub entities_found: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyReport {
    pub hierarchy: Vec<HierarchyLevel>,
    pub summary: HierarchySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub siblings: Option<SiblingEntities>,
}

/// Deduplicate principal records by id, keeping the first occurrence.
pub(crate) fn dedupe_ubos(records: Vec<UboRecord>) -> Vec<UboRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.id))
        .collect()
}

/// Hierarchy aggregation service.
pub struct HierarchyBuilder {
    pool: PgPool,
}

type PropertyRow = (i64, String, String, String, String);
type EntityRow = (i64, String, Option<String>, i64, String);
type CompanyRow = (i64, String, Option<String>);
type PrincipalRow = (i64, String, String, Option<Decimal>);

impl HierarchyBuilder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn hierarchy(&self, params: &HierarchyParams) -> GraphResult<HierarchyReport> {
        params.validate()?;

        let mut levels: Vec<HierarchyLevel> = Vec::new();
        let mut level = 0usize;
        let mut entity_ids: Vec<i64> = Vec::new();
        let mut start_property: Option<i64> = None;
        let start_point;

        if params.property_id.is_some() || params.ccn.is_some() {
            start_point = "property";
            let property = self
                .fetch_property(params.property_id, params.ccn.as_deref())
                .await?;
            start_property = Some(property.id);

            let entities = self.fetch_property_entities(property.id).await?;
            entity_ids = entities.iter().map(|e| e.id).collect();

            levels.push(HierarchyLevel::Property { level, property });
            level += 1;
            levels.push(HierarchyLevel::Entities {
                level,
                count: entities.len(),
                entities,
            });
            level += 1;
        } else if let Some(entity_id) = params.entity_id {
            start_point = "entity";
            let entity = self.fetch_entity(entity_id).await?;
            entity_ids = vec![entity.id];
            levels.push(HierarchyLevel::Entity { level, entity });
            level += 1;
        } else {
            start_point = "company";
        }

        let mut company_ids: Vec<i64> = Vec::new();
        if !entity_ids.is_empty() {
            let companies = self.fetch_parent_companies(&entity_ids).await?;
            company_ids = companies.iter().map(|c| c.id).collect();
            levels.push(HierarchyLevel::Companies {
                level,
                count: companies.len(),
                companies,
            });
            level += 1;
        } else if let Some(company_id) = params.company_id {
            let company = self.fetch_company(company_id).await?;
            company_ids = vec![company.id];
            levels.push(HierarchyLevel::Company { level, company });
            level += 1;
        }

        if !company_ids.is_empty() {
            let ubos = self.fetch_ubos(&company_ids, &entity_ids).await?;
            levels.push(HierarchyLevel::Principals {
                level,
                count: ubos.len(),
                ultimate_beneficial_owners: ubos,
            });
        }

        let siblings = if params.include_siblings && !company_ids.is_empty() {
            Some(
                self.fetch_siblings(&company_ids, &entity_ids, start_property)
                    .await?,
            )
        } else {
            None
        };

        debug!(
            start_point,
            entities = entity_ids.len(),
            companies = company_ids.len(),
            levels = levels.len(),
            "built ownership hierarchy"
        );

        Ok(HierarchyReport {
            summary: HierarchySummary {
                total_levels: levels.len(),
                start_point: start_point.to_string(),
                companies_found: company_ids.len(),
                entities_found: entity_ids.len(),
            },
            hierarchy: levels,
            siblings,
        })
    }

    async fn fetch_property(
        &self,
        property_id: Option<i64>,
        ccn: Option<&str>,
    ) -> GraphResult<PropertySummary> {
        let row: Option<PropertyRow> = if let Some(id) = property_id {
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

    async fn fetch_property_entities(&self, property_id: i64) -> GraphResult<Vec<EntityNode>> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.entity_name, e.entity_type, e.company_id, per.relationship_type
            FROM property_entity_relationships per
            JOIN entities e ON e.id = per.entity_id
            WHERE per.property_master_id = $1 AND per.end_date IS NULL
            ORDER BY e.id
            "#,
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, kind, company_id, relationship)| EntityNode {
                id,
                name,
                kind,
                relationship,
                company_id,
            })
            .collect())
    }

    async fn fetch_entity(&self, entity_id: i64) -> GraphResult<EntityNode> {
        let row: Option<(i64, String, Option<String>, i64)> = sqlx::query_as(
            "SELECT id, entity_name, entity_type, company_id FROM entities WHERE id = $1",
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name, kind, company_id) =
            row.ok_or_else(|| GraphError::not_found("entity", entity_id))?;
        Ok(EntityNode {
            id,
            name,
            kind,
            relationship: "direct".to_string(),
            company_id,
        })
    }

    async fn fetch_parent_companies(&self, entity_ids: &[i64]) -> GraphResult<Vec<CompanySummary>> {
        let rows: Vec<CompanyRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT c.id, c.company_name, c.company_type
            FROM entities e
            JOIN companies c ON c.id = e.company_id
            WHERE e.id = ANY($1) AND c.company_name NOT LIKE '[MERGED]%'
            ORDER BY c.id
            "#,
        )
        .bind(entity_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, kind)| CompanySummary { id, name, kind })
            .collect())
    }

    async fn fetch_company(&self, company_id: i64) -> GraphResult<CompanySummary> {
        let row: Option<CompanyRow> = sqlx::query_as(
            r#"
            SELECT id, company_name, company_type FROM companies
            WHERE id = $1 AND company_name NOT LIKE '[MERGED]%'
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name, kind) = row.ok_or_else(|| GraphError::not_found("company", company_id))?;
        Ok(CompanySummary { id, name, kind })
    }

    /// Union of company-level roles at the given companies and entity-level
    /// roles at the path entities (all entities of the companies when the
    /// chain started at a company). Deduplicated by principal id.
    async fn fetch_ubos(
        &self,
        company_ids: &[i64],
        entity_ids: &[i64],
    ) -> GraphResult<Vec<UboRecord>> {
        let company_level: Vec<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT p.id, p.full_name, pcr.role, pcr.ownership_percentage
            FROM principal_company_relationships pcr
            JOIN principals p ON p.id = pcr.principal_id
            WHERE pcr.company_id = ANY($1) AND pcr.end_date IS NULL
            "#,
        )
        .bind(company_ids)
        .fetch_all(&self.pool)
        .await?;

        let entity_level: Vec<PrincipalRow> = if entity_ids.is_empty() {
            sqlx::query_as(
                r#"
                SELECT DISTINCT p.id, p.full_name, pner.role, pner.ownership_percentage
                FROM entities e
                JOIN principal_entity_relationships pner
                  ON pner.entity_id = e.id AND pner.end_date IS NULL
                JOIN principals p ON p.id = pner.principal_id
                WHERE e.company_id = ANY($1)
                "#,
            )
            .bind(company_ids)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT DISTINCT p.id, p.full_name, pner.role, pner.ownership_percentage
                FROM principal_entity_relationships pner
                JOIN principals p ON p.id = pner.principal_id
                WHERE pner.entity_id = ANY($1) AND pner.end_date IS NULL
                "#,
            )
            .bind(entity_ids)
            .fetch_all(&self.pool)
            .await?
        };

        let mut records: Vec<UboRecord> = company_level
            .into_iter()
            .chain(entity_level)
            .map(|(id, name, role, ownership_percentage)| UboRecord {
                id,
                name,
                role,
                ownership_percentage,
            })
            .collect();

        // Highest stakes first, then stable by name; dedupe keeps the top
        // record per principal.
        records.sort_by(|a, b| {
            b.ownership_percentage
                .cmp(&a.ownership_percentage)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(dedupe_ubos(records))
    }

    async fn fetch_siblings(
        &self,
        company_ids: &[i64],
        entity_ids: &[i64],
        start_property: Option<i64>,
    ) -> GraphResult<SiblingEntities> {
        let entity_rows: Vec<CompanyRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.entity_name, e.entity_type
            FROM entities e
            WHERE e.company_id = ANY($1) AND NOT (e.id = ANY($2))
            ORDER BY e.id
            LIMIT $3
            "#,
        )
        .bind(company_ids)
        .bind(entity_ids)
        .bind(SIBLING_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let property_rows: Vec<PropertyRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT pm.id, pm.ccn, pm.facility_name, pm.city, pm.state
            FROM property_entity_relationships per
            JOIN entities e ON e.id = per.entity_id
            JOIN property_master pm ON pm.id = per.property_master_id
            WHERE e.company_id = ANY($1)
              AND per.end_date IS NULL
              AND pm.id != $2
            ORDER BY pm.id
            LIMIT $3
            "#,
        )
        .bind(company_ids)
        .bind(start_property.unwrap_or(-1))
        .bind(SIBLING_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(SiblingEntities {
            sibling_entities: entity_rows
                .into_iter()
                .map(|(id, name, kind)| EntitySummary { id, name, kind })
                .collect(),
            sibling_properties: property_rows
                .into_iter()
                .map(|(id, ccn, facility_name, city, state)| PropertySummary {
                    id,
                    ccn,
                    facility_name,
                    location: format!("{}, {}", city, state),
                })
                .collect(),
        })
    }
}
