//! Pairwise relationship-strength scoring between companies
//!
//! Three independently computed overlap signals (shared properties, shared
//! deals, shared principals) feed a weighted total and a classification of
//! the dominant relationship type. Scores are symmetric: swapping the two
//! company ids only swaps the labeled role columns.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::error::{GraphError, GraphResult};

pub const WEIGHT_SHARED_PROPERTY: i64 = 2;
pub const WEIGHT_SHARED_DEAL: i64 = 3;
pub const WEIGHT_SHARED_PRINCIPAL: i64 = 5;

/// How many shared deals are itemized in the report (counts and totals cover
/// all of them).
const DEAL_DETAIL_LIMIT: usize = 10;

/// Parameters for a relationship-strength query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipParams {
    pub company_id_1: i64,
    pub company_id_2: i64,
}

impl RelationshipParams {
    pub fn validate(&self) -> GraphResult<()> {
        if self.company_id_1 <= 0 || self.company_id_2 <= 0 {
            return Err(GraphError::validation(
                "company_id_1 and company_id_2 must be positive",
            ));
        }
        Ok(())
    }
}

/// Dominant relationship classification, first matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    CommonOwnership,
    TransactionCounterparty,
    LendingRelationship,
    CoInvestment,
    None,
}

/// Strength bucket derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipDepth {
    Strong,
    Moderate,
    Weak,
    None,
}

pub(crate) fn depth_for(total_score: i64) -> RelationshipDepth {
    if total_score > 15 {
        RelationshipDepth::Strong
    } else if total_score > 5 {
        RelationshipDepth::Moderate
    } else if total_score > 0 {
        RelationshipDepth::Weak
    } else {
        RelationshipDepth::None
    }
}

/// Classification priority: shared principals dominate, then deal-role
/// pairings, then shared properties.
pub(crate) fn classify(
    shared_principals: usize,
    deal_role_pairs: &[(String, String)],
    shared_properties: usize,
) -> RelationshipType {
    if shared_principals > 0 {
        return RelationshipType::CommonOwnership;
    }
    if !deal_role_pairs.is_empty() {
        let has = |needle: &str| {
            deal_role_pairs
                .iter()
                .any(|(a, b)| a.contains(needle) || b.contains(needle))
        };
        if has("buyer") || has("seller") {
            return RelationshipType::TransactionCounterparty;
        }
        if has("lender") {
            return RelationshipType::LendingRelationship;
        }
        return RelationshipType::None;
    }
    if shared_properties > 0 {
        return RelationshipType::CoInvestment;
    }
    RelationshipType::None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRef {
    pub id: i64,
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedProperty {
    pub property_id: i64,
    pub facility_name: String,
    pub location: String,
    pub company_1_role: String,
    pub company_2_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDeal {
    pub deal_id: i64,
    pub deal_type: String,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub property: Option<String>,
    pub company_1_role: String,
    pub company_2_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedPrincipal {
    pub principal_id: i64,
    pub name: String,
    pub company_1_role: String,
    pub company_2_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub shared_properties: i64,
    pub shared_deals: i64,
    pub shared_principals: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDealSummary {
    pub count: usize,
    pub total_value: Decimal,
    pub deals: Vec<SharedDeal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub have_relationship: bool,
    pub relationship_depth: RelationshipDepth,
}

/// Full scoring report for a company pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipStrength {
    pub company_1: CompanyRef,
    pub company_2: CompanyRef,
    pub total_score: i64,
    pub relationship_type: RelationshipType,
    pub breakdown: ScoreBreakdown,
    pub shared_properties: Vec<SharedProperty>,
    pub shared_deals: SharedDealSummary,
    pub shared_principals: Vec<SharedPrincipal>,
    pub summary: RelationshipSummary,
}

/// Aggregate-backed relationship scoring service.
pub struct RelationshipScorer {
    pool: PgPool,
}

type CompanyRow = (i64, String, Option<String>);
type SharedPropertyRow = (i64, String, String, String, String, String);
type SharedDealRow = (
    i64,
    String,
    Option<NaiveDate>,
    Option<Decimal>,
    String,
    String,
    Option<String>,
);
type SharedPrincipalRow = (i64, String, String, String);

impl RelationshipScorer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn score(&self, params: &RelationshipParams) -> GraphResult<RelationshipStrength> {
        params.validate()?;

        let company_1 = self.fetch_company(params.company_id_1).await?;
        let company_2 = self.fetch_company(params.company_id_2).await?;

        let shared_properties = self
            .shared_properties(params.company_id_1, params.company_id_2)
            .await?;
        let shared_deals = self
            .shared_deals(params.company_id_1, params.company_id_2)
            .await?;
        let shared_principals = self
            .shared_principals(params.company_id_1, params.company_id_2)
            .await?;

        let total_score = WEIGHT_SHARED_PROPERTY * shared_properties.len() as i64
            + WEIGHT_SHARED_DEAL * shared_deals.len() as i64
            + WEIGHT_SHARED_PRINCIPAL * shared_principals.len() as i64;

        let deal_role_pairs: Vec<(String, String)> = shared_deals
            .iter()
            .map(|d| (d.company_1_role.clone(), d.company_2_role.clone()))
            .collect();
        let relationship_type = classify(
            shared_principals.len(),
            &deal_role_pairs,
            shared_properties.len(),
        );

        let total_value: Decimal = shared_deals
            .iter()
            .map(|d| d.amount.unwrap_or_default())
            .sum();

        debug!(
            company_1 = params.company_id_1,
            company_2 = params.company_id_2,
            total_score,
            ?relationship_type,
            "scored company relationship"
        );

        Ok(RelationshipStrength {
            company_1,
            company_2,
            total_score,
            relationship_type,
            breakdown: ScoreBreakdown {
                shared_properties: WEIGHT_SHARED_PROPERTY * shared_properties.len() as i64,
                shared_deals: WEIGHT_SHARED_DEAL * shared_deals.len() as i64,
                shared_principals: WEIGHT_SHARED_PRINCIPAL * shared_principals.len() as i64,
            },
            shared_properties,
            shared_deals: SharedDealSummary {
                count: shared_deals.len(),
                total_value,
                deals: shared_deals.into_iter().take(DEAL_DETAIL_LIMIT).collect(),
            },
            shared_principals,
            summary: RelationshipSummary {
                have_relationship: total_score > 0,
                relationship_depth: depth_for(total_score),
            },
        })
    }

    async fn fetch_company(&self, id: i64) -> GraphResult<CompanyRef> {
        let row: Option<CompanyRow> = sqlx::query_as(
            r#"
            SELECT id, company_name, company_type FROM companies
            WHERE id = $1 AND company_name NOT LIKE '[MERGED]%'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name, kind) = row.ok_or_else(|| GraphError::not_found("company", id))?;
        Ok(CompanyRef { id, name, kind })
    }

    async fn shared_properties(&self, id_1: i64, id_2: i64) -> GraphResult<Vec<SharedProperty>> {
        let rows: Vec<SharedPropertyRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT pm.id, pm.facility_name, pm.city, pm.state,
                   per1.relationship_type AS company1_role,
                   per2.relationship_type AS company2_role
            FROM property_master pm
            JOIN property_entity_relationships per1 ON per1.property_master_id = pm.id
            JOIN entities e1 ON e1.id = per1.entity_id AND e1.company_id = $1
            JOIN property_entity_relationships per2 ON per2.property_master_id = pm.id
            JOIN entities e2 ON e2.id = per2.entity_id AND e2.company_id = $2
            WHERE per1.end_date IS NULL AND per2.end_date IS NULL
            ORDER BY pm.id
            "#,
        )
        .bind(id_1)
        .bind(id_2)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(property_id, facility_name, city, state, role_1, role_2)| SharedProperty {
                    property_id,
                    facility_name,
                    location: format!("{}, {}", city, state),
                    company_1_role: role_1,
                    company_2_role: role_2,
                },
            )
            .collect())
    }

    async fn shared_deals(&self, id_1: i64, id_2: i64) -> GraphResult<Vec<SharedDeal>> {
        let rows: Vec<SharedDealRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT d.id, d.deal_type, d.effective_date, d.amount,
                   dp1.party_role AS company1_role,
                   dp2.party_role AS company2_role,
                   pm.facility_name
            FROM deals d
            JOIN deal_parties dp1 ON dp1.deal_id = d.id AND dp1.company_id = $1
            JOIN deal_parties dp2 ON dp2.deal_id = d.id AND dp2.company_id = $2
            LEFT JOIN property_master pm ON pm.id = d.property_master_id
            WHERE dp1.id != dp2.id
            ORDER BY d.effective_date DESC NULLS LAST, d.id
            "#,
        )
        .bind(id_1)
        .bind(id_2)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(deal_id, deal_type, date, amount, role_1, role_2, property)| SharedDeal {
                    deal_id,
                    deal_type,
                    date,
                    amount,
                    property,
                    company_1_role: role_1,
                    company_2_role: role_2,
                },
            )
            .collect())
    }

    async fn shared_principals(&self, id_1: i64, id_2: i64) -> GraphResult<Vec<SharedPrincipal>> {
        let rows: Vec<SharedPrincipalRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT p.id, p.full_name,
                   pcr1.role AS company1_role,
                   pcr2.role AS company2_role
            FROM principals p
            JOIN principal_company_relationships pcr1
              ON pcr1.principal_id = p.id AND pcr1.company_id = $1
            JOIN principal_company_relationships pcr2
              ON pcr2.principal_id = p.id AND pcr2.company_id = $2
            WHERE pcr1.end_date IS NULL AND pcr2.end_date IS NULL
            ORDER BY p.id
            "#,
        )
        .bind(id_1)
        .bind(id_2)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(principal_id, name, role_1, role_2)| SharedPrincipal {
                principal_id,
                name,
                company_1_role: role_1,
                company_2_role: role_2,
            })
            .collect())
    }
}
