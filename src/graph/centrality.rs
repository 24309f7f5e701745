//! Weighted connectivity ranking across the ownership network
//!
//! Ranks companies, principals, or entities by the number of distinct active
//! properties reachable through their holding entities, then assigns
//! percentile tiers. The state filter restricts the underlying property set
//! before aggregation, so it changes who qualifies, not just what is shown.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::NodeType;

/// Fixed per-hop connectivity weights.
pub const WEIGHT_PROPERTY: i64 = 10;
pub const WEIGHT_ENTITY: i64 = 2;
pub const WEIGHT_PRINCIPAL: i64 = 3;
pub const WEIGHT_DEAL: i64 = 5;
pub const WEIGHT_COMPANY: i64 = 4;

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;

/// Centrality metric requested by the caller. Ranking is always driven by the
/// distinct-active-property aggregate; the metric is echoed in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityMetric {
    #[default]
    Degree,
    PropertyCount,
    TransactionCount,
}

/// Percentile tier assigned after sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Dominant,
    Major,
    Established,
    Emerging,
    Local,
}

impl Tier {
    pub fn description(&self) -> &'static str {
        match self {
            Tier::Dominant => "Top 5% - Market leader",
            Tier::Major => "Top 15% - Major player",
            Tier::Established => "Top 35% - Established presence",
            Tier::Emerging => "Top 60% - Growing footprint",
            Tier::Local => "Regional operator",
        }
    }
}

/// Map a 1-based rank within `total` results to its percentile tier. The top
/// rank is always DOMINANT, regardless of how small the result set is.
pub(crate) fn tier_for(rank: usize, total: usize) -> Tier {
    if rank == 1 {
        return Tier::Dominant;
    }
    let pct = (rank as f64 / total.max(1) as f64) * 100.0;
    if pct <= 5.0 {
        Tier::Dominant
    } else if pct <= 15.0 {
        Tier::Major
    } else if pct <= 35.0 {
        Tier::Established
    } else if pct <= 60.0 {
        Tier::Emerging
    } else {
        Tier::Local
    }
}

/// Share of the leader's property count, rounded to whole percent. The leader
/// count is floored at 1 so a zero-property leader cannot divide by zero.
pub(crate) fn pct_of_leader(property_count: i64, leader_count: i64) -> i64 {
    ((property_count as f64 / leader_count.max(1) as f64) * 100.0).round() as i64
}

/// Parameters for a centrality ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityParams {
    /// One of company, principal, entity. Properties are what get counted,
    /// not what gets ranked.
    pub node_type: NodeType,
    #[serde(default)]
    pub metric: CentralityMetric,
    /// Two-letter state code restricting the underlying property set.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl CentralityParams {
    pub fn validate(&self) -> GraphResult<()> {
        if self.node_type == NodeType::Property {
            return Err(GraphError::validation(
                "node_type must be one of company, principal, entity",
            ));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(GraphError::validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, self.limit
            )));
        }
        if let Some(state) = &self.state {
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(GraphError::validation(format!(
                    "state must be a two-letter code, got '{}'",
                    state
                )));
            }
        }
        Ok(())
    }

    fn state_upper(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.to_ascii_uppercase())
    }
}

/// One ranked node. Fields that only apply to some node types are omitted
/// from serialization when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub rank: usize,
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub tier: Tier,
    pub tier_description: String,
    pub influence_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_count: Option<i64>,
    pub property_count: i64,
    pub pct_of_leader: i64,
}

/// Ranking report for one node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentralityReport {
    pub node_type: NodeType,
    pub metric: CentralityMetric,
    pub state_filter: Option<String>,
    pub count: usize,
    pub rankings: Vec<Ranking>,
}

/// Aggregate-backed centrality ranking service.
pub struct CentralityRanker {
    pool: PgPool,
}

type CompanyRow = (i64, String, Option<String>, Option<String>, i64);
type PrincipalRow = (i64, String, Option<String>, i64, i64);
type EntityRow = (i64, String, Option<String>, Option<String>, Option<String>, i64);

impl CentralityRanker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn rank(&self, params: &CentralityParams) -> GraphResult<CentralityReport> {
        params.validate()?;
        let state = params.state_upper();

        let rankings = match params.node_type {
            NodeType::Company => self.rank_companies(state.as_deref(), params.limit).await?,
            NodeType::Principal => self.rank_principals(params.limit).await?,
            NodeType::Entity => self.rank_entities(state.as_deref(), params.limit).await?,
            NodeType::Property => unreachable!("rejected by validate"),
        };

        debug!(
            node_type = %params.node_type,
            count = rankings.len(),
            state = state.as_deref().unwrap_or("ALL"),
            "computed centrality ranking"
        );

        Ok(CentralityReport {
            node_type: params.node_type,
            metric: params.metric,
            state_filter: state,
            count: rankings.len(),
            rankings,
        })
    }

    async fn rank_companies(&self, state: Option<&str>, limit: i64) -> GraphResult<Vec<Ranking>> {
        let rows: Vec<CompanyRow> = if let Some(state) = state {
            sqlx::query_as(
                r#"
                SELECT c.id, c.company_name, c.company_type, c.state,
                       COUNT(DISTINCT per.property_master_id) AS property_count
                FROM companies c
                JOIN entities e ON e.company_id = c.id
                JOIN property_entity_relationships per
                  ON per.entity_id = e.id AND per.end_date IS NULL
                JOIN property_master pm
                  ON pm.id = per.property_master_id AND pm.state = $2
                WHERE c.company_name NOT LIKE '[MERGED]%'
                GROUP BY c.id
                ORDER BY property_count DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .bind(state)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT c.id, c.company_name, c.company_type, c.state,
                       COUNT(DISTINCT per.property_master_id) AS property_count
                FROM companies c
                JOIN entities e ON e.company_id = c.id
                JOIN property_entity_relationships per
                  ON per.entity_id = e.id AND per.end_date IS NULL
                WHERE c.company_name NOT LIKE '[MERGED]%'
                GROUP BY c.id
                ORDER BY property_count DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        let leader = rows.first().map(|r| r.4).unwrap_or(0);
        let total = rows.len();

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(idx, (id, name, kind, hq_state, property_count))| {
                let tier = tier_for(idx + 1, total);
                Ranking {
                    rank: idx + 1,
                    id,
                    name,
                    kind: Some(kind.unwrap_or_else(|| "unknown".to_string())),
                    headquarters: hq_state,
                    title: None,
                    parent_company: None,
                    state: None,
                    tier,
                    tier_description: tier.description().to_string(),
                    influence_score: property_count * WEIGHT_PROPERTY,
                    company_count: None,
                    property_count,
                    pct_of_leader: pct_of_leader(property_count, leader),
                }
            })
            .collect())
    }

    async fn rank_principals(&self, limit: i64) -> GraphResult<Vec<Ranking>> {
        let rows: Vec<PrincipalRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.full_name,
                   (SELECT pcr2.title FROM principal_company_relationships pcr2
                    WHERE pcr2.principal_id = p.id AND pcr2.end_date IS NULL
                    LIMIT 1) AS title,
                   COUNT(DISTINCT pcr.company_id) AS company_count,
                   COUNT(DISTINCT per.property_master_id) AS property_count
            FROM principals p
            JOIN principal_company_relationships pcr
              ON pcr.principal_id = p.id AND pcr.end_date IS NULL
            LEFT JOIN entities e ON e.company_id = pcr.company_id
            LEFT JOIN property_entity_relationships per
              ON per.entity_id = e.id AND per.end_date IS NULL
            WHERE p.full_name NOT LIKE '[MERGED]%'
            GROUP BY p.id
            ORDER BY property_count DESC, company_count DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let leader = rows.first().map(|r| r.4).unwrap_or(0);
        let total = rows.len();

        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(idx, (id, name, title, company_count, property_count))| {
                let tier = tier_for(idx + 1, total);
                Ranking {
                    rank: idx + 1,
                    id,
                    name,
                    kind: None,
                    headquarters: None,
                    title,
                    parent_company: None,
                    state: None,
                    tier,
                    tier_description: tier.description().to_string(),
                    influence_score: property_count * WEIGHT_PROPERTY
                        + company_count * WEIGHT_COMPANY,
                    company_count: Some(company_count),
                    property_count,
                    pct_of_leader: pct_of_leader(property_count, leader),
                }
            })
            .collect())
    }

    async fn rank_entities(&self, state: Option<&str>, limit: i64) -> GraphResult<Vec<Ranking>> {
        let rows: Vec<EntityRow> = if let Some(state) = state {
            sqlx::query_as(
                r#"
                SELECT e.id, e.entity_name, e.entity_type, e.state, c.company_name,
                       COUNT(DISTINCT per.property_master_id) AS property_count
                FROM entities e
                LEFT JOIN companies c ON c.id = e.company_id
                JOIN property_entity_relationships per
                  ON per.entity_id = e.id AND per.end_date IS NULL
                JOIN property_master pm
                  ON pm.id = per.property_master_id AND pm.state = $2
                GROUP BY e.id, c.company_name
                ORDER BY property_count DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .bind(state)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT e.id, e.entity_name, e.entity_type, e.state, c.company_name,
                       COUNT(DISTINCT per.property_master_id) AS property_count
                FROM entities e
                LEFT JOIN companies c ON c.id = e.company_id
                JOIN property_entity_relationships per
                  ON per.entity_id = e.id AND per.end_date IS NULL
                GROUP BY e.id, c.company_name
                ORDER BY property_count DESC
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        let leader = rows.first().map(|r| r.5).unwrap_or(0);
        let total = rows.len();

        Ok(rows
            .into_iter()
            .enumerate()
            .map(
                |(idx, (id, name, kind, entity_state, parent_company, property_count))| {
                    let tier = tier_for(idx + 1, total);
                    Ranking {
                        rank: idx + 1,
                        id,
                        name,
                        kind,
                        headquarters: None,
                        title: None,
                        parent_company,
                        state: entity_state,
                        tier,
                        tier_description: tier.description().to_string(),
                        influence_score: property_count * WEIGHT_PROPERTY,
                        company_count: None,
                        property_count,
                        pct_of_leader: pct_of_leader(property_count, leader),
                    }
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds_are_inclusive() {
        // 100 results: rank 5 is exactly the 5% boundary
        assert_eq!(tier_for(5, 100), Tier::Dominant);
        assert_eq!(tier_for(6, 100), Tier::Major);
        assert_eq!(tier_for(15, 100), Tier::Major);
        assert_eq!(tier_for(16, 100), Tier::Established);
        assert_eq!(tier_for(35, 100), Tier::Established);
        assert_eq!(tier_for(36, 100), Tier::Emerging);
        assert_eq!(tier_for(60, 100), Tier::Emerging);
        assert_eq!(tier_for(61, 100), Tier::Local);
        assert_eq!(tier_for(100, 100), Tier::Local);
    }

    #[test]
    fn sole_leader_is_dominant() {
        // A limit-1 ranking still crowns its leader.
        assert_eq!(tier_for(1, 1), Tier::Dominant);
        assert_eq!(tier_for(1, 2), Tier::Dominant);
        assert_eq!(tier_for(2, 2), Tier::Local);
    }

    #[test]
    fn pct_of_leader_rounds_and_guards_zero() {
        assert_eq!(pct_of_leader(50, 200), 25);
        assert_eq!(pct_of_leader(1, 3), 33);
        assert_eq!(pct_of_leader(2, 3), 67);
        // leader with zero properties must not divide by zero
        assert_eq!(pct_of_leader(0, 0), 0);
        // leader is always 100% of itself
        assert_eq!(pct_of_leader(7, 7), 100);
    }

    #[test]
    fn params_reject_property_ranking() {
        let p = CentralityParams {
            node_type: NodeType::Property,
            metric: CentralityMetric::Degree,
            state: None,
            limit: 25,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn params_reject_bad_limit_and_state() {
        let mut p = CentralityParams {
            node_type: NodeType::Company,
            metric: CentralityMetric::Degree,
            state: None,
            limit: 0,
        };
        assert!(p.validate().is_err());
        p.limit = 101;
        assert!(p.validate().is_err());
        p.limit = 100;
        assert!(p.validate().is_ok());

        p.state = Some("Ohio".to_string());
        assert!(p.validate().is_err());
        p.state = Some("oh".to_string());
        assert!(p.validate().is_ok());
        assert_eq!(p.state_upper().as_deref(), Some("OH"));
    }

    #[test]
    fn tier_serializes_screaming() {
        assert_eq!(serde_json::to_string(&Tier::Dominant).unwrap(), "\"DOMINANT\"");
        assert_eq!(serde_json::to_string(&Tier::Local).unwrap(), "\"LOCAL\"");
    }
}
