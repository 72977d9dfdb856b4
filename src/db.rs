use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    CrmStatus, EngagementSample, EventRecord, EventType, ProspectOverview, ProspectRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Owner id used by the seed data so the demo commands have a known tenant.
pub const SEED_OWNER_ID: &str = "7f3c1f6e-9d2b-4a6f-bb5a-1f9e6c2d8a41";

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let owner_id = Uuid::parse_str(SEED_OWNER_ID)?;

    let prospects = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Acme Logistics",
            "https://acme-logistics.example.com",
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Brightline Dental",
            "https://brightline-dental.example.com",
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Harbor & Vine Realty",
            "https://harborvine.example.com",
        ),
    ];

    for (id, company_name, target_url) in prospects {
        sqlx::query(
            r#"
            INSERT INTO outreach.prospects (id, owner_id, company_name, target_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET company_name = EXCLUDED.company_name, target_url = EXCLUDED.target_url
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(company_name)
        .bind(target_url)
        .execute(pool)
        .await?;
    }

    Ok(owner_id)
}

pub async fn get_prospect(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<ProspectRecord>> {
    let row = sqlx::query(
        "SELECT id, owner_id, company_name, crm_status, visit_count, last_viewed_at \
         FROM outreach.prospects WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let status: String = row.get("crm_status");
        ProspectRecord {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            company_name: row.get("company_name"),
            crm_status: CrmStatus::from_db(&status),
            visit_count: row.get("visit_count"),
            last_viewed_at: row.get("last_viewed_at"),
        }
    }))
}

pub async fn insert_report_event(
    pool: &PgPool,
    owner_id: Uuid,
    prospect_id: Uuid,
    event_type: EventType,
    scroll_depth: Option<i32>,
    dwell_seconds: Option<f64>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO outreach.report_events
        (id, owner_id, prospect_id, event_type, scroll_depth, dwell_seconds, interacted, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(prospect_id)
    .bind(event_type.as_str())
    .bind(scroll_depth)
    .bind(dwell_seconds)
    .bind(event_type.interacted())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Full telemetry history for one prospect, scoped to its owner. Threshold
/// evaluation always runs over everything ever recorded.
pub async fn fetch_engagement_history(
    pool: &PgPool,
    owner_id: Uuid,
    prospect_id: Uuid,
) -> anyhow::Result<Vec<EngagementSample>> {
    let rows = sqlx::query(
        "SELECT scroll_depth, dwell_seconds FROM outreach.report_events \
         WHERE owner_id = $1 AND prospect_id = $2",
    )
    .bind(owner_id)
    .bind(prospect_id)
    .fetch_all(pool)
    .await?;

    let mut samples = Vec::with_capacity(rows.len());
    for row in rows {
        samples.push(EngagementSample {
            scroll_depth: row.get("scroll_depth"),
            dwell_seconds: row.get("dwell_seconds"),
        });
    }

    Ok(samples)
}

/// Write back the derived fields. The owner predicate is what prevents a
/// cross-tenant mutation, so both keys are always bound here.
pub async fn update_prospect_engagement(
    pool: &PgPool,
    prospect_id: Uuid,
    owner_id: Uuid,
    crm_status: CrmStatus,
    last_viewed_at: DateTime<Utc>,
    visit_count: i32,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE outreach.prospects \
         SET crm_status = $3, last_viewed_at = $4, visit_count = $5 \
         WHERE id = $1 AND owner_id = $2",
    )
    .bind(prospect_id)
    .bind(owner_id)
    .bind(crm_status.as_str())
    .bind(last_viewed_at)
    .bind(visit_count)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_owner_overview(
    pool: &PgPool,
    owner_id: Uuid,
) -> anyhow::Result<Vec<ProspectOverview>> {
    let rows = sqlx::query(
        "SELECT p.company_name, p.crm_status, p.visit_count, p.last_viewed_at, \
         COUNT(e.id) AS event_count \
         FROM outreach.prospects p \
         LEFT JOIN outreach.report_events e ON e.prospect_id = p.id AND e.owner_id = p.owner_id \
         WHERE p.owner_id = $1 \
         GROUP BY p.id, p.company_name, p.crm_status, p.visit_count, p.last_viewed_at \
         ORDER BY p.visit_count DESC, p.company_name",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    let mut overviews = Vec::new();
    for row in rows {
        let status: String = row.get("crm_status");
        overviews.push(ProspectOverview {
            company_name: row.get("company_name"),
            crm_status: CrmStatus::from_db(&status),
            visit_count: row.get("visit_count"),
            last_viewed_at: row.get("last_viewed_at"),
            event_count: row.get("event_count"),
        });
    }

    Ok(overviews)
}

pub async fn fetch_recent_events(
    pool: &PgPool,
    owner_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<EventRecord>> {
    let rows = sqlx::query(
        "SELECT p.company_name, e.event_type, e.scroll_depth, e.dwell_seconds, e.recorded_at \
         FROM outreach.report_events e \
         JOIN outreach.prospects p ON p.id = e.prospect_id \
         WHERE e.owner_id = $1 \
         ORDER BY e.recorded_at DESC \
         LIMIT $2",
    )
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut events = Vec::new();
    for row in rows {
        events.push(EventRecord {
            company_name: row.get("company_name"),
            event_type: row.get("event_type"),
            scroll_depth: row.get("scroll_depth"),
            dwell_seconds: row.get("dwell_seconds"),
            recorded_at: row.get("recorded_at"),
        });
    }

    Ok(events)
}
