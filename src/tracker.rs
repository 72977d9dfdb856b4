use anyhow::Context;
use chrono::Utc;
use log::{info, warn};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{CrmStatus, EventType, ProspectRecord};
use crate::scoring;

/// Raw measurements attached to a telemetry ping. Scroll depth arrives as a
/// 0..1 fraction of the page, dwell as elapsed seconds on page.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventMetadata {
    pub scroll_depth: Option<f64>,
    pub dwell_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AnonymousCaller,
    UnknownProspect,
    NotOwner,
    InvalidScrollDepth,
    InvalidDwellSeconds,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AnonymousCaller => "no caller identity",
            SkipReason::UnknownProspect => "prospect not found",
            SkipReason::NotOwner => "prospect owned by another user",
            SkipReason::InvalidScrollDepth => "scroll depth outside 0..1",
            SkipReason::InvalidDwellSeconds => "dwell seconds negative or non-finite",
        }
    }
}

/// What a single telemetry ping did. Skips are part of the normal contract
/// for a public report page: the viewer never sees them, operators see logs.
#[derive(Debug, Clone, Copy)]
pub enum RecordOutcome {
    Recorded {
        event_id: Uuid,
        crm_status: CrmStatus,
        visit_count: i32,
    },
    Skipped(SkipReason),
}

/// Gate a write against the resolved caller. Anonymous viewers and callers
/// who do not own the prospect are turned away without an error; nothing
/// about the prospect's existence leaks back to the report page.
fn authorize(
    caller: Option<Uuid>,
    prospect: Option<ProspectRecord>,
) -> Result<(Uuid, ProspectRecord), SkipReason> {
    let user_id = caller.ok_or(SkipReason::AnonymousCaller)?;
    let prospect = prospect.ok_or(SkipReason::UnknownProspect)?;
    if prospect.owner_id != user_id {
        return Err(SkipReason::NotOwner);
    }
    Ok((user_id, prospect))
}

fn validate_metadata(metadata: EventMetadata) -> Result<(Option<i32>, Option<f64>), SkipReason> {
    let scroll_depth = match metadata.scroll_depth {
        Some(fraction) => Some(
            scoring::normalize_scroll_depth(fraction).ok_or(SkipReason::InvalidScrollDepth)?,
        ),
        None => None,
    };
    let dwell_seconds = match metadata.dwell_seconds {
        Some(dwell) => {
            Some(scoring::normalize_dwell_seconds(dwell).ok_or(SkipReason::InvalidDwellSeconds)?)
        }
        None => None,
    };
    Ok((scroll_depth, dwell_seconds))
}

/// Record one engagement event for a prospect and recompute its derived CRM
/// fields from the full event history.
///
/// Authorization and validation failures are absorbed as logged skips. A
/// storage failure on the event insert aborts before any recompute so the
/// derived fields never run ahead of the persisted history; a failure after
/// the insert leaves them stale until the next event self-heals them.
pub async fn record_engagement_event(
    pool: &PgPool,
    prospect_id: Uuid,
    caller: Option<Uuid>,
    event_type: EventType,
    metadata: EventMetadata,
) -> anyhow::Result<RecordOutcome> {
    let prospect = db::get_prospect(pool, prospect_id)
        .await
        .context("failed to look up prospect")?;

    let (user_id, prospect) = match authorize(caller, prospect) {
        Ok(authorized) => authorized,
        Err(reason) => {
            warn!("skipping engagement event for prospect {prospect_id}: {}", reason.as_str());
            return Ok(RecordOutcome::Skipped(reason));
        }
    };

    let (scroll_depth, dwell_seconds) = match validate_metadata(metadata) {
        Ok(values) => values,
        Err(reason) => {
            warn!(
                "dropping malformed engagement event for prospect {prospect_id}: {}",
                reason.as_str()
            );
            return Ok(RecordOutcome::Skipped(reason));
        }
    };

    let event_id = db::insert_report_event(
        pool,
        user_id,
        prospect_id,
        event_type,
        scroll_depth,
        dwell_seconds,
    )
    .await
    .context("failed to insert report event; leaving prospect fields untouched")?;

    let history = db::fetch_engagement_history(pool, user_id, prospect_id)
        .await
        .context("failed to load engagement history")?;
    let crm_status = scoring::evaluate_status(&history);

    let now = Utc::now();
    let visit_count = scoring::next_visit_count(prospect.visit_count, prospect.last_viewed_at, now);

    let updated =
        db::update_prospect_engagement(pool, prospect_id, user_id, crm_status, now, visit_count)
            .await
            .context("failed to write back derived prospect fields")?;
    if updated == 0 {
        // Owner-scoped update matched nothing, e.g. the prospect was deleted
        // between the lookup and the write-back.
        warn!("derived-field update for prospect {prospect_id} matched no row");
    }

    info!(
        "recorded {} for prospect {prospect_id}: status {crm_status}, visit {visit_count}",
        event_type.as_str()
    );

    Ok(RecordOutcome::Recorded {
        event_id,
        crm_status,
        visit_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prospect(owner_id: Uuid) -> ProspectRecord {
        ProspectRecord {
            id: Uuid::new_v4(),
            owner_id,
            company_name: "Acme Logistics".to_string(),
            crm_status: CrmStatus::Cold,
            visit_count: 0,
            last_viewed_at: None,
        }
    }

    #[test]
    fn anonymous_caller_is_turned_away() {
        let record = prospect(Uuid::new_v4());
        assert_eq!(
            authorize(None, Some(record)).unwrap_err(),
            SkipReason::AnonymousCaller
        );
    }

    #[test]
    fn missing_prospect_is_turned_away() {
        assert_eq!(
            authorize(Some(Uuid::new_v4()), None).unwrap_err(),
            SkipReason::UnknownProspect
        );
    }

    #[test]
    fn foreign_owner_cannot_write() {
        let record = prospect(Uuid::new_v4());
        assert_eq!(
            authorize(Some(Uuid::new_v4()), Some(record)).unwrap_err(),
            SkipReason::NotOwner
        );
    }

    #[test]
    fn owner_passes_the_gate() {
        let owner = Uuid::new_v4();
        let record = prospect(owner);
        let (user_id, authorized) = authorize(Some(owner), Some(record)).unwrap();
        assert_eq!(user_id, owner);
        assert_eq!(authorized.owner_id, owner);
    }

    #[test]
    fn metadata_fraction_becomes_percentage() {
        let metadata = EventMetadata {
            scroll_depth: Some(0.85),
            dwell_seconds: Some(35.0),
        };
        assert_eq!(validate_metadata(metadata), Ok((Some(85), Some(35.0))));
    }

    #[test]
    fn absent_metadata_passes_as_nulls() {
        assert_eq!(validate_metadata(EventMetadata::default()), Ok((None, None)));
    }

    #[test]
    fn bad_scroll_fraction_is_rejected() {
        let metadata = EventMetadata {
            scroll_depth: Some(1.5),
            dwell_seconds: None,
        };
        assert_eq!(
            validate_metadata(metadata),
            Err(SkipReason::InvalidScrollDepth)
        );
    }

    #[test]
    fn bad_dwell_is_rejected() {
        let metadata = EventMetadata {
            scroll_depth: None,
            dwell_seconds: Some(-3.0),
        };
        assert_eq!(
            validate_metadata(metadata),
            Err(SkipReason::InvalidDwellSeconds)
        );
    }
}
