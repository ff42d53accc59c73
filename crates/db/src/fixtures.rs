use chrono::{Duration, Utc};

use partflow_core::domain::request::{RequestId, RequestPayload};
use partflow_core::workflow::engine::{WorkflowAction, WorkflowEngine};

use crate::repositories::{RepositoryError, RequestRepository, SqlRequestRepository};
use crate::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub skipped: bool,
}

const DEMO_CREATOR: &str = "creator@demo.local";
const DEMO_APPROVER: &str = "approver@demo.local";
const DEMO_VALIDATOR: &str = "validator@demo.local";

fn demo_payload(part_code: &str, description: &str) -> RequestPayload {
    RequestPayload {
        plant: Some("1000".to_string()),
        part_code: Some(part_code.to_string()),
        description: Some(description.to_string()),
        hsn_code: Some("84713010".to_string()),
        procurement_type: Some("F".to_string()),
        sales_views: Some("yes".to_string()),
        ..RequestPayload::default()
    }
}

/// Seed one request per workflow state for local development. A non-empty
/// table short-circuits so reseeding never duplicates rows.
pub async fn seed_demo_requests(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modification_request")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        return Ok(SeedSummary { inserted: 0, skipped: true });
    }

    let repo = SqlRequestRepository::new(pool.clone());
    let engine = WorkflowEngine;
    let base = Utc::now() - Duration::days(1);
    let mut inserted = 0usize;

    let mut pending = engine.create(
        demo_payload("P-1001", "revise casting thickness"),
        None,
        DEMO_CREATOR,
        base,
    );
    pending.id = RequestId("PCR-demo-pending".to_string());
    repo.insert(pending).await?;
    inserted += 1;

    let mut approved_seed = engine.create(
        demo_payload("P-1002", "update tax indication"),
        None,
        DEMO_CREATOR,
        base + Duration::hours(1),
    );
    approved_seed.id = RequestId("PCR-demo-approved".to_string());
    let approved = engine
        .approver_act(
            &approved_seed,
            WorkflowAction::Approve,
            None,
            DEMO_APPROVER,
            base + Duration::hours(2),
        )
        .expect("pending seed is approvable");
    repo.insert(approved.clone()).await?;
    inserted += 1;

    let mut rejected_seed = engine.create(
        demo_payload("P-1003", "duplicate of P-1002"),
        None,
        DEMO_CREATOR,
        base + Duration::hours(3),
    );
    rejected_seed.id = RequestId("PCR-demo-rejected".to_string());
    let rejected = engine
        .approver_act(
            &rejected_seed,
            WorkflowAction::Reject,
            Some("duplicate request"),
            DEMO_APPROVER,
            base + Duration::hours(4),
        )
        .expect("pending seed is rejectable");
    repo.insert(rejected).await?;
    inserted += 1;

    let mut returned_seed = engine.create(
        demo_payload("P-1004", "missing supplying plant"),
        None,
        DEMO_CREATOR,
        base + Duration::hours(5),
    );
    returned_seed.id = RequestId("PCR-demo-returned".to_string());
    let returned = engine
        .approver_act(
            &returned_seed,
            WorkflowAction::Return,
            Some("add the supplying plant"),
            DEMO_APPROVER,
            base + Duration::hours(6),
        )
        .expect("pending seed is returnable");
    repo.insert(returned).await?;
    inserted += 1;

    let mut validated_seed = engine.create(
        demo_payload("P-1005", "storage location activation"),
        None,
        DEMO_CREATOR,
        base + Duration::hours(7),
    );
    validated_seed.id = RequestId("PCR-demo-validated".to_string());
    let validated_approved = engine
        .approver_act(
            &validated_seed,
            WorkflowAction::Approve,
            None,
            DEMO_APPROVER,
            base + Duration::hours(8),
        )
        .expect("pending seed is approvable");
    let validated = engine
        .validator_act(
            &validated_approved,
            WorkflowAction::Approve,
            Some("matches SAP master data"),
            DEMO_VALIDATOR,
            base + Duration::hours(9),
        )
        .expect("approved seed is validatable");
    repo.insert(validated).await?;
    inserted += 1;

    Ok(SeedSummary { inserted, skipped: false })
}

#[cfg(test)]
mod tests {
    use partflow_core::workflow::views::RoleView;

    use super::seed_demo_requests;
    use crate::repositories::{RequestRepository, SqlRequestRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_covers_every_workflow_state_once() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let summary = seed_demo_requests(&pool).await.expect("seed");
        assert_eq!(summary.inserted, 5);
        assert!(!summary.skipped);

        let repo = SqlRequestRepository::new(pool.clone());
        assert_eq!(repo.list(RoleView::ApproverQueue, None).await.expect("queue").len(), 1);
        assert_eq!(repo.list(RoleView::ValidatorQueue, None).await.expect("queue").len(), 1);
        assert_eq!(repo.list(RoleView::ValidatorHistory, None).await.expect("history").len(), 2);
        assert_eq!(repo.list(RoleView::CreatorHistory, None).await.expect("history").len(), 5);

        let again = seed_demo_requests(&pool).await.expect("reseed");
        assert!(again.skipped);
        assert_eq!(again.inserted, 0);
    }
}
