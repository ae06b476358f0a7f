mod common;

use anyhow::Result;
use common::{acquire_db_lock, TestApp};
use serde_json::json;
use tenderdesk::jobs::{
    enqueue_job, mark_job_failed, mark_job_succeeded, reserve_job, sync_job_pending,
    JOB_SYNC_TENDERS, STATUS_FAILED, STATUS_PROCESSING, STATUS_SUCCEEDED,
};
use uuid::Uuid;

#[tokio::test]
async fn queue_lifecycle_and_service_dedupe() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let service_id = Uuid::new_v4();
    let other_service = Uuid::new_v4();

    app.with_conn(move |conn| {
        assert!(!sync_job_pending(conn, service_id)?);

        let job = enqueue_job(
            conn,
            JOB_SYNC_TENDERS,
            json!({ "service_id": service_id.to_string() }),
            None,
        )?;

        // Queued job blocks another run for the same service, not others.
        assert!(sync_job_pending(conn, service_id)?);
        assert!(!sync_job_pending(conn, other_service)?);

        let reserved = reserve_job(conn, &[JOB_SYNC_TENDERS])?.expect("job should be reservable");
        assert_eq!(reserved.id, job.id);
        assert_eq!(reserved.status, STATUS_PROCESSING);
        assert_eq!(reserved.attempts, 1);

        // Still pending while processing.
        assert!(sync_job_pending(conn, service_id)?);
        assert!(reserve_job(conn, &[JOB_SYNC_TENDERS])?.is_none());

        mark_job_succeeded(conn, job.id)?;
        assert!(!sync_job_pending(conn, service_id)?);

        let failed = enqueue_job(
            conn,
            JOB_SYNC_TENDERS,
            json!({ "service_id": service_id.to_string() }),
            None,
        )?;
        let reserved = reserve_job(conn, &[JOB_SYNC_TENDERS])?.expect("second job reservable");
        assert_eq!(reserved.id, failed.id);
        mark_job_failed(conn, failed.id, "boom")?;

        // A failed job is terminal and no longer blocks scheduling.
        assert!(!sync_job_pending(conn, service_id)?);

        use diesel::prelude::*;
        use tenderdesk::schema::jobs::dsl::*;
        let rows: Vec<tenderdesk::models::Job> = jobs.load(conn)?;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|row| row.status == STATUS_SUCCEEDED));
        let failed_row = rows
            .iter()
            .find(|row| row.status == STATUS_FAILED)
            .expect("failed job row");
        assert_eq!(failed_row.last_error.as_deref(), Some("boom"));

        Ok(())
    })
    .await?;

    app.cleanup().await?;
    Ok(())
}
