use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use tracing::info;
use uuid::Uuid;

use crate::{
    jobs::JOB_SYNC_TENDERS,
    models::{Job, SyncService},
    schema::sync_services,
    state::AppState,
    sync::run_sync,
    workers::{JobExecution, JobHandler},
};

pub struct SyncTendersJob;

impl SyncTendersJob {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SyncTendersJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobHandler for SyncTendersJob {
    fn job_type(&self) -> &'static str {
        JOB_SYNC_TENDERS
    }

    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution {
        let service_id = match job
            .payload
            .get("service_id")
            .and_then(|value| value.as_str())
            .and_then(|value| Uuid::parse_str(value).ok())
        {
            Some(id) => id,
            None => {
                return JobExecution::Failed {
                    error: "payload is missing a valid service_id".to_string(),
                }
            }
        };

        let service: SyncService = {
            let mut conn = match state.db() {
                Ok(conn) => conn,
                Err(err) => {
                    return JobExecution::Failed {
                        error: format!("database pool error: {err}"),
                    }
                }
            };
            match sync_services::table.find(service_id).first(&mut conn) {
                Ok(service) => service,
                Err(diesel::result::Error::NotFound) => {
                    return JobExecution::Failed {
                        error: format!("sync service {service_id} not found"),
                    }
                }
                Err(err) => {
                    return JobExecution::Failed {
                        error: format!("database error: {err}"),
                    }
                }
            }
        };

        // Deactivated between scheduling and pickup; nothing to do.
        if !service.is_active {
            info!(service = %service.name, "skipping sync for inactive service");
            return JobExecution::Success;
        }

        match run_sync(&state, &service).await {
            Ok(report) => {
                info!(
                    service = %service.name,
                    synced = report.synced,
                    total = report.total,
                    articles = report.articles,
                    status = report.status,
                    "sync run finished"
                );
                JobExecution::Success
            }
            Err(err) => JobExecution::Failed {
                error: err.to_string(),
            },
        }
    }
}
