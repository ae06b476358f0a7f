//! Tender synchronization against the external bid-aggregation API.
//!
//! A run fetches the full tender list, upserts each tender by its external
//! id and replaces its line items wholesale, all inside one transaction per
//! tender. Per-tender failures are collected as tagged outcomes and never
//! abort the run; a failure of the initial list fetch aborts it and is
//! recorded on the service row.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    models::{NewTender, NewTenderLine, SyncService, Tender},
    pricing,
    schema::{sync_services, tender_lines, tenders},
    state::AppState,
};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

pub const SYNC_STATUS_SUCCESS: &str = "success";
pub const SYNC_STATUS_PARTIAL: &str = "partial";
pub const SYNC_STATUS_ERROR: &str = "error";

pub const TENDER_SOURCE_API: &str = "api";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch data from API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("database pool error: {0}")]
    Pool(String),
}

/// Tender summary as returned by `GET /tenders`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTender {
    pub tender_id: String,
    #[serde(default)]
    pub procuring_entity: Option<String>,
    #[serde(default)]
    pub tender_value: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub procurement_method: Option<String>,
    #[serde(default)]
    pub tender_url: Option<String>,
    #[serde(default)]
    pub budget_appropriation_certificate: Option<String>,
    #[serde(default)]
    pub budget_appropriation_value: Option<f64>,
    #[serde(default)]
    pub budget_source: Option<String>,
    #[serde(default)]
    pub date_published: Option<NaiveDate>,
    #[serde(default)]
    pub date_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub date_evaluation: Option<NaiveDate>,
    #[serde(default)]
    pub date_awarded: Option<NaiveDate>,
}

/// Line item as returned by `GET /tenders/{id}/articles`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArticle {
    pub article_number: String,
    pub article_description: String,
    #[serde(default)]
    pub lot_info: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub unspsc_code: Option<String>,
    #[serde(default)]
    pub unspsc_description: Option<String>,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    #[serde(default)]
    pub price_25_quartile: Option<f64>,
    #[serde(default)]
    pub price_75_quartile: Option<f64>,
    #[serde(default)]
    pub competitiveness_rank: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TenderOutcome {
    Synced { tender_id: String, articles: usize },
    Failed { tender_id: String, reason: String },
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub total: usize,
    pub articles: usize,
    pub status: &'static str,
    pub outcomes: Vec<TenderOutcome>,
}

/// Bearer-authenticated client for the external bid API. All calls are
/// single-shot with a fixed timeout; there is no retry.
pub struct BidApiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl BidApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, SyncError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn for_service(service: &SyncService) -> Result<Self, SyncError> {
        Self::new(&service.api_url, &service.api_key)
    }

    pub async fn fetch_tenders(&self) -> Result<Vec<ApiTender>, SyncError> {
        let response = self
            .http
            .get(format!("{}/tenders", self.base_url))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    pub async fn fetch_articles(&self, tender_id: &str) -> Result<Vec<ApiArticle>, SyncError> {
        let response = self
            .http
            .get(format!("{}/tenders/{}/articles", self.base_url, tender_id))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    /// Connectivity probe; any 2xx counts as reachable.
    pub async fn health(&self) -> Result<(), SyncError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status()));
        }

        Ok(())
    }
}

/// Run one synchronization pass for the given service.
///
/// A top-level fetch failure records an `error` run on the service and is
/// returned to the caller; no tender rows are touched in that case.
pub async fn run_sync(state: &AppState, service: &SyncService) -> Result<SyncReport, SyncError> {
    let client = BidApiClient::for_service(service)?;

    let summaries = match client.fetch_tenders().await {
        Ok(summaries) => summaries,
        Err(err) => {
            error!(service = %service.name, error = %err, "tender list fetch failed");
            record_run_error(state, service.id, &err)?;
            return Err(err);
        }
    };

    let total = summaries.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut synced = 0usize;
    let mut articles_synced = 0usize;

    for summary in &summaries {
        // An article fetch failure degrades to an empty line list; the
        // tender itself is still upserted.
        let articles = match client.fetch_articles(&summary.tender_id).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!(
                    tender_id = %summary.tender_id,
                    error = %err,
                    "article fetch failed; replacing lines with empty set"
                );
                Vec::new()
            }
        };

        let mut conn = state.db().map_err(|err| SyncError::Pool(err.to_string()))?;
        match upsert_tender(&mut conn, summary, &articles) {
            Ok(inserted) => {
                synced += 1;
                articles_synced += inserted;
                outcomes.push(TenderOutcome::Synced {
                    tender_id: summary.tender_id.clone(),
                    articles: inserted,
                });
            }
            Err(err) => {
                error!(tender_id = %summary.tender_id, error = %err, "tender upsert failed");
                outcomes.push(TenderOutcome::Failed {
                    tender_id: summary.tender_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let status = if synced == total {
        SYNC_STATUS_SUCCESS
    } else {
        SYNC_STATUS_PARTIAL
    };
    let message = format!("Synced {synced} of {total} tenders");

    let mut conn = state.db().map_err(|err| SyncError::Pool(err.to_string()))?;
    record_run(&mut conn, service.id, synced, articles_synced, status, &message)?;

    Ok(SyncReport {
        synced,
        total,
        articles: articles_synced,
        status,
        outcomes,
    })
}

#[derive(Debug, Error)]
enum UpsertError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Upsert one tender by external id and replace its lines wholesale, as a
/// single transaction. Returns the number of lines inserted.
fn upsert_tender(
    conn: &mut PgConnection,
    summary: &ApiTender,
    articles: &[ApiArticle],
) -> Result<usize, UpsertError> {
    conn.transaction(|conn| {
        let existing: Option<Tender> = tenders::table
            .filter(tenders::tender_id.eq(&summary.tender_id))
            .first(conn)
            .optional()?;

        let tender_pk = match existing {
            Some(tender) => {
                diesel::update(tenders::table.find(tender.id))
                    .set((
                        tenders::procuring_entity.eq(summary.procuring_entity.clone()),
                        tenders::tender_value.eq(summary.tender_value),
                        tenders::description.eq(summary.description.clone()),
                        tenders::procurement_method.eq(summary.procurement_method.clone()),
                        tenders::tender_url.eq(summary.tender_url.clone()),
                        tenders::budget_certificate
                            .eq(summary.budget_appropriation_certificate.clone()),
                        tenders::budget_value.eq(summary.budget_appropriation_value),
                        tenders::budget_source.eq(summary.budget_source.clone()),
                        tenders::date_published.eq(summary.date_published),
                        tenders::date_deadline.eq(summary.date_deadline),
                        tenders::date_evaluation.eq(summary.date_evaluation),
                        tenders::date_awarded.eq(summary.date_awarded),
                        tenders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)?;
                tender.id
            }
            None => {
                let new_tender = NewTender {
                    id: Uuid::new_v4(),
                    tender_id: summary.tender_id.clone(),
                    procuring_entity: summary.procuring_entity.clone(),
                    tender_value: summary.tender_value,
                    description: summary.description.clone(),
                    procurement_method: summary.procurement_method.clone(),
                    tender_url: summary.tender_url.clone(),
                    budget_certificate: summary.budget_appropriation_certificate.clone(),
                    budget_value: summary.budget_appropriation_value,
                    budget_source: summary.budget_source.clone(),
                    state: "draft".to_string(),
                    source: TENDER_SOURCE_API.to_string(),
                    type_id: None,
                    stage_id: None,
                    assigned_to: None,
                    date_published: summary.date_published,
                    date_deadline: summary.date_deadline,
                    date_evaluation: summary.date_evaluation,
                    date_awarded: summary.date_awarded,
                };
                diesel::insert_into(tenders::table)
                    .values(&new_tender)
                    .execute(conn)?;
                new_tender.id
            }
        };

        diesel::delete(tender_lines::table.filter(tender_lines::tender_ref.eq(tender_pk)))
            .execute(conn)?;

        let new_lines = articles
            .iter()
            .map(|article| build_line(tender_pk, article))
            .collect::<Result<Vec<_>, UpsertError>>()?;

        if !new_lines.is_empty() {
            diesel::insert_into(tender_lines::table)
                .values(&new_lines)
                .execute(conn)?;
        }

        Ok(new_lines.len())
    })
}

fn build_line(tender_pk: Uuid, article: &ApiArticle) -> Result<NewTenderLine, UpsertError> {
    let quantity = article.quantity.unwrap_or(0.0);
    let unit_price = article.unit_price.unwrap_or(0.0);

    if quantity < 0.0 {
        return Err(UpsertError::Invalid(format!(
            "article {}: quantity must not be negative",
            article.article_number
        )));
    }
    if unit_price < 0.0 {
        return Err(UpsertError::Invalid(format!(
            "article {}: unit price must not be negative",
            article.article_number
        )));
    }

    Ok(NewTenderLine {
        id: Uuid::new_v4(),
        tender_ref: tender_pk,
        article_number: article.article_number.clone(),
        description: article.article_description.clone(),
        lot_info: article.lot_info.clone(),
        unit: article.unit.clone(),
        quantity,
        unit_price,
        total_price: pricing::total_price(quantity, unit_price),
        unspsc_code: article.unspsc_code.clone(),
        unspsc_description: article.unspsc_description.clone(),
        estimated_price: article.estimated_price,
        price_quartile_25: article.price_25_quartile,
        price_quartile_75: article.price_75_quartile,
        competitiveness_rank: article.competitiveness_rank,
        price_variance: pricing::price_variance(unit_price, article.estimated_price),
        price_competitiveness: pricing::competitiveness(article.competitiveness_rank).to_string(),
    })
}

fn record_run(
    conn: &mut PgConnection,
    service_id: Uuid,
    synced: usize,
    articles: usize,
    status: &str,
    message: &str,
) -> Result<(), SyncError> {
    diesel::update(sync_services::table.find(service_id))
        .set((
            sync_services::last_sync_date.eq(Utc::now().naive_utc()),
            sync_services::total_tenders_synced.eq(synced as i32),
            sync_services::total_articles_synced.eq(articles as i32),
            sync_services::last_sync_status.eq(status),
            sync_services::last_sync_message.eq(message),
            sync_services::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;
    Ok(())
}

fn record_run_error(
    state: &AppState,
    service_id: Uuid,
    err: &SyncError,
) -> Result<(), SyncError> {
    let mut conn = state.db().map_err(|e| SyncError::Pool(e.to_string()))?;
    record_run(&mut conn, service_id, 0, 0, SYNC_STATUS_ERROR, &err.to_string())
}
