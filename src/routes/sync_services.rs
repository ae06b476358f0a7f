use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewSyncService, SyncService},
    routes::tenders::to_iso,
    schema::sync_services,
    state::AppState,
    sync::{self, BidApiClient, SyncReport},
};

/// Service row as returned by the API. The api key is write-only and never
/// serialized back out.
#[derive(Serialize)]
pub struct ServiceSummary {
    pub id: Uuid,
    pub name: String,
    pub api_url: String,
    pub is_active: bool,
    pub sync_interval_hours: i32,
    pub last_sync_date: Option<String>,
    pub next_sync_date: String,
    pub total_tenders_synced: i32,
    pub total_articles_synced: i32,
    pub last_sync_status: String,
    pub last_sync_message: Option<String>,
}

impl From<SyncService> for ServiceSummary {
    fn from(service: SyncService) -> Self {
        let next = service.next_sync_date(Utc::now().naive_utc());
        Self {
            id: service.id,
            name: service.name,
            api_url: service.api_url,
            is_active: service.is_active,
            sync_interval_hours: service.sync_interval_hours,
            last_sync_date: service.last_sync_date.map(to_iso),
            next_sync_date: to_iso(next),
            total_tenders_synced: service.total_tenders_synced,
            total_articles_synced: service.total_articles_synced,
            last_sync_status: service.last_sync_status,
            last_sync_message: service.last_sync_message,
        }
    }
}

pub async fn list_services(State(state): State<AppState>) -> AppResult<Json<Vec<ServiceSummary>>> {
    let mut conn = state.db()?;
    let rows: Vec<SyncService> = sync_services::table
        .order(sync_services::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(ServiceSummary::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_interval")]
    pub sync_interval_hours: i32,
}

fn default_active() -> bool {
    true
}

fn default_interval() -> i32 {
    24
}

pub async fn create_service(
    State(state): State<AppState>,
    Json(payload): Json<CreateServiceRequest>,
) -> AppResult<Json<ServiceSummary>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    if Url::parse(&payload.api_url).is_err() {
        return Err(AppError::bad_request("api_url is not a valid URL"));
    }
    if payload.api_key.trim().is_empty() {
        return Err(AppError::bad_request("api_key is required"));
    }
    if payload.sync_interval_hours < 1 {
        return Err(AppError::bad_request(
            "sync_interval_hours must be at least 1",
        ));
    }

    let new_service = NewSyncService {
        id: Uuid::new_v4(),
        name: name.to_string(),
        api_url: payload.api_url.trim_end_matches('/').to_string(),
        api_key: payload.api_key,
        is_active: payload.is_active,
        sync_interval_hours: payload.sync_interval_hours,
    };

    let mut conn = state.db()?;
    diesel::insert_into(sync_services::table)
        .values(&new_service)
        .execute(&mut conn)?;

    let created: SyncService = sync_services::table.find(new_service.id).first(&mut conn)?;
    Ok(Json(created.into()))
}

#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub is_active: Option<bool>,
    pub sync_interval_hours: Option<i32>,
}

#[derive(AsChangeset)]
#[diesel(table_name = sync_services)]
struct ServiceChangeset<'a> {
    name: Option<&'a str>,
    api_url: Option<String>,
    api_key: Option<&'a str>,
    is_active: Option<bool>,
    sync_interval_hours: Option<i32>,
}

pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateServiceRequest>,
) -> AppResult<Json<ServiceSummary>> {
    if let Some(ref api_url) = payload.api_url {
        if Url::parse(api_url).is_err() {
            return Err(AppError::bad_request("api_url is not a valid URL"));
        }
    }
    if let Some(hours) = payload.sync_interval_hours {
        if hours < 1 {
            return Err(AppError::bad_request(
                "sync_interval_hours must be at least 1",
            ));
        }
    }

    let mut conn = state.db()?;
    let _existing: SyncService = sync_services::table.find(id).first(&mut conn)?;

    let changeset = ServiceChangeset {
        name: payload.name.as_deref(),
        api_url: payload
            .api_url
            .as_deref()
            .map(|value| value.trim_end_matches('/').to_string()),
        api_key: payload.api_key.as_deref(),
        is_active: payload.is_active,
        sync_interval_hours: payload.sync_interval_hours,
    };

    diesel::update(sync_services::table.find(id))
        .set((
            &changeset,
            sync_services::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: SyncService = sync_services::table.find(id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

/// Trigger a synchronization run immediately, bypassing the schedule.
pub async fn run_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SyncReport>> {
    let service: SyncService = {
        let mut conn = state.db()?;
        sync_services::table.find(id).first(&mut conn)?
    };

    if !service.is_active {
        return Err(AppError::bad_request("service is not active"));
    }

    let report = sync::run_sync(&state, &service)
        .await
        .map_err(|err| AppError::bad_request(format!("Sync failed: {err}")))?;

    Ok(Json(report))
}

/// Probe the service's health endpoint without touching any tender data.
pub async fn test_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service: SyncService = {
        let mut conn = state.db()?;
        sync_services::table.find(id).first(&mut conn)?
    };

    let client = BidApiClient::for_service(&service)
        .map_err(|err| AppError::bad_request(format!("Connection test failed: {err}")))?;

    match client.health().await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "message": "API connection successful",
        }))),
        Err(err) => Ok(Json(json!({
            "status": "error",
            "message": format!("API connection failed: {err}"),
        }))),
    }
}
