use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    ingest::{self, EmailPayload},
    models::{EmailProcessor, InboundEmail, NewEmailProcessor},
    routes::tenders::{to_iso, TenderSummary},
    schema::{email_processors, inbound_emails},
    state::AppState,
};

#[derive(Serialize)]
pub struct ProcessorSummary {
    pub id: Uuid,
    pub name: String,
    pub email_address: String,
    pub is_active: bool,
    pub auto_classify: bool,
    pub auto_create: bool,
    pub notifications_enabled: bool,
    pub total_emails_processed: i32,
    pub total_tenders_created: i32,
    pub last_processing_date: Option<String>,
}

impl From<EmailProcessor> for ProcessorSummary {
    fn from(processor: EmailProcessor) -> Self {
        Self {
            id: processor.id,
            name: processor.name,
            email_address: processor.email_address,
            is_active: processor.is_active,
            auto_classify: processor.auto_classify,
            auto_create: processor.auto_create,
            notifications_enabled: processor.notifications_enabled,
            total_emails_processed: processor.total_emails_processed,
            total_tenders_created: processor.total_tenders_created,
            last_processing_date: processor.last_processing_date.map(to_iso),
        }
    }
}

#[derive(Serialize)]
pub struct EmailSummary {
    pub id: Uuid,
    pub processor_id: Uuid,
    pub subject: String,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub extracted_tender_id: Option<String>,
    pub extracted_entity: Option<String>,
    pub extracted_value: Option<f64>,
    pub status: String,
    pub message: Option<String>,
    pub tender_ref: Option<Uuid>,
    pub created_at: String,
}

impl From<InboundEmail> for EmailSummary {
    fn from(email: InboundEmail) -> Self {
        Self {
            id: email.id,
            processor_id: email.processor_id,
            subject: email.subject,
            sender_email: email.sender_email,
            sender_name: email.sender_name,
            extracted_tender_id: email.extracted_tender_id,
            extracted_entity: email.extracted_entity,
            extracted_value: email.extracted_value,
            status: email.status,
            message: email.message,
            tender_ref: email.tender_ref,
            created_at: to_iso(email.created_at),
        }
    }
}

pub async fn list_processors(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProcessorSummary>>> {
    let mut conn = state.db()?;
    let rows: Vec<EmailProcessor> = email_processors::table
        .order(email_processors::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(ProcessorSummary::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateProcessorRequest {
    pub name: String,
    pub email_address: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub auto_classify: bool,
    #[serde(default = "default_true")]
    pub auto_create: bool,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_processor(
    State(state): State<AppState>,
    Json(payload): Json<CreateProcessorRequest>,
) -> AppResult<Json<ProcessorSummary>> {
    let name = payload.name.trim();
    let email_address = payload.email_address.trim();
    if name.is_empty() || email_address.is_empty() {
        return Err(AppError::bad_request("name and email_address are required"));
    }

    let new_processor = NewEmailProcessor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email_address: email_address.to_string(),
        is_active: payload.is_active,
        auto_classify: payload.auto_classify,
        auto_create: payload.auto_create,
        notifications_enabled: payload.notifications_enabled,
    };

    let mut conn = state.db()?;
    diesel::insert_into(email_processors::table)
        .values(&new_processor)
        .execute(&mut conn)?;

    let created: EmailProcessor = email_processors::table
        .find(new_processor.id)
        .first(&mut conn)?;
    Ok(Json(created.into()))
}

pub async fn list_emails(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<EmailSummary>>> {
    let mut conn = state.db()?;
    let _processor: EmailProcessor = email_processors::table.find(id).first(&mut conn)?;

    let rows: Vec<InboundEmail> = inbound_emails::table
        .filter(inbound_emails::processor_id.eq(id))
        .order(inbound_emails::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(EmailSummary::from).collect()))
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub email: EmailSummary,
    pub tender: Option<TenderSummary>,
}

/// Feed one email through the processor pipeline.
pub async fn ingest_email(
    State(state): State<AppState>,
    AuthenticatedUser { user_id, .. }: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmailPayload>,
) -> AppResult<Json<IngestResponse>> {
    let mut conn = state.db()?;
    let processor: EmailProcessor = email_processors::table.find(id).first(&mut conn)?;

    if !processor.is_active {
        return Err(AppError::bad_request("processor is not active"));
    }

    let outcome = ingest::process_email(&mut conn, &processor, Some(user_id), &payload)?;

    Ok(Json(IngestResponse {
        email: outcome.email.into(),
        tender: outcome.tender.map(TenderSummary::from),
    }))
}
