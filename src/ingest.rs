//! Email-ingestion pipeline: stores the inbound email, extracts tender
//! metadata, and creates the corresponding tender with notifications.
//!
//! The raw email row is written before extraction runs and is not rolled
//! back when a later step fails; processor statistics advance regardless of
//! outcome.

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    extract::{self, ExtractedTender},
    models::{
        EmailProcessor, InboundEmail, NewInboundEmail, NewTender, NewTenderActivity,
        NewTenderMessage, Tender, TenderStage, TenderType,
    },
    schema::{
        email_processors, inbound_emails, tender_activities, tender_messages, tender_stages,
        tender_types, tenders,
    },
};

pub const EMAIL_STATUS_PROCESSING: &str = "processing";
pub const EMAIL_STATUS_COMPLETED: &str = "completed";
pub const EMAIL_STATUS_ERROR: &str = "error";

pub const TENDER_SOURCE_EMAIL: &str = "email";

#[derive(Debug, Deserialize)]
pub struct EmailPayload {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

pub struct IngestOutcome {
    pub email: InboundEmail,
    pub tender: Option<Tender>,
}

/// Process one inbound email for a processor.
///
/// Returns `Ok` with the stored email row even when no tender information
/// was found (the row is marked `error` in that case); returns `Err` only
/// when tender creation itself fails.
pub fn process_email(
    conn: &mut PgConnection,
    processor: &EmailProcessor,
    user_id: Option<Uuid>,
    payload: &EmailPayload,
) -> AppResult<IngestOutcome> {
    let email_row = NewInboundEmail {
        id: Uuid::new_v4(),
        processor_id: processor.id,
        subject: payload.subject.clone(),
        body: payload.body.clone(),
        email_date: payload.date,
        sender_email: payload.sender_email.clone(),
        sender_name: payload.sender_name.clone(),
        status: EMAIL_STATUS_PROCESSING.to_string(),
    };
    diesel::insert_into(inbound_emails::table)
        .values(&email_row)
        .execute(conn)?;
    let email_id = email_row.id;

    let extracted = extract::extract(&payload.subject, &payload.body);

    diesel::update(inbound_emails::table.find(email_id))
        .set((
            inbound_emails::extracted_tender_id.eq(extracted.tender_id.clone()),
            inbound_emails::extracted_entity.eq(extracted.entity.clone()),
            inbound_emails::extracted_description.eq(extracted.description.clone()),
            inbound_emails::extracted_value.eq(extracted.value),
            inbound_emails::extracted_deadline.eq(extracted.deadline),
            inbound_emails::extracted_url.eq(extracted.url.clone()),
        ))
        .execute(conn)?;

    let result = if extracted.is_empty() {
        warn!(processor = %processor.name, "no tender information found in email");
        finish_email(conn, email_id, EMAIL_STATUS_ERROR, "No tender information found in email", None)?;
        Ok(None)
    } else if processor.auto_create {
        match create_tender_from_email(conn, processor, user_id, payload, &extracted) {
            Ok(tender) => {
                diesel::update(email_processors::table.find(processor.id))
                    .set(
                        email_processors::total_tenders_created
                            .eq(email_processors::total_tenders_created + 1),
                    )
                    .execute(conn)?;
                finish_email(
                    conn,
                    email_id,
                    EMAIL_STATUS_COMPLETED,
                    "Email processed successfully",
                    Some(tender.id),
                )?;
                Ok(Some(tender))
            }
            Err(err) => Err(err),
        }
    } else {
        finish_email(conn, email_id, EMAIL_STATUS_COMPLETED, "Email processed successfully", None)?;
        Ok(None)
    };

    // Counts and the last-run timestamp advance on every outcome.
    diesel::update(email_processors::table.find(processor.id))
        .set((
            email_processors::total_emails_processed
                .eq(email_processors::total_emails_processed + 1),
            email_processors::last_processing_date.eq(Utc::now().naive_utc()),
            email_processors::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    match result {
        Ok(tender) => {
            let email: InboundEmail = inbound_emails::table.find(email_id).first(conn)?;
            Ok(IngestOutcome { email, tender })
        }
        Err(err) => {
            let message = format!("Email processing failed: {err}");
            finish_email(conn, email_id, EMAIL_STATUS_ERROR, &message, None)?;
            Err(AppError::bad_request(message))
        }
    }
}

fn finish_email(
    conn: &mut PgConnection,
    email_id: Uuid,
    status: &str,
    message: &str,
    tender_ref: Option<Uuid>,
) -> AppResult<()> {
    diesel::update(inbound_emails::table.find(email_id))
        .set((
            inbound_emails::status.eq(status),
            inbound_emails::message.eq(message),
            inbound_emails::tender_ref.eq(tender_ref),
        ))
        .execute(conn)?;
    Ok(())
}

fn create_tender_from_email(
    conn: &mut PgConnection,
    processor: &EmailProcessor,
    user_id: Option<Uuid>,
    payload: &EmailPayload,
    extracted: &ExtractedTender,
) -> Result<Tender, diesel::result::Error> {
    let now = Utc::now();
    let tender_id = extracted
        .tender_id
        .clone()
        .unwrap_or_else(|| format!("EMAIL_{}", now.format("%Y%m%d_%H%M%S")));

    let type_id = if processor.auto_classify {
        classify_tender_type(
            conn,
            &payload.subject,
            extracted.description.as_deref().unwrap_or(""),
        )?
    } else {
        None
    };

    let default_stage: Option<TenderStage> = tender_stages::table
        .filter(tender_stages::is_default.eq(true))
        .first(conn)
        .optional()?;

    let new_tender = NewTender {
        id: Uuid::new_v4(),
        tender_id,
        procuring_entity: extracted.entity.clone(),
        tender_value: extracted.value,
        description: extracted.description.clone(),
        procurement_method: None,
        tender_url: extracted.url.clone(),
        budget_certificate: None,
        budget_value: None,
        budget_source: None,
        state: "draft".to_string(),
        source: TENDER_SOURCE_EMAIL.to_string(),
        type_id,
        stage_id: default_stage.map(|stage| stage.id),
        assigned_to: user_id,
        date_published: None,
        date_deadline: extracted.deadline,
        date_evaluation: None,
        date_awarded: None,
    };

    diesel::insert_into(tenders::table)
        .values(&new_tender)
        .execute(conn)?;
    let tender: Tender = tenders::table.find(new_tender.id).first(conn)?;

    info!(tender_id = %tender.tender_id, "created tender from email");

    // Notifications are best-effort; a failure here must not undo the
    // created tender or fail the email.
    if processor.notifications_enabled {
        if let Err(err) = send_notifications(conn, processor, &tender) {
            warn!(
                tender_id = %tender.tender_id,
                error = %err,
                "failed to write tender notifications"
            );
        }
    }

    Ok(tender)
}

/// Pick a tender type for an email-created tender: a type whose own keyword
/// list matches wins, then the fixed construction/service/goods buckets by
/// type name, then the default-flagged type.
fn classify_tender_type(
    conn: &mut PgConnection,
    subject: &str,
    description: &str,
) -> Result<Option<Uuid>, diesel::result::Error> {
    let text = format!("{description} {subject}").to_lowercase();

    let types: Vec<TenderType> = tender_types::table.load(conn)?;
    for tender_type in &types {
        if let Some(ref keywords) = tender_type.classification_keywords {
            let hit = keywords
                .split(',')
                .map(|kw| kw.trim().to_lowercase())
                .any(|kw| !kw.is_empty() && text.contains(&kw));
            if hit {
                return Ok(Some(tender_type.id));
            }
        }
    }

    if let Some(kind) = extract::classify(subject, description) {
        let matched: Option<TenderType> = tender_types::table
            .filter(tender_types::name.ilike(format!("%{}%", kind.type_name())))
            .first(conn)
            .optional()?;
        if let Some(tender_type) = matched {
            return Ok(Some(tender_type.id));
        }
    }

    let fallback: Option<TenderType> = tender_types::table
        .filter(tender_types::is_default.eq(true))
        .first(conn)
        .optional()?;
    Ok(fallback.map(|tender_type| tender_type.id))
}

fn send_notifications(
    conn: &mut PgConnection,
    processor: &EmailProcessor,
    tender: &Tender,
) -> Result<(), diesel::result::Error> {
    let message = NewTenderMessage {
        id: Uuid::new_v4(),
        tender_ref: tender.id,
        subject: format!("New Tender: {}", tender.tender_id),
        body: format!(
            "Tender created from email notification. Source: {}",
            processor.email_address
        ),
    };
    diesel::insert_into(tender_messages::table)
        .values(&message)
        .execute(conn)?;

    let activity = NewTenderActivity {
        id: Uuid::new_v4(),
        tender_ref: tender.id,
        user_id: tender.assigned_to,
        note: format!("New tender created from email: {}", tender.tender_id),
        due_date: Utc::now().date_naive(),
    };
    diesel::insert_into(tender_activities::table)
        .values(&activity)
        .execute(conn)?;

    Ok(())
}
