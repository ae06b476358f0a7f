mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tenderdesk::models::{EmailProcessor, TenderActivity, TenderMessage};
use uuid::Uuid;

#[derive(Deserialize)]
struct IdResponse {
    id: Uuid,
}

#[derive(Deserialize)]
struct IngestResponse {
    email: EmailInfo,
    tender: Option<TenderInfo>,
}

#[derive(Deserialize)]
struct EmailInfo {
    status: String,
    message: Option<String>,
    extracted_tender_id: Option<String>,
    tender_ref: Option<Uuid>,
}

#[derive(Deserialize)]
struct TenderInfo {
    id: Uuid,
    tender_id: String,
    procuring_entity: Option<String>,
    tender_value: Option<f64>,
    source: String,
    state: String,
    type_id: Option<Uuid>,
    stage_id: Option<Uuid>,
    assigned_to: Option<Uuid>,
    date_deadline: Option<String>,
}

async fn create_processor(app: &TestApp, token: &str) -> Result<Uuid> {
    let response = app
        .post_json(
            "/api/processors",
            &json!({
                "name": "Inbox",
                "email_address": "tenders@example.gov",
            }),
            Some(token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let parsed: IdResponse = serde_json::from_slice(&body)?;
    Ok(parsed.id)
}

async fn create_type(
    app: &TestApp,
    token: &str,
    name: &str,
    code: &str,
    is_default: bool,
) -> Result<Uuid> {
    let response = app
        .post_json(
            "/api/tender-types",
            &json!({ "name": name, "code": code, "is_default": is_default }),
            Some(token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let parsed: IdResponse = serde_json::from_slice(&body)?;
    Ok(parsed.id)
}

async fn create_default_stage(app: &TestApp, token: &str) -> Result<Uuid> {
    let response = app
        .post_json(
            "/api/tender-stages",
            &json!({ "name": "New", "sequence": 1, "is_default": true }),
            Some(token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let parsed: IdResponse = serde_json::from_slice(&body)?;
    Ok(parsed.id)
}

fn tender_email() -> serde_json::Value {
    json!({
        "subject": "Tender: T-2026-001",
        "body": "Construcción de nueva escuela en la región norte\nEntidad: Ministerio de Educación\nValor: $1,500,000.00\nFecha límite: 30/09/2026\nhttps://portal.compras.gov/t/T-2026-001",
        "sender_email": "noreply@compras.gov",
        "sender_name": "Portal de Compras",
    })
}

#[tokio::test]
async fn email_with_tender_info_creates_tender() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let user_id = app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;

    let construction_type = create_type(&app, &token, "Construction Works", "CW", false).await?;
    create_type(&app, &token, "General", "GEN", true).await?;
    let stage_id = create_default_stage(&app, &token).await?;
    let processor_id = create_processor(&app, &token).await?;

    let response = app
        .post_json(
            &format!("/api/processors/{processor_id}/emails"),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: IngestResponse = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    assert_eq!(parsed.email.status, "completed");
    assert_eq!(parsed.email.extracted_tender_id.as_deref(), Some("T-2026-001"));

    let tender = parsed.tender.expect("tender should be created");
    assert_eq!(tender.tender_id, "T-2026-001");
    assert_eq!(
        tender.procuring_entity.as_deref(),
        Some("Ministerio de Educación")
    );
    assert_eq!(tender.tender_value, Some(1_500_000.0));
    assert_eq!(tender.source, "email");
    assert_eq!(tender.state, "draft");
    assert_eq!(tender.type_id, Some(construction_type));
    assert_eq!(tender.stage_id, Some(stage_id));
    assert_eq!(tender.assigned_to, Some(user_id));
    assert_eq!(tender.date_deadline.as_deref(), Some("2026-09-30"));
    assert_eq!(parsed.email.tender_ref, Some(tender.id));

    // Notification message and follow-up activity are written alongside.
    let tender_pk = tender.id;
    let messages = app
        .with_conn(move |conn| {
            use tenderdesk::schema::tender_messages::dsl::*;
            Ok(tender_messages
                .filter(tender_ref.eq(tender_pk))
                .load::<TenderMessage>(conn)?)
        })
        .await?;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "New Tender: T-2026-001");

    let activities = app
        .with_conn(move |conn| {
            use tenderdesk::schema::tender_activities::dsl::*;
            Ok(tender_activities
                .filter(tender_ref.eq(tender_pk))
                .load::<TenderActivity>(conn)?)
        })
        .await?;
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].user_id, Some(user_id));

    let processor = load_processor(&app, processor_id).await?;
    assert_eq!(processor.total_emails_processed, 1);
    assert_eq!(processor.total_tenders_created, 1);
    assert!(processor.last_processing_date.is_some());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn notification_failure_does_not_fail_ingestion() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;
    let processor_id = create_processor(&app, &token).await?;

    // Make the notification insert fail without touching anything else.
    app.with_conn(|conn| {
        use diesel::connection::SimpleConnection;
        conn.batch_execute(
            "ALTER TABLE tender_messages DROP CONSTRAINT IF EXISTS tender_messages_subject_guard;
             ALTER TABLE tender_messages ADD CONSTRAINT tender_messages_subject_guard CHECK (subject NOT LIKE 'New Tender:%');",
        )?;
        Ok(())
    })
    .await?;

    let response = app
        .post_json(
            &format!("/api/processors/{processor_id}/emails"),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: IngestResponse = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    assert_eq!(parsed.email.status, "completed");
    let tender = parsed.tender.expect("tender should still be created");
    assert_eq!(tender.tender_id, "T-2026-001");

    let messages: i64 = app
        .with_conn(|conn| {
            use tenderdesk::schema::tender_messages::dsl::*;
            Ok(tender_messages.count().get_result(conn)?)
        })
        .await?;
    assert_eq!(messages, 0);

    let processor = load_processor(&app, processor_id).await?;
    assert_eq!(processor.total_emails_processed, 1);
    assert_eq!(processor.total_tenders_created, 1);

    app.with_conn(|conn| {
        use diesel::connection::SimpleConnection;
        conn.batch_execute(
            "ALTER TABLE tender_messages DROP CONSTRAINT tender_messages_subject_guard;",
        )?;
        Ok(())
    })
    .await?;

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn email_without_tender_info_is_recorded_as_error() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;
    let processor_id = create_processor(&app, &token).await?;

    let response = app
        .post_json(
            &format!("/api/processors/{processor_id}/emails"),
            &json!({ "subject": "hola", "body": "ok" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: IngestResponse = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    assert!(parsed.tender.is_none());
    assert_eq!(parsed.email.status, "error");
    assert_eq!(
        parsed.email.message.as_deref(),
        Some("No tender information found in email")
    );

    let processor = load_processor(&app, processor_id).await?;
    assert_eq!(processor.total_emails_processed, 1);
    assert_eq!(processor.total_tenders_created, 0);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn duplicate_tender_id_fails_the_second_email() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;
    let processor_id = create_processor(&app, &token).await?;

    let first = app
        .post_json(
            &format!("/api/processors/{processor_id}/emails"),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .post_json(
            &format!("/api/processors/{processor_id}/emails"),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    // Both emails are kept; the second one carries the failure.
    let listing = app
        .get(&format!("/api/processors/{processor_id}/emails"), Some(&token))
        .await?;
    assert_eq!(listing.status(), StatusCode::OK);
    let emails: Vec<EmailInfo> = serde_json::from_slice(&body_to_vec(listing.into_body()).await?)?;
    assert_eq!(emails.len(), 2);
    assert!(emails.iter().any(|email| email.status == "error"));
    assert!(emails.iter().any(|email| email.status == "completed"));

    let processor = load_processor(&app, processor_id).await?;
    assert_eq!(processor.total_emails_processed, 2);
    assert_eq!(processor.total_tenders_created, 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn inactive_processor_rejects_emails() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;

    let response = app
        .post_json(
            "/api/processors",
            &json!({
                "name": "Disabled",
                "email_address": "off@example.gov",
                "is_active": false,
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: IdResponse = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    let ingest = app
        .post_json(
            &format!("/api/processors/{}/emails", parsed.id),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(ingest.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn auto_create_disabled_stores_email_without_tender() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("ops", "opspass", "admin").await?;
    let token = app.login_token("ops", "opspass").await?;

    let response = app
        .post_json(
            "/api/processors",
            &json!({
                "name": "Review only",
                "email_address": "review@example.gov",
                "auto_create": false,
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let parsed: IdResponse = serde_json::from_slice(&body_to_vec(response.into_body()).await?)?;

    let ingest = app
        .post_json(
            &format!("/api/processors/{}/emails", parsed.id),
            &tender_email(),
            Some(&token),
        )
        .await?;
    assert_eq!(ingest.status(), StatusCode::OK);
    let outcome: IngestResponse = serde_json::from_slice(&body_to_vec(ingest.into_body()).await?)?;
    assert_eq!(outcome.email.status, "completed");
    assert!(outcome.tender.is_none());
    assert_eq!(
        outcome.email.extracted_tender_id.as_deref(),
        Some("T-2026-001")
    );

    app.cleanup().await?;
    Ok(())
}

async fn load_processor(app: &TestApp, processor_id: Uuid) -> Result<EmailProcessor> {
    app.with_conn(move |conn| {
        use tenderdesk::schema::email_processors::dsl::*;
        Ok(email_processors
            .find(processor_id)
            .first::<EmailProcessor>(conn)?)
    })
    .await
}
