use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tender_types)]
pub struct TenderType {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub classification_keywords: Option<String>,
    pub is_default: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tender_types)]
pub struct NewTenderType {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub classification_keywords: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tender_stages)]
pub struct TenderStage {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub is_won: bool,
    pub is_lost: bool,
    pub is_closed: bool,
    pub is_default: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tender_stages)]
pub struct NewTenderStage {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub is_won: bool,
    pub is_lost: bool,
    pub is_closed: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = tenders)]
pub struct Tender {
    pub id: Uuid,
    pub tender_id: String,
    pub procuring_entity: Option<String>,
    pub tender_value: Option<f64>,
    pub description: Option<String>,
    pub procurement_method: Option<String>,
    pub tender_url: Option<String>,
    pub budget_certificate: Option<String>,
    pub budget_value: Option<f64>,
    pub budget_source: Option<String>,
    pub state: String,
    pub source: String,
    pub type_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub date_published: Option<NaiveDate>,
    pub date_deadline: Option<NaiveDate>,
    pub date_evaluation: Option<NaiveDate>,
    pub date_awarded: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tenders)]
pub struct NewTender {
    pub id: Uuid,
    pub tender_id: String,
    pub procuring_entity: Option<String>,
    pub tender_value: Option<f64>,
    pub description: Option<String>,
    pub procurement_method: Option<String>,
    pub tender_url: Option<String>,
    pub budget_certificate: Option<String>,
    pub budget_value: Option<f64>,
    pub budget_source: Option<String>,
    pub state: String,
    pub source: String,
    pub type_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub date_published: Option<NaiveDate>,
    pub date_deadline: Option<NaiveDate>,
    pub date_evaluation: Option<NaiveDate>,
    pub date_awarded: Option<NaiveDate>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tender_lines)]
#[diesel(belongs_to(Tender, foreign_key = tender_ref))]
pub struct TenderLine {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub article_number: String,
    pub description: String,
    pub lot_info: Option<String>,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub unspsc_code: Option<String>,
    pub unspsc_description: Option<String>,
    pub estimated_price: Option<f64>,
    pub price_quartile_25: Option<f64>,
    pub price_quartile_75: Option<f64>,
    pub competitiveness_rank: Option<f64>,
    pub price_variance: f64,
    pub price_competitiveness: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tender_lines)]
pub struct NewTenderLine {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub article_number: String,
    pub description: String,
    pub lot_info: Option<String>,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub unspsc_code: Option<String>,
    pub unspsc_description: Option<String>,
    pub estimated_price: Option<f64>,
    pub price_quartile_25: Option<f64>,
    pub price_quartile_75: Option<f64>,
    pub competitiveness_rank: Option<f64>,
    pub price_variance: f64,
    pub price_competitiveness: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = sync_services)]
pub struct SyncService {
    pub id: Uuid,
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub is_active: bool,
    pub sync_interval_hours: i32,
    pub last_sync_date: Option<NaiveDateTime>,
    pub total_tenders_synced: i32,
    pub total_articles_synced: i32,
    pub last_sync_status: String,
    pub last_sync_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SyncService {
    /// Next scheduled run; a service that never ran is due immediately.
    pub fn next_sync_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self.last_sync_date {
            Some(last) => last + chrono::Duration::hours(i64::from(self.sync_interval_hours)),
            None => now,
        }
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.next_sync_date(now) <= now
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sync_services)]
pub struct NewSyncService {
    pub id: Uuid,
    pub name: String,
    pub api_url: String,
    pub api_key: String,
    pub is_active: bool,
    pub sync_interval_hours: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = email_processors)]
pub struct EmailProcessor {
    pub id: Uuid,
    pub name: String,
    pub email_address: String,
    pub is_active: bool,
    pub auto_classify: bool,
    pub auto_create: bool,
    pub notifications_enabled: bool,
    pub total_emails_processed: i32,
    pub total_tenders_created: i32,
    pub last_processing_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = email_processors)]
pub struct NewEmailProcessor {
    pub id: Uuid,
    pub name: String,
    pub email_address: String,
    pub is_active: bool,
    pub auto_classify: bool,
    pub auto_create: bool,
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = inbound_emails)]
#[diesel(belongs_to(EmailProcessor, foreign_key = processor_id))]
pub struct InboundEmail {
    pub id: Uuid,
    pub processor_id: Uuid,
    pub subject: String,
    pub body: String,
    pub email_date: Option<NaiveDateTime>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub extracted_tender_id: Option<String>,
    pub extracted_entity: Option<String>,
    pub extracted_description: Option<String>,
    pub extracted_value: Option<f64>,
    pub extracted_deadline: Option<NaiveDate>,
    pub extracted_url: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub tender_ref: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inbound_emails)]
pub struct NewInboundEmail {
    pub id: Uuid,
    pub processor_id: Uuid,
    pub subject: String,
    pub body: String,
    pub email_date: Option<NaiveDateTime>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tender_activities)]
#[diesel(belongs_to(Tender, foreign_key = tender_ref))]
pub struct TenderActivity {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub user_id: Option<Uuid>,
    pub note: String,
    pub due_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tender_activities)]
pub struct NewTenderActivity {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub user_id: Option<Uuid>,
    pub note: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tender_messages)]
#[diesel(belongs_to(Tender, foreign_key = tender_ref))]
pub struct TenderMessage {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub subject: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tender_messages)]
pub struct NewTenderMessage {
    pub id: Uuid,
    pub tender_ref: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub run_after: NaiveDateTime,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub run_after: NaiveDateTime,
}
