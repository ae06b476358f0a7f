use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::{prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewTender, Tender, TenderLine, TenderStage},
    schema::{tender_lines, tender_stages, tenders},
    state::AppState,
};

pub const STATE_DRAFT: &str = "draft";
pub const STATE_ACTIVE: &str = "active";
pub const STATE_AWARDED: &str = "awarded";
pub const STATE_CANCELLED: &str = "cancelled";
pub const STATE_CLOSED: &str = "closed";

pub(crate) fn to_iso(value: NaiveDateTime) -> String {
    value.and_utc().to_rfc3339()
}

#[derive(Serialize)]
pub struct TenderSummary {
    pub id: Uuid,
    pub tender_id: String,
    pub procuring_entity: Option<String>,
    pub tender_value: Option<f64>,
    pub description: Option<String>,
    pub procurement_method: Option<String>,
    pub tender_url: Option<String>,
    pub state: String,
    pub source: String,
    pub type_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub date_published: Option<NaiveDate>,
    pub date_deadline: Option<NaiveDate>,
    pub date_evaluation: Option<NaiveDate>,
    pub date_awarded: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Tender> for TenderSummary {
    fn from(tender: Tender) -> Self {
        Self {
            id: tender.id,
            tender_id: tender.tender_id,
            procuring_entity: tender.procuring_entity,
            tender_value: tender.tender_value,
            description: tender.description,
            procurement_method: tender.procurement_method,
            tender_url: tender.tender_url,
            state: tender.state,
            source: tender.source,
            type_id: tender.type_id,
            stage_id: tender.stage_id,
            assigned_to: tender.assigned_to,
            date_published: tender.date_published,
            date_deadline: tender.date_deadline,
            date_evaluation: tender.date_evaluation,
            date_awarded: tender.date_awarded,
            created_at: to_iso(tender.created_at),
            updated_at: to_iso(tender.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct LineSummary {
    pub id: Uuid,
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

impl From<TenderLine> for LineSummary {
    fn from(line: TenderLine) -> Self {
        Self {
            id: line.id,
            article_number: line.article_number,
            description: line.description,
            lot_info: line.lot_info,
            unit: line.unit,
            quantity: line.quantity,
            unit_price: line.unit_price,
            total_price: line.total_price,
            unspsc_code: line.unspsc_code,
            unspsc_description: line.unspsc_description,
            estimated_price: line.estimated_price,
            price_quartile_25: line.price_quartile_25,
            price_quartile_75: line.price_quartile_75,
            competitiveness_rank: line.competitiveness_rank,
            price_variance: line.price_variance,
            price_competitiveness: line.price_competitiveness,
        }
    }
}

#[derive(Deserialize)]
pub struct ListTendersQuery {
    pub state: Option<String>,
    pub source: Option<String>,
}

pub async fn list_tenders(
    State(state): State<AppState>,
    Query(query): Query<ListTendersQuery>,
) -> AppResult<Json<Vec<TenderSummary>>> {
    let mut conn = state.db()?;

    let mut statement = tenders::table
        .order(tenders::created_at.desc())
        .into_boxed();
    if let Some(ref tender_state) = query.state {
        statement = statement.filter(tenders::state.eq(tender_state));
    }
    if let Some(ref source) = query.source {
        statement = statement.filter(tenders::source.eq(source));
    }

    let rows: Vec<Tender> = statement.load(&mut conn)?;
    Ok(Json(rows.into_iter().map(TenderSummary::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateTenderRequest {
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
    pub type_id: Option<Uuid>,
    #[serde(default)]
    pub stage_id: Option<Uuid>,
    #[serde(default)]
    pub date_deadline: Option<NaiveDate>,
}

pub async fn create_tender(
    State(state): State<AppState>,
    crate::auth::AuthenticatedUser { user_id, .. }: crate::auth::AuthenticatedUser,
    Json(payload): Json<CreateTenderRequest>,
) -> AppResult<Json<TenderSummary>> {
    let tender_id = payload.tender_id.trim();
    if tender_id.is_empty() {
        return Err(AppError::bad_request("tender id is required"));
    }

    let new_tender = NewTender {
        id: Uuid::new_v4(),
        tender_id: tender_id.to_string(),
        procuring_entity: payload.procuring_entity,
        tender_value: payload.tender_value,
        description: payload.description,
        procurement_method: payload.procurement_method,
        tender_url: payload.tender_url,
        budget_certificate: None,
        budget_value: None,
        budget_source: None,
        state: STATE_DRAFT.to_string(),
        source: "manual".to_string(),
        type_id: payload.type_id,
        stage_id: payload.stage_id,
        assigned_to: Some(user_id),
        date_published: None,
        date_deadline: payload.date_deadline,
        date_evaluation: None,
        date_awarded: None,
    };

    let mut conn = state.db()?;
    match diesel::insert_into(tenders::table)
        .values(&new_tender)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request("tender id already exists"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let tender: Tender = tenders::table.find(new_tender.id).first(&mut conn)?;
    Ok(Json(tender.into()))
}

pub async fn get_tender(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TenderSummary>> {
    let mut conn = state.db()?;
    let tender: Tender = tenders::table.find(id).first(&mut conn)?;
    Ok(Json(tender.into()))
}

#[derive(Deserialize)]
pub struct UpdateTenderRequest {
    pub procuring_entity: Option<String>,
    pub tender_value: Option<f64>,
    pub description: Option<String>,
    pub procurement_method: Option<String>,
    pub tender_url: Option<String>,
    pub type_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub date_deadline: Option<NaiveDate>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = tenders)]
struct TenderChangeset<'a> {
    procuring_entity: Option<&'a str>,
    tender_value: Option<f64>,
    description: Option<&'a str>,
    procurement_method: Option<&'a str>,
    tender_url: Option<&'a str>,
    type_id: Option<Uuid>,
    assigned_to: Option<Uuid>,
    date_deadline: Option<NaiveDate>,
}

pub async fn update_tender(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenderRequest>,
) -> AppResult<Json<TenderSummary>> {
    let mut conn = state.db()?;
    // Presence check keeps an unknown id a 404 rather than a no-op update.
    let _existing: Tender = tenders::table.find(id).first(&mut conn)?;

    let changeset = TenderChangeset {
        procuring_entity: payload.procuring_entity.as_deref(),
        tender_value: payload.tender_value,
        description: payload.description.as_deref(),
        procurement_method: payload.procurement_method.as_deref(),
        tender_url: payload.tender_url.as_deref(),
        type_id: payload.type_id,
        assigned_to: payload.assigned_to,
        date_deadline: payload.date_deadline,
    };

    diesel::update(tenders::table.find(id))
        .set((&changeset, tenders::updated_at.eq(Utc::now().naive_utc())))
        .execute(&mut conn)?;

    let updated: Tender = tenders::table.find(id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

#[derive(Deserialize)]
pub struct TransitionStageRequest {
    pub stage_id: Uuid,
}

/// Move a tender to a new stage; the lifecycle state is derived from the
/// stage flags (won, lost, closed) rather than set directly.
pub async fn transition_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionStageRequest>,
) -> AppResult<Json<TenderSummary>> {
    let mut conn = state.db()?;

    let _existing: Tender = tenders::table.find(id).first(&mut conn)?;
    let stage: TenderStage = tender_stages::table
        .find(payload.stage_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::bad_request("unknown stage"))?;

    let next_state = state_for_stage(&stage);

    diesel::update(tenders::table.find(id))
        .set((
            tenders::stage_id.eq(stage.id),
            tenders::state.eq(next_state),
            tenders::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: Tender = tenders::table.find(id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

pub(crate) fn state_for_stage(stage: &TenderStage) -> &'static str {
    if stage.is_won {
        STATE_AWARDED
    } else if stage.is_lost {
        STATE_CANCELLED
    } else if stage.is_closed {
        STATE_CLOSED
    } else {
        STATE_ACTIVE
    }
}

pub async fn list_tender_lines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<LineSummary>>> {
    let mut conn = state.db()?;
    let _existing: Tender = tenders::table.find(id).first(&mut conn)?;

    let rows: Vec<TenderLine> = tender_lines::table
        .filter(tender_lines::tender_ref.eq(id))
        .order(tender_lines::article_number.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(LineSummary::from).collect()))
}
