use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewTenderStage, TenderStage},
    schema::tender_stages,
    state::AppState,
};

#[derive(Serialize)]
pub struct StageSummary {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub is_won: bool,
    pub is_lost: bool,
    pub is_closed: bool,
    pub is_default: bool,
}

impl From<TenderStage> for StageSummary {
    fn from(stage: TenderStage) -> Self {
        Self {
            id: stage.id,
            name: stage.name,
            sequence: stage.sequence,
            is_won: stage.is_won,
            is_lost: stage.is_lost,
            is_closed: stage.is_closed,
            is_default: stage.is_default,
        }
    }
}

pub async fn list_stages(State(state): State<AppState>) -> AppResult<Json<Vec<StageSummary>>> {
    let mut conn = state.db()?;
    let rows: Vec<TenderStage> = tender_stages::table
        .order(tender_stages::sequence.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(StageSummary::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateStageRequest {
    pub name: String,
    #[serde(default)]
    pub sequence: i32,
    #[serde(default)]
    pub is_won: bool,
    #[serde(default)]
    pub is_lost: bool,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn create_stage(
    State(state): State<AppState>,
    Json(payload): Json<CreateStageRequest>,
) -> AppResult<Json<StageSummary>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name is required"));
    }
    // A stage can carry at most one terminal flag.
    let flags = [payload.is_won, payload.is_lost, payload.is_closed];
    if flags.iter().filter(|flag| **flag).count() > 1 {
        return Err(AppError::bad_request(
            "a stage may set at most one of is_won, is_lost, is_closed",
        ));
    }

    let new_stage = NewTenderStage {
        id: Uuid::new_v4(),
        name: name.to_string(),
        sequence: payload.sequence,
        is_won: payload.is_won,
        is_lost: payload.is_lost,
        is_closed: payload.is_closed,
        is_default: payload.is_default,
    };

    let mut conn = state.db()?;
    diesel::insert_into(tender_stages::table)
        .values(&new_stage)
        .execute(&mut conn)?;

    let created: TenderStage = tender_stages::table.find(new_stage.id).first(&mut conn)?;
    Ok(Json(created.into()))
}
