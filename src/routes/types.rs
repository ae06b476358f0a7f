use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{NewTenderType, TenderType},
    schema::tender_types,
    state::AppState,
};

#[derive(Serialize)]
pub struct TypeSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub classification_keywords: Option<String>,
    pub is_default: bool,
}

impl From<TenderType> for TypeSummary {
    fn from(tender_type: TenderType) -> Self {
        Self {
            id: tender_type.id,
            name: tender_type.name,
            code: tender_type.code,
            description: tender_type.description,
            classification_keywords: tender_type.classification_keywords,
            is_default: tender_type.is_default,
        }
    }
}

pub async fn list_types(State(state): State<AppState>) -> AppResult<Json<Vec<TypeSummary>>> {
    let mut conn = state.db()?;
    let rows: Vec<TenderType> = tender_types::table
        .order(tender_types::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(TypeSummary::from).collect()))
}

#[derive(Deserialize)]
pub struct CreateTypeRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub classification_keywords: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn create_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateTypeRequest>,
) -> AppResult<Json<TypeSummary>> {
    let name = payload.name.trim();
    let code = payload.code.trim();
    if name.is_empty() || code.is_empty() {
        return Err(AppError::bad_request("name and code are required"));
    }

    let new_type = NewTenderType {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: code.to_string(),
        description: payload.description,
        classification_keywords: payload.classification_keywords,
        is_default: payload.is_default,
    };

    let mut conn = state.db()?;
    diesel::insert_into(tender_types::table)
        .values(&new_type)
        .execute(&mut conn)?;

    let created: TenderType = tender_types::table.find(new_type.id).first(&mut conn)?;
    Ok(Json(created.into()))
}
