use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use mongodb::bson::Bson;
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::Procedure;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureQuery {
    pub ambulance_id: Option<String>,
}

/// All procedures, or only those performed by `?ambulanceId=`.
pub async fn list_procedures(
    State(state): State<AppState>,
    query: Result<Query<ProcedureQuery>, QueryRejection>,
) -> Result<Json<Vec<Procedure>>, AppError> {
    let Query(query) = query?;

    let procedures = match query.ambulance_id.filter(|id| !id.is_empty()) {
        Some(ambulance_id) => {
            state
                .procedures
                .find_documents_by_field(Procedure::AMBULANCE_FIELD, Bson::String(ambulance_id))
                .await?
        }
        None => state.procedures.list_documents().await?,
    };

    Ok(Json(procedures))
}
