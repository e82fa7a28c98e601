use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use mongodb::bson::Bson;
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::Payment;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub procedure_id: Option<String>,
}

/// All payments, or only those settling `?procedureId=`.
pub async fn list_payments(
    State(state): State<AppState>,
    query: Result<Query<PaymentQuery>, QueryRejection>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let Query(query) = query?;

    let payments = match query.procedure_id.filter(|id| !id.is_empty()) {
        Some(procedure_id) => {
            state
                .payments
                .find_documents_by_field(Payment::PROCEDURE_FIELD, Bson::String(procedure_id))
                .await?
        }
        None => state.payments.list_documents().await?,
    };

    Ok(Json(payments))
}
