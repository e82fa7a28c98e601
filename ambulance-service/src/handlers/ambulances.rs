use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use mongodb::bson::Bson;
use service_core::error::AppError;

use super::merge::{apply_to_document, Merge};
use crate::models::{Ambulance, AmbulanceSummary, Procedure};
use crate::AppState;

/// Number and total price of the procedures an ambulance performed.
pub async fn ambulance_summary(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
) -> Result<Merge<Ambulance>, AppError> {
    let procedures = state.procedures.clone();

    apply_to_document(state.ambulances.as_ref(), &ambulance_id, |ambulance| async move {
        let performed = procedures
            .find_documents_by_field(Procedure::AMBULANCE_FIELD, Bson::String(ambulance.id.clone()))
            .await?;

        let summary = AmbulanceSummary {
            procedure_count: performed.len(),
            total_cost: performed.iter().map(|p| p.price).sum(),
            ambulance_id: ambulance.id,
        };

        tracing::debug!(
            ambulance_id = %summary.ambulance_id,
            procedures = summary.procedure_count,
            "Built ambulance summary"
        );
        Merge::read(StatusCode::OK, &summary)
    })
    .await
}
