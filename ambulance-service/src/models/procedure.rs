use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{merge_field, Document};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Procedure {
    pub id: String,
    pub patient: String,
    pub visit_type: String,
    pub price: f64,
    pub payer: String,
    pub ambulance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Procedure {
    /// Field referencing the ambulance that performed the procedure.
    pub const AMBULANCE_FIELD: &'static str = "ambulanceId";
}

impl Document for Procedure {
    const KIND: &'static str = "procedure";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, incoming: Self) {
        merge_field(&mut self.patient, incoming.patient);
        merge_field(&mut self.visit_type, incoming.visit_type);
        merge_field(&mut self.price, incoming.price);
        merge_field(&mut self.payer, incoming.payer);
        merge_field(&mut self.ambulance_id, incoming.ambulance_id);
        merge_field(&mut self.timestamp, incoming.timestamp);
    }
}
