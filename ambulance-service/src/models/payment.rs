use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{merge_field, Document};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub insurance: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub procedure_id: String,
}

impl Payment {
    /// Field referencing the procedure a payment settles.
    pub const PROCEDURE_FIELD: &'static str = "procedureId";
}

impl Document for Payment {
    const KIND: &'static str = "payment";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, incoming: Self) {
        merge_field(&mut self.insurance, incoming.insurance);
        merge_field(&mut self.amount, incoming.amount);
        merge_field(&mut self.timestamp, incoming.timestamp);
        merge_field(&mut self.procedure_id, incoming.procedure_id);
    }
}
