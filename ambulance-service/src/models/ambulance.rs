use serde::{Deserialize, Serialize};

use super::document::{merge_field, Document};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Ambulance {
    pub id: String,
    pub name: String,
    pub location: String,
    pub driver_name: String,
    pub department: String,
    pub capacity: u32,
    pub status: String,
}

impl Document for Ambulance {
    const KIND: &'static str = "ambulance";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn merge(&mut self, incoming: Self) {
        merge_field(&mut self.name, incoming.name);
        merge_field(&mut self.location, incoming.location);
        merge_field(&mut self.driver_name, incoming.driver_name);
        merge_field(&mut self.department, incoming.department);
        merge_field(&mut self.capacity, incoming.capacity);
        merge_field(&mut self.status, incoming.status);
    }
}

/// Cost roll-up of the procedures performed by one ambulance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbulanceSummary {
    pub ambulance_id: String,
    pub procedure_count: usize,
    pub total_cost: f64,
}
