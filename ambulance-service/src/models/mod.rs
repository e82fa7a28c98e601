pub mod ambulance;
pub mod document;
pub mod payment;
pub mod procedure;

pub use ambulance::{Ambulance, AmbulanceSummary};
pub use document::{merge_field, Document};
pub use payment::Payment;
pub use procedure::Procedure;
