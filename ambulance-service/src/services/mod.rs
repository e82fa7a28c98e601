pub mod connection;
pub mod events;
pub mod memory_store;
pub mod metrics;
pub mod mongo_store;
pub mod store;

pub use connection::{ConnectionManager, ConnectionStatus, Connector, MongoConnector};
pub use events::{EventNotifier, EventPublisher, LogPublisher, PublishError, RestProxyPublisher};
pub use memory_store::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use mongo_store::MongoStore;
pub use store::{DocumentStore, StoreError};
