pub mod publisher;
pub mod types;

pub use publisher::{EventPublisher, PublisherConfig};
pub use types::{EventEnvelope, EventType, PaymentEvent};
