pub mod payment;
pub mod state_machine;

pub use payment::{
    generate_reference, NewPayment, PaymentKind, PaymentRecord, PaymentStatistics, PaymentStatus,
    StatusMetadata, StatusTransition,
};
pub use state_machine::PaymentStateMachine;
