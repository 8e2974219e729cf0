//! Domain layer: entities, the pricing engine and the payment state machine.
//!
//! Everything in here is synchronous and free of I/O. Services in
//! [`crate::service`] load entities through the datastore, call into these
//! types to decide, and write the result back.

pub mod event;
pub mod ids;
pub mod participant;
pub mod payment_config;
pub mod payment_status;
pub mod pricing;

pub use event::{Event, Organizer};
pub use ids::{EventId, OrganizerId, ParticipantId, PaymentConfigId, PaymentStatusId};
pub use participant::Participant;
pub use payment_config::{
    BankAccount, PaymentConfig, PaymentMethod, PaypayCredentials, ProviderSettings,
};
pub use payment_status::{
    ChargeSnapshot, IssuedCharge, PaymentAttempt, PaymentState, PaymentStatus, ProviderOutcome,
    StatusEdit, Transition,
};
pub use pricing::{Condition, ConditionKind, ConditionOption, Selection, Selections, compute_total};
