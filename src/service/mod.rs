//! Service layer: business logic orchestration.
//!
//! [`PaymentService`] reconciles submissions with the payment provider,
//! [`AuthService`] runs the email verification gate, [`OrganizerService`]
//! covers the organizer surface, and all of them drive payment rows
//! through the shared [`StatusMachine`].

pub mod auth_service;
pub mod notifications;
pub mod organizer_service;
pub mod payment_service;
pub mod status_machine;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_service::{AuthService, VerificationRequest, Verified};
pub use notifications::Notifier;
pub use organizer_service::{
    EventChanges, EventDraft, OrganizerService, ParticipantRegistration, PaymentBoardEntry,
};
pub use payment_service::{
    ParticipantPayment, PaymentInstructions, PaymentReceipt, PaymentService, PaymentSubmission,
};
pub use status_machine::StatusMachine;
