//! # paylink-gateway
//!
//! Payment collection service for event organizers.
//!
//! Organizers publish an event with a base amount and priced conditions;
//! participants verify their email, pick conditions and a payment method,
//! and receive payment instructions. Provider charges are created
//! idempotently and settled through webhooks, and every payment row moves
//! through a small state machine in which `PAID` is terminal.
//!
//! ## Architecture
//!
//! ```text
//! Clients (payment page, organizer dashboard, provider webhooks)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── PaymentService / AuthService / OrganizerService (service/)
//!     ├── StatusMachine (service/)
//!     │
//!     ├── Pricing, PaymentStatus transitions (domain/)
//!     │
//!     ├── PaymentProvider (provider/)   Mailer (notify/)
//!     │
//!     └── PaymentStore: PostgreSQL or in-memory (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod provider;
pub mod service;
