//! Data Transfer Objects for REST request/response serialization.
//!
//! Amounts are integers in the smallest currency unit (JPY has no minor
//! unit). Provider secrets never appear in any response type.

pub mod common_dto;
pub mod config_dto;
pub mod organizer_dto;
pub mod pay_dto;
pub mod webhook_dto;

pub use common_dto::*;
pub use config_dto::*;
pub use organizer_dto::*;
pub use pay_dto::*;
pub use webhook_dto::*;
