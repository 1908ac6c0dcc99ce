//! Data Transfer Objects for REST request/response serialization.

pub mod common_dto;
pub mod earthquake_dto;
pub mod risk_dto;

pub use common_dto::*;
pub use earthquake_dto::*;
pub use risk_dto::*;
