//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// Envelope for list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse<T> {
    /// Always `true` for successful responses.
    pub success: bool,
    /// Number of items in `data`.
    pub count: usize,
    /// The items.
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    /// Wraps `data` in a successful list envelope.
    #[must_use]
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Envelope for single-item responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataResponse<T> {
    /// Always `true` for successful responses.
    pub success: bool,
    /// The item.
    pub data: T,
}

impl<T> DataResponse<T> {
    /// Wraps `data` in a successful envelope.
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
