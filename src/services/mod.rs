// src/services/mod.rs

use crate::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

pub mod result;
pub mod scoring;
pub mod session;
pub mod sweeper;

pub use result::ResultService;
pub use session::{SessionService, SubmittedSession};

/// Normalized limit/offset for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
