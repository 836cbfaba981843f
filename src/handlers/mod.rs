// src/handlers/mod.rs

use serde::Deserialize;

use crate::{error::AppError, services::Page, utils::jwt::Claims};

pub mod results;
pub mod sessions;

/// `?limit&offset` for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<Pagination> for Page {
    fn from(params: Pagination) -> Self {
        Page::new(params.limit, params.offset)
    }
}

/// Read access: the owner, or any staff member.
fn ensure_can_view(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.is_staff() || claims.user_id()? == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not your session".to_string()))
    }
}

/// Write access: the owner only.
fn ensure_owner(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.user_id()? == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not your session".to_string()))
    }
}
