//! HTTP request handlers.

mod health;
mod item_tags;
mod items;
mod me;
mod tags;

pub use health::{health_check, root};
pub use item_tags::{attach_tag, detach_tag, list_item_tags};
pub use items::{create_item, delete_item, get_item, list_items, update_item};
pub use me::get_me;
pub use tags::{create_tag, delete_tag, list_tags, update_tag};

use crate::auth::AuthError;
use crate::errors::ApiError;
use uuid::Uuid;

/// Parse the principal's subject into the UUID used as the row-ownership
/// key. The provider issues UUID subjects; anything else is a token the
/// service cannot act on.
pub(crate) fn parse_user_id(sub: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(sub).map_err(|_| {
        tracing::warn!(
            target: "buddhira.handlers",
            "Token subject is not a valid user identifier"
        );
        ApiError::Auth(AuthError::InvalidToken)
    })
}

/// Parse a path id, surfacing a uniform 400 body instead of the framework
/// rejection.
pub(crate) fn parse_path_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what} id")))
}
