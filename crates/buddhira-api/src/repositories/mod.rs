//! Database repositories.
//!
//! All persistence goes through the hosted Postgres behind a `PgPool`.
//! Every query is parameterized and scoped by the owning `user_id`; the
//! schema (items, tags, item_tags) is managed in the hosted project.

mod item_tags;
mod items;
mod tags;

pub use item_tags::ItemTagsRepository;
pub use items::{ItemChanges, ItemsRepository, NewItem};
pub use tags::{TagWithCountRow, TagsRepository};
