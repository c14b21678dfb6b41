//! Tag model.

use super::{TagId, UserId};
use serde::{Deserialize, Serialize};

/// Tag names are unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub user_id: UserId,
    pub name: String,
}

/// Tag list entry with the number of notes carrying the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    pub note_count: u32,
}
