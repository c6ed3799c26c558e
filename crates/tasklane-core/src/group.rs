//! Task groups: named, coloured buckets that tasks reference by id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::GroupId;

/// Maximum group name length, counted in characters after trimming.
pub const MAX_GROUP_NAME_CHARS: usize = 50;

/// Palette offered when creating or editing a group. The first entry is the default.
pub const DEFAULT_COLORS: [&str; 16] = [
    "#4cd484", "#ff4d4f", "#ffa500", "#1976d2", "#9c27b0", "#009688", "#795548", "#607d8b",
    "#e91e63", "#3f51b5", "#00bcd4", "#8bc34a", "#ffc107", "#ff5722", "#2ecc71", "#1abc9c",
];

/// A user-defined task group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Registry-assigned id, never reused.
    pub id: GroupId,
    /// Display name, 1 to 50 characters.
    pub name: String,
    /// Hex colour code, `#` followed by 3-8 hex digits.
    pub color: String,
}

/// First seed group, used whenever a selection has nothing else to point at.
#[must_use]
pub fn default_group() -> Group {
    Group {
        id: GroupId(0),
        name: "Personal tasks".to_owned(),
        color: DEFAULT_COLORS[0].to_owned(),
    }
}

/// The predefined groups that form the floor of the registry.
#[must_use]
pub fn seed_groups() -> Vec<Group> {
    [
        (0, "Personal tasks", "#4cd484"),
        (1, "Work tasks", "#ff4d4f"),
        (2, "Study tasks", "#ffa500"),
    ]
    .into_iter()
    .map(|(id, name, color)| Group {
        id: GroupId(id),
        name: name.to_owned(),
        color: color.to_owned(),
    })
    .collect()
}

/// Rejected group input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupValidationError {
    /// Name is blank after trimming.
    #[error("group name is required")]
    EmptyName,
    /// Name exceeds the character limit.
    #[error("group name must be at most {max} characters (got {len})", max = MAX_GROUP_NAME_CHARS)]
    NameTooLong {
        /// Length of the trimmed name in characters.
        len: usize,
    },
    /// Colour is not a hex code.
    #[error("invalid color '{0}': expected '#' followed by 3-8 hex digits")]
    InvalidColor(String),
}

/// Mutable fields of a group as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInput {
    /// Name as typed; trimmed on validation.
    pub name: String,
    /// Hex colour code.
    pub color: String,
}

impl GroupInput {
    /// Build an input from raw values.
    #[must_use]
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    /// Validate and normalize the input, trimming the name.
    ///
    /// # Errors
    /// Returns an error when the trimmed name is empty or too long, or the colour is malformed.
    pub fn validate(self) -> Result<Self, GroupValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(GroupValidationError::EmptyName);
        }
        let len = name.chars().count();
        if len > MAX_GROUP_NAME_CHARS {
            return Err(GroupValidationError::NameTooLong { len });
        }
        if !is_hex_color(&self.color) {
            return Err(GroupValidationError::InvalidColor(self.color));
        }
        Ok(Self {
            name: name.to_owned(),
            color: self.color,
        })
    }
}

fn is_hex_color(raw: &str) -> bool {
    raw.strip_prefix('#').is_some_and(|digits| {
        (3..=8).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_hexdigit())
    })
}
