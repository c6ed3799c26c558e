//! Domain types and pure transformations for tasklane.

/// Time source abstraction.
pub mod clock;
/// Date rendering helpers.
pub mod display;
/// Task filters and text search.
pub mod filter;
/// Task groups.
pub mod group;
/// Identifier types.
pub mod id;
/// Priority codec.
pub mod priority;
/// Wire and internal task forms.
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use display::format_date_display;
pub use filter::{TaskFilter, TextMatcher};
pub use group::{
    DEFAULT_COLORS, Group, GroupInput, GroupValidationError, default_group, seed_groups,
};
pub use id::{GroupId, TaskId};
pub use priority::Tier;
pub use task::{
    Task, TaskDraft, TaskPatch, TaskValidationError, WireTask, sort_newest_first, to_internal,
    to_wire,
};
