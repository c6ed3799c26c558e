//! Task representations exchanged with the backend and used inside the application.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::clock::iso_timestamp;
use crate::id::{GroupId, TaskId};
use crate::priority::Tier;

/// Highest numeric priority accepted by the backend.
pub const MAX_PRIORITY: u8 = 100;

/// Task as exchanged with the remote API (numeric priority).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTask {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Short summary shown in lists.
    #[serde(default)]
    pub title: String,
    /// Longer free-form notes.
    #[serde(default)]
    pub description: String,
    /// Start date as entered, `YYYY-MM-DD` or RFC 3339; empty when unset.
    #[serde(default)]
    pub start_date: String,
    /// Due date, same format as `start_date`.
    #[serde(default)]
    pub end_date: String,
    /// Free-text tags.
    #[serde(default)]
    pub tags: String,
    /// Numeric priority in `0..=100`.
    #[serde(default)]
    pub priority: u8,
    /// Whether the task is done.
    #[serde(default)]
    pub completed: bool,
    /// Creation timestamp; may be absent on writes.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Group the task belongs to.
    #[serde(default)]
    pub group_id: GroupId,
}

/// Task as used by the application: tier plus the retained numeric priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Short summary shown in lists.
    pub title: String,
    /// Longer free-form notes.
    pub description: String,
    /// Start date as received; empty when unset.
    pub start_date: String,
    /// Due date as received; empty when unset.
    pub end_date: String,
    /// Free-text tags.
    pub tags: String,
    /// Tier derived from [`priority_number`](Self::priority_number).
    pub priority: Tier,
    /// Original 0-100 value, kept for round-tripping.
    #[serde(rename = "priorityNumber")]
    pub priority_number: u8,
    /// Whether the task is done.
    pub completed: bool,
    /// Creation timestamp; never empty.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// Group the task belongs to.
    pub group_id: GroupId,
}

impl Task {
    /// Parsed creation instant, if the stored timestamp is RFC 3339.
    #[must_use]
    pub fn created_instant(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.created_at, &Rfc3339).ok()
    }
}

/// Convert a wire task into its internal form.
///
/// A missing or empty `createdAt` is filled with `now`.
#[must_use]
pub fn to_internal(wire: WireTask, now: OffsetDateTime) -> Task {
    let created_at = wire
        .created_at
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| iso_timestamp(now));
    Task {
        id: wire.id,
        title: wire.title,
        description: wire.description,
        start_date: wire.start_date,
        end_date: wire.end_date,
        tags: wire.tags,
        priority: Tier::from_number(wire.priority),
        priority_number: wire.priority,
        completed: wire.completed,
        created_at,
        group_id: wire.group_id,
    }
}

/// Convert an internal task back to wire form, dropping the tier.
#[must_use]
pub fn to_wire(task: Task) -> WireTask {
    WireTask {
        id: task.id,
        title: task.title,
        description: task.description,
        start_date: task.start_date,
        end_date: task.end_date,
        tags: task.tags,
        priority: task.priority_number,
        completed: task.completed,
        created_at: Some(task.created_at),
        group_id: task.group_id,
    }
}

/// Sort newest first by `createdAt`.
///
/// The sort is stable; tasks whose timestamp does not parse keep their relative
/// order and sink below every parsed timestamp.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by_cached_key(|task| std::cmp::Reverse(SortStamp(task.created_instant())));
}

#[derive(PartialEq, Eq)]
struct SortStamp(Option<OffsetDateTime>);

impl Ord for SortStamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for SortStamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Rejected task input, detected before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    /// Title is blank after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// Numeric priority above 100.
    #[error("priority {0} is outside 0..=100")]
    PriorityOutOfRange(u8),
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Required title.
    pub title: String,
    /// Longer notes.
    pub description: String,
    /// Start date; empty when unset.
    pub start_date: String,
    /// Due date; empty when unset.
    pub end_date: String,
    /// Free-text tags.
    pub tags: String,
    /// Numeric priority in `0..=100`.
    pub priority: u8,
    /// Initial completion flag.
    pub completed: bool,
    /// Creation timestamp; the backend fills it when absent.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Target group.
    pub group_id: GroupId,
}

impl TaskDraft {
    /// Minimal draft with a title in the given group; other fields empty, priority medium.
    #[must_use]
    pub fn new(title: impl Into<String>, group_id: GroupId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            tags: String::new(),
            priority: Tier::Medium.to_number(),
            completed: false,
            created_at: None,
            group_id,
        }
    }

    /// Set the numeric priority from a tier midpoint.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.priority = tier.to_number();
        self
    }

    /// Check the draft before sending it.
    ///
    /// # Errors
    /// Returns an error for a blank title or an out-of-range priority.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        check_priority(self.priority)
    }
}

/// Partial update; only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// New due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// New tags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    /// New numeric priority in `0..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// Move the task to another group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
}

impl TaskPatch {
    /// Patch that only flips the completion flag.
    #[must_use]
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Set the numeric priority from a tier midpoint.
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.priority = Some(tier.to_number());
        self
    }

    /// True when the patch carries no fields.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.group_id.is_none()
    }

    /// Check the patch before sending it.
    ///
    /// # Errors
    /// Returns an error when the patch blanks the title or carries an out-of-range priority.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TaskValidationError::EmptyTitle);
        }
        self.priority.map_or(Ok(()), check_priority)
    }
}

const fn check_priority(priority: u8) -> Result<(), TaskValidationError> {
    if priority > MAX_PRIORITY {
        Err(TaskValidationError::PriorityOutOfRange(priority))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn wire(id: &str, priority: u8, created_at: Option<&str>) -> WireTask {
        WireTask {
            id: TaskId::new(id),
            title: format!("task {id}"),
            description: "details".into(),
            start_date: "2024-03-01".into(),
            end_date: "2024-03-02".into(),
            tags: "home".into(),
            priority,
            completed: false,
            created_at: created_at.map(str::to_owned),
            group_id: GroupId(1),
        }
    }

    fn internal(id: &str, created_at: &str) -> Task {
        to_internal(wire(id, 50, Some(created_at)), OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn low_priority_round_trips_through_transform() {
        let task = to_internal(
            wire("1", 20, Some("2024-01-01T00:00:00.000Z")),
            OffsetDateTime::UNIX_EPOCH,
        );
        assert_eq!(task.priority, Tier::Low);
        assert_eq!(task.priority_number, 20);
        assert_eq!(to_wire(task).priority, 20);
    }

    #[test]
    fn round_trip_preserves_every_field_when_created_at_present() {
        let original = wire("9", 70, Some("2024-02-03T04:05:06.000Z"));
        let back = to_wire(to_internal(original.clone(), OffsetDateTime::UNIX_EPOCH));
        assert_eq!(back, original);
    }

    #[test]
    fn missing_created_at_is_filled_with_now() {
        let now = datetime!(2024-06-01 10:00 UTC);
        let task = to_internal(wire("2", 90, None), now);
        assert_eq!(task.created_at, "2024-06-01T10:00:00.000Z");
        assert_eq!(task.priority, Tier::High);

        let empty = to_internal(wire("3", 90, Some("")), now);
        assert_eq!(empty.created_at, "2024-06-01T10:00:00.000Z");
    }

    #[test]
    fn wire_json_uses_backend_field_names() {
        let json = r##"{
            "id": "5",
            "title": "Buy milk",
            "description": "",
            "start_date": "2024-01-01",
            "end_date": "2024-01-02",
            "tags": "shopping",
            "priority": 40,
            "completed": true,
            "createdAt": "2024-01-01T08:00:00.000Z",
            "group_id": 2
        }"##;
        let parsed: WireTask = serde_json::from_str(json).expect("parse wire task");
        assert_eq!(parsed.group_id, GroupId(2));
        assert_eq!(parsed.created_at.as_deref(), Some("2024-01-01T08:00:00.000Z"));

        let task = to_internal(parsed, OffsetDateTime::UNIX_EPOCH);
        let value = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(value["priority"], "medium");
        assert_eq!(value["priorityNumber"], 40);
    }

    #[test]
    fn sorts_newest_first() {
        let mut tasks = vec![
            internal("t1", "2024-01-01T00:00:00.000Z"),
            internal("t3", "2024-01-03T00:00:00.000Z"),
            internal("t2", "2024-01-02T00:00:00.000Z"),
        ];
        sort_newest_first(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn unparseable_timestamps_sink_and_stay_stable() {
        let mut tasks = vec![
            internal("bad-a", "yesterday"),
            internal("good", "2024-01-01T00:00:00.000Z"),
            internal("bad-b", "last week"),
        ];
        sort_newest_first(&mut tasks);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["good", "bad-a", "bad-b"]);
    }

    #[test]
    fn draft_validation() {
        let draft = TaskDraft::new("  ", GroupId(0));
        assert_eq!(draft.validate(), Err(TaskValidationError::EmptyTitle));

        let mut draft = TaskDraft::new("Write report", GroupId(0)).with_tier(Tier::High);
        assert_eq!(draft.priority, 83);
        assert!(draft.validate().is_ok());

        draft.priority = 101;
        assert_eq!(
            draft.validate(),
            Err(TaskValidationError::PriorityOutOfRange(101))
        );
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch::completion(true);
        let json = serde_json::to_string(&patch).expect("serialize patch");
        assert_eq!(json, r#"{"completed":true}"#);
        assert!(!patch.is_empty());
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn patch_rejects_blank_title() {
        let patch = TaskPatch {
            title: Some(" ".into()),
            ..TaskPatch::default()
        };
        assert_eq!(patch.validate(), Err(TaskValidationError::EmptyTitle));
        assert!(TaskPatch::default().tier(Tier::Low).validate().is_ok());
    }
}
