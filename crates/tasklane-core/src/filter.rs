//! Task filtering used by list and search views.

use std::collections::BTreeSet;

use crate::id::GroupId;
use crate::priority::Tier;
use crate::task::Task;

/// Case-insensitive substring matcher over the textual fields of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatcher {
    needle: String,
}

impl TextMatcher {
    /// Normalize a query string into a matcher. Returns `None` for blank inputs.
    #[must_use]
    pub fn new(query: &str) -> Option<Self> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            needle: trimmed.to_lowercase(),
        })
    }

    /// Whether the title, description or tags contain the query.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.matches_field(&task.title)
            || self.matches_field(&task.description)
            || self.matches_field(&task.tags)
    }

    fn matches_field(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.needle)
    }
}

/// Conjunction of optional task predicates. The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks in this group.
    pub group: Option<GroupId>,
    /// Only tasks with this completion state.
    pub completed: Option<bool>,
    /// Only tasks in one of these tiers (empty = any tier).
    pub tiers: BTreeSet<Tier>,
    /// Free-text search.
    pub text: Option<TextMatcher>,
}

impl TaskFilter {
    /// Restrict to a group.
    #[must_use]
    pub fn in_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    /// Restrict by completion state.
    #[must_use]
    pub fn with_completed(mut self, completed: Option<bool>) -> Self {
        self.completed = completed;
        self
    }

    /// Add accepted tiers.
    #[must_use]
    pub fn with_tiers(mut self, tiers: impl IntoIterator<Item = Tier>) -> Self {
        self.tiers.extend(tiers);
        self
    }

    /// Configure the search text (blank queries are ignored).
    #[must_use]
    pub fn with_text(mut self, query: Option<&str>) -> Self {
        self.text = query.and_then(TextMatcher::new);
        self
    }

    /// True when no predicate is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group.is_none() && self.completed.is_none() && self.tiers.is_empty() && self.text.is_none()
    }

    /// Evaluate the filter against a task.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.group.is_some_and(|group| group != task.group_id) {
            return false;
        }
        if self.completed.is_some_and(|completed| completed != task.completed) {
            return false;
        }
        if !self.tiers.is_empty() && !self.tiers.contains(&task.priority) {
            return false;
        }
        self.text.as_ref().is_none_or(|matcher| matcher.matches(task))
    }

    /// Keep matching tasks, preserving order.
    #[must_use]
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        if self.is_empty() {
            return tasks;
        }
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}
