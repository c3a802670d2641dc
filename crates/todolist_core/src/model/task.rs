//! Task domain model.
//!
//! # Invariants
//! - Every task references exactly one category id; the category itself is
//!   resolved at read time and may be gone (`CategoryRef::Dangling`).
//! - Checklist order is significant and preserved through persistence.

use crate::model::category::{Category, CategoryId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned task identifier. `0` marks an unsaved task.
pub type TaskId = i64;

/// Task urgency, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Human-facing label. Not used for persistence.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// One line of a task checklist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChecklistItem {
    pub text: String,
    pub is_checked: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>, is_checked: bool) -> Self {
        Self {
            text: text.into(),
            is_checked,
        }
    }
}

/// The category a task is filed under, as resolved at read time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryRef {
    Resolved(Category),
    /// The referenced category was deleted after the task was saved.
    Dangling(CategoryId),
}

impl CategoryRef {
    pub fn id(&self) -> CategoryId {
        match self {
            Self::Resolved(category) => category.id,
            Self::Dangling(id) => *id,
        }
    }

    pub fn resolved(&self) -> Option<&Category> {
        match self {
            Self::Resolved(category) => Some(category),
            Self::Dangling(_) => None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self, Self::Dangling(_))
    }
}

impl From<Category> for CategoryRef {
    fn from(value: Category) -> Self {
        Self::Resolved(value)
    }
}

/// A user-created to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub is_completed: bool,
    pub priority: Priority,
    pub category: CategoryRef,
    pub checklist: Vec<ChecklistItem>,
}

/// Write-side validation errors for tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankTitle,
    /// The referenced category has never been saved.
    UnsavedCategory,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::UnsavedCategory => write!(f, "task category must be saved before the task"),
        }
    }
}

impl Error for TaskValidationError {}

impl Task {
    /// Creates an unsaved, active, low-priority task with an empty checklist.
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: None,
            is_completed: false,
            priority: Priority::default(),
            category: CategoryRef::Resolved(category),
            checklist: Vec::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn category_id(&self) -> CategoryId {
        self.category.id()
    }

    /// Copy of this task with only the completion flag replaced.
    pub fn with_completed(&self, is_completed: bool) -> Self {
        Self {
            is_completed,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        if self.category_id() == 0 {
            return Err(TaskValidationError::UnsavedCategory);
        }
        Ok(())
    }
}
