//! Category domain model.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned category identifier. `0` marks an unsaved category.
pub type CategoryId = i64;

/// Named, emoji-tagged grouping label for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Short glyph shown next to the name.
    pub emoji: String,
}

/// Write-side validation errors for categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    BlankName,
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "category name must not be blank"),
        }
    }
}

impl Error for CategoryValidationError {}

impl Category {
    /// Creates an unsaved category.
    pub fn new(name: impl Into<String>, emoji: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            emoji: emoji.into(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::BlankName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryValidationError};

    #[test]
    fn new_category_is_unsaved() {
        let category = Category::new("Work", "💼");
        assert_eq!(category.id, 0);
        assert!(!category.is_persisted());
    }

    #[test]
    fn blank_name_is_rejected() {
        let category = Category::new("   ", "📁");
        assert_eq!(
            category.validate(),
            Err(CategoryValidationError::BlankName)
        );
    }
}
