//! Cache tags: the join between queries and mutations.
//!
//! Queries *provide* tags describing the data they hold; mutations
//! *invalidate* tags describing the data they change. The cache marks every
//! entry whose provided tags intersect a mutation's invalidated set as stale.
//!
//! # Matching
//!
//! A tag is a type with an optional id. A provided `Course:42` satisfies an
//! invalidation for the bare `Course` (the whole type) or for `Course:42`
//! exactly — never for `Course:7`. A provided bare tag (a collection query
//! such as `Courses`) satisfies only a bare invalidation of the same type.
//! This lets a single-item edit invalidate the one-item query and the
//! collection query independently.
//!
//! ```
//! use lectern::tag::Tag;
//!
//! let provided = Tag::item("Course", "42");
//! assert!(provided.matches(&Tag::of("Course")));
//! assert!(provided.matches(&Tag::item("Course", "42")));
//! assert!(!provided.matches(&Tag::item("Course", "7")));
//!
//! let collection = Tag::of("Courses");
//! assert!(collection.matches(&Tag::of("Courses")));
//! assert!(!collection.matches(&Tag::item("Courses", "42")));
//! ```

use std::fmt;

/// A cache tag: a type name plus an optional instance id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    type_name: String,
    id: Option<String>,
}

impl Tag {
    /// Creates a bare tag covering a whole type (e.g. a collection).
    #[must_use]
    pub fn of(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
        }
    }

    /// Creates a tag for a single instance of a type.
    #[must_use]
    pub fn item(type_name: impl Into<String>, id: impl ToString) -> Self {
        Self {
            type_name: type_name.into(),
            id: Some(id.to_string()),
        }
    }

    /// The tag's type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The tag's instance id, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this *provided* tag satisfies the given *invalidation* tag.
    ///
    /// Matching is not symmetric: a bare invalidation covers every id of its
    /// type, but a bare provided tag is only covered by a bare invalidation.
    #[must_use]
    pub fn matches(&self, invalidation: &Tag) -> bool {
        if self.type_name != invalidation.type_name {
            return false;
        }
        match &invalidation.id {
            None => true,
            Some(wanted) => self.id.as_deref() == Some(wanted.as_str()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{id}", self.type_name),
            None => f.write_str(&self.type_name),
        }
    }
}

/// Whether any provided tag satisfies any invalidation tag.
#[must_use]
pub fn any_match(provided: &[Tag], invalidated: &[Tag]) -> bool {
    provided
        .iter()
        .any(|tag| invalidated.iter().any(|inv| tag.matches(inv)))
}
