//! Repository error types
//!
//! Every failure raised by the query core is a [`RepositoryError`]: a kind,
//! the operation that was running, and whatever context was known at the time
//! (entity, offending field, specification summary, underlying source).
//!
//! Absence is not an error. Lookups that find nothing return `Ok(None)`;
//! [`RepositoryErrorKind::NotFound`] is reserved for writes that target a
//! missing entity when a unit of work commits.
//!
//! # Example
//!
//! ```rust
//! use acton_query::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
//!
//! let error = RepositoryError::invalid_argument(
//!     RepositoryOperation::BuildSpecification,
//!     "page_size",
//!     "must be a positive integer",
//! );
//! assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
//! assert_eq!(error.field.as_deref(), Some("page_size"));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Looking up a single entity by ID
    GetById,
    /// Checking if an entity exists
    Exists,
    /// Listing every entity without a filter
    ListAll,
    /// Evaluating a specification
    FindBySpecification,
    /// Counting entities matching a specification
    CountBySpecification,
    /// Evaluating a specification together with its unpaged total
    FindPage,
    /// Staging a new entity
    Add,
    /// Staging a replacement of an existing entity
    Update,
    /// Staging a removal
    Delete,
    /// Committing staged changes
    SaveChanges,
    /// Attaching related data to a result set
    Include,
    /// Assembling a hierarchy from minimal nodes
    BuildTree,
    /// Validating parameters while building a specification
    BuildSpecification,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetById => write!(f, "get_by_id"),
            Self::Exists => write!(f, "exists"),
            Self::ListAll => write!(f, "list_all"),
            Self::FindBySpecification => write!(f, "find_by_specification"),
            Self::CountBySpecification => write!(f, "count_by_specification"),
            Self::FindPage => write!(f, "find_page"),
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::SaveChanges => write!(f, "save_changes"),
            Self::Include => write!(f, "include"),
            Self::BuildTree => write!(f, "build_tree"),
            Self::BuildSpecification => write!(f, "build_specification"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Caller supplied a parameter that can never succeed
    InvalidArgument,
    /// A staged write targets an entity that does not exist
    NotFound,
    /// A staged add collides with an existing entity
    AlreadyExists,
    /// The caller cancelled the operation
    Cancelled,
    /// Parent links loop back onto an ancestor
    CycleDetected,
    /// Hierarchy is deeper than the configured limit
    DepthExceeded,
    /// The data source failed
    Unexpected,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::CycleDetected => write!(f, "cycle_detected"),
            Self::DepthExceeded => write!(f, "depth_exceeded"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use acton_query::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::unexpected(RepositoryOperation::FindBySpecification, "connection reset")
///     .with_specification("Product{filter, order=price desc}");
/// assert!(error.to_string().contains("find_by_specification"));
/// assert!(error.to_string().contains("Product{filter, order=price desc}"));
/// ```
#[derive(Debug, Clone)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Product", "Category")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
    /// The caller-supplied parameter that was rejected
    pub field: Option<String>,
    /// Summary of the specification being evaluated
    pub specification: Option<String>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            field: None,
            specification: None,
            source: None,
        }
    }

    /// Reject a caller-supplied parameter
    pub fn invalid_argument(
        operation: RepositoryOperation,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(operation, RepositoryErrorKind::InvalidArgument, message);
        error.field = Some(field.into());
        error
    }

    /// A staged write targets a missing entity
    pub fn not_found(
        operation: RepositoryOperation,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::NotFound, "Entity not found")
            .with_entity(entity_type, entity_id)
    }

    /// A staged add collides with an existing entity
    pub fn already_exists(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::SaveChanges,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, entity_id)
    }

    /// The caller's cancellation token fired
    pub fn cancelled(operation: RepositoryOperation) -> Self {
        Self::new(
            operation,
            RepositoryErrorKind::Cancelled,
            "Operation cancelled",
        )
    }

    /// Wrap a data source failure described only by a message
    pub fn unexpected(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Unexpected, message)
    }

    /// Wrap a data source failure, keeping it as the error source
    pub fn from_source<E>(operation: RepositoryOperation, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut error = Self::unexpected(operation, source.to_string());
        error.source = Some(Arc::new(source));
        error
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Attach the summary of the specification being evaluated
    #[must_use]
    pub fn with_specification(mut self, specification: impl Into<String>) -> Self {
        self.specification = Some(specification.into());
        self
    }

    /// Attach the entity type when the error does not carry one yet
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        if self.entity_type.is_none() {
            self.entity_type = Some(entity_type.into());
        }
        self
    }

    /// Fill in operation and specification context on the way out of the repository
    ///
    /// Context that is already present is left alone, so an error wrapped
    /// deeper in the stack keeps its original operation.
    #[must_use]
    pub(crate) fn within(
        mut self,
        operation: RepositoryOperation,
        specification: Option<&str>,
    ) -> Self {
        if self.specification.is_none() {
            self.specification = specification.map(str::to_string);
        }
        if self.kind == RepositoryErrorKind::Unexpected && self.operation != operation {
            self.message = format!("{} (while running {})", self.message, self.operation);
            self.operation = operation;
        }
        self
    }

    /// Whether the caller's cancellation token caused this error
    pub fn is_cancelled(&self) -> bool {
        self.kind == RepositoryErrorKind::Cancelled
    }

    /// Text that is safe to show to an end user
    ///
    /// Invalid arguments name the offending field, absence reads as absence,
    /// and unexpected failures never leak internal detail.
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_query::repository::{RepositoryError, RepositoryOperation};
    ///
    /// let error = RepositoryError::unexpected(RepositoryOperation::ListAll, "pool exhausted on db-3");
    /// assert_eq!(error.user_message(), "The request could not be completed");
    /// ```
    pub fn user_message(&self) -> String {
        match self.kind {
            RepositoryErrorKind::InvalidArgument => match &self.field {
                Some(field) => format!("Invalid value for '{}': {}", field, self.message),
                None => format!("Invalid request: {}", self.message),
            },
            RepositoryErrorKind::NotFound => match &self.entity_type {
                Some(entity_type) => format!("{} not found", entity_type),
                None => "Not found".to_string(),
            },
            RepositoryErrorKind::AlreadyExists => match &self.entity_type {
                Some(entity_type) => format!("{} already exists", entity_type),
                None => "Already exists".to_string(),
            },
            RepositoryErrorKind::Cancelled => "The request was cancelled".to_string(),
            RepositoryErrorKind::CycleDetected | RepositoryErrorKind::DepthExceeded => {
                "The hierarchy could not be assembled".to_string()
            }
            RepositoryErrorKind::Unexpected => "The request could not be completed".to_string(),
        }
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        if let Some(ref field) = self.field {
            write!(f, " (field: {})", field)?;
        }
        if let Some(ref specification) = self.specification {
            write!(f, " (specification: {})", specification)?;
        }
        Ok(())
    }
}

impl StdError for RepositoryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display() {
        assert_eq!(RepositoryOperation::GetById.to_string(), "get_by_id");
        assert_eq!(
            RepositoryOperation::CountBySpecification.to_string(),
            "count_by_specification"
        );
        assert_eq!(RepositoryOperation::SaveChanges.to_string(), "save_changes");
        assert_eq!(RepositoryOperation::BuildTree.to_string(), "build_tree");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(
            RepositoryErrorKind::InvalidArgument.to_string(),
            "invalid_argument"
        );
        assert_eq!(
            RepositoryErrorKind::CycleDetected.to_string(),
            "cycle_detected"
        );
        assert_eq!(RepositoryErrorKind::Unexpected.to_string(), "unexpected");
    }

    #[test]
    fn test_invalid_argument_names_field() {
        let error = RepositoryError::invalid_argument(
            RepositoryOperation::BuildSpecification,
            "sort",
            "unknown sort field 'colour'",
        );
        assert_eq!(error.kind, RepositoryErrorKind::InvalidArgument);
        assert_eq!(
            error.to_string(),
            "Repository invalid_argument error during build_specification: unknown sort field 'colour' (field: sort)"
        );
        assert_eq!(
            error.user_message(),
            "Invalid value for 'sort': unknown sort field 'colour'"
        );
    }

    #[test]
    fn test_not_found_display() {
        let error = RepositoryError::not_found(RepositoryOperation::SaveChanges, "Product", "42");
        assert_eq!(
            error.to_string(),
            "Repository not_found error during save_changes: Entity not found [Product: 42]"
        );
        assert_eq!(error.user_message(), "Product not found");
    }

    #[test]
    fn test_already_exists() {
        let error = RepositoryError::already_exists("Category", "7");
        assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(error.operation, RepositoryOperation::SaveChanges);
        assert_eq!(error.entity_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_from_source_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = RepositoryError::from_source(RepositoryOperation::ListAll, io);
        assert_eq!(error.kind, RepositoryErrorKind::Unexpected);
        assert_eq!(error.message, "reset by peer");
        let source = error.source().expect("source should be kept");
        assert_eq!(source.to_string(), "reset by peer");
    }

    #[test]
    fn test_within_fills_missing_context_only() {
        let operation = RepositoryOperation::FindBySpecification;
        let error = RepositoryError::unexpected(operation, "boom");
        let error = error.within(operation, Some("Product{all}"));
        assert_eq!(error.specification.as_deref(), Some("Product{all}"));
        assert_eq!(error.message, "boom");

        let error = error.within(RepositoryOperation::FindPage, Some("other"));
        assert_eq!(error.specification.as_deref(), Some("Product{all}"));
        assert_eq!(error.operation, RepositoryOperation::FindPage);
        assert_eq!(error.message, "boom (while running find_by_specification)");
    }

    #[test]
    fn test_within_keeps_invalid_argument_operation() {
        let error = RepositoryError::invalid_argument(
            RepositoryOperation::Include,
            "include",
            "unsupported include path",
        )
        .within(RepositoryOperation::FindBySpecification, None);
        assert_eq!(error.operation, RepositoryOperation::Include);
    }

    #[test]
    fn test_unexpected_user_message_hides_detail() {
        let operation = RepositoryOperation::GetById;
        let error = RepositoryError::unexpected(operation, "socket 10.0.0.3 closed");
        assert!(!error.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_cancelled() {
        let error = RepositoryError::cancelled(RepositoryOperation::BuildTree);
        assert!(error.is_cancelled());
        assert_eq!(error.user_message(), "The request was cancelled");
    }

    #[test]
    fn test_with_entity_type_does_not_overwrite() {
        let error = RepositoryError::unexpected(RepositoryOperation::ListAll, "x")
            .with_entity_type("Product")
            .with_entity_type("Category");
        assert_eq!(error.entity_type.as_deref(), Some("Product"));
    }
}
