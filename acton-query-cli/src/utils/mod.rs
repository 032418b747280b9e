use acton_query::error::{Error as QueryError, ErrorResponse};
use acton_query::repository::{RepositoryError, RepositoryErrorKind};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod format;

pub const EXIT_OK: i32 = 0;
pub const EXIT_UNEXPECTED: i32 = 1;
pub const EXIT_NOT_FOUND: i32 = 2;
pub const EXIT_INVALID_ARGUMENT: i32 = 3;

/// Read and deserialize a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in: {}", path.display()))
}

/// The repository error behind an anyhow chain, if any
fn repository_error(err: &anyhow::Error) -> Option<&RepositoryError> {
    if let Some(error) = err.downcast_ref::<RepositoryError>() {
        return Some(error);
    }
    err.downcast_ref::<QueryError>()
        .and_then(QueryError::as_repository)
}

/// Exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match repository_error(err).map(|e| e.kind) {
        Some(RepositoryErrorKind::InvalidArgument) => EXIT_INVALID_ARGUMENT,
        Some(RepositoryErrorKind::NotFound) => EXIT_NOT_FOUND,
        _ => EXIT_UNEXPECTED,
    }
}

/// Machine-readable body for a failed command
pub fn error_response(err: &anyhow::Error) -> ErrorResponse {
    if let Some(repository) = repository_error(err) {
        return ErrorResponse::from(repository);
    }
    match err.downcast_ref::<QueryError>() {
        Some(query) => ErrorResponse::from(query),
        None => ErrorResponse::new("UNEXPECTED", format!("{:#}", err)),
    }
}

/// Print a failed command's error and return its exit code
///
/// Repository errors print their user message; the full error goes to the
/// log. Anything else prints its context chain. With `json` set the error is
/// printed to stdout as an [`ErrorResponse`] instead.
pub fn report(err: &anyhow::Error, json: bool) -> i32 {
    if json {
        if let Some(repository) = repository_error(err) {
            tracing::debug!(error = %repository, "command failed");
        }
        match serde_json::to_string_pretty(&error_response(err)) {
            Ok(body) => println!("{}", body),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
        return exit_code(err);
    }
    match repository_error(err) {
        Some(repository) => {
            tracing::debug!(error = %repository, "command failed");
            error(&repository.user_message());
        }
        None => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            if let Some(source) = err.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }
        }
    }
    exit_code(err)
}

/// Info message
pub fn info(message: &str) {
    println!("{} {}", "→".blue().bold(), message);
}

/// Warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Section header
pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

#[cfg(test)]
mod tests {
    use super::*;
    use acton_query::repository::RepositoryOperation;
    use std::io::Write;

    #[test]
    fn test_exit_codes() {
        let invalid = anyhow::Error::new(RepositoryError::invalid_argument(
            RepositoryOperation::BuildSpecification,
            "page",
            "must be at least 1, got 0",
        ));
        assert_eq!(exit_code(&invalid), EXIT_INVALID_ARGUMENT);

        let wrapped = anyhow::Error::new(QueryError::from(RepositoryError::unexpected(
            RepositoryOperation::ListAll,
            "disk gone",
        )));
        assert_eq!(exit_code(&wrapped), EXIT_UNEXPECTED);

        let other = anyhow::anyhow!("Failed to read file: nope.json");
        assert_eq!(exit_code(&other), EXIT_UNEXPECTED);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = Err::<(), _>(RepositoryError::invalid_argument(
            RepositoryOperation::BuildSpecification,
            "sort",
            "unknown sort field 'colour'",
        ))
        .context("Invalid product query")
        .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_INVALID_ARGUMENT);
    }

    #[test]
    fn test_error_response_for_repository_error() {
        let err = Err::<(), _>(RepositoryError::invalid_argument(
            RepositoryOperation::BuildSpecification,
            "page_size",
            "must not exceed 100, got 500",
        ))
        .context("Invalid product query")
        .unwrap_err();
        let response = error_response(&err);
        assert_eq!(response.code, "INVALID_ARGUMENT");
        assert_eq!(response.field.as_deref(), Some("page_size"));
    }

    #[test]
    fn test_error_response_hides_source_detail() {
        let err = anyhow::Error::new(RepositoryError::unexpected(
            RepositoryOperation::ListAll,
            "disk /dev/sdb1 gone",
        ));
        let response = error_response(&err);
        assert_eq!(response.code, "UNEXPECTED");
        assert!(!response.error.contains("sdb1"));
    }

    #[test]
    fn test_error_response_for_other_errors() {
        let tracing = anyhow::Error::new(QueryError::Tracing("already installed".to_string()));
        assert_eq!(error_response(&tracing).code, "TRACING_ERROR");

        let other = anyhow::anyhow!("Failed to read file: nope.json");
        let response = error_response(&other);
        assert_eq!(response.code, "UNEXPECTED");
        assert_eq!(response.error, "Failed to read file: nope.json");
        assert_eq!(exit_code(&other), EXIT_UNEXPECTED);
    }

    #[test]
    fn test_read_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1, "name": "Hardware"}}]"#).unwrap();
        let nodes: Vec<serde_json::Value> = read_json(file.path()).unwrap();
        assert_eq!(nodes.len(), 1);

        let err = read_json::<Vec<u8>>(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
