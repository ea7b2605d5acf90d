//! Error mapping and trait bounds of the PostgreSQL backend.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use mitch_core::{Catalog, CatalogError};
use sqlx::error::{DatabaseError, ErrorKind};

use crate::PgCatalog;
use crate::pg_catalog::extension_not_installed;

#[derive(Debug)]
struct ServerError {
    code: &'static str,
    message: &'static str,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl StdError for ServerError {}

impl DatabaseError for ServerError {
    fn message(&self) -> &str {
        self.message
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

fn server_error(code: &'static str, message: &'static str) -> CatalogError {
    CatalogError::Database(sqlx::Error::Database(Box::new(ServerError { code, message })))
}

const fn assert_send_catalog<C: Catalog + Send>() {}

#[test]
fn pg_catalog_is_a_send_catalog() {
    assert_send_catalog::<PgCatalog<'static>>();
}

#[test]
fn missing_control_file_is_dependency_missing() {
    let err = extension_not_installed(server_error("0A000", "extension \"postgis\" is not available"));
    assert!(matches!(err, CatalogError::DependencyMissing(ref msg) if msg.contains("postgis")), "{err}");
}

#[test]
fn unreadable_extension_file_is_dependency_missing() {
    let err = extension_not_installed(server_error(
        "58P01",
        "could not open extension control file \"/usr/share/postgresql/extension/postgis.control\"",
    ));
    assert!(matches!(err, CatalogError::DependencyMissing(_)), "{err}");
}

#[test]
fn matching_goes_by_code_not_message_text() {
    // Localized servers word the message differently.
    let err = extension_not_installed(server_error("0A000", "Erweiterung »postgis« ist nicht verfügbar"));
    assert!(matches!(err, CatalogError::DependencyMissing(_)), "{err}");

    let err = extension_not_installed(server_error("42501", "extension \"postgis\" is not available"));
    assert!(matches!(err, CatalogError::Database(_)), "{err}");
}

#[test]
fn non_database_errors_pass_through() {
    let err = extension_not_installed(CatalogError::Database(sqlx::Error::PoolTimedOut));
    assert!(err.is_transient(), "{err}");
}
