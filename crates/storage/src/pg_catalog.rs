//! PostgreSQL catalog backend using sqlx.
//!
//! `PgCatalog` borrows one connection, normally the inside of an open
//! transaction. Each creating statement runs in its own savepoint so a lost
//! race (`AlreadyExists`) leaves the outer transaction usable.

use std::time::Duration;

use async_trait::async_trait;
use mitch_core::{
    Catalog, CatalogError, ColumnInfo, ColumnSpec, DEFAULT_LOCK_KEY, Ident, PG_POOL_MAX_CONNECTIONS, QualifiedName,
    RelationKind, TableSpec, canonical_type, ddl,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};

/// Open a small pool; a run only ever borrows one connection from it.
pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<PgPool, CatalogError> {
    let pool = PgPoolOptions::new()
        .max_connections(PG_POOL_MAX_CONNECTIONS)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;
    tracing::info!("PostgreSQL pool initialized");
    Ok(pool)
}

/// The extension's control file is missing on the server (`0A000` from
/// `CREATE EXTENSION`, `58P01` when a file it names cannot be opened).
pub(crate) fn extension_not_installed(err: CatalogError) -> CatalogError {
    match err {
        CatalogError::Database(sqlx::Error::Database(db)) if matches!(db.code().as_deref(), Some("0A000" | "58P01")) => {
            CatalogError::DependencyMissing(db.message().to_owned())
        },
        other => other,
    }
}

pub struct PgCatalog<'c> {
    conn: &'c mut PgConnection,
    lock_key: i64,
}

impl<'c> PgCatalog<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn, lock_key: DEFAULT_LOCK_KEY }
    }

    #[must_use]
    pub fn with_lock_key(mut self, lock_key: i64) -> Self {
        self.lock_key = lock_key;
        self
    }

    async fn execute_ddl(&mut self, sql: String) -> Result<(), CatalogError> {
        tracing::debug!(%sql, "executing DDL");
        let mut savepoint = self.conn.begin().await?;
        match sqlx::Executor::execute(&mut *savepoint, sql.as_str()).await {
            Ok(_) => {
                savepoint.commit().await?;
                Ok(())
            },
            Err(err) => {
                savepoint.rollback().await?;
                Err(err.into())
            },
        }
    }
}

#[async_trait]
impl Catalog for PgCatalog<'_> {
    async fn acquire_lock(&mut self) -> Result<(), CatalogError> {
        tracing::debug!(lock_key = self.lock_key, "waiting for advisory lock");
        sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(self.lock_key).execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn has_extension(&mut self, name: &Ident) -> Result<bool, CatalogError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = $1)")
            .bind(name.as_str())
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(found)
    }

    async fn create_extension(&mut self, name: &Ident) -> Result<(), CatalogError> {
        self.execute_ddl(ddl::create_extension(name)).await.map_err(extension_not_installed)
    }

    async fn has_schema(&mut self, name: &Ident) -> Result<bool, CatalogError> {
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(name.as_str())
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(found)
    }

    async fn create_schema(&mut self, name: &Ident) -> Result<(), CatalogError> {
        self.execute_ddl(ddl::create_schema(name)).await
    }

    async fn relation_kind(&mut self, name: &QualifiedName) -> Result<Option<RelationKind>, CatalogError> {
        let code: Option<String> = sqlx::query_scalar(
            "SELECT c.relkind::text FROM pg_class c \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = $1 AND c.relname = $2",
        )
        .bind(name.schema.as_str())
        .bind(name.name.as_str())
        .fetch_optional(&mut *self.conn)
        .await?;
        code.map(|code| {
            RelationKind::from_relkind(&code)
                .ok_or_else(|| CatalogError::Internal(format!("unknown relkind {code:?} for {name}")))
        })
        .transpose()
    }

    async fn create_table(&mut self, table: &TableSpec) -> Result<(), CatalogError> {
        self.execute_ddl(ddl::create_table(table)).await
    }

    async fn columns(&mut self, table: &QualifiedName) -> Result<Vec<ColumnInfo>, CatalogError> {
        if self.relation_kind(table).await?.is_none() {
            return Err(CatalogError::DependencyMissing(format!("relation \"{table}\" does not exist")));
        }
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            "SELECT a.attname::text, format_type(a.atttypid, a.atttypmod), NOT a.attnotnull \
             FROM pg_attribute a \
             JOIN pg_class c ON c.oid = a.attrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped \
             ORDER BY a.attnum",
        )
        .bind(table.schema.as_str())
        .bind(table.name.as_str())
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter()
            .map(|(name, data_type, nullable)| {
                let name = Ident::new(name).map_err(|e| CatalogError::Internal(e.to_string()))?;
                Ok(ColumnInfo { name, data_type: canonical_type(&data_type), nullable })
            })
            .collect()
    }

    async fn add_column(&mut self, table: &QualifiedName, column: &ColumnSpec) -> Result<(), CatalogError> {
        self.execute_ddl(ddl::add_column(table, column)).await
    }
}
