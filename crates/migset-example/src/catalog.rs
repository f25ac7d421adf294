//! A toy schema catalog and the migrations that shape it.
//!
//! The catalog stands in for a real database: tables with named columns,
//! shared between migrations behind a lock.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use migset::{from_fns, BoxError, Migration, MigrationConfig, MigrationSet};

/// Error raised by catalog changes.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("table {0:?} already exists")]
    TableExists(String),
    #[error("table {0:?} does not exist")]
    NoSuchTable(String),
    #[error("column {column:?} already exists on {table:?}")]
    ColumnExists { table: String, column: String },
    #[error("column {column:?} does not exist on {table:?}")]
    NoSuchColumn { table: String, column: String },
    #[error("{0}")]
    Irreversible(&'static str),
    #[error("injected failure")]
    Injected,
}

#[derive(Debug, Default)]
struct Tables(BTreeMap<String, BTreeSet<String>>);

/// Shared handle to an in-memory schema.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Arc<Mutex<Tables>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic inside a migration leaves the map itself intact.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create_table(&self, table: &str, columns: &[&str]) -> Result<(), CatalogError> {
        let mut tables = self.lock();
        if tables.0.contains_key(table) {
            return Err(CatalogError::TableExists(table.into()));
        }
        debug!("create table {table}");
        tables.0.insert(
            table.into(),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        Ok(())
    }

    pub fn drop_table(&self, table: &str) -> Result<(), CatalogError> {
        debug!("drop table {table}");
        self.lock()
            .0
            .remove(table)
            .map(drop)
            .ok_or_else(|| CatalogError::NoSuchTable(table.into()))
    }

    pub fn add_column(&self, table: &str, column: &str) -> Result<(), CatalogError> {
        let mut tables = self.lock();
        let columns = tables
            .0
            .get_mut(table)
            .ok_or_else(|| CatalogError::NoSuchTable(table.into()))?;
        if !columns.insert(column.into()) {
            return Err(CatalogError::ColumnExists {
                table: table.into(),
                column: column.into(),
            });
        }
        debug!("add column {table}.{column}");
        Ok(())
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<(), CatalogError> {
        let mut tables = self.lock();
        let columns = tables
            .0
            .get_mut(table)
            .ok_or_else(|| CatalogError::NoSuchTable(table.into()))?;
        if !columns.remove(column) {
            return Err(CatalogError::NoSuchColumn {
                table: table.into(),
                column: column.into(),
            });
        }
        debug!("drop column {table}.{column}");
        Ok(())
    }

    #[cfg(test)]
    pub fn has_table(&self, table: &str) -> bool {
        self.lock().0.contains_key(table)
    }

    #[cfg(test)]
    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        self.lock().0.get(table).map(|c| c.iter().cloned().collect())
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.lock();
        if tables.0.is_empty() {
            return writeln!(f, "  (empty schema)");
        }
        for (name, columns) in &tables.0 {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            writeln!(f, "  {name:<12} {}", columns.join(", "))?;
        }
        Ok(())
    }
}

/// Creates a table on upgrade, drops it on downgrade.
struct CreateTable {
    catalog: Catalog,
    table: &'static str,
    columns: &'static [&'static str],
}

impl Migration for CreateTable {
    fn upgrade(&self) -> Result<(), BoxError> {
        self.catalog
            .create_table(self.table, self.columns)
            .map_err(Into::into)
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        self.catalog.drop_table(self.table).map_err(Into::into)
    }
}

/// Wraps a migration so it fails instead of running.
struct FailOnce<M> {
    inner: M,
    armed: Mutex<bool>,
}

impl<M: Migration> Migration for FailOnce<M> {
    fn upgrade(&self) -> Result<(), BoxError> {
        self.check()?;
        self.inner.upgrade()
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        self.check()?;
        self.inner.downgrade()
    }
}

impl<M> FailOnce<M> {
    fn check(&self) -> Result<(), CatalogError> {
        let mut armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        if std::mem::take(&mut *armed) {
            return Err(CatalogError::Injected);
        }
        Ok(())
    }
}

/// Register `migration` under `label`, making its first run fail when
/// `fail_at` names the same label.
fn register(
    set: &mut MigrationSet,
    label: &str,
    migration: impl Migration + 'static,
    fail_at: Option<&str>,
) {
    if fail_at == Some(label) {
        set.insert(
            label,
            FailOnce {
                inner: migration,
                armed: Mutex::new(true),
            },
        );
    } else {
        set.insert(label, migration);
    }
}

/// The demo's migration history.
///
/// `2.0.0` drops a column and cannot restore its data, so its downgrade
/// fails on purpose.
pub fn migrations(
    catalog: &Catalog,
    config: MigrationConfig,
    fail_at: Option<&str>,
) -> MigrationSet {
    let mut set = MigrationSet::with_config(config);

    register(
        &mut set,
        "1.0.0",
        CreateTable {
            catalog: catalog.clone(),
            table: "users",
            columns: &["id", "name", "legacy_flags"],
        },
        fail_at,
    );

    let (up, down) = (catalog.clone(), catalog.clone());
    register(
        &mut set,
        "1.1.0",
        from_fns(
            move || up.add_column("users", "email"),
            move || down.drop_column("users", "email"),
        ),
        fail_at,
    );

    let up = catalog.clone();
    register(
        &mut set,
        "2.0.0",
        from_fns(
            move || up.drop_column("users", "legacy_flags"),
            || {
                Err::<(), _>(CatalogError::Irreversible(
                    "users.legacy_flags was dropped with its data",
                ))
            },
        ),
        fail_at,
    );

    register(
        &mut set,
        "2.1.0",
        CreateTable {
            catalog: catalog.clone(),
            table: "sessions",
            columns: &["id", "user_id", "expires_at"],
        },
        fail_at,
    );

    set
}

/// Bring a fresh `catalog` to `from`, then return the set to run from there.
///
/// The setup upgrade runs on its own uninjected set, so `fail_at` only
/// affects the run the caller asked for.
pub fn prepare(
    catalog: &Catalog,
    config: MigrationConfig,
    from: &str,
    fail_at: Option<&str>,
) -> migset::Result<MigrationSet> {
    migrations(catalog, MigrationConfig::default(), None).upgrade("0", from)?;
    Ok(migrations(catalog, config, fail_at))
}
