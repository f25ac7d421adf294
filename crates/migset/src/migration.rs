use std::sync::Arc;

use crate::error::BoxError;

/// Something that can move external state one version forward or back.
///
/// A migration is usually a database schema change, but anything with an
/// upgrade and a matching downgrade fits. When a change cannot be undone
/// (an upgrade that drops data, say) the opposite operation should return a
/// descriptive error rather than pretend to succeed.
///
/// Both operations take `&self`: a [`MigrationSet`](crate::MigrationSet) is
/// never mutated while it runs. Implementations that need mutable state
/// should hold it behind a lock or in the external system itself.
pub trait Migration: Send + Sync {
    /// Apply this migration.
    fn upgrade(&self) -> Result<(), BoxError>;
    /// Revert this migration.
    fn downgrade(&self) -> Result<(), BoxError>;
}

impl<M: Migration + ?Sized> Migration for Box<M> {
    fn upgrade(&self) -> Result<(), BoxError> {
        (**self).upgrade()
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        (**self).downgrade()
    }
}

impl<M: Migration + ?Sized> Migration for Arc<M> {
    fn upgrade(&self) -> Result<(), BoxError> {
        (**self).upgrade()
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        (**self).downgrade()
    }
}

impl<M: Migration + ?Sized> Migration for &M {
    fn upgrade(&self) -> Result<(), BoxError> {
        (**self).upgrade()
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        (**self).downgrade()
    }
}

/// A [`Migration`] built from two closures.
///
/// Saves defining a type per migration when a pair of functions will do:
///
/// ```
/// use migset::{from_fns, MigrationSet};
///
/// fn create_users() -> Result<(), std::io::Error> { Ok(()) }
/// fn drop_users() -> Result<(), std::io::Error> { Ok(()) }
///
/// let set = MigrationSet::new().with("1.0.0", from_fns(create_users, drop_users));
/// set.upgrade("0", "1").unwrap();
/// ```
#[derive(Clone)]
pub struct FnMigration<U, D> {
    up: U,
    down: D,
}

impl<U, D> FnMigration<U, D> {
    pub fn new(up: U, down: D) -> Self {
        Self { up, down }
    }
}

impl<U, D, EU, ED> Migration for FnMigration<U, D>
where
    U: Fn() -> Result<(), EU> + Send + Sync,
    D: Fn() -> Result<(), ED> + Send + Sync,
    EU: Into<BoxError>,
    ED: Into<BoxError>,
{
    fn upgrade(&self) -> Result<(), BoxError> {
        (self.up)().map_err(Into::into)
    }

    fn downgrade(&self) -> Result<(), BoxError> {
        (self.down)().map_err(Into::into)
    }
}

impl<U, D> core::fmt::Debug for FnMigration<U, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnMigration").finish_non_exhaustive()
    }
}

/// Build a [`Migration`] from an upgrade and a downgrade function.
pub fn from_fns<U, D>(up: U, down: D) -> FnMigration<U, D> {
    FnMigration::new(up, down)
}
