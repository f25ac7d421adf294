//! # migset
//!
//! Versioned migration sets: register migrations under version labels and
//! move external state between any two versions, forward or back.
//!
//! ## How It Works
//!
//! 1. Each [`Migration`] knows how to upgrade and downgrade one version.
//! 2. A [`MigrationSet`] maps version labels (`"1.0.0"`, `"2"`, `"v3.1"`) to
//!    migrations.
//! 3. [`MigrationSet::upgrade`] runs every migration after `from` up to and
//!    including `to`, oldest first. [`MigrationSet::downgrade`] runs every
//!    migration after `to` up to and including `from`, newest first.
//! 4. The first failure stops the run and is reported as a
//!    [`MigrationError`] naming the failing version and the last version that
//!    completed.
//!
//! ## Key Concepts
//!
//! - **Semver order**: labels are parsed with [`semver`] (short forms such as
//!   `"3"` are padded to `"3.0.0"`), never sorted as strings or by insertion.
//! - **Stateless**: the set does not remember where the external state is;
//!   pass it as `from` on every call.
//! - **Fail fast, no rollback**: migrations that ran before a failure stay
//!   applied. Resume by retrying from [`MigrationError::resume_from`]: the
//!   last completed version for an upgrade, the failing version for a
//!   downgrade.
//!
//! ```
//! use migset::{from_fns, BoxError, Error, MigrationSet};
//!
//! let noop = || Ok::<_, BoxError>(());
//! let irreversible = || Err::<(), BoxError>("v2 dropped the legacy table".into());
//!
//! let set = MigrationSet::new()
//!     .with("1.0.0", from_fns(noop, noop))
//!     .with("2.0.0", from_fns(noop, irreversible));
//!
//! set.upgrade("0", "2").unwrap();
//!
//! let err = set.downgrade("2", "0").unwrap_err();
//! assert!(err.is_migration_failure());
//! if let Error::Migration(failure) = err {
//!     assert_eq!(failure.version().as_str(), "2.0.0");
//!     assert!(failure.last_version().is_none());
//! }
//! ```

mod error;
mod migration;
mod plan;
mod set;
mod version;

pub use error::{BoxError, Error, MigrationError, MigrationErrorKind, Result, VersionError};
pub use migration::{from_fns, FnMigration, Migration};
pub use plan::{Direction, Plan};
pub use set::{MigrationConfig, MigrationSet};
pub use version::{Version, VersionRange};
