use core::fmt;

use crate::plan::Direction;
use crate::version::Version;

/// Error type migrations report from [`Migration::upgrade`] and
/// [`Migration::downgrade`].
///
/// [`Migration::upgrade`]: crate::Migration::upgrade
/// [`Migration::downgrade`]: crate::Migration::downgrade
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used by [`MigrationSet`](crate::MigrationSet).
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A version label could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The label was empty or only whitespace.
    #[error("empty version label")]
    Empty,
    /// The label is not a valid version.
    #[error("invalid version label {label:?}: {reason}")]
    Invalid { label: String, reason: String },
}

impl VersionError {
    pub(crate) fn invalid(label: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Category of a [`MigrationError`].
///
/// Two migration errors are the same kind of error when their kinds match,
/// whatever version or cause they carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum MigrationErrorKind {
    /// A migration's upgrade or downgrade reported an error.
    Failed,
}

impl fmt::Display for MigrationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("migration failed"),
        }
    }
}

/// A migration failed partway through an upgrade or downgrade.
///
/// Migrations before [`version`](Self::version) in the same call have been
/// applied and stay applied. Where the state now sits depends on the
/// direction:
///
/// - upgrade: at [`last_version`](Self::last_version), or still at the
///   original `from` when it is `None`;
/// - downgrade: at [`version`](Self::version), since every newer version has
///   been downgraded and this one has not.
///
/// [`resume_from`](Self::resume_from) picks the right one.
///
/// Equality compares [`kind`](Self::kind) only:
///
/// ```
/// use migset::{from_fns, Error, MigrationSet};
///
/// let failing = || Err::<(), _>("disk full");
/// let a = MigrationSet::new().with("1", from_fns(failing, failing));
/// let b = MigrationSet::new().with("7", from_fns(failing, failing));
///
/// let (Err(Error::Migration(ea)), Err(Error::Migration(eb))) =
///     (a.upgrade("0", "1"), b.downgrade("9", "0"))
/// else {
///     unreachable!()
/// };
/// assert_eq!(ea, eb);
/// assert_eq!(ea.to_string(), "migration failed at version \"1\": disk full");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{kind} at version \"{version}\": {source}")]
pub struct MigrationError {
    kind: MigrationErrorKind,
    direction: Direction,
    version: Version,
    last_version: Option<Version>,
    source: BoxError,
}

impl MigrationError {
    pub(crate) fn failed(
        direction: Direction,
        version: Version,
        last_version: Option<Version>,
        source: BoxError,
    ) -> Self {
        Self {
            kind: MigrationErrorKind::Failed,
            direction,
            version,
            last_version,
            source,
        }
    }

    pub fn kind(&self) -> MigrationErrorKind {
        self.kind
    }

    /// Direction of the transition that failed.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Version whose migration failed.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Last version that completed in the same call, if any.
    pub fn last_version(&self) -> Option<&Version> {
        self.last_version.as_ref()
    }

    /// Version to pass as `from` when retrying the same transition.
    ///
    /// `None` means nothing completed and the original `from` still holds.
    ///
    /// ```
    /// use migset::{from_fns, BoxError, MigrationSet};
    ///
    /// let ok = || Ok::<_, BoxError>(());
    /// let irreversible = || Err::<(), BoxError>("data is gone".into());
    /// let set = MigrationSet::new()
    ///     .with("1", from_fns(ok, ok))
    ///     .with("2", from_fns(ok, irreversible))
    ///     .with("3", from_fns(ok, ok));
    ///
    /// let err = set.downgrade("3", "0").unwrap_err();
    /// let failure = err.as_migration().unwrap();
    /// assert_eq!(failure.last_version().map(|v| v.as_str()), Some("3"));
    /// assert_eq!(failure.resume_from().map(|v| v.as_str()), Some("2"));
    /// ```
    pub fn resume_from(&self) -> Option<&Version> {
        match self.direction {
            Direction::Upgrade => self.last_version.as_ref(),
            Direction::Downgrade => Some(&self.version),
        }
    }

    /// The migration's own error.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.source
    }

    /// Take the migration's own error.
    pub fn into_cause(self) -> BoxError {
        self.source
    }
}

impl PartialEq for MigrationError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for MigrationError {}

impl PartialEq<MigrationErrorKind> for MigrationError {
    fn eq(&self, other: &MigrationErrorKind) -> bool {
        self.kind == *other
    }
}

/// Errors returned by [`MigrationSet`](crate::MigrationSet) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `from`, `to`, or a registered label is not a valid version.
    /// Nothing was executed.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A migration failed; earlier migrations in the same call were applied.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// The requested range runs the wrong way for its direction.
    /// Only reported when [`MigrationConfig::strict_range`] is set.
    ///
    /// [`MigrationConfig::strict_range`]: crate::MigrationConfig::strict_range
    #[error("cannot {direction} from {from} to {to}: range is inverted")]
    InvertedRange {
        direction: Direction,
        from: Version,
        to: Version,
    },
}

impl Error {
    /// Whether this is a [`MigrationError`] of any version or cause.
    pub fn is_migration_failure(&self) -> bool {
        matches!(self, Self::Migration(_))
    }

    pub fn as_migration(&self) -> Option<&MigrationError> {
        match self {
            Self::Migration(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&VersionError> {
        match self {
            Self::Version(e) => Some(e),
            _ => None,
        }
    }
}
