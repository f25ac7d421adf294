use core::fmt;
use core::ops::Bound;

use crate::version::{Version, VersionRange};

/// Which way a transition moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Run [`Migration::upgrade`](crate::Migration::upgrade) in ascending version order.
    Upgrade,
    /// Run [`Migration::downgrade`](crate::Migration::downgrade) in descending version order.
    Downgrade,
}

impl Direction {
    /// Versions that take part in moving from `from` to `to`.
    ///
    /// Both directions exclude the version the state is already at and
    /// include the version being moved towards:
    ///
    /// - upgrade: `from < v <= to`
    /// - downgrade: `to < v <= from`
    pub fn range(self, from: &Version, to: &Version) -> VersionRange {
        match self {
            Self::Upgrade => {
                VersionRange::new(Bound::Excluded(from.clone()), Bound::Included(to.clone()))
            }
            Self::Downgrade => {
                VersionRange::new(Bound::Excluded(to.clone()), Bound::Included(from.clone()))
            }
        }
    }

    /// Whether `from -> to` runs against this direction.
    pub fn is_inverted(self, from: &Version, to: &Version) -> bool {
        match self {
            Self::Upgrade => from > to,
            Self::Downgrade => from < to,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::Upgrade => Self::Downgrade,
            Self::Downgrade => Self::Upgrade,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upgrade => f.write_str("upgrade"),
            Self::Downgrade => f.write_str("downgrade"),
        }
    }
}

/// The versions selected for one transition, in execution order.
///
/// Built by [`MigrationSet::plan`](crate::MigrationSet::plan) and run with
/// [`MigrationSet::execute`](crate::MigrationSet::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    direction: Direction,
    from: Version,
    to: Version,
    steps: Vec<Version>,
}

impl Plan {
    /// Select the versions from `available` that take part in the
    /// transition, ordered for `direction`.
    ///
    /// `available` must already be sorted ascending. The sort is stable, so
    /// equal versions keep the order they arrive in.
    pub(crate) fn select(
        direction: Direction,
        from: Version,
        to: Version,
        available: Vec<Version>,
    ) -> Self {
        let range = direction.range(&from, &to);
        let mut steps: Vec<Version> = available
            .into_iter()
            .filter(|v| range.contains(v))
            .collect();
        if direction == Direction::Downgrade {
            steps.reverse();
        }

        Self {
            direction,
            from,
            to,
            steps,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn from(&self) -> &Version {
        &self.from
    }

    pub fn to(&self) -> &Version {
        &self.to
    }

    /// Versions to run, in order.
    pub fn versions(&self) -> &[Version] {
        &self.steps
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Version> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First version that will run.
    pub fn first(&self) -> Option<&Version> {
        self.steps.first()
    }

    /// Last version that will run, i.e. the version the state ends at.
    pub fn last(&self) -> Option<&Version> {
        self.steps.last()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Version;
    type IntoIter = core::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
