use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::error::{Error, MigrationError, Result, VersionError};
use crate::migration::Migration;
use crate::plan::{Direction, Plan};
use crate::version::Version;

/// Configuration for a [`MigrationSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationConfig {
    /// If true, an upgrade with `from > to` or a downgrade with `from < to`
    /// fails with [`Error::InvertedRange`]. Otherwise such a call selects no
    /// migrations and succeeds.
    pub strict_range: bool,
}

/// Migrations keyed by version label.
///
/// The set runs upgrades in ascending version order and downgrades in
/// descending order. Labels are parsed as versions on every call, so the
/// order labels were inserted in never matters:
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use migset::{from_fns, BoxError, MigrationSet};
///
/// let ran = Arc::new(Mutex::new(Vec::new()));
/// let step = |label: &'static str| {
///     let (up, down) = (ran.clone(), ran.clone());
///     from_fns(
///         move || { up.lock().unwrap().push(label); Ok::<_, BoxError>(()) },
///         move || { down.lock().unwrap().push(label); Ok::<_, BoxError>(()) },
///     )
/// };
///
/// let set = MigrationSet::new()
///     .with("3", step("3"))
///     .with("1", step("1"))
///     .with("2", step("2"));
///
/// set.upgrade("1", "3").unwrap();
/// assert_eq!(*ran.lock().unwrap(), vec!["2", "3"]);
/// ```
///
/// The set holds no notion of a current version. Callers keep track of where
/// the external state is and pass it as `from` on each call.
#[derive(Default)]
pub struct MigrationSet {
    migrations: BTreeMap<String, Box<dyn Migration>>,
    config: MigrationConfig,
}

impl MigrationSet {
    /// Create an empty set with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with `config`.
    pub fn with_config(config: MigrationConfig) -> Self {
        Self {
            migrations: BTreeMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Register `migration` under `label`, returning the migration it
    /// replaced.
    ///
    /// Labels are not validated here; a bad label surfaces as
    /// [`Error::Version`] on the next call that reads the set.
    pub fn insert(
        &mut self,
        label: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> Option<Box<dyn Migration>> {
        self.migrations.insert(label.into(), Box::new(migration))
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, label: impl Into<String>, migration: impl Migration + 'static) -> Self {
        self.insert(label, migration);
        self
    }

    pub fn remove(&mut self, label: &str) -> Option<Box<dyn Migration>> {
        self.migrations.remove(label)
    }

    pub fn get(&self, label: &str) -> Option<&dyn Migration> {
        self.migrations.get(label).map(|m| &**m)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.migrations.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Registered labels, as given, in string order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.migrations.keys().map(String::as_str)
    }

    /// All registered versions, sorted ascending.
    ///
    /// Fails on the first label that does not parse.
    pub fn versions(&self) -> Result<Vec<Version>, VersionError> {
        let mut versions = self
            .migrations
            .keys()
            .map(|label| Version::parse(label))
            .collect::<Result<Vec<_>, _>>()?;
        // Stable: labels that compare equal keep their string order.
        versions.sort();
        Ok(versions)
    }

    /// Highest registered version, or `None` for an empty set.
    pub fn latest(&self) -> Result<Option<Version>, VersionError> {
        Ok(self.versions()?.pop())
    }

    /// Work out which migrations a transition would run, without running
    /// them.
    pub fn plan(&self, direction: Direction, from: &str, to: &str) -> Result<Plan> {
        let from = Version::parse(from)?;
        let to = Version::parse(to)?;
        let available = self.versions()?;

        if self.config.strict_range && direction.is_inverted(&from, &to) {
            return Err(Error::InvertedRange {
                direction,
                from,
                to,
            });
        }

        let plan = Plan::select(direction, from, to, available);
        debug!(
            "{} {} -> {}: {} of {} migration(s) selected",
            direction,
            plan.from(),
            plan.to(),
            plan.len(),
            self.len()
        );
        Ok(plan)
    }

    /// Run the upgrades of every version after `from` up to and including
    /// `to`, in ascending order.
    pub fn upgrade(&self, from: &str, to: &str) -> Result<()> {
        self.run(Direction::Upgrade, from, to)
    }

    /// Run the downgrades of every version after `to` up to and including
    /// `from`, in descending order.
    pub fn downgrade(&self, from: &str, to: &str) -> Result<()> {
        self.run(Direction::Downgrade, from, to)
    }

    /// Plan and execute a transition in `direction`.
    pub fn run(&self, direction: Direction, from: &str, to: &str) -> Result<()> {
        let plan = self.plan(direction, from, to)?;
        self.execute(&plan)
    }

    /// Execute a plan built by [`plan`](Self::plan).
    ///
    /// Stops at the first failing migration. Migrations that already ran stay
    /// applied.
    pub fn execute(&self, plan: &Plan) -> Result<()> {
        let direction = plan.direction();
        let mut last: Option<&Version> = None;

        for version in plan {
            // A plan from another set may name a label this set lacks.
            let migration = self.migrations.get(version.as_str()).ok_or_else(|| {
                MigrationError::failed(
                    direction,
                    version.clone(),
                    last.cloned(),
                    format!("no migration registered for {:?}", version.as_str()).into(),
                )
            })?;

            debug!("{direction} {version}");
            let outcome = match direction {
                Direction::Upgrade => migration.upgrade(),
                Direction::Downgrade => migration.downgrade(),
            };

            if let Err(source) = outcome {
                warn!(
                    "{direction} failed at {version} (last completed: {}): {source}",
                    last.map_or("none", Version::as_str)
                );
                let failure =
                    MigrationError::failed(direction, version.clone(), last.cloned(), source);
                return Err(failure.into());
            }
            last = Some(version);
        }

        match last {
            Some(version) => info!(
                "{direction} {} -> {}: {} migration(s) applied, now at {version}",
                plan.from(),
                plan.to(),
                plan.len()
            ),
            None => debug!("{direction} {} -> {}: nothing to do", plan.from(), plan.to()),
        }
        Ok(())
    }
}

impl core::fmt::Debug for MigrationSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MigrationSet")
            .field("labels", &self.migrations.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl<L, M> FromIterator<(L, M)> for MigrationSet
where
    L: Into<String>,
    M: Migration + 'static,
{
    fn from_iter<I: IntoIterator<Item = (L, M)>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<L, M> Extend<(L, M)> for MigrationSet
where
    L: Into<String>,
    M: Migration + 'static,
{
    fn extend<I: IntoIterator<Item = (L, M)>>(&mut self, iter: I) {
        for (label, migration) in iter {
            self.insert(label, migration);
        }
    }
}
