//! Migration executor for planning and running version steps.

use super::collection::VersionCollection;
use super::step::VersionStep;
use super::store::{ActiveVersionSource, ActiveVersionStore};
use super::types::{
    Action, ActiveTarget, MigrationDirection, MigrationError, MigrationStatus, Plan, Target,
};
use crate::version::{normalize, parse, SemVer};
use std::cmp::Ordering;
use tracing::{debug, error, info};

/// Executor for running version steps against a shared context.
///
/// The executor owns the registered versions and the context handed to
/// every action and store call. Apart from the in-memory marker it keeps
/// no state between calls: each operation starts by asking the
/// [`ActiveVersionSource`] where it currently stands.
pub struct MigrationExecutor<C> {
    versions: VersionCollection<C>,
    source: ActiveVersionSource<C>,
    context: C,
}

impl<C: Send + Sync> MigrationExecutor<C> {
    /// Create an executor that keeps the active version in memory.
    pub fn new(context: C) -> Self {
        Self {
            versions: VersionCollection::new(),
            source: ActiveVersionSource::InMemory,
            context,
        }
    }

    /// Create an executor whose active version lives in `store`.
    pub fn with_store<S>(context: C, store: S) -> Self
    where
        S: ActiveVersionStore<C> + 'static,
    {
        Self {
            versions: VersionCollection::new(),
            source: ActiveVersionSource::Persisted(Box::new(store)),
            context,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn versions(&self) -> &VersionCollection<C> {
        &self.versions
    }

    /// Normalized labels of every registered version, in order.
    pub fn available(&self) -> Vec<String> {
        self.versions.labels()
    }

    /// Register a version with its `up` and `down` actions.
    pub fn add_version<U, D>(
        &mut self,
        label: &str,
        up: U,
        down: D,
        comment: Option<&str>,
    ) -> Result<&VersionStep<C>, MigrationError>
    where
        U: Action<C> + 'static,
        D: Action<C> + 'static,
    {
        let step = VersionStep::new(
            label,
            Box::new(up),
            Box::new(down),
            comment.map(str::to_string),
        )?;
        self.add_step(step)
    }

    /// Register an already constructed step.
    pub fn add_step(&mut self, step: VersionStep<C>) -> Result<&VersionStep<C>, MigrationError> {
        debug!(version = %step.normalized(), "Registering version");
        self.versions.add(step)
    }

    /// Read the active version, normalized. `None` means nothing is active.
    pub async fn get_active_version(&self) -> Result<Option<String>, MigrationError> {
        match &self.source {
            ActiveVersionSource::InMemory => Ok(self
                .versions
                .active()
                .map(|step| step.normalized().to_string())),
            ActiveVersionSource::Persisted(store) => {
                let stored = store
                    .get(&self.context)
                    .await
                    .map_err(MigrationError::StoreUnavailable)?;
                normalize_stored(stored)
            }
        }
    }

    /// Move the active marker and persist it.
    ///
    /// The in-memory marker is updated first, then the store (if any) is
    /// written. Returns the label the store confirmed.
    pub async fn set_active_version(
        &mut self,
        target: ActiveTarget,
    ) -> Result<Option<String>, MigrationError> {
        let resolved = match &target {
            ActiveTarget::Unset => None,
            ActiveTarget::Latest => Some(self.versions.last()),
            ActiveTarget::Initial => Some(self.versions.first()),
            ActiveTarget::Version(label) => Some(self.versions.get(label)),
        };
        let label = match resolved {
            None => None,
            Some(Some(step)) => Some(step.normalized().to_string()),
            Some(None) => return Err(MigrationError::VersionNotFound(target.to_string())),
        };

        match &label {
            Some(key) => {
                self.versions.set_active(key)?;
            }
            None => self.versions.unset_active(),
        }

        match &self.source {
            ActiveVersionSource::InMemory => Ok(label),
            ActiveVersionSource::Persisted(store) => {
                let confirmed = store
                    .set(label.as_deref(), &self.context)
                    .await
                    .map_err(|source| MigrationError::PersistenceFailed {
                        version: label.clone(),
                        source,
                    })?;
                normalize_stored(confirmed)
            }
        }
    }

    /// Resolve where an upgrade toward `target` starts and ends.
    ///
    /// `from` overrides the active version. With nothing active the plan
    /// starts at the lowest version and is marked `is_initial`. Returns
    /// `None` when no versions are registered.
    pub async fn plan_upgrade(
        &self,
        target: &Target,
        from: Option<&str>,
    ) -> Result<Option<Plan>, MigrationError> {
        let Some(lowest) = self.versions.first() else {
            return Ok(None);
        };

        let active = match from {
            Some(label) => Some(normalize(label, true)?),
            None => self.get_active_version().await?,
        };
        let (from, is_initial) = match active {
            Some(label) => (label, false),
            None => (lowest.normalized().to_string(), true),
        };

        let current = parse(&from)?;
        let from_index = self.versions.index_of(&from);
        let to_index = match target {
            Target::Latest => Some(self.versions.len() - 1),
            Target::Initial => Some(0),
            Target::Major => self
                .next_major_group(&current)
                .or(from_index),
            Target::Minor => self
                .rposition(|v| v.major == current.major && v.minor > current.minor)
                .or(from_index),
            Target::Patch => self
                .rposition(|v| {
                    v.major == current.major
                        && v.minor == current.minor
                        && v.patch > current.patch
                })
                .or(from_index),
            Target::Version(label) => self.versions.index_of(label),
        };

        Ok(Some(self.plan(target, from, from_index, to_index, is_initial)))
    }

    /// Resolve where a downgrade toward `target` starts and ends.
    ///
    /// `initial` keeps the lowest version applied. `major`/`minor`/`patch`
    /// step back to the nearest lower version with a smaller component
    /// under the same prefix, skipping gaps; without one the plan ends
    /// where it starts.
    pub async fn plan_downgrade(
        &self,
        target: &Target,
        from: Option<&str>,
    ) -> Result<Option<Plan>, MigrationError> {
        let from = match from {
            Some(label) => normalize(label, true)?,
            None => self
                .get_active_version()
                .await?
                .ok_or(MigrationError::NoActiveVersion)?,
        };
        if self.versions.is_empty() {
            return Ok(None);
        }

        let current = parse(&from)?;
        let from_index = self.versions.index_of(&from);
        let to_index = match target {
            Target::Latest => Some(self.versions.len() - 1),
            Target::Initial => Some(0),
            Target::Major => self
                .rposition(|v| v.major < current.major)
                .or(from_index),
            Target::Minor => self
                .rposition(|v| v.major == current.major && v.minor < current.minor)
                .or(from_index),
            Target::Patch => self
                .rposition(|v| {
                    v.major == current.major
                        && v.minor == current.minor
                        && v.patch < current.patch
                })
                .or(from_index),
            Target::Version(label) => self.versions.index_of(label),
        };

        Ok(Some(self.plan(target, from, from_index, to_index, false)))
    }

    /// Upgrade toward `target`, running each `up` action in order.
    ///
    /// The active version is persisted after every step. Returns the number
    /// of steps that ran and were recorded.
    pub async fn up(&mut self, target: &Target) -> Result<usize, MigrationError> {
        let plan = self
            .plan_upgrade(target, None)
            .await?
            .ok_or_else(|| MigrationError::TargetNotFound(target.to_string()))?;
        let (from_index, to_index) = resolved_indices(&plan)?;

        if from_index >= to_index && !plan.is_initial {
            info!(version = %plan.from, requested = %target, "Already at target version");
            return Ok(0);
        }

        info!(
            from = %plan.from,
            to = %plan.to,
            initial = plan.is_initial,
            "Starting upgrade"
        );

        // Unless nothing has run yet, `from` is already applied.
        let start = if plan.is_initial {
            from_index
        } else {
            from_index + 1
        };

        let mut completed = 0;
        for index in start..=to_index {
            self.run_step(index, index, MigrationDirection::Up).await?;
            completed += 1;
        }

        info!(to = %plan.to, steps = completed, "Upgrade completed");
        Ok(completed)
    }

    /// Downgrade toward `target`, running each `down` action from the top.
    ///
    /// Each step reverts the version at index `i` and records `i - 1` as
    /// active; the target itself stays applied.
    pub async fn down(&mut self, target: &Target) -> Result<usize, MigrationError> {
        self.downgrade_from(target, None).await
    }

    /// Run a downgrade starting at `from`, or at the stored active version.
    async fn downgrade_from(
        &mut self,
        target: &Target,
        from: Option<&str>,
    ) -> Result<usize, MigrationError> {
        let plan = self
            .plan_downgrade(target, from)
            .await?
            .ok_or_else(|| MigrationError::TargetNotFound(target.to_string()))?;
        let (from_index, to_index) = resolved_indices(&plan)?;

        if from_index <= to_index {
            info!(version = %plan.from, requested = %target, "Already at target version");
            return Ok(0);
        }

        info!(from = %plan.from, to = %plan.to, "Starting downgrade");

        let mut completed = 0;
        for index in (to_index + 1..=from_index).rev() {
            self.run_step(index, index - 1, MigrationDirection::Down)
                .await?;
            completed += 1;
        }

        info!(to = %plan.to, steps = completed, "Downgrade completed");
        Ok(completed)
    }

    /// Revert everything, including the lowest version, and clear the
    /// active marker.
    pub async fn uninstall(&mut self) -> Result<usize, MigrationError> {
        let Some(active) = self.get_active_version().await? else {
            info!("Nothing to uninstall");
            return Ok(0);
        };

        info!(version = %active, "Starting uninstall");
        let mut completed = self.downgrade_from(&Target::Initial, Some(&active)).await?;

        let (label, result) = {
            let step = self
                .versions
                .first()
                .ok_or_else(|| MigrationError::TargetNotFound(Target::Initial.to_string()))?;
            info!(version = %step.normalized(), "Reverting initial version");
            (
                step.normalized().to_string(),
                step.down_action().run(&self.context).await,
            )
        };
        if let Err(source) = result {
            error!(version = %label, error = %source, "Uninstall failed");
            return Err(MigrationError::UninstallFailed {
                version: label,
                source,
            });
        }
        completed += 1;

        if let Err(e) = self.set_active_version(ActiveTarget::Unset).await {
            error!(error = %e, "Uninstalled but could not clear the active version");
            return Err(e);
        }

        info!(steps = completed, "Uninstall completed");
        Ok(completed)
    }

    /// Active version, latest registered version, and how many versions
    /// sit above the active one.
    pub async fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let active = self.get_active_version().await?;
        let pending = match &active {
            None => self.versions.len(),
            Some(label) => match self.versions.index_of(label) {
                Some(index) => self.versions.len() - index - 1,
                None => {
                    let current = parse(label)?;
                    self.versions
                        .iter()
                        .filter(|step| step.semver().precedence(&current) == Ordering::Greater)
                        .count()
                }
            },
        };

        Ok(MigrationStatus {
            active,
            latest: self.versions.last().map(|step| step.normalized().to_string()),
            pending,
        })
    }

    /// Run the action of the step at `index`, then record the step at
    /// `record` as active.
    async fn run_step(
        &mut self,
        index: usize,
        record: usize,
        direction: MigrationDirection,
    ) -> Result<(), MigrationError> {
        let (label, recorded, result) = {
            let step = &self.versions.items()[index];
            let recorded = self.versions.items()[record].normalized().to_string();
            info!(version = %step.normalized(), direction = %direction, "Applying version step");
            let action = match direction {
                MigrationDirection::Up => step.up_action(),
                MigrationDirection::Down => step.down_action(),
            };
            (
                step.normalized().to_string(),
                recorded,
                action.run(&self.context).await,
            )
        };

        if let Err(source) = result {
            error!(version = %label, direction = %direction, error = %source, "Version step failed");
            return Err(match direction {
                MigrationDirection::Up => MigrationError::UpgradeFailed {
                    version: label,
                    source,
                },
                MigrationDirection::Down => MigrationError::DowngradeFailed {
                    version: label,
                    source,
                },
            });
        }

        if let Err(e) = self
            .set_active_version(ActiveTarget::Version(recorded))
            .await
        {
            error!(version = %label, error = %e, "Version step ran but was not recorded");
            return Err(e);
        }
        Ok(())
    }

    fn plan(
        &self,
        target: &Target,
        from: String,
        from_index: Option<usize>,
        to_index: Option<usize>,
        is_initial: bool,
    ) -> Plan {
        let to = match (target, to_index) {
            (_, Some(index)) => self.versions.items()[index].normalized().to_string(),
            (Target::Version(label), None) => label.clone(),
            (_, None) => from.clone(),
        };
        Plan {
            from,
            from_index,
            to,
            to_index,
            is_initial,
        }
    }

    /// Last (highest-sorted) step whose version matches `predicate`.
    fn rposition(&self, predicate: impl Fn(&SemVer) -> bool) -> Option<usize> {
        self.versions
            .items()
            .iter()
            .rposition(|step| predicate(step.semver()))
    }

    /// Newest member of the smallest major group above `current`.
    fn next_major_group(&self, current: &SemVer) -> Option<usize> {
        let major = self
            .versions
            .iter()
            .map(|step| step.major())
            .filter(|major| *major > current.major)
            .min()?;
        self.rposition(|v| v.major == major)
    }
}

fn resolved_indices(plan: &Plan) -> Result<(usize, usize), MigrationError> {
    match (plan.from_index, plan.to_index) {
        (Some(from), Some(to)) => Ok((from, to)),
        (None, _) => Err(MigrationError::TargetNotFound(plan.from.clone())),
        (_, None) => Err(MigrationError::TargetNotFound(plan.to.clone())),
    }
}

fn normalize_stored(stored: Option<String>) -> Result<Option<String>, MigrationError> {
    match stored.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => Ok(Some(normalize(label, true)?)),
        _ => Ok(None),
    }
}
