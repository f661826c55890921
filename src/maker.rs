// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Site maker.
//!
//! Drives one full run against a roster, in this order:
//!
//! 1. Remove project groups nobody needs anymore.
//! 2. Plan group membership of every student.
//! 3. Provision the site directory tree.
//! 4. Write the index page and stylesheet.
//!
//! The first fatal error stops the run. Nothing done before it is rolled
//! back, but every step is safe to repeat, so the fix is to rerun.

use crate::{
    provision::{Admin, ProvisionReport, Provisioner},
    reconcile::{execute, plan_memberships, GroupPlan, MembershipPlan, Mode},
    roster::Roster,
    site::{render, Site, INDEX_FILE, STYLESHEET_FILE},
    system::{CommandExecutor, SystemExecutor, SystemSnapshot},
};

use std::path::PathBuf;
use tracing::{info, instrument};

/// Everything a run decided and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeReport {
    pub groups: GroupPlan,
    pub memberships: Vec<MembershipPlan>,
    pub directories: ProvisionReport,
    pub site: Site,
}

/// Reconcile system state and site tree with a roster.
#[derive(Debug)]
pub struct SiteMaker<E = CommandExecutor>
where
    E: SystemExecutor,
{
    roster: Roster,
    snapshot: SystemSnapshot,
    root: PathBuf,
    admin: Admin,
    mode: Mode,
    executor: E,
}

impl<E> SiteMaker<E>
where
    E: SystemExecutor,
{
    /// Construct new site maker.
    pub fn new(
        roster: Roster,
        snapshot: SystemSnapshot,
        root: impl Into<PathBuf>,
        admin: Admin,
        mode: Mode,
        executor: E,
    ) -> Self {
        Self {
            roster,
            snapshot,
            root: root.into(),
            admin,
            mode,
            executor,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// - Return [`MakeError::System`] if a group change fails to apply.
    /// - Return [`MakeError::Provision`] if the site tree cannot be created
    ///   or the site files cannot be written.
    #[instrument(skip(self), level = "debug")]
    pub fn make(&self) -> Result<MakeReport> {
        let groups = self.correct_groups()?;
        let memberships = self.correct_users()?;
        let directories = self.make_directories()?;
        let site = self.create_index()?;

        Ok(MakeReport {
            groups,
            memberships,
            directories,
            site,
        })
    }

    /// Remove stale project groups.
    ///
    /// Missing project groups are planned as well, but their creation is
    /// suppressed.
    ///
    /// # Errors
    ///
    /// - Return [`MakeError::System`] if a group removal fails.
    pub fn correct_groups(&self) -> Result<GroupPlan> {
        let plan = GroupPlan::from_roster(&self.roster, &self.snapshot);
        info!(
            "{} project groups to remove, {} missing",
            plan.to_remove.len(),
            plan.to_add.len()
        );
        execute(&plan.directives(self.mode), &self.executor)?;

        Ok(plan)
    }

    /// Plan group membership of every student.
    ///
    /// Membership changes are suppressed, so this only ever logs.
    ///
    /// # Errors
    ///
    /// - Return [`MakeError::System`] if a membership change fails to apply.
    pub fn correct_users(&self) -> Result<Vec<MembershipPlan>> {
        let plans = plan_memberships(&self.roster, &self.snapshot);
        let directives = plans
            .iter()
            .filter_map(MembershipPlan::directive)
            .collect::<Vec<_>>();
        execute(&directives, &self.executor)?;

        Ok(plans)
    }

    /// Provision the site directory tree.
    ///
    /// # Errors
    ///
    /// - Return [`MakeError::Provision`] if a directory cannot be created.
    pub fn make_directories(&self) -> Result<ProvisionReport> {
        Ok(self.provisioner().provision(&self.roster)?)
    }

    /// Render and write the index page and stylesheet.
    ///
    /// # Errors
    ///
    /// - Return [`MakeError::Provision`] if a site file cannot be written.
    pub fn create_index(&self) -> Result<Site> {
        let site = render(&self.roster);
        let provisioner = self.provisioner();
        provisioner.write_site_file(INDEX_FILE, &site.html)?;
        provisioner.write_site_file(STYLESHEET_FILE, &site.css)?;

        Ok(site)
    }

    fn provisioner(&self) -> Provisioner<'_> {
        Provisioner::new(&self.root, self.admin.clone(), &self.snapshot, self.mode)
    }
}

/// Site maker error types.
#[derive(Debug, thiserror::Error)]
pub enum MakeError {
    /// Account database change fails.
    #[error(transparent)]
    System(#[from] crate::system::SystemError),

    /// Site tree or site files cannot be written.
    #[error(transparent)]
    Provision(#[from] crate::provision::ProvisionError),
}

/// Friendly result alias :3
type Result<T, E = MakeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        provision::DirectoryState,
        reconcile::Change,
        system::GroupEntry,
    };
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{cell::RefCell, path::Path};

    #[derive(Debug, Default)]
    struct RecordingExecutor {
        seen: RefCell<Vec<Change>>,
    }

    impl SystemExecutor for RecordingExecutor {
        fn execute(&self, change: &Change) -> crate::system::Result<String> {
            self.seen.borrow_mut().push(change.clone());
            Ok(String::new())
        }
    }

    fn maker(mode: Mode) -> SiteMaker<RecordingExecutor> {
        let roster = Roster::from_rows([
            vec!["student", "2023", "Fall", "CS101", "jdoe", "Jane Doe"],
            vec!["project", "2023", "Fall", "CS401", "capstone1", "jdoe", "Capstone Alpha"],
        ])
        .unwrap();
        let snapshot = SystemSnapshot::new(
            vec![],
            vec![
                GroupEntry {
                    name: "sdc_stale".into(),
                    gid: 2001,
                    members: vec!["jdoe".into()],
                },
                GroupEntry {
                    name: "sdc_capstone1".into(),
                    gid: 2000,
                    members: vec![],
                },
            ],
        );

        SiteMaker::new(
            roster,
            snapshot,
            "site",
            Admin::default(),
            mode,
            RecordingExecutor::default(),
        )
    }

    #[sealed_test]
    fn live_run_applies_only_group_removal() -> anyhow::Result<()> {
        let maker = maker(Mode::Live);
        let report = maker.make()?;

        assert_eq!(
            maker.executor.seen.borrow().clone(),
            vec![Change::DeleteGroup("sdc_stale".into())]
        );
        assert!(report.groups.to_add.is_empty());
        assert_eq!(report.memberships.len(), 1);
        assert!(report.memberships[0].to_add.contains("sdc_capstone1"));
        assert!(report.memberships[0].to_remove.contains("sdc_stale"));
        assert_eq!(report.directories.count(DirectoryState::Created), 5);
        assert_eq!(
            std::fs::read_to_string("site/index.html")?,
            report.site.html
        );
        assert!(Path::new("site/a.css").exists());

        Ok(())
    }

    #[sealed_test]
    fn dry_run_applies_nothing() -> anyhow::Result<()> {
        let maker = maker(Mode::DryRun);
        let report = maker.make()?;

        assert!(maker.executor.seen.borrow().is_empty());
        assert_eq!(report.directories.count(DirectoryState::Planned), 5);
        assert!(!Path::new("site").exists());

        Ok(())
    }
}
