// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project group reconciliation.
//!
//! Every project owns one system group named after its directory, prefixed
//! with `sdc_`. Reconciliation compares the groups the roster wants against
//! the `sdc_` groups the system has, and works out what must change. The
//! same is done per student for group membership.
//!
//! # Directives
//!
//! Plans are turned into [`Directive`]s. A directive pairs a [`Change`] with
//! a [`Disposition`] that says what should happen to it:
//!
//! - Group removal is applied in live mode, and reported in dry-run mode.
//! - Group addition and per-user membership changes are always computed,
//!   but are __suppressed__. They show up in the logs and in the plan, yet
//!   nothing is executed for them.

use crate::{
    roster::{model::GROUP_PREFIX, Roster},
    system::{SystemExecutor, SystemSnapshot},
};

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, info, instrument};

/// Whether external state may be mutated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Apply changes.
    Live,

    /// Report changes without applying them.
    #[default]
    DryRun,
}

impl Mode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun
        } else {
            Self::Live
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// Single change to the account databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Delete a group.
    DeleteGroup(String),

    /// Create a group.
    AddGroup(String),

    /// Replace the supplementary groups of a user.
    SetUserGroups { user: String, groups: Vec<String> },
}

impl Change {
    /// Command and arguments that carry out this change.
    pub fn command(&self) -> (&'static str, Vec<String>) {
        match self {
            Self::DeleteGroup(group) => ("groupdel", vec![group.clone()]),
            Self::AddGroup(group) => ("groupadd", vec![group.clone()]),
            Self::SetUserGroups { user, groups } => (
                "usermod",
                vec!["-G".into(), groups.join(","), user.clone()],
            ),
        }
    }
}

impl Display for Change {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::DeleteGroup(group) => write!(fmt, "groupdel {group}"),
            Self::AddGroup(group) => write!(fmt, "groupadd {group}"),
            Self::SetUserGroups { user, groups } => {
                write!(fmt, "usermod -G '{}' {user}", groups.join(","))
            }
        }
    }
}

/// What to do with a planned change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Execute the change.
    Apply,

    /// Only report the change.
    DryRunReport,

    /// Planned but never applied.
    Suppressed,
}

/// Planned change with its disposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub change: Change,
    pub disposition: Disposition,
}

impl Directive {
    pub fn new(change: Change, disposition: Disposition) -> Self {
        Self {
            change,
            disposition,
        }
    }
}

/// Project groups to add and remove.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl GroupPlan {
    /// Reconcile existing project groups against desired ones.
    ///
    /// Groups in `existing` without the `sdc_` prefix are ignored, so the
    /// full group list of a system can be passed in as is.
    pub fn new(
        existing: impl IntoIterator<Item = impl Into<String>>,
        desired: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let existing = existing
            .into_iter()
            .map(Into::into)
            .filter(|group: &String| group.starts_with(GROUP_PREFIX))
            .collect::<BTreeSet<String>>();
        let desired = desired
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<String>>();

        Self {
            to_add: desired.difference(&existing).cloned().collect(),
            to_remove: existing.difference(&desired).cloned().collect(),
        }
    }

    /// Reconcile a system snapshot against a roster.
    pub fn from_roster(roster: &Roster, snapshot: &SystemSnapshot) -> Self {
        Self::new(
            snapshot.groups_with_prefix(GROUP_PREFIX),
            roster.project_groups(),
        )
    }

    /// Turn plan into directives.
    ///
    /// Removals follow the mode. Additions are always suppressed.
    pub fn directives(&self, mode: Mode) -> Vec<Directive> {
        let removal = match mode {
            Mode::Live => Disposition::Apply,
            Mode::DryRun => Disposition::DryRunReport,
        };

        self.to_add
            .iter()
            .map(|group| Directive::new(Change::AddGroup(group.clone()), Disposition::Suppressed))
            .chain(
                self.to_remove
                    .iter()
                    .map(|group| Directive::new(Change::DeleteGroup(group.clone()), removal)),
            )
            .collect()
    }
}

/// Group membership changes for one student.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MembershipPlan {
    pub user_name: String,
    pub current: BTreeSet<String>,
    pub desired: BTreeSet<String>,
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl MembershipPlan {
    /// Plan membership of one user.
    ///
    /// Groups without the `sdc_` prefix the user already belongs to are
    /// always kept.
    pub fn new(
        user_name: impl Into<String>,
        current: BTreeSet<String>,
        project_groups: BTreeSet<String>,
    ) -> Self {
        let kept = current
            .iter()
            .filter(|group| !group.starts_with(GROUP_PREFIX))
            .cloned();
        let desired = project_groups.into_iter().chain(kept).collect::<BTreeSet<_>>();

        Self {
            user_name: user_name.into(),
            to_add: desired.difference(&current).cloned().collect(),
            to_remove: current.difference(&desired).cloned().collect(),
            current,
            desired,
        }
    }

    /// Check if membership needs to change at all.
    pub fn is_unchanged(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Turn plan into a directive, if there is anything to change.
    ///
    /// Membership changes are never applied, whatever the mode.
    pub fn directive(&self) -> Option<Directive> {
        if self.is_unchanged() {
            return None;
        }

        Some(Directive::new(
            Change::SetUserGroups {
                user: self.user_name.clone(),
                groups: self.desired.iter().cloned().collect(),
            },
            Disposition::Suppressed,
        ))
    }
}

/// Plan group membership of every student in the roster.
pub fn plan_memberships(roster: &Roster, snapshot: &SystemSnapshot) -> Vec<MembershipPlan> {
    roster
        .students()
        .keys()
        .map(|user_name| {
            MembershipPlan::new(
                user_name.as_str(),
                snapshot.memberships(user_name),
                roster.groups_of(user_name),
            )
        })
        .collect()
}

/// Carry out directives in order.
///
/// Only [`Disposition::Apply`] reaches the executor. Everything else is
/// logged.
///
/// # Errors
///
/// - Return [`SystemError`](crate::system::SystemError) of the first change
///   that fails to apply.
#[instrument(skip(directives, executor), level = "debug")]
pub fn execute(
    directives: &[Directive],
    executor: &impl SystemExecutor,
) -> crate::system::Result<()> {
    for directive in directives {
        match directive.disposition {
            Disposition::Apply => {
                info!("{}", directive.change);
                let output = executor.execute(&directive.change)?;
                if !output.is_empty() {
                    info!("{output}");
                }
            }
            Disposition::DryRunReport => info!("would run: {}", directive.change),
            Disposition::Suppressed => debug!("suppressed: {}", directive.change),
        }
    }

    Ok(())
}
