// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Site directory provisioning.
//!
//! Lays out the site tree for a roster:
//!
//! ```text
//! <root>/                     admin            0755
//! <root>/students/            admin            0755
//! <root>/students/<user>/     user:user        0711
//! <root>/projects/            admin            0755
//! <root>/projects/<dir>/      admin:<group>    2771
//! <root>/index.html           admin            0644
//! <root>/a.css                admin            0644
//! ```
//!
//! Provisioning is idempotent. Directories that already exist are reported
//! and left alone, so a run that died half way can simply be repeated. The
//! one exception is an existing directory whose owner or group differs from
//! the resolved owner, which gets ownership and mode applied again. That
//! picks up a project group created after its directory. There is no
//! rollback.

use crate::{reconcile::Mode, roster::Roster, system::SystemSnapshot};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{metadata, set_permissions, write, DirBuilder, Permissions},
    io::ErrorKind,
    os::unix::fs::{chown, DirBuilderExt, MetadataExt, PermissionsExt},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Name of the directory holding student directories.
pub const STUDENTS_DIRECTORY: &str = "students";

/// Name of the directory holding project directories.
pub const PROJECTS_DIRECTORY: &str = "projects";

/// Mode of the site root and its containers.
pub const CONTAINER_MODE: u32 = 0o755;

/// Mode of a student directory: private, traversal only for others.
pub const STUDENT_MODE: u32 = 0o711;

/// Mode of a project directory: setgid, group writable, no access for others
/// beyond traversal.
pub const PROJECT_MODE: u32 = 0o2771;

/// Mode of generated site files.
pub const SITE_FILE_MODE: u32 = 0o644;

/// Administrator identity that owns everything not owned by a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admin {
    pub user: String,
    pub group: String,
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            user: "root".into(),
            group: "root".into(),
        }
    }
}

/// Resolved owner of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub user: String,
    pub group: String,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

/// Resolve who should own a path.
///
/// If the intended user has no account, both user and group fall back to
/// the administrator. IDs are looked up in the snapshot and stay empty when
/// the account or group does not exist.
pub fn resolve_ownership(
    snapshot: &SystemSnapshot,
    admin: &Admin,
    user: &str,
    group: &str,
) -> Ownership {
    let (user, group) = if snapshot.has_user(user) {
        (user, group)
    } else {
        (admin.user.as_str(), admin.group.as_str())
    };

    Ownership {
        user: user.to_string(),
        group: group.to_string(),
        uid: snapshot.uid_of(user),
        gid: snapshot.gid_of(group),
    }
}

/// Check if a path owned by uid and gid differs from resolved owner.
///
/// IDs the snapshot could not resolve never count as a difference.
pub fn ownership_drifted(owner: &Ownership, uid: u32, gid: u32) -> bool {
    owner.uid.is_some_and(|expect| expect != uid) || owner.gid.is_some_and(|expect| expect != gid)
}

/// Outcome of provisioning one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryState {
    /// Directory was created.
    Created,

    /// Directory was already present and was left untouched.
    AlreadyExists,

    /// Directory was already present with the wrong owner and was fixed.
    Corrected,

    /// Directory would be created outside of dry-run mode.
    Planned,
}

impl Display for DirectoryState {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Created => fmt.write_str("created"),
            Self::AlreadyExists => fmt.write_str("already exists"),
            Self::Corrected => fmt.write_str("ownership corrected"),
            Self::Planned => fmt.write_str("planned"),
        }
    }
}

/// Outcome of provisioning a whole site tree, in creation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub entries: Vec<(PathBuf, DirectoryState)>,
}

impl ProvisionReport {
    /// Count entries in given state.
    pub fn count(&self, state: DirectoryState) -> usize {
        self.entries.iter().filter(|(_, s)| *s == state).count()
    }
}

/// Create site tree with ownership and permission policy applied.
#[derive(Debug, Clone)]
pub struct Provisioner<'a> {
    root: PathBuf,
    admin: Admin,
    snapshot: &'a SystemSnapshot,
    mode: Mode,
}

impl<'a> Provisioner<'a> {
    /// Construct new provisioner for site root.
    pub fn new(
        root: impl Into<PathBuf>,
        admin: Admin,
        snapshot: &'a SystemSnapshot,
        mode: Mode,
    ) -> Self {
        Self {
            root: root.into(),
            admin,
            snapshot,
            mode,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Provision the whole site tree for roster.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError`] for the first directory that cannot be
    ///   created, chowned, or chmodded. Existing directories are not errors.
    #[instrument(skip(self, roster), level = "debug")]
    pub fn provision(&self, roster: &Roster) -> Result<ProvisionReport> {
        let mut report = ProvisionReport::default();
        let admin = (self.admin.user.as_str(), self.admin.group.as_str());

        let mut ensure = |path: PathBuf, user: &str, group: &str, mode: u32| -> Result<()> {
            let state = self.ensure_directory(&path, user, group, mode)?;
            report.entries.push((path, state));
            Ok(())
        };

        ensure(self.root.clone(), admin.0, admin.1, CONTAINER_MODE)?;

        let base = self.root.join(STUDENTS_DIRECTORY);
        ensure(base.clone(), admin.0, admin.1, CONTAINER_MODE)?;
        for student in roster.students().values() {
            ensure(
                base.join(&student.user_name),
                &student.user_name,
                &student.user_name,
                STUDENT_MODE,
            )?;
        }

        let base = self.root.join(PROJECTS_DIRECTORY);
        ensure(base.clone(), admin.0, admin.1, CONTAINER_MODE)?;
        for project in roster.projects().values() {
            ensure(
                base.join(&project.directory_name),
                admin.0,
                &project.group_name,
                PROJECT_MODE,
            )?;
        }

        Ok(report)
    }

    /// Ensure a single directory exists.
    ///
    /// Existing directories are reported as [`DirectoryState::AlreadyExists`]
    /// in either mode, unless their ownership drifted from the resolved
    /// owner. Those are reported as [`DirectoryState::Corrected`] after
    /// ownership and mode are applied again. In dry-run mode nothing is
    /// created or corrected.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::CreateDirectory`] if directory cannot be
    ///   created for any reason other than already existing.
    /// - Return [`ProvisionError::Inspect`] if existing directory cannot be
    ///   inspected.
    /// - Return [`ProvisionError::Chown`] or [`ProvisionError::Chmod`] if
    ///   ownership or permissions cannot be applied.
    pub fn ensure_directory(
        &self,
        path: &Path,
        user: &str,
        group: &str,
        mode: u32,
    ) -> Result<DirectoryState> {
        let owner = resolve_ownership(self.snapshot, &self.admin, user, group);
        info!(
            "making directory {} user={} group={} mode={mode:o}",
            path.display(),
            owner.user,
            owner.group
        );

        if self.mode.is_dry_run() {
            if path.exists() {
                if self.has_drifted(path, &owner)? {
                    warn!(
                        "directory {} already exists, would correct ownership to {}:{}",
                        path.display(),
                        owner.user,
                        owner.group
                    );
                } else {
                    warn!("directory {} already exists", path.display());
                }
                return Ok(DirectoryState::AlreadyExists);
            }

            info!("mkdir {}", path.display());
            return Ok(DirectoryState::Planned);
        }

        match DirBuilder::new().mode(mode).create(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if !self.has_drifted(path, &owner)? {
                    warn!("directory {} already exists", path.display());
                    return Ok(DirectoryState::AlreadyExists);
                }

                warn!(
                    "directory {} already exists, correcting ownership to {}:{}",
                    path.display(),
                    owner.user,
                    owner.group
                );
                self.apply_policy(path, &owner, mode)?;
                return Ok(DirectoryState::Corrected);
            }
            Err(err) => {
                return Err(ProvisionError::CreateDirectory {
                    source: err,
                    path: path.to_path_buf(),
                })
            }
        }

        self.apply_policy(path, &owner, mode)?;

        Ok(DirectoryState::Created)
    }

    /// Write generated site file at the site root.
    ///
    /// In dry-run mode the contents are logged instead.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::WriteFile`] if file cannot be written.
    /// - Return [`ProvisionError::Chown`] or [`ProvisionError::Chmod`] if
    ///   ownership or permissions cannot be applied.
    #[instrument(skip(self, contents), level = "debug")]
    pub fn write_site_file(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.root.join(name);
        if self.mode.is_dry_run() {
            info!("would have written {}:\n{contents}", path.display());
            return Ok(());
        }

        info!("write {}", path.display());
        write(&path, contents).map_err(|err| ProvisionError::WriteFile {
            source: err,
            path: path.clone(),
        })?;

        let owner = resolve_ownership(self.snapshot, &self.admin, &self.admin.user, &self.admin.group);
        self.apply_owner(&path, &owner)?;
        set_permissions(&path, Permissions::from_mode(SITE_FILE_MODE)).map_err(|err| {
            ProvisionError::Chmod {
                source: err,
                path: path.clone(),
            }
        })?;

        Ok(())
    }

    fn has_drifted(&self, path: &Path, owner: &Ownership) -> Result<bool> {
        let meta = metadata(path).map_err(|err| ProvisionError::Inspect {
            source: err,
            path: path.to_path_buf(),
        })?;

        Ok(ownership_drifted(owner, meta.uid(), meta.gid()))
    }

    fn apply_policy(&self, path: &Path, owner: &Ownership, mode: u32) -> Result<()> {
        // INVARIANT: Chown before chmod, so the setgid bit survives.
        self.apply_owner(path, owner)?;
        set_permissions(path, Permissions::from_mode(mode)).map_err(|err| {
            ProvisionError::Chmod {
                source: err,
                path: path.to_path_buf(),
            }
        })
    }

    fn apply_owner(&self, path: &Path, owner: &Ownership) -> Result<()> {
        if owner.uid.is_none() {
            warn!("no account {:?}, keeping owner of {}", owner.user, path.display());
        }

        if owner.gid.is_none() {
            warn!("no group {:?}, keeping group of {}", owner.group, path.display());
        }

        if owner.uid.is_none() && owner.gid.is_none() {
            return Ok(());
        }

        chown(path, owner.uid, owner.gid).map_err(|err| ProvisionError::Chown {
            source: err,
            path: path.to_path_buf(),
            user: owner.user.clone(),
            group: owner.group.clone(),
        })
    }
}

/// Provisioning error types.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDirectory {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Existing path cannot be inspected.
    #[error("failed to inspect {:?}", path.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Ownership cannot be changed.
    #[error("failed to chown {:?} to {user}:{group}", path.display())]
    Chown {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        user: String,
        group: String,
    },

    /// Permissions cannot be changed.
    #[error("failed to chmod {:?}", path.display())]
    Chmod {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Site file cannot be written.
    #[error("failed to write site file {:?}", path.display())]
    WriteFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ProvisionError> = std::result::Result<T, E>;
