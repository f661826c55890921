// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Operating system account database access.
//!
//! sdcsite never owns the user and group databases. It takes a read-only
//! [`SystemSnapshot`] of them at the start of a run through a
//! [`SnapshotProvider`], and it changes them only by handing a
//! [`Change`](crate::reconcile::Change) to a [`SystemExecutor`]. Both seams
//! are traits so that planning can be exercised against synthetic account
//! data.
//!
//! # Account Sources
//!
//! The default provider is [`Getent`], which enumerates the databases through
//! the name service switch, so accounts held in LDAP or SSSD are seen the
//! same as local ones. [`EtcFiles`] reads the flat files directly instead.
//! Both yield the classic colon separated format:
//!
//! ```text
//! passwd: name:password:uid:gid:gecos:home:shell
//! group:  name:password:gid:member,member,...
//! ```
//!
//! NIS compat entries (lines starting with `+` or `-`) are skipped.

use crate::reconcile::Change;

use std::{
    collections::BTreeSet,
    ffi::OsStr,
    fs::read_to_string,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tracing::{debug, instrument};

/// System user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
}

/// System group with its supplementary members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Point in time copy of the user and group databases.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    users: Vec<UserEntry>,
    groups: Vec<GroupEntry>,
}

impl SystemSnapshot {
    /// Construct new snapshot from account entries.
    pub fn new(users: Vec<UserEntry>, groups: Vec<GroupEntry>) -> Self {
        Self { users, groups }
    }

    pub fn users(&self) -> &[UserEntry] {
        &self.users
    }

    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    /// Check if user account exists.
    pub fn has_user(&self, name: &str) -> bool {
        self.users.iter().any(|user| user.name == name)
    }

    /// Look up user ID of user account.
    pub fn uid_of(&self, name: &str) -> Option<u32> {
        self.users
            .iter()
            .find(|user| user.name == name)
            .map(|user| user.uid)
    }

    /// Look up group ID of group.
    pub fn gid_of(&self, name: &str) -> Option<u32> {
        self.groups
            .iter()
            .find(|group| group.name == name)
            .map(|group| group.gid)
    }

    /// Names of all groups starting with prefix.
    pub fn groups_with_prefix(&self, prefix: &str) -> BTreeSet<String> {
        self.groups
            .iter()
            .filter(|group| group.name.starts_with(prefix))
            .map(|group| group.name.clone())
            .collect()
    }

    /// Names of all groups listing user as a supplementary member.
    pub fn memberships(&self, user_name: &str) -> BTreeSet<String> {
        self.groups
            .iter()
            .filter(|group| group.members.iter().any(|member| member == user_name))
            .map(|group| group.name.clone())
            .collect()
    }
}

/// Source of account database snapshots.
pub trait SnapshotProvider {
    /// Take a snapshot of the user and group databases.
    fn snapshot(&self) -> Result<SystemSnapshot>;
}

/// Snapshot provider backed by the name service switch.
///
/// Runs `getent passwd` and `getent group`, which report every account the
/// system resolves, local or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Getent {
    program: PathBuf,
}

impl Getent {
    /// Construct new provider running given `getent` compatible program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Getent {
    fn default() -> Self {
        Self::new("getent")
    }
}

impl SnapshotProvider for Getent {
    #[instrument(skip(self), level = "debug")]
    fn snapshot(&self) -> Result<SystemSnapshot> {
        debug!("enumerate account databases with {:?}", self.program.display());
        let passwd = syscall_stdout(&self.program, ["passwd"])?;
        let group = syscall_stdout(&self.program, ["group"])?;
        let program = self.program.display();
        let users = parse_database(&format!("{program} passwd"), &passwd, parse_user)?;
        let groups = parse_database(&format!("{program} group"), &group, parse_group)?;

        Ok(SystemSnapshot { users, groups })
    }
}

/// Snapshot provider backed by passwd and group files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcFiles {
    passwd: PathBuf,
    group: PathBuf,
}

impl EtcFiles {
    /// Construct new provider reading from given database files.
    pub fn new(passwd: impl Into<PathBuf>, group: impl Into<PathBuf>) -> Self {
        Self {
            passwd: passwd.into(),
            group: group.into(),
        }
    }
}

impl Default for EtcFiles {
    fn default() -> Self {
        Self::new("/etc/passwd", "/etc/group")
    }
}

impl SnapshotProvider for EtcFiles {
    #[instrument(skip(self), level = "debug")]
    fn snapshot(&self) -> Result<SystemSnapshot> {
        debug!(
            "read account databases {:?} and {:?}",
            self.passwd.display(),
            self.group.display()
        );
        let users = read_database(&self.passwd, parse_user)?;
        let groups = read_database(&self.group, parse_group)?;

        Ok(SystemSnapshot { users, groups })
    }
}

/// Account source selected by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountDatabase {
    /// Enumerate through the name service switch.
    Nss(Getent),

    /// Read flat database files.
    Files(EtcFiles),
}

impl Default for AccountDatabase {
    fn default() -> Self {
        Self::Nss(Getent::default())
    }
}

impl SnapshotProvider for AccountDatabase {
    fn snapshot(&self) -> Result<SystemSnapshot> {
        match self {
            Self::Nss(getent) => getent.snapshot(),
            Self::Files(files) => files.snapshot(),
        }
    }
}

fn read_database<T>(path: &Path, parse: fn(&[&str]) -> Option<T>) -> Result<Vec<T>> {
    let content = read_to_string(path).map_err(|err| SystemError::ReadDatabase {
        source: err,
        path: path.to_path_buf(),
    })?;

    parse_database(&path.display().to_string(), &content, parse)
}

fn parse_database<T>(
    database: &str,
    content: &str,
    parse: fn(&[&str]) -> Option<T>,
) -> Result<Vec<T>> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(['#', '+', '-']) {
            continue;
        }

        let fields = line.split(':').collect::<Vec<_>>();
        let entry = parse(&fields).ok_or_else(|| SystemError::MalformedEntry {
            database: database.to_string(),
            line: index + 1,
        })?;
        entries.push(entry);
    }

    Ok(entries)
}

fn parse_user(fields: &[&str]) -> Option<UserEntry> {
    match fields {
        [name, _, uid, gid, _, _, _] => Some(UserEntry {
            name: name.to_string(),
            uid: uid.parse().ok()?,
            gid: gid.parse().ok()?,
        }),
        _ => None,
    }
}

fn parse_group(fields: &[&str]) -> Option<GroupEntry> {
    match fields {
        [name, _, gid, members] => Some(GroupEntry {
            name: name.to_string(),
            gid: gid.parse().ok()?,
            members: members
                .split(',')
                .filter(|member| !member.is_empty())
                .map(str::to_owned)
                .collect(),
        }),
        _ => None,
    }
}

/// Carry out changes against the account databases.
pub trait SystemExecutor {
    /// Apply one change.
    fn execute(&self, change: &Change) -> Result<String>;
}

/// Executor that runs the standard shadow-utils commands.
///
/// Commands are spawned directly, never through a shell.
#[derive(Debug, Default, Clone)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl SystemExecutor for CommandExecutor {
    #[instrument(skip(self), level = "debug")]
    fn execute(&self, change: &Change) -> Result<String> {
        let (cmd, args) = change.command();
        syscall_non_interactive(cmd, args)
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = spawn(cmd.as_ref(), args)?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            cmd: cmd.as_ref().to_string_lossy().into_owned(),
            message,
        });
    }

    Ok(message)
}

fn syscall_stdout(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = spawn(cmd.as_ref(), args)?;
    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            cmd: cmd.as_ref().to_string_lossy().into_owned(),
            message: String::from_utf8_lossy(output.stderr.as_slice())
                .trim_end()
                .to_string(),
        });
    }

    Ok(String::from_utf8_lossy(output.stdout.as_slice()).into_owned())
}

fn spawn(cmd: &OsStr, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<Output> {
    Command::new(cmd)
        .args(args)
        .output()
        .map_err(|err| SystemError::Spawn {
            source: err,
            cmd: cmd.to_string_lossy().into_owned(),
        })
}

/// Account database error types.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Database file cannot be read.
    #[error("failed to read account database at {:?}", path.display())]
    ReadDatabase {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Database has a line that does not parse.
    #[error("malformed entry in {database:?} at line {line}")]
    MalformedEntry { database: String, line: usize },

    /// Command cannot be spawned.
    #[error("failed to run command {cmd:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        cmd: String,
    },

    /// Command ran but reported failure.
    #[error("command {cmd:?} failed:\n{message}")]
    CommandFailed { cmd: String, message: String },
}

/// Friendly result alias :3
pub type Result<T, E = SystemError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn write_databases() -> std::io::Result<()> {
        std::fs::write(
            "passwd",
            indoc! {"
                root:x:0:0:root:/root:/bin/bash
                # service accounts
                jdoe:x:1000:1000:Jane Doe:/home/jdoe:/bin/sh

                asmith:x:1001:1001::/home/asmith:/bin/sh
            "},
        )?;
        std::fs::write(
            "group",
            indoc! {"
                root:x:0:
                wheel:x:10:jdoe
                sdc_capstone1:x:2000:jdoe,asmith
                sdc_old:x:2001:
            "},
        )
    }

    #[sealed_test]
    fn snapshot_from_etc_files() -> anyhow::Result<()> {
        write_databases()?;
        let snapshot = EtcFiles::new("passwd", "group").snapshot()?;

        assert_eq!(snapshot.users().len(), 3);
        assert!(snapshot.has_user("asmith"));
        assert!(!snapshot.has_user("ghost"));
        assert_eq!(snapshot.uid_of("jdoe"), Some(1000));
        assert_eq!(snapshot.gid_of("sdc_capstone1"), Some(2000));
        assert_eq!(snapshot.gid_of("sdc_missing"), None);
        assert_eq!(
            snapshot.groups_with_prefix("sdc_"),
            BTreeSet::from(["sdc_capstone1".to_string(), "sdc_old".to_string()])
        );
        assert_eq!(
            snapshot.memberships("jdoe"),
            BTreeSet::from(["sdc_capstone1".to_string(), "wheel".to_string()])
        );
        assert!(snapshot.memberships("root").is_empty());

        Ok(())
    }

    #[sealed_test]
    fn malformed_line_reports_position() -> anyhow::Result<()> {
        write_databases()?;
        std::fs::write("group", "root:x:0:\nbroken:x:notanumber:\n")?;
        let result = EtcFiles::new("passwd", "group").snapshot();
        assert!(matches!(
            result,
            Err(SystemError::MalformedEntry { line: 2, .. })
        ));

        Ok(())
    }

    #[sealed_test]
    fn nis_compat_lines_are_skipped() -> anyhow::Result<()> {
        std::fs::write(
            "passwd",
            indoc! {"
                root:x:0:0:root:/root:/bin/bash
                +::::::
                +@students::::::
                -baduser
                jdoe:x:1000:1000:Jane Doe:/home/jdoe:/bin/sh
            "},
        )?;
        std::fs::write("group", "root:x:0:
+:::
-sdc_hidden:::
sdc_capstone1:x:2000:jdoe
")?;
        let snapshot = EtcFiles::new("passwd", "group").snapshot()?;

        assert_eq!(snapshot.users().len(), 2);
        assert!(snapshot.has_user("jdoe"));
        assert_eq!(
            snapshot.groups_with_prefix("sdc_"),
            BTreeSet::from(["sdc_capstone1".to_string()])
        );

        Ok(())
    }

    #[sealed_test]
    fn snapshot_from_getent() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        write_databases()?;
        std::fs::write("fake-getent", "#!/bin/sh\ncat \"$1\"\n")?;
        std::fs::set_permissions("fake-getent", std::fs::Permissions::from_mode(0o755))?;
        let nss = AccountDatabase::Nss(Getent::new("./fake-getent")).snapshot()?;
        let files = AccountDatabase::Files(EtcFiles::new("passwd", "group")).snapshot()?;

        assert_eq!(nss, files);
        assert_eq!(nss.uid_of("asmith"), Some(1001));

        Ok(())
    }

    #[test]
    fn failing_getent_is_error() {
        let result = Getent::new("false").snapshot();
        assert!(matches!(
            result,
            Err(SystemError::CommandFailed { ref cmd, .. }) if cmd == "false"
        ));
    }

    #[test]
    fn default_account_database_uses_nss() {
        assert_eq!(AccountDatabase::default(), AccountDatabase::Nss(Getent::new("getent")));
    }

    #[sealed_test]
    fn missing_database_names_path() {
        let result = EtcFiles::new("nope", "group").snapshot();
        assert!(matches!(
            result,
            Err(SystemError::ReadDatabase { ref path, .. }) if path == Path::new("nope")
        ));
    }

    #[test]
    fn failing_command_is_error() {
        let result = syscall_non_interactive("false", Vec::<String>::new());
        assert!(matches!(result, Err(SystemError::CommandFailed { .. })));

        let result = syscall_non_interactive("echo", ["hello"]);
        assert_eq!(result.unwrap(), "stdout: hello");
    }
}
