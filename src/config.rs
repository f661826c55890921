// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional sdcsite configuration file to simplify
//! serialization and deserialization. File I/O is left to the caller to
//! figure out. Command line flags take precedence over anything set here.
//!
//! # General Layout
//!
//! ```toml
//! [site]
//! root = "/var/www/sdc"
//!
//! [accounts]
//! admin_user = "root"
//! admin_group = "root"
//! source = "nss"
//! passwd = "/etc/passwd"
//! group = "/etc/group"
//! ```
//!
//! Every key is optional. Accounts are enumerated through the name service
//! switch unless `source = "files"`, in which case `passwd` and `group` are
//! read directly. Path values go through shell expansion, so variables like
//! `$HOME` and a leading `~` work.

use crate::{
    provision::Admin,
    system::{AccountDatabase, EtcFiles, Getent},
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Top level configuration.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Site tree settings.
    pub site: SiteSettings,

    /// Account database settings.
    pub accounts: AccountSettings,
}

impl Config {
    /// Administrator identity to own shared paths.
    pub fn admin(&self) -> Admin {
        Admin {
            user: self.accounts.admin_user.clone(),
            group: self.accounts.admin_group.clone(),
        }
    }

    /// Account snapshot provider for configured source.
    pub fn account_database(&self) -> AccountDatabase {
        match self.accounts.source {
            AccountSource::Nss => AccountDatabase::Nss(Getent::default()),
            AccountSource::Files => AccountDatabase::Files(EtcFiles::new(
                &self.accounts.passwd,
                &self.accounts.group,
            )),
        }
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(root) = config.site.root.take() {
            config.site.root = Some(expand(root)?);
        }
        config.accounts.passwd = expand(std::mem::take(&mut config.accounts.passwd))?;
        config.accounts.group = expand(std::mem::take(&mut config.accounts.group))?;

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Site tree settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Directory to provision the site tree under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Account database settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccountSettings {
    /// Account owning the site root, containers, and project directories.
    pub admin_user: String,

    /// Group paired with the administrator account.
    pub admin_group: String,

    /// Where account snapshots come from.
    pub source: AccountSource,

    /// Path to the user account database.
    pub passwd: PathBuf,

    /// Path to the group database.
    pub group: PathBuf,
}

impl Default for AccountSettings {
    fn default() -> Self {
        let admin = Admin::default();
        Self {
            admin_user: admin.user,
            admin_group: admin.group,
            source: AccountSource::default(),
            passwd: "/etc/passwd".into(),
            group: "/etc/group".into(),
        }
    }
}

/// Origin of user and group account data.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSource {
    /// Name service switch, through `getent`.
    #[default]
    Nss,

    /// Flat passwd and group files.
    Files,
}

fn expand(path: PathBuf) -> Result<PathBuf> {
    Ok(shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned()
        .into())
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
