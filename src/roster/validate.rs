// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record field syntax checks.
//!
//! User names follow the useradd(8) rules minus the optional trailing `$`:
//! a lower case letter or underscore, then lower case letters, digits,
//! underscores, or dashes.

use crate::roster::model::Semester;

use regex::Regex;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").unwrap());
static USER_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*$").unwrap());
static DIRECTORY_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Check that year is exactly four ASCII digits.
pub fn is_valid_year(year: &str) -> bool {
    YEAR.is_match(year)
}

/// Check that user name is a legal system account name.
pub fn is_valid_user_name(user_name: &str) -> bool {
    USER_NAME.is_match(user_name)
}

/// Check that semester is one of the known literals.
pub fn is_valid_semester(semester: &str) -> bool {
    semester.parse::<Semester>().is_ok()
}

/// Check that directory name is safe to use as a single path component.
pub fn is_valid_directory_name(directory_name: &str) -> bool {
    DIRECTORY_NAME.is_match(directory_name)
}
