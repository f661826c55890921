// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Roster entities.
//!
//! Plain data describing the students and projects of one run. Nothing in
//! here talks to the operating system. Entities are only ever constructed by
//! the roster builder after validation, so every value held here is known to
//! satisfy the record syntax rules.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Prefix shared by every project group.
pub const GROUP_PREFIX: &str = "sdc_";

/// Longest group name the system accepts.
pub const GROUP_NAME_MAX_LEN: usize = 16;

/// Academic semester.
///
/// Variants are declared in calendar order, so the derived ordering is the
/// ascending order within a year: Spring < SummerI < SummerII < Fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semester {
    Spring,
    SummerI,
    SummerII,
    Fall,
}

impl Semester {
    /// All semesters in ascending order.
    pub const ALL: [Semester; 4] = [
        Semester::Spring,
        Semester::SummerI,
        Semester::SummerII,
        Semester::Fall,
    ];

    /// Literal used in record files and rendered output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::SummerI => "SummerI",
            Self::SummerII => "SummerII",
            Self::Fall => "Fall",
        }
    }
}

impl Display for Semester {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = UnknownSemester;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|semester| semester.as_str() == data)
            .ok_or_else(|| UnknownSemester(data.to_string()))
    }
}

/// Semester literal is not one of the four known values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown semester {0:?}")]
pub struct UnknownSemester(pub String);

/// A (year, semester) pair.
///
/// Ordering is chronological: year first, then semester rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term {
    pub year: u16,
    pub semester: Semester,
}

impl Term {
    pub fn new(year: u16, semester: Semester) -> Self {
        Self { year, semester }
    }
}

impl Display for Term {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} {}", self.year, self.semester)
    }
}

/// Enrolled student.
///
/// The user name doubles as the student's system account name and is unique
/// across a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub term: Term,
    pub class_name: String,
    pub user_name: String,
    pub name: String,
}

impl Student {
    /// Last whitespace delimited token of the display name.
    pub fn surname(&self) -> &str {
        self.name.split_whitespace().last().unwrap_or_default()
    }

    /// Display name in "Surname, First Middle" form.
    ///
    /// Single token names have nothing to put after the comma, so they come
    /// out as the bare surname.
    pub fn sort_name(&self) -> String {
        let tokens = self.name.split_whitespace().collect::<Vec<_>>();
        match tokens.split_last() {
            Some((surname, [])) => surname.to_string(),
            Some((surname, rest)) => format!("{surname}, {}", rest.join(" ")),
            None => String::new(),
        }
    }
}

/// Course project with a shared team directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub term: Term,
    pub class_name: String,
    pub name: String,
    pub directory_name: String,
    pub group_name: String,

    /// Team members in the order the record listed them.
    pub students: Vec<Student>,
}

impl Project {
    /// Check if student with given user name is on this project's team.
    pub fn has_member(&self, user_name: &str) -> bool {
        self.students
            .iter()
            .any(|student| student.user_name == user_name)
    }
}

/// Derive the system group name of a project directory.
///
/// Prefixes [`GROUP_PREFIX`], lowercases, and truncates to
/// [`GROUP_NAME_MAX_LEN`] characters.
pub fn group_name(directory_name: &str) -> String {
    format!("{GROUP_PREFIX}{directory_name}")
        .to_lowercase()
        .chars()
        .take(GROUP_NAME_MAX_LEN)
        .collect()
}
