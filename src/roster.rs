// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Student and project roster.
//!
//! A __roster__ is the validated set of students and projects for one run.
//! It is built once from raw tagged rows and never modified afterwards. Every
//! other part of sdcsite reads from it.
//!
//! # Record Layout
//!
//! Each raw row starts with a tag field. Tags containing "student" (any case)
//! mark student records, tags containing "project" mark project records:
//!
//! ```text
//! student, <year>, <semester>, <class>, <user name>, <name>
//! project, <year>, <semester>, <class>, <directory name>, <user names>, <title>
//! ```
//!
//! The user names field of a project is a comma separated list of students
//! that must already appear as student records. Rows whose fields are all
//! blank are padding and get dropped. Anything else is an error.
//!
//! # Chronology
//!
//! The distinct terms found across students and projects, sorted newest
//! first. Rendering groups its sections by this order.

pub mod model;
pub mod validate;

use crate::roster::{
    model::{group_name, Project, Semester, Student, Term},
    validate::{is_valid_directory_name, is_valid_semester, is_valid_user_name, is_valid_year},
};

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, instrument};

/// Field count of a student record after its tag is removed.
pub const STUDENT_RECORD_NUM_FIELDS: usize = 5;

/// Field count of a project record after its tag is removed.
pub const PROJECT_RECORD_NUM_FIELDS: usize = 6;

/// Validated students and projects of one run.
///
/// # Invariants
///
/// - Student user names are unique.
/// - Project directory names are unique, and so are their group names.
/// - Every project has at least one student, and every one of them is in the
///   student mapping.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Roster {
    students: BTreeMap<String, Student>,
    projects: BTreeMap<String, Project>,
    chronology: Vec<Term>,
}

impl Roster {
    /// Build roster from raw rows.
    ///
    /// Student rows are processed before project rows no matter where they
    /// appear, so projects may reference any student in the input.
    ///
    /// # Errors
    ///
    /// - Return [`RosterError::FieldCount`] if a record has the wrong number
    ///   of fields.
    /// - Return [`RosterError::InvalidField`] if a field fails its syntax
    ///   check.
    /// - Return [`RosterError::DuplicateStudent`],
    ///   [`RosterError::DuplicateProject`], [`RosterError::UnknownStudent`],
    ///   [`RosterError::EmptyProject`], or
    ///   [`RosterError::GroupNameCollision`] if records are inconsistent with
    ///   each other.
    /// - Return [`RosterError::Unrecognized`] if rows remain that are neither
    ///   student nor project records.
    #[instrument(skip(rows), level = "debug")]
    pub fn from_rows<R, F>(rows: impl IntoIterator<Item = R>) -> Result<Self>
    where
        R: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect::<Vec<String>>())
            .filter(|row| !row.iter().all(|field| field.trim().is_empty()))
            .collect::<Vec<_>>();

        let (student_rows, rest): (Vec<_>, Vec<_>) = rows
            .into_iter()
            .partition(|row| RecordKind::Student.matches_tag(&row[0]));
        let (project_rows, unrecognized): (Vec<_>, Vec<_>) = rest
            .into_iter()
            .partition(|row| RecordKind::Project.matches_tag(&row[0]));

        let mut students = BTreeMap::new();
        for row in student_rows {
            let student = parse_student(row)?;
            if students.contains_key(&student.user_name) {
                return Err(RosterError::DuplicateStudent {
                    user_name: student.user_name,
                });
            }
            debug!("add student {:?}", student.user_name);
            students.insert(student.user_name.clone(), student);
        }

        let mut projects: BTreeMap<String, Project> = BTreeMap::new();
        let mut groups: BTreeMap<String, String> = BTreeMap::new();
        for row in project_rows {
            let project = parse_project(row, &students)?;
            if projects.contains_key(&project.directory_name) {
                return Err(RosterError::DuplicateProject {
                    directory_name: project.directory_name,
                });
            }

            // INVARIANT: Truncation must not fold two projects into one group.
            if let Some(first) = groups.get(&project.group_name) {
                return Err(RosterError::GroupNameCollision {
                    group_name: project.group_name,
                    first: first.clone(),
                    second: project.directory_name,
                });
            }

            debug!(
                "add project {:?} with group {:?}",
                project.directory_name, project.group_name
            );
            groups.insert(project.group_name.clone(), project.directory_name.clone());
            projects.insert(project.directory_name.clone(), project);
        }

        if !unrecognized.is_empty() {
            return Err(RosterError::Unrecognized { rows: unrecognized });
        }

        let chronology = chronology(
            students
                .values()
                .map(|student| student.term)
                .chain(projects.values().map(|project| project.term)),
        );

        Ok(Self {
            students,
            projects,
            chronology,
        })
    }

    /// Students keyed by user name.
    pub fn students(&self) -> &BTreeMap<String, Student> {
        &self.students
    }

    /// Projects keyed by directory name.
    pub fn projects(&self) -> &BTreeMap<String, Project> {
        &self.projects
    }

    /// Distinct terms of the roster, newest first.
    pub fn chronology(&self) -> &[Term] {
        &self.chronology
    }

    /// Group names of every project.
    pub fn project_groups(&self) -> BTreeSet<String> {
        self.projects
            .values()
            .map(|project| project.group_name.clone())
            .collect()
    }

    /// Group names of the projects a student is a member of.
    pub fn groups_of(&self, user_name: &str) -> BTreeSet<String> {
        self.projects
            .values()
            .filter(|project| project.has_member(user_name))
            .map(|project| project.group_name.clone())
            .collect()
    }

    /// Students enrolled in given term.
    pub fn students_in(&self, term: Term) -> impl Iterator<Item = &Student> {
        self.students
            .values()
            .filter(move |student| student.term == term)
    }

    /// Projects running in given term.
    pub fn projects_in(&self, term: Term) -> impl Iterator<Item = &Project> {
        self.projects
            .values()
            .filter(move |project| project.term == term)
    }
}

/// Sort distinct terms newest first.
///
/// Years compare numerically, semesters by their calendar rank.
pub fn chronology(terms: impl IntoIterator<Item = Term>) -> Vec<Term> {
    let mut terms = terms
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    terms.reverse();
    terms
}

fn parse_student(mut row: Vec<String>) -> Result<Student> {
    row.remove(0);
    let kind = RecordKind::Student;
    if row.len() != STUDENT_RECORD_NUM_FIELDS {
        return Err(RosterError::FieldCount {
            kind,
            expected: STUDENT_RECORD_NUM_FIELDS,
            actual: row.len(),
            row,
        });
    }

    let [year, semester, class_name, user_name, name] = &row[..] else {
        unreachable!("field count checked above");
    };
    check(kind, Field::UserName, user_name, is_valid_user_name, &row)?;
    let term = parse_term(kind, year, semester, &row)?;

    Ok(Student {
        term,
        class_name: class_name.clone(),
        user_name: user_name.clone(),
        name: name.clone(),
    })
}

fn parse_project(mut row: Vec<String>, students: &BTreeMap<String, Student>) -> Result<Project> {
    row.remove(0);
    let kind = RecordKind::Project;
    if row.len() != PROJECT_RECORD_NUM_FIELDS {
        return Err(RosterError::FieldCount {
            kind,
            expected: PROJECT_RECORD_NUM_FIELDS,
            actual: row.len(),
            row,
        });
    }

    let [year, semester, class_name, directory_name, user_names, name] = &row[..] else {
        unreachable!("field count checked above");
    };
    let term = parse_term(kind, year, semester, &row)?;
    check(
        kind,
        Field::DirectoryName,
        directory_name,
        is_valid_directory_name,
        &row,
    )?;

    let mut members = Vec::<Student>::new();
    for user_name in user_names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let student = students
            .get(user_name)
            .ok_or_else(|| RosterError::UnknownStudent {
                user_name: user_name.to_string(),
                directory_name: directory_name.clone(),
            })?;

        if !members.iter().any(|member| member.user_name == user_name) {
            members.push(student.clone());
        }
    }

    if members.is_empty() {
        return Err(RosterError::EmptyProject {
            directory_name: directory_name.clone(),
        });
    }

    Ok(Project {
        term,
        class_name: class_name.clone(),
        name: name.clone(),
        directory_name: directory_name.clone(),
        group_name: group_name(directory_name),
        students: members,
    })
}

fn parse_term(kind: RecordKind, year: &str, semester: &str, row: &[String]) -> Result<Term> {
    check(kind, Field::Year, year, is_valid_year, row)?;
    check(kind, Field::Semester, semester, is_valid_semester, row)?;

    // INVARIANT: Both fields passed their syntax checks.
    let year = year.parse::<u16>().map_err(|_| invalid(kind, Field::Year, year, row))?;
    let semester = semester
        .parse::<Semester>()
        .map_err(|_| invalid(kind, Field::Semester, semester, row))?;

    Ok(Term::new(year, semester))
}

fn check(
    kind: RecordKind,
    field: Field,
    value: &str,
    rule: impl Fn(&str) -> bool,
    row: &[String],
) -> Result<()> {
    if rule(value) {
        Ok(())
    } else {
        Err(invalid(kind, field, value, row))
    }
}

fn invalid(kind: RecordKind, field: Field, value: &str, row: &[String]) -> RosterError {
    RosterError::InvalidField {
        kind,
        field,
        value: value.to_string(),
        row: row.to_vec(),
    }
}

/// Kind of tagged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Student,
    Project,
}

impl RecordKind {
    fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        match self {
            Self::Student => tag.contains("student"),
            Self::Project => tag.contains("project"),
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Student => fmt.write_str("student"),
            Self::Project => fmt.write_str("project"),
        }
    }
}

/// Record field subject to a syntax check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Semester,
    UserName,
    DirectoryName,
}

impl Display for Field {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Year => fmt.write_str("year"),
            Self::Semester => fmt.write_str("semester"),
            Self::UserName => fmt.write_str("username"),
            Self::DirectoryName => fmt.write_str("directoryName"),
        }
    }
}

/// Broad class of a roster error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Record has the wrong shape.
    Structural,

    /// Field fails its syntax check.
    Validation,

    /// Records contradict each other.
    Integrity,

    /// Rows that are neither student nor project records.
    Unrecognized,
}

/// Roster construction error types.
///
/// All of these are fatal. The operator is expected to fix the input and
/// run again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// Record has the wrong number of fields.
    #[error(
        "{kind} record has an invalid number of fields \
         (expected {expected}, but got {actual}) {row:?}"
    )]
    FieldCount {
        kind: RecordKind,
        expected: usize,
        actual: usize,
        row: Vec<String>,
    },

    /// Record field fails its syntax check.
    #[error("invalid {field} {value:?} in {kind} record {row:?}")]
    InvalidField {
        kind: RecordKind,
        field: Field,
        value: String,
        row: Vec<String>,
    },

    /// Two student records share a user name.
    #[error("student with username {user_name:?} already exists")]
    DuplicateStudent { user_name: String },

    /// Two project records share a directory name.
    #[error("project with directory name {directory_name:?} already exists")]
    DuplicateProject { directory_name: String },

    /// Project lists a user name with no student record.
    #[error("student with username {user_name:?} does not exist (listed by project {directory_name:?})")]
    UnknownStudent {
        user_name: String,
        directory_name: String,
    },

    /// Project lists no students at all.
    #[error("project {directory_name:?} has no students")]
    EmptyProject { directory_name: String },

    /// Two projects derive the same group name.
    #[error("projects {first:?} and {second:?} both map to group {group_name:?}")]
    GroupNameCollision {
        group_name: String,
        first: String,
        second: String,
    },

    /// Rows left over after extracting student and project records.
    #[error("couldn't understand the following records:\n{rows:?}")]
    Unrecognized { rows: Vec<Vec<String>> },
}

impl RosterError {
    /// Classify error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::FieldCount { .. } => ErrorClass::Structural,
            Self::InvalidField { .. } => ErrorClass::Validation,
            Self::DuplicateStudent { .. }
            | Self::DuplicateProject { .. }
            | Self::UnknownStudent { .. }
            | Self::EmptyProject { .. }
            | Self::GroupNameCollision { .. } => ErrorClass::Integrity,
            Self::Unrecognized { .. } => ErrorClass::Unrecognized,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = RosterError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(rows: &[&[&str]]) -> Result<Roster> {
        Roster::from_rows(rows.iter().map(|row| row.iter().copied()))
    }

    const JDOE: &[&str] = &["Student", "2023", "Fall", "CS101", "jdoe", "Jane Doe"];
    const ASMITH: &[&str] = &["student", "2022", "Spring", "CS101", "asmith", "Al Smith"];

    #[test]
    fn build_student_and_project() -> anyhow::Result<()> {
        let roster = build(&[
            &["PROJECT", "2023", "Fall", "CS401", "capstone1", "jdoe", "Capstone Alpha"],
            JDOE,
        ])?;

        assert_eq!(roster.students().len(), 1);
        let project = &roster.projects()["capstone1"];
        assert_eq!(project.group_name, "sdc_capstone1");
        assert_eq!(project.name, "Capstone Alpha");
        assert_eq!(project.students, vec![roster.students()["jdoe"].clone()]);
        assert_eq!(roster.chronology(), &[Term::new(2023, Semester::Fall)]);

        Ok(())
    }

    #[test]
    fn blank_rows_are_padding() -> anyhow::Result<()> {
        let roster = build(&[&[""], JDOE, &["", " ", ""]])?;
        assert_eq!(roster.students().len(), 1);

        Ok(())
    }

    #[test]
    fn project_members_are_trimmed_and_deduplicated() -> anyhow::Result<()> {
        let roster = build(&[
            JDOE,
            ASMITH,
            &["project", "2023", "Fall", "CS401", "team", "asmith, jdoe,asmith,", "Team"],
        ])?;

        let members = roster.projects()["team"]
            .students
            .iter()
            .map(|student| student.user_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(members, vec!["asmith", "jdoe"]);
        assert_eq!(roster.groups_of("jdoe"), BTreeSet::from(["sdc_team".to_string()]));
        assert!(roster.groups_of("nobody").is_empty());

        Ok(())
    }

    #[test]
    fn student_field_count_mismatch() {
        let result = build(&[&["student", "2023", "Fall", "CS101", "jdoe"]]);
        let expect = RosterError::FieldCount {
            kind: RecordKind::Student,
            expected: 5,
            actual: 4,
            row: vec!["2023".into(), "Fall".into(), "CS101".into(), "jdoe".into()],
        };
        assert_eq!(result, Err(expect.clone()));
        assert_eq!(expect.class(), ErrorClass::Structural);
        assert_eq!(
            expect.to_string(),
            r#"student record has an invalid number of fields (expected 5, but got 4) ["2023", "Fall", "CS101", "jdoe"]"#
        );
    }

    #[test]
    fn project_field_count_mismatch() {
        let result = build(&[JDOE, &["project", "2023", "Fall", "CS401", "capstone1", "jdoe"]]);
        assert!(matches!(
            result,
            Err(RosterError::FieldCount {
                kind: RecordKind::Project,
                expected: 6,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn invalid_fields_name_field_and_value() {
        let cases: &[(&[&str], Field, &str)] = &[
            (&["student", "23", "Fall", "CS101", "jdoe", "Jane Doe"], Field::Year, "23"),
            (&["student", "2023", "Autumn", "CS101", "jdoe", "Jane Doe"], Field::Semester, "Autumn"),
            (&["student", "2023", "Fall", "CS101", "JDoe", "Jane Doe"], Field::UserName, "JDoe"),
            (&["student", "x", "x", "CS101", "9x", "Jane Doe"], Field::UserName, "9x"),
        ];

        for (row, field, value) in cases {
            let error = build(&[*row]).unwrap_err();
            assert_eq!(error.class(), ErrorClass::Validation);
            match error {
                RosterError::InvalidField { field: f, value: v, .. } => {
                    assert_eq!((f, v.as_str()), (*field, *value));
                }
                other => panic!("expected invalid field, got {other:?}"),
            }
        }

        let cases: &[(&[&str], Field, &str)] = &[
            (&["project", "20x3", "Winter", "CS401", "bad-dir", "jdoe", "X"], Field::Year, "20x3"),
            (&["project", "2023", "Winter", "CS401", "bad-dir", "jdoe", "X"], Field::Semester, "Winter"),
            (&["project", "2023", "Fall", "CS401", "cap-1", "jdoe", "X"], Field::DirectoryName, "cap-1"),
        ];

        for (row, field, value) in cases {
            let error = build(&[JDOE, *row]).unwrap_err();
            assert_eq!(error.class(), ErrorClass::Validation);
            match error {
                RosterError::InvalidField { kind, field: f, value: v, .. } => {
                    assert_eq!(kind, RecordKind::Project);
                    assert_eq!((f, v.as_str()), (*field, *value));
                }
                other => panic!("expected invalid field, got {other:?}"),
            }
        }
    }

    #[test]
    fn duplicate_student_is_integrity_error() {
        let result = build(&[JDOE, &["student", "2022", "Spring", "CS102", "jdoe", "John Doe"]]);
        let expect = RosterError::DuplicateStudent {
            user_name: "jdoe".into(),
        };
        assert_eq!(result, Err(expect.clone()));
        assert_eq!(expect.class(), ErrorClass::Integrity);
    }

    #[test]
    fn unknown_project_member_is_integrity_error() {
        let result = build(&[
            JDOE,
            &["project", "2023", "Fall", "CS401", "capstone1", "jdoe,ghost", "Capstone"],
        ]);
        assert_eq!(
            result,
            Err(RosterError::UnknownStudent {
                user_name: "ghost".into(),
                directory_name: "capstone1".into(),
            })
        );
    }

    #[test]
    fn project_without_members_is_integrity_error() {
        let result = build(&[JDOE, &["project", "2023", "Fall", "CS401", "capstone1", " ", "X"]]);
        assert_eq!(
            result,
            Err(RosterError::EmptyProject {
                directory_name: "capstone1".into(),
            })
        );
    }

    #[test]
    fn duplicate_project_is_integrity_error() {
        let result = build(&[
            JDOE,
            &["project", "2023", "Fall", "CS401", "capstone1", "jdoe", "A"],
            &["project", "2023", "Fall", "CS401", "capstone1", "jdoe", "B"],
        ]);
        assert_eq!(
            result,
            Err(RosterError::DuplicateProject {
                directory_name: "capstone1".into(),
            })
        );
    }

    #[test]
    fn truncated_group_name_collision_is_rejected() {
        let result = build(&[
            JDOE,
            &["project", "2023", "Fall", "CS401", "averylongname_a", "jdoe", "A"],
            &["project", "2023", "Fall", "CS401", "averylongname_b", "jdoe", "B"],
        ]);
        assert_eq!(
            result,
            Err(RosterError::GroupNameCollision {
                group_name: "sdc_averylongnam".into(),
                first: "averylongname_a".into(),
                second: "averylongname_b".into(),
            })
        );
    }

    #[test]
    fn leftover_rows_reported_together() {
        let result = build(&[JDOE, &["faculty", "x"], &["", "stray"]]);
        let expect = RosterError::Unrecognized {
            rows: vec![
                vec!["faculty".into(), "x".into()],
                vec!["".into(), "stray".into()],
            ],
        };
        assert_eq!(result, Err(expect.clone()));
        assert_eq!(expect.class(), ErrorClass::Unrecognized);
    }

    #[test]
    fn chronology_newest_first() {
        let result = chronology([
            Term::new(2021, Semester::Fall),
            Term::new(2022, Semester::Spring),
            Term::new(2021, Semester::Spring),
            Term::new(2021, Semester::Fall),
        ]);
        let expect = vec![
            Term::new(2022, Semester::Spring),
            Term::new(2021, Semester::Fall),
            Term::new(2021, Semester::Spring),
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn chronology_covers_students_and_projects() -> anyhow::Result<()> {
        let roster = build(&[
            JDOE,
            ASMITH,
            &["project", "2021", "SummerII", "CS401", "old", "asmith", "Old"],
        ])?;
        assert_eq!(
            roster.chronology(),
            &[
                Term::new(2023, Semester::Fall),
                Term::new(2022, Semester::Spring),
                Term::new(2021, Semester::SummerII),
            ]
        );
        assert_eq!(roster.students_in(Term::new(2022, Semester::Spring)).count(), 1);
        assert_eq!(roster.projects_in(Term::new(2022, Semester::Spring)).count(), 0);

        Ok(())
    }
}
