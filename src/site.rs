// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Static index page rendering.
//!
//! The index page has two side by side blocks, one listing students and one
//! listing projects. Both blocks are split into sections per term, newest
//! term first, and terms with nothing to list are left out of that block.
//! Rendering is a pure function of the roster, so the same roster always
//! yields byte identical output.

use crate::roster::{
    model::{Project, Student, Term},
    Roster,
};

/// File name of the generated index page.
pub const INDEX_FILE: &str = "index.html";

/// File name of the stylesheet.
pub const STYLESHEET_FILE: &str = "a.css";

/// Fixed stylesheet referenced by the index page.
pub const STYLESHEET: &str = r#"a, a:visited
{
	background: inherit;
	color: blue;
}

body, h1, h2
{
	font-family: Verdana;
}

#heading
{
	margin-bottom: 1em;
}
#heading h1
{
	font-size: 1.5em;
	margin: 0;
}

#studentsList, #projectsList
{
	background: #f4f4f4;
	border: 1px solid #ccc;
	float: left;
	padding: 0 1em;
}
#studentsList ul, #projectsList ul
{
	list-style: none;
	margin-top: 0;
	padding-top: 0;
}
#studentsList li, #projectsList li
{
	white-space: nowrap;
}
#studentsList h1, #projectsList h1
{
	font-size: 1.5em;
}
#studentsList h2, #projectsList h2
{
	font-size: 1.2em;
	margin-bottom: 0;
	padding-bottom: 0;
}
#projectsList>ul>li
{
	margin-bottom: 1em;
}
#projectsList
{
	margin-left: 1em;
}
"#;

/// Rendered site files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub html: String,
    pub css: String,
}

/// Render index page and stylesheet for roster.
pub fn render(roster: &Roster) -> Site {
    let mut students_html = String::new();
    let mut projects_html = String::new();

    for term in roster.chronology() {
        let students = sorted_students(roster.students_in(*term));
        if !students.is_empty() {
            push_heading(&mut students_html, *term);
            students_html.push_str("\t\t\t<ul>\n");
            for student in students {
                students_html.push_str(&format!("\t\t\t\t{}\n", student_item(student)));
            }
            students_html.push_str("\t\t\t</ul>\n");
        }

        let mut projects = roster.projects_in(*term).collect::<Vec<_>>();
        projects.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.directory_name.cmp(&b.directory_name))
        });
        if !projects.is_empty() {
            push_heading(&mut projects_html, *term);
            projects_html.push_str("\t\t\t<ul>\n");
            for project in projects {
                push_project(&mut projects_html, project);
            }
            projects_html.push_str("\t\t\t</ul>\n");
        }
    }

    Site {
        html: page(&students_html, &projects_html),
        css: STYLESHEET.to_string(),
    }
}

fn sorted_students<'a>(students: impl IntoIterator<Item = &'a Student>) -> Vec<&'a Student> {
    let mut students = students.into_iter().collect::<Vec<_>>();
    students.sort_by(|a, b| {
        a.surname()
            .cmp(b.surname())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.user_name.cmp(&b.user_name))
    });
    students
}

fn push_heading(out: &mut String, term: Term) {
    out.push_str(&format!("\t\t\t<h2>{term}</h2>\n"));
}

fn push_project(out: &mut String, project: &Project) {
    out.push_str("\t\t\t\t<li>\n");
    out.push_str(&format!(
        "\t\t\t\t\t<a href=\"/projects/{}\">{}</a>\n",
        escape(&project.directory_name),
        escape(&project.name)
    ));
    out.push_str("\t\t\t\t\t<ul>\n");
    for student in sorted_students(&project.students) {
        out.push_str(&format!("\t\t\t\t\t\t{}\n", student_item(student)));
    }
    out.push_str("\t\t\t\t\t</ul>\n");
    out.push_str("\t\t\t\t</li>\n");
}

fn student_item(student: &Student) -> String {
    format!(
        "<li><a href=\"/students/{}\">{}</a></li>",
        escape(&student.user_name),
        escape(&student.sort_name())
    )
}

fn page(students_html: &str, projects_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
	<head profile="http://www.w3.org/2005/11/profile">
		<title>Senior Design/Capstone students and projects</title>
		<link rel="stylesheet" href="/{STYLESHEET_FILE}" type="text/css" />
		<meta http-equiv="Content-Type" content="text/html; charset=utf-8" />
	</head>

	<body>
		<div id="heading">
			<h1>Computer Science and Computer Engineering Department</h1>
			<h1>Senior Design/Capstone</h1>
		</div>

		<div id="studentsList">
			<h1>Students</h1>
{students_html}
		</div>

		<div id="projectsList">
			<h1>Projects</h1>
{projects_html}
		</div>
	</body>
</html>
"#
    )
}

/// Escape text for use in element content and attribute values.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn roster(rows: &[&[&str]]) -> Roster {
        Roster::from_rows(rows.iter().map(|row| row.iter().copied())).unwrap()
    }

    #[test]
    fn render_sections_newest_first() {
        let roster = roster(&[
            &["student", "2022", "Spring", "CS101", "bzed", "Bea Zed"],
            &["student", "2023", "Fall", "CS101", "jdoe", "Jane Doe"],
            &["student", "2023", "Fall", "CS101", "asmith", "Al B Smith"],
            &["student", "2023", "Fall", "CS101", "cadams", "Cy Adams"],
            &["project", "2023", "Fall", "CS401", "zeta", "jdoe,asmith", "Zeta"],
            &["project", "2023", "Fall", "CS401", "alpha", "cadams", "Alpha & Co"],
        ]);
        let site = render(&roster);

        let students = concat!(
            "\t\t\t<h1>Students</h1>\n",
            "\t\t\t<h2>2023 Fall</h2>\n",
            "\t\t\t<ul>\n",
            "\t\t\t\t<li><a href=\"/students/cadams\">Adams, Cy</a></li>\n",
            "\t\t\t\t<li><a href=\"/students/jdoe\">Doe, Jane</a></li>\n",
            "\t\t\t\t<li><a href=\"/students/asmith\">Smith, Al B</a></li>\n",
            "\t\t\t</ul>\n",
            "\t\t\t<h2>2022 Spring</h2>\n",
            "\t\t\t<ul>\n",
            "\t\t\t\t<li><a href=\"/students/bzed\">Zed, Bea</a></li>\n",
            "\t\t\t</ul>\n",
        );
        assert!(site.html.contains(students), "{}", site.html);

        let projects = concat!(
            "\t\t\t<h1>Projects</h1>\n",
            "\t\t\t<h2>2023 Fall</h2>\n",
            "\t\t\t<ul>\n",
            "\t\t\t\t<li>\n",
            "\t\t\t\t\t<a href=\"/projects/alpha\">Alpha &amp; Co</a>\n",
            "\t\t\t\t\t<ul>\n",
            "\t\t\t\t\t\t<li><a href=\"/students/cadams\">Adams, Cy</a></li>\n",
            "\t\t\t\t\t</ul>\n",
            "\t\t\t\t</li>\n",
            "\t\t\t\t<li>\n",
            "\t\t\t\t\t<a href=\"/projects/zeta\">Zeta</a>\n",
            "\t\t\t\t\t<ul>\n",
            "\t\t\t\t\t\t<li><a href=\"/students/jdoe\">Doe, Jane</a></li>\n",
            "\t\t\t\t\t\t<li><a href=\"/students/asmith\">Smith, Al B</a></li>\n",
            "\t\t\t\t\t</ul>\n",
            "\t\t\t\t</li>\n",
            "\t\t\t</ul>\n",
            "\n",
            "\t\t</div>\n",
        );
        assert!(site.html.contains(projects), "{}", site.html);
        assert_eq!(site.css, STYLESHEET);
    }

    #[test]
    fn term_without_projects_has_no_project_heading() {
        let roster = roster(&[
            &["student", "2022", "Spring", "CS101", "bzed", "Bea Zed"],
            &["student", "2023", "Fall", "CS101", "jdoe", "Jane Doe"],
            &["project", "2023", "Fall", "CS401", "capstone1", "jdoe", "Capstone"],
        ]);
        let html = render(&roster).html;

        assert_eq!(html.matches("<h2>2022 Spring</h2>").count(), 1);
        assert_eq!(html.matches("<h2>2023 Fall</h2>").count(), 2);
        let projects = html.split("<div id=\"projectsList\">").nth(1).unwrap();
        assert!(!projects.contains("2022 Spring"));
    }

    #[test]
    fn render_is_deterministic() {
        let rows: &[&[&str]] = &[
            &["student", "2023", "Fall", "CS101", "jdoe", "Jane Doe"],
            &["student", "2023", "Fall", "CS101", "jdoe2", "John Doe"],
            &["student", "2023", "Fall", "CS101", "jdoe3", "Jane Doe"],
            &["project", "2023", "Fall", "CS401", "b", "jdoe3,jdoe", "Same"],
            &["project", "2023", "Fall", "CS401", "a", "jdoe2", "Same"],
        ];
        assert_eq!(render(&roster(rows)), render(&roster(rows)));

        let html = render(&roster(rows)).html;
        let first = html.find("/projects/a\"").unwrap();
        let second = html.find("/projects/b\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn empty_roster_renders_skeleton() {
        let html = render(&Roster::default()).html;
        assert!(html.contains("<h1>Students</h1>"));
        assert!(!html.contains("<h2>"));
    }

    #[test]
    fn escape_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
