// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Senior design site maker.
//!
//! Provisions a directory tree for senior design students and their project
//! teams, keeps the `sdc_` project groups of the system in line with the
//! roster, and publishes a static index of everyone by term.
//!
//! The roster comes in as a spreadsheet export, see [`records`] and
//! [`roster`]. From there [`reconcile`] plans group changes, [`provision`]
//! builds the directory tree, and [`site`] renders the index page. The
//! [`maker`] module ties the steps together for one run.

pub mod config;
pub mod maker;
pub mod path;
pub mod provision;
pub mod reconcile;
pub mod records;
pub mod roster;
pub mod site;
pub mod system;

pub use maker::SiteMaker;
pub use reconcile::Mode;
pub use roster::Roster;
