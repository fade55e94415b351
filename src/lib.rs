//! Track your practice of katas: small exercises that each live in their own repository.
//!
//! Katas are listed from a catalog, measured by cloning them and counting their lines, joined with
//! a ledger of when you completed them, and shown either as a sortable table or as an activity
//! calendar.

pub mod catalog;
pub mod cli;
pub mod enrichment;
pub mod error;
pub mod ledger;
pub mod report;
pub mod sort;
pub mod utils;
