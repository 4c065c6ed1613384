//! permaudit - vSphere permissions audit library
//!
//! This library exposes the permission data model, exclusion matching,
//! classification and the chunked tooltip enrichment of HTML reports.

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod exclusion;
pub mod inventory;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod report;
