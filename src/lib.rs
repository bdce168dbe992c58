//! Portfolio advisor for the prism scoring server.
//!
//! A single run fetches the client's investment brief, screens a historical
//! ticker universe against the client's constraints, sizes the survivors by
//! reward per unit of risk, and submits the share counts for scoring.

pub mod brief;
pub mod client;
pub mod config;
pub mod cpi;
pub mod market;
pub mod portfolio;
pub mod screen;
pub mod universe;
