//! Fixed-column product spec records from comparison pages whose payloads come in
//! inconsistent shapes.

pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod output;
pub mod parsers;
pub mod scrapers;
pub mod semantic;
pub mod sources;
pub mod utils;
