//! Airtable (Records Service) integration.

mod client;
mod config;

pub use client::AirtableClient;
pub use config::AirtableConfig;
