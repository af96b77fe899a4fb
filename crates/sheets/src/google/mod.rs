//! Google Sheets remote sink.

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountKey, TokenSource};
pub use client::{GoogleSheet, GoogleSheetsConnector, SheetsClient};
