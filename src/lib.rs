//! snipvault keeps code snippets organized in nested folders and projects.
//!
//! [`store::SnippetStore`] is the single source of truth. It persists each
//! collection through a [`models::KeyValueStore`], keeps snippet placement
//! consistent with the folder and project forests, and offers fuzzy search
//! and aggregate counts over the collection.

pub mod cleanup;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod counts;
pub mod hierarchy;
pub mod models;
pub mod search;
pub mod store;
