//! # StoreError
//!
//! Centralized error handling for the content store.
//! Every backend maps its failures onto these four kinds so the query layer
//! can translate them without knowing which backend is active.

use std::fmt;

use thiserror::Error;

/// The kind of entity a lookup was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Post,
    Comment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Post => f.write_str("post"),
            EntityKind::Comment => f.write_str("comment"),
        }
    }
}

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Caller-supplied field violates a constraint (empty, too long, wrong post)
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced post or comment does not exist
    #[error("{kind} not found with ID {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Operation disallowed by entity state (e.g. comments switched off)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Backing medium failed (connection, query execution). Not retried.
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        StoreError::NotFound { kind, id: id.into() }
    }

    /// Wraps any backend failure as an opaque `Storage` error.
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Storage(err.into())
    }
}

/// A specialized Result type for content store logic.
pub type Result<T> = std::result::Result<T, StoreError>;
