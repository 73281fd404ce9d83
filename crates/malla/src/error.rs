//! Error types for malla operations.
//!
//! Component errors live with their components ([`ProtocolError`] in the
//! model, [`DocumentError`] in the document adapter, [`GestureError`] in the
//! session); [`MallaError`] is the crate-level umbrella they convert into.
//!
//! Constraint-validator rejections are deliberately not errors anywhere in
//! this crate. An illegal link or membership move is ordinary interactive
//! feedback and surfaces as a boolean.

use thiserror::Error;

use crate::{document::DocumentError, model::ProtocolError, session::GestureError};

/// The main error type for malla operations.
#[derive(Debug, Error)]
pub enum MallaError {
    /// Transaction discipline was violated by the calling layer.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A graph document could not be loaded or produced.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// A gesture call arrived in the wrong state.
    #[error("Gesture error: {0}")]
    Gesture(#[from] GestureError),

    /// The supplied configuration could not be applied.
    #[error("Configuration error: {0}")]
    Config(String),
}
