//! Malla - a headless editor core for curriculum map diagrams
//!
//! This library maintains a directed graph of courses partitioned into
//! ordered semester lanes, the way a swimlane diagram editor would: a
//! transactional graph model with undo and redo, a prerequisite-ordering
//! validator, a pool layout that keeps every lane the same length, an
//! editing session that turns user gestures into transactions, and a
//! serialization adapter for the host page's `go.GraphLinksModel` JSON.
//!
//! The crate renders nothing and binds to no UI toolkit; a host embeds it
//! and draws whatever the published document describes.
//!
//! # Examples
//!
//! ```rust
//! use malla::config::AppConfig;
//! use malla::document::{Document, Host};
//! use malla::session::EditorSession;
//!
//! /// Receives the serialized document after every finished transaction.
//! struct FormField;
//!
//! impl Host for FormField {
//!     fn document_changed(&mut self, document: &Document) {
//!         let _json = document.to_json().expect("Failed to serialize");
//!     }
//! }
//!
//! let mut session =
//!     EditorSession::load(AppConfig::default(), Document::seed(), Box::new(FormField))
//!         .expect("Failed to load session");
//!
//! let key = session
//!     .add_course(None)
//!     .expect("Failed to add course")
//!     .expect("Document has no lanes");
//! session
//!     .edit_course_text(key, "Cálculo I")
//!     .expect("Failed to rename course");
//!
//! assert!(session.can_undo());
//! session.teardown();
//! ```

pub mod config;
pub mod document;
pub mod layout;
pub mod model;
pub mod session;
pub mod validate;

mod error;

pub use malla_core::{color, geometry, key, semantic};

pub use error::MallaError;
