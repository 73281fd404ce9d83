//! Malla Core Types and Definitions
//!
//! This crate provides the foundational types for the malla curriculum
//! graph editor. It includes:
//!
//! - **Keys**: Efficient string-interned lane keys and integer node keys
//!   ([`key`] module)
//! - **Colors**: Color handling with CSS color support and the curriculum
//!   area palette ([`color`] module)
//! - **Geometry**: Basic geometric types and the textual coordinate
//!   encoding used by graph documents ([`geometry`] module)
//! - **Semantic**: The course, semester, and prerequisite record types
//!   ([`semantic`] module)

pub mod color;
pub mod geometry;
pub mod key;
pub mod semantic;
