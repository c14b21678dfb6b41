//! Search and filter engine for notes.
//!
//! # Responsibility
//! - Combine substring text matching with AND-semantics tag filtering.
//!
//! # See also
//! - `filter::search_notes`

pub mod filter;
