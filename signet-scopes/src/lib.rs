//! # signet-scopes
//!
//! Scope grammar and permission algebra for the Signet authority.
//!
//! ## Components
//!
//! - **Pattern:** Parsing, normalization and matcher compilation for a single
//!   scope string (`domain:resource.subtype:action`, with `*`/`**` wildcards).
//! - **Collection:** Ordered sets of scopes with a space-separated wire form.
//! - **Algebra:** `combine`, `simplify`, `combine_collections` and the
//!   `allows`/`admits` checks used to intersect independently granted
//!   permission sets.

pub mod algebra;
pub mod collection;
pub mod error;
pub mod pattern;

pub use algebra::{combine, combine_collections};
pub use collection::ScopeCollection;
pub use error::ScopeError;
pub use pattern::Scope;
