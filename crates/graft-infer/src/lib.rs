//! graft type-inference service.
//!
//! graft never type-checks the host language. When lowering needs a
//! type it cannot see in the construct itself (a match scrutinee's
//! enum, a `Result`/`Option` argument, an expression arm's value), it
//! asks this crate. Answers come from two places, in order:
//!
//! - [`oracle`]: the [`TypeOracle`] seam, an adapter for whatever real
//!   type checker the host project runs
//! - [`service`]: structural heuristics over literals and scanned
//!   function signatures
//!
//! A miss is an `Option::None`, which the caller reports as a
//! diagnostic. Nothing in this crate guesses.

pub mod oracle;
pub mod service;

pub use oracle::{NullOracle, StaticOracle, TypeOracle};
pub use service::{literal_type, InferenceService};
