//! graft text stage: locating and parsing the non-host constructs.
//!
//! The host language is never parsed in full. This crate finds `enum`
//! and `match` constructs with depth-tracked, literal-aware scanning,
//! slices their exact byte spans, and parses only the graft-specific
//! surface inside them (variant lists, arm patterns, guards). Host
//! expressions stay opaque text. It also scans host function signatures
//! as best-effort input for type inference.

pub mod arms;
pub mod ast;
pub mod construct;
pub mod enums;
pub mod error;
pub mod pattern;
pub mod scan;
pub mod sigs;
pub mod types;

pub use arms::{split_arms, RawArm};
pub use ast::{EnumDecl, Field, FieldPattern, MatchArm, Pattern, Variant, VariantKind};
pub use construct::{find_constructs, ConstructKind, MatchContext, RawConstruct};
pub use enums::parse_enum_decl;
pub use error::ExtractError;
pub use pattern::parse_pattern;
pub use sigs::{FnSig, Param, SignatureIndex};
pub use types::{find_generic_refs, GenericRef};
