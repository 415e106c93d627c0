//! graft ADT model: registry, tagged-union layout, generic templates.
//!
//! One [`AdtRegistry`] per compilation unit holds every concrete enum;
//! [`layout::lower`] computes the discriminant constants, qualified
//! nullable storage slots, and constructor signatures a declaration
//! turns into; [`Instantiator`] materializes generic templates on
//! demand with a (template, args)-keyed cache.

pub mod error;
pub mod instantiate;
pub mod layout;
pub mod registry;

pub use error::{AdtError, AdtErrorKind, InstError};
pub use instantiate::{mangle, Instantiation, Instantiator};
pub use layout::{lower, Slot, TaggedUnionLayout, VariantLayout, TAG_FIELD};
pub use registry::{hint_from_type, AdtRegistry, Resolution};
