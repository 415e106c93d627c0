//! Surface AST for graft constructs.
//!
//! Only the graft extensions are modelled; host statements and
//! expressions stay opaque text throughout. Variant field types, guard
//! expressions, and arm bodies are therefore plain strings, carried
//! verbatim into the lowered output.

use graft_common::span::Span;

/// A parsed `enum` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    /// Generic parameter names (`enum Either<L, R>`); empty for concrete
    /// enums.
    pub type_params: Vec<String>,
    pub variants: Vec<Variant>,
    /// Span of the whole declaration in the original source.
    pub span: Span,
}

impl EnumDecl {
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// One variant of an enum declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub kind: VariantKind,
    pub span: Span,
}

impl Variant {
    /// Number of payload fields.
    pub fn arity(&self) -> usize {
        match &self.kind {
            VariantKind::Unit => 0,
            VariantKind::Tuple(tys) => tys.len(),
            VariantKind::Struct(fields) => fields.len(),
        }
    }
}

/// The shape of a variant's payload.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantKind {
    /// No payload: `Point`.
    Unit,
    /// Positional payload: `Circle(float64)`. Field types in order.
    Tuple(Vec<String>),
    /// Named payload: `Rect { w: float64, h: float64 }`.
    Struct(Vec<Field>),
}

/// A named, typed field of a struct variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: String,
}

/// A parsed match pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard,
    /// A literal: number, string, rune, `true`/`false`, `nil`. Raw text.
    Literal(String),
    /// A bare identifier. Classified at lowering time as either a unit
    /// variant of the scrutinee's enum or a binding that captures the
    /// whole value.
    Ident(String),
    /// `Name(p0, p1, ...)`
    Constructor { name: String, args: Vec<Pattern> },
    /// `Name { field, field: binding }`
    Struct {
        name: String,
        fields: Vec<FieldPattern>,
    },
    /// `(p0, p1, ...)`
    Tuple(Vec<Pattern>),
}

impl Pattern {
    /// The variant name this pattern would select, if it names one.
    /// `Ident` is included here because a bare identifier may turn out
    /// to be a unit variant.
    pub fn variant_name(&self) -> Option<&str> {
        match self {
            Pattern::Constructor { name, .. } | Pattern::Struct { name, .. } => Some(name),
            Pattern::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// One field in a struct-destructuring pattern. Shorthand `{ w }` binds
/// the field to its own name; `{ w: width }` renames; `{ w: _ }`
/// discards.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPattern {
    pub field: String,
    pub binding: String,
}

/// One parsed arm of a match construct.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub pattern_span: Span,
    /// Guard expression text (everything after the arm's `if`), if any.
    pub guard: Option<String>,
    /// Body text, verbatim: an expression or a `{ ... }` block.
    pub body: String,
    pub body_span: Span,
}

impl MatchArm {
    /// Whether the body is a brace block rather than an expression.
    pub fn has_block_body(&self) -> bool {
        self.body.trim_start().starts_with('{')
    }
}
