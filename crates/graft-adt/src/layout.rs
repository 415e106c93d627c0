//! Tagged-union layout for registered enums.
//!
//! An enum lowers to one host struct holding an integer discriminant
//! plus an independent nullable slot for every field of every variant.
//! Slot names are qualified by variant (`Circle_0`, `Rect_w`) so no two
//! variants can collide, and a tuple variant with k fields always gets
//! exactly k positional slots. Constructors take one pointer parameter
//! per slot of their own variant and leave every other slot nil.

use graft_parse::ast::{EnumDecl, VariantKind};

/// Layout of one lowered enum.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedUnionLayout {
    pub enum_name: String,
    pub variants: Vec<VariantLayout>,
}

/// Layout of one variant: its discriminant constant and storage slots.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantLayout {
    pub name: String,
    /// Discriminant constant name, `<Enum>_Tag_<Variant>`.
    pub tag_const: String,
    /// Discriminant value, the variant's declaration index.
    pub tag_value: usize,
    /// Constructor function name, `<Enum>_<Variant>`.
    pub ctor_name: String,
    pub slots: Vec<Slot>,
}

/// One nullable storage slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// Storage field name qualified by variant: `Circle_0`, `Rect_w`.
    pub field: String,
    /// Base host type; the struct field and constructor parameter are
    /// pointers to this.
    pub ty: String,
    /// Constructor parameter name (`a0`, `a1`, ... for tuple fields,
    /// the declared name for struct fields).
    pub param: String,
}

impl TaggedUnionLayout {
    pub fn variant(&self, name: &str) -> Option<&VariantLayout> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// Name of the discriminant field in every lowered enum struct.
pub const TAG_FIELD: &str = "tag";

/// Compute the layout for a concrete enum declaration.
pub fn lower(decl: &EnumDecl) -> TaggedUnionLayout {
    let variants = decl
        .variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let slots = match &v.kind {
                VariantKind::Unit => Vec::new(),
                VariantKind::Tuple(tys) => tys
                    .iter()
                    .enumerate()
                    .map(|(k, ty)| Slot {
                        field: format!("{}_{k}", v.name),
                        ty: ty.clone(),
                        param: format!("a{k}"),
                    })
                    .collect(),
                VariantKind::Struct(fields) => fields
                    .iter()
                    .map(|f| Slot {
                        field: format!("{}_{}", v.name, f.name),
                        ty: f.ty.clone(),
                        param: f.name.clone(),
                    })
                    .collect(),
            };
            VariantLayout {
                name: v.name.clone(),
                tag_const: format!("{}_Tag_{}", decl.name, v.name),
                tag_value: i,
                ctor_name: format!("{}_{}", decl.name, v.name),
                slots,
            }
        })
        .collect();
    TaggedUnionLayout {
        enum_name: decl.name.clone(),
        variants,
    }
}
