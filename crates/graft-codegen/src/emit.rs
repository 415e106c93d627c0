//! Printing lowered declarations and generated statements as host text.
//!
//! Generated identifiers carry a `__graft_` prefix so they cannot
//! collide with user names; generated control flow indents with tabs,
//! the host convention.

use graft_adt::{TaggedUnionLayout, TAG_FIELD};
use graft_common::options::NilSafety;

use crate::inject::DEBUG_FLAG;

/// Prefix of the per-construct scrutinee temporary (`__graft_m0`).
pub const MATCH_TEMP: &str = "__graft_m";

/// Prefix of the per-construct matched flag (`__graft_matched0`).
pub const MATCHED_FLAG: &str = "__graft_matched";

/// Prefix of hoisted argument temporaries (`__graft_tmp0`).
pub const HOIST_TEMP: &str = "__graft_tmp";

/// Runtime fallback for a dispatch that matched no arm.
pub const NO_MATCH_PANIC: &str = "panic(\"graft: no match arm matched\")";

/// Marker statement standing in for a construct that failed to lower.
/// Units containing one always carry an error diagnostic and are never
/// written out.
pub fn error_marker(message: &str) -> String {
    format!("panic(\"graft error: {}\")", message.replace('"', "'"))
}

/// All declarations for one lowered enum: the discriminant constants,
/// the storage struct, and one constructor per variant.
pub fn enum_decls(layout: &TaggedUnionLayout) -> String {
    let mut out = String::new();

    out.push_str("const (\n");
    for v in &layout.variants {
        out.push_str(&format!("\t{} = {}\n", v.tag_const, v.tag_value));
    }
    out.push_str(")\n\n");

    out.push_str(&format!("type {} struct {{\n", layout.enum_name));
    out.push_str(&format!("\t{TAG_FIELD} int\n"));
    for v in &layout.variants {
        for slot in &v.slots {
            out.push_str(&format!("\t{} *{}\n", slot.field, slot.ty));
        }
    }
    out.push_str("}\n");

    for v in &layout.variants {
        let params: Vec<String> = v
            .slots
            .iter()
            .map(|s| format!("{} *{}", s.param, s.ty))
            .collect();
        let mut fields = vec![format!("{TAG_FIELD}: {}", v.tag_const)];
        fields.extend(v.slots.iter().map(|s| format!("{}: {}", s.field, s.param)));
        out.push_str(&format!(
            "\nfunc {}({}) {} {{\n\treturn {}{{{}}}\n}}\n",
            v.ctor_name,
            params.join(", "),
            layout.enum_name,
            layout.enum_name,
            fields.join(", "),
        ));
    }

    out.trim_end().to_string()
}

/// The condition under which a nil-slot check fires, or `None` when the
/// policy emits no check.
pub fn nil_check_cond(policy: NilSafety, slot_expr: &str) -> Option<String> {
    match policy {
        NilSafety::Off => None,
        NilSafety::On => Some(format!("{slot_expr} == nil")),
        NilSafety::Debug => Some(format!("{DEBUG_FLAG} && {slot_expr} == nil")),
    }
}

/// Panic message for an empty slot read.
pub fn nil_panic(enum_name: &str, variant: &str, slot_field: &str) -> String {
    format!("panic(\"graft: {enum_name}.{variant}: field {slot_field} is nil\")")
}

/// Line-oriented emission buffer with a fixed base indent.
#[derive(Debug)]
pub struct HostWriter {
    out: String,
    base: String,
}

impl HostWriter {
    pub fn new(base_indent: &str) -> Self {
        Self { out: String::new(), base: base_indent.to_string() }
    }

    /// Append one line at `depth` tabs below the base indent.
    pub fn line(&mut self, depth: usize, text: &str) {
        self.out.push_str(&self.base);
        for _ in 0..depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Append raw text with no indent or newline handling.
    pub fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}
