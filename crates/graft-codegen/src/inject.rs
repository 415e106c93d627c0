//! Collecting synthesized top-level declarations.
//!
//! Plugins hand the injector declaration blocks keyed by what they
//! declare (an enum name, the debug flag). The first block wins for a
//! key; later offers of the same key are dropped, which is what keeps
//! one enum's constants, struct, and constructors from appearing twice
//! no matter how many plugins touched it. Everything renders as a
//! single block after the user's lines, never interleaved with them.

use rustc_hash::FxHashSet;

/// Package-level flag gating nil-slot checks in debug mode.
pub const DEBUG_FLAG: &str = "__graft_debug_checks";

/// Exported setter for the debug flag.
pub const DEBUG_SETTER: &str = "GraftSetDebugChecks";

/// Declaration collector for one unit.
#[derive(Debug, Default)]
pub struct DeclInjector {
    keys: FxHashSet<String>,
    blocks: Vec<String>,
}

impl DeclInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration block under `key`; duplicate keys are ignored.
    pub fn add(&mut self, key: &str, text: String) {
        if self.keys.insert(key.to_string()) {
            self.blocks.push(text);
        }
    }

    /// Declare the debug flag and its setter, once per unit.
    pub fn ensure_debug_flag(&mut self) {
        self.add(
            DEBUG_FLAG,
            format!(
                "var {DEBUG_FLAG} = true\n\nfunc {DEBUG_SETTER}(enabled bool) {{\n\t{DEBUG_FLAG} = enabled\n}}"
            ),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The full injected block, or an empty string when nothing was
    /// collected.
    pub fn render(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let mut out = String::from("// Code generated by graft. DO NOT EDIT.\n\n");
        out.push_str(&self.blocks.join("\n\n"));
        out.push('\n');
        out
    }
}
