use serde::{Deserialize, Serialize};

/// Which memory encoding the generated program uses. The two are never
/// interleaved within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryModelKind {
    /// Locals and fields read and write named locations directly; by-ref
    /// parameters surface as copy-out results.
    Copy,
    /// Locals live behind `Addr` cells in typed heaps; by-ref parameters
    /// pass addresses.
    Address,
}

/// Run-wide switches for the Boogie generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoogieCodeGenConfig {
    /// Assert (rather than assume) non-nullness before dereferences.
    pub check_null_dereferences: bool,
    /// Fuse metadata-backed array initializers into a bulk havoc.
    pub atomic_array_init: bool,
    /// Model exception flow through the pending-exception globals. When off,
    /// call sites only get null-guard instrumentation.
    pub exceptions: bool,
    /// Close dispatch chains by calling the declared callee when no subtype
    /// guard matches, instead of `assert false`.
    pub avoid_subtype_checks_for_interfaces: bool,
    /// Emit `{:sourceFile}`/`{:sourceLine}` annotations where the input
    /// carries source positions.
    pub emit_line_numbers: bool,
    /// Stop at the first method that fails to translate instead of skipping
    /// it.
    pub fail_fast: bool,
    pub memory_model: MemoryModelKind,
    pub indent: String,
}

impl Default for BoogieCodeGenConfig {
    fn default() -> Self {
        Self {
            check_null_dereferences: false,
            atomic_array_init: true,
            exceptions: true,
            avoid_subtype_checks_for_interfaces: false,
            emit_line_numbers: false,
            fail_fast: false,
            memory_model: MemoryModelKind::Copy,
            indent: "    ".to_string(),
        }
    }
}
