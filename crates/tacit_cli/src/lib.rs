// tacit_cli - CLI functionality (library interface for testing)
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use tacit_cha::ProgramHierarchy;
use tacit_codegen_boogie::{BoogieCodeGenConfig, BoogieModule, BoogieTranslator, MemoryModelKind};
use tacit_ir::Program;

#[derive(Parser)]
#[command(name = "tacit")]
#[command(about = "Translates typed IR programs into Boogie verification input")]
pub struct Cli {
    /// Serialized IR program to translate
    pub input: PathBuf,
    /// Output path; defaults to the input with a .bpl extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Assert non-nullness before dereferences instead of assuming it
    #[arg(long)]
    pub check_null_dereferences: bool,
    /// Keep metadata-backed array initializers as runtime helper calls
    #[arg(long)]
    pub no_atomic_array_init: bool,
    /// Drop exception-flow modelling
    #[arg(long)]
    pub no_exceptions: bool,
    /// Call the declared callee when no dispatch guard matches
    #[arg(long)]
    pub avoid_interface_subtype_checks: bool,
    /// Annotate statements with source file and line attributes
    #[arg(long)]
    pub emit_line_numbers: bool,
    /// Stop at the first method that fails to translate
    #[arg(long)]
    pub fail_fast: bool,
    /// Memory encoding for locals, fields, and by-ref parameters
    #[arg(long, value_enum, default_value_t = MemoryModel::Copy)]
    pub memory_model: MemoryModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MemoryModel {
    Copy,
    Address,
}

impl From<MemoryModel> for MemoryModelKind {
    fn from(model: MemoryModel) -> Self {
        match model {
            MemoryModel::Copy => MemoryModelKind::Copy,
            MemoryModel::Address => MemoryModelKind::Address,
        }
    }
}

impl Cli {
    pub fn codegen_config(&self) -> BoogieCodeGenConfig {
        BoogieCodeGenConfig {
            check_null_dereferences: self.check_null_dereferences,
            atomic_array_init: !self.no_atomic_array_init,
            exceptions: !self.no_exceptions,
            avoid_subtype_checks_for_interfaces: self.avoid_interface_subtype_checks,
            emit_line_numbers: self.emit_line_numbers,
            fail_fast: self.fail_fast,
            memory_model: self.memory_model.into(),
            ..BoogieCodeGenConfig::default()
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("bpl"))
    }
}

pub fn load_program(path: &Path) -> Result<Program> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program from {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse program from {}", path.display()))
}

pub fn translate(program: &Program, config: BoogieCodeGenConfig) -> Result<BoogieModule> {
    let hierarchy = ProgramHierarchy::new(program);
    BoogieTranslator::new(program, &hierarchy, config)
        .translate_program()
        .context("Failed to translate program")
}
