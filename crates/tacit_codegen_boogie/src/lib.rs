//! Boogie code generation for the typed three-address program model.
//!
//! [`generator::BoogieTranslator`] drives the whole pass: each translatable
//! method body lowers to one procedure, cross-method registries accumulate
//! in a [`context::TranslationContext`], and one declaration block flushes
//! after the last method. Location access is abstracted behind
//! [`memory::MemoryStrategy`] so the copy-based and address-based encodings
//! share the rest of the pipeline.

pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod memory;
pub mod naming;


pub use builder::BoogieSourceBuilder;
pub use config::{BoogieCodeGenConfig, MemoryModelKind};
pub use context::TranslationContext;
pub use error::TranslateError;
pub use generator::{BoogieModule, BoogieTranslator};
pub use memory::{strategy_for, MemoryStrategy, ParameterLowering};
pub use naming::{boogie_type, unique_method_name, BoogieType, StringInterner};
