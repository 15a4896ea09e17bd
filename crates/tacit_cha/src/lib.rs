//! Class-hierarchy analysis for closed-world virtual dispatch.
//!
//! The subtype index sits behind the [`ClassHierarchy`] trait so the
//! generator can be driven by any hierarchy source; [`ProgramHierarchy`]
//! is the default implementation over an in-memory program. On top of it,
//! [`DispatchResolver`] turns a call site into the ordered list of override
//! candidates the emitted dispatch chain will test.

pub mod dispatch;
pub mod hierarchy;


pub use dispatch::DispatchResolver;
pub use hierarchy::{ClassHierarchy, ProgramHierarchy};
