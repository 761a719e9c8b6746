//! buildplan-lib: resolve package-build specs into a dependency-ordered plan.
//!
//! This crate provides:
//! - `spec`: the spec model, its validation rules and default filling
//! - `args`: build argument substitution over every templated field
//! - `load`: strict YAML loading of one or many specs
//! - `graph`: dependency graph, cycle detection, build order and target slicing
//!
//! Everything here is pure computation over in-memory values: nothing is
//! fetched, built or executed.

pub mod args;
pub mod graph;
pub mod load;
pub mod spec;

pub use args::{KnownArgs, SubstituteError, substitute_batch};
pub use graph::{CycleError, DepKind, Graph, GraphError, build_graph, target_slice};
pub use load::{LoadError, load_spec, load_specs};
pub use spec::Spec;
