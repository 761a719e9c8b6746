//! The spec model: one buildable package, its sources, tests and targets.
//!
//! - [`Spec`]: the unit of dependency resolution
//! - [`Source`]: tagged union describing where input materials come from
//! - [`TestSpec`]: checks run against the built package
//!
//! Structural rules live in [`Spec::validate`]; unset defaults are filled by
//! [`Spec::fill_defaults`].

mod cache;
mod defaults;
mod source;
mod types;
mod validate;

pub use cache::*;
pub use source::*;
pub use test::*;
pub use types::*;
pub use validate::*;
