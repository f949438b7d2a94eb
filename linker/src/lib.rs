//! Linking and derived relations.
//!
//! [`link`] turns a filled [`ast::Forest`] into an [`Environment`]: one
//! arena of identified nodes whose references all carry their resolution
//! target. Relations such as the parent of a node, the hierarchy of a
//! module or method lookup are computed on demand from the environment and
//! memoized inside it.

pub mod environment;
pub mod error;
pub mod link;
pub mod relations;
pub mod scope;

pub use environment::Environment;
pub use error::LinkError;
pub use link::link;
pub use scope::{GLOBAL_PACKAGE, Scope};
