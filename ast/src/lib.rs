//! Program trees for the Wollok backend.
//!
//! Every stage of the pipeline shares one node model ([`Node`], [`Kind`]).
//! Before linking, nodes own their children ([`Tree`]) and travel in a
//! stage-typed [`Forest`]; the linker flattens them into an arena addressed
//! by [`NodeId`].

pub mod build;
pub mod node;
pub mod span;
pub mod tree;

pub use node::{BaseCall, Kind, LiteralValue, Node, NodeId};
pub use span::{Pos, Span};
pub use tree::{CLOSURE, Filled, Forest, LIST, OBJECT, Raw, Tree};
