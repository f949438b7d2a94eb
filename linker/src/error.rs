use ast::{NodeId, Span};
use thiserror::Error;

/// Fatal linking failures. There is no partially linked environment: any of
/// these aborts the whole link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("unresolved reference `{name}`{}", located(.span))]
    UnresolvedReference { name: String, span: Option<Span> },
    #[error("node {0} has no reachable ancestor")]
    MissingAncestor(NodeId),
    #[error("malformed base environment: {0}")]
    MalformedBase(String),
}

fn located(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" at {span}"),
        None => String::new(),
    }
}
