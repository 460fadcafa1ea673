//! Planner errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("schema references unknown predicate `{0}`")]
    UnknownPredicate(String),

    #[error("predicate `{0}` is declared more than once")]
    DuplicatePredicate(String),

    #[error("predicate `{predicate}` has no variable `{variable}`")]
    UnknownVariable { predicate: String, variable: String },

    #[error("cannot parse property `{property}` of predicate `{predicate}`: {message}")]
    PropertyParse {
        predicate: String,
        property: String,
        message: String,
    },

    /// The node was never searched under the current bindings.
    #[error("trying to instantiate an uninitialized node: {0}")]
    UninitializedNode(String),

    /// Every cached assignment for the node has already been consumed.
    #[error("trying to instantiate an exhausted node: {0}")]
    ExhaustedNode(String),

    #[error("chooser picked position {position} out of {candidates} candidates")]
    EmptyConfusionChoice { position: usize, candidates: usize },
}
