//! Rhetor schema definitions
//!
//! This crate holds the typed description of a rhetorical schema (a predicate
//! library plus a combinator tree over predicate references) and the parser
//! for the indentation-structured `.schema` surface syntax.
//!
//! The planner consumes [`SchemaDefinition`] values; whether they come from a
//! `.schema` file or from their serde JSON form is up to the caller.

pub mod schema;

pub use schema::{
    format_schema, parse_schema, OutputAttr, OutputValue, PredicateDecl, SchemaDefinition, SchemaNodeDecl,
    SchemaParseError, VarBindingDecl, VariableDecl,
};

/// Parse a schema from JSON (the serde form of [`SchemaDefinition`]).
pub fn parse_schema_json(text: &str) -> Result<SchemaDefinition, serde_json::Error> {
    serde_json::from_str(text)
}
