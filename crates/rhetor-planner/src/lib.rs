//! Rhetor: schema-driven document planning
//!
//! Given a schema (a network of rhetorical predicates), a set of typed
//! frames and an ontology, the planner walks the network, searches for data
//! that can fill each step, and chooses among competing continuations with
//! discourse-focus heuristics. The result is a [`DocumentPlan`]: paragraphs
//! of aggregation segments of instantiated clauses.
//!
//! ## Module Organization
//!
//! - `fd`, `frame`, `ontology`: data model and external collaborators
//! - `property`, `predicate`, `network`: compiled schemas
//! - `search`, `confusion`: constraint search, caching and reachability
//! - `chooser`, `planner`, `plan`: the planning loop and its output

pub mod chooser;
pub mod confusion;
pub mod error;
pub mod fd;
pub mod frame;
pub mod network;
pub mod ontology;
pub mod plan;
pub mod planner;
pub mod predicate;
pub mod property;
pub mod search;

pub use chooser::{
    extract_potential_foci, ChoiceContext, ChooserPolicy, Decision, GreedyChooser, LocalChooser,
    RandomChooser, SimpleFocusChooser,
};
pub use confusion::DecoratedNode;
pub use error::PlannerError;
pub use fd::{Fd, FdValue, Literal, VarRef};
pub use frame::{Frame, FrameId, FrameSet, MemoryFrameSet, Value};
pub use network::{NodeId, NodeKind, SchemaNetwork};
pub use ontology::{FlatOntology, Ontology, Taxonomy, MAX_DISTANCE};
pub use plan::DocumentPlan;
pub use planner::{FocusStack, Planner, PlannerConfig};
pub use predicate::Predicate;
pub use property::Property;
pub use search::{Assignment, Bindings, Search};
