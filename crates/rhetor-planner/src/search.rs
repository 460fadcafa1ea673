//! Search and cache
//!
//! For a predicate node, the search enumerates every assignment of frames to
//! the predicate's local variables and keeps the ones satisfying all of its
//! properties. A local variable bound at the reference site to a global that
//! already has a value ranges over that value only; any other variable ranges
//! over every frame whose concept falls under the variable's type.
//!
//! The enumeration is a full Cartesian product: its cost is the product of
//! the domain sizes, and nothing is pruned before properties are checked.
//!
//! Results are cached per (node, values of the globals the node references)
//! and consumed from the front, one assignment per committed clause.

use std::collections::{BTreeMap, HashMap, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::PlannerError;
use crate::fd::{Fd, FdValue, VarRef};
use crate::frame::{follow_path, Frame, FrameId, FrameSet, Resolved};
use crate::network::{NodeId, SchemaNetwork};
use crate::ontology::Ontology;
use crate::predicate::Predicate;

/// Local variable → frame.
pub type Assignment<'f> = BTreeMap<String, &'f Frame>;

/// Global variable → frame.
pub type Bindings<'f> = BTreeMap<String, &'f Frame>;

/// A node plus the values of the bound globals it references, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    node: NodeId,
    globals: Vec<(String, FrameId)>,
}

impl CacheKey {
    pub fn new(network: &SchemaNetwork, node: NodeId, globals: &Bindings<'_>) -> Self {
        let mut projected: Vec<(String, FrameId)> = network
            .predicate_of(node)
            .map(|(_, bindings)| {
                bindings
                    .values()
                    .filter_map(|global| {
                        globals
                            .get(global)
                            .map(|frame| (global.clone(), frame.id().to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        projected.sort();
        projected.dedup();
        Self {
            node,
            globals: projected,
        }
    }
}

/// Per-run memo of search results.
///
/// A missing key means the node has not been searched under those bindings;
/// an empty list means it was searched and has nothing (left) to offer.
#[derive(Debug, Default)]
pub struct Cache<'f> {
    entries: HashMap<CacheKey, VecDeque<Assignment<'f>>>,
}

impl<'f> Cache<'f> {
    pub fn fetch(&self, key: &CacheKey) -> Option<&VecDeque<Assignment<'f>>> {
        self.entries.get(key)
    }

    pub fn populate(&mut self, key: CacheKey, values: Vec<Assignment<'f>>) {
        self.entries.insert(key, values.into());
    }

    fn pop(&mut self, key: &CacheKey) -> Option<Option<Assignment<'f>>> {
        self.entries.get_mut(key).map(VecDeque::pop_front)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Search state for one planning run.
pub struct Search<'a, 'f> {
    network: &'a SchemaNetwork,
    frames: &'f dyn FrameSet,
    ontology: &'a dyn Ontology,
    cache: Cache<'f>,
}

impl<'a, 'f> Search<'a, 'f> {
    pub fn new(
        network: &'a SchemaNetwork,
        frames: &'f dyn FrameSet,
        ontology: &'a dyn Ontology,
    ) -> Self {
        Self {
            network,
            frames,
            ontology,
            cache: Cache::default(),
        }
    }

    pub fn network(&self) -> &'a SchemaNetwork {
        self.network
    }

    pub fn frames(&self) -> &'f dyn FrameSet {
        self.frames
    }

    pub fn ontology(&self) -> &'a dyn Ontology {
        self.ontology
    }

    pub fn cache(&self) -> &Cache<'f> {
        &self.cache
    }

    /// Cached assignments for `node` under `globals`, if it was searched.
    pub fn cached(&self, node: NodeId, globals: &Bindings<'f>) -> Option<&VecDeque<Assignment<'f>>> {
        self.cache.fetch(&CacheKey::new(self.network, node, globals))
    }

    /// Whether `node` has an assignment available, searching on a cache miss.
    pub fn can_be_instantiated(&mut self, node: NodeId, globals: &Bindings<'f>) -> bool {
        let key = CacheKey::new(self.network, node, globals);
        if let Some(values) = self.cache.fetch(&key) {
            return !values.is_empty();
        }
        let values = self.search_values(node, globals);
        debug!(
            node = %self.network.node(node).label,
            found = values.len(),
            "searched values"
        );
        let available = !values.is_empty();
        self.cache.populate(key, values);
        available
    }

    /// Every assignment satisfying the node's predicate, in canonical order.
    pub fn search_values(&self, node: NodeId, globals: &Bindings<'f>) -> Vec<Assignment<'f>> {
        let network = self.network;
        let Some((predicate, bindings)) = network.predicate_of(node) else {
            return Vec::new();
        };

        let mut domains: Vec<(&str, Vec<&'f Frame>)> = Vec::with_capacity(predicate.vars.len());
        for (local, concept) in &predicate.vars {
            let bound = bindings
                .get(local)
                .and_then(|global| globals.get(global))
                .copied();
            let domain = match bound {
                Some(frame) => vec![frame],
                None => self.frames_under(concept),
            };
            trace!(var = %local, concept = %concept, size = domain.len(), "variable domain");
            if domain.is_empty() {
                return Vec::new();
            }
            domains.push((local.as_str(), domain));
        }

        let mut found: Vec<(String, Assignment<'f>)> = Vec::new();
        let mut positions = vec![0usize; domains.len()];
        loop {
            let assignment: Assignment<'f> = domains
                .iter()
                .zip(&positions)
                .map(|((name, domain), &pos)| (name.to_string(), domain[pos]))
                .collect();

            let satisfied = predicate.properties.iter().all(|property| {
                let ok = property.check(&assignment, self.frames, self.ontology);
                trace!(property = %property, ok, "checked property");
                ok
            });
            if satisfied {
                found.push((canonical_key(&assignment), assignment));
            }

            // Odometer step, last variable least significant.
            let mut carry = true;
            for i in (0..positions.len()).rev() {
                positions[i] += 1;
                if positions[i] < domains[i].1.len() {
                    carry = false;
                    break;
                }
                positions[i] = 0;
            }
            if carry {
                break;
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        found.into_iter().map(|(_, assignment)| assignment).collect()
    }

    fn frames_under(&self, concept: &str) -> Vec<&'f Frame> {
        self.frames
            .frames()
            .filter(|frame| {
                frame
                    .concept()
                    .is_some_and(|c| self.ontology.is_a(c, concept))
            })
            .collect()
    }

    /// Instantiate the node's output template from its first cached
    /// assignment.
    ///
    /// With `commit`, that assignment is consumed and its values are written
    /// to the globals the node binds.
    pub fn instantiate_predicate(
        &mut self,
        node: NodeId,
        globals: &mut Bindings<'f>,
        commit: bool,
    ) -> Result<Fd, PlannerError> {
        if commit {
            self.commit(node, globals)
        } else {
            self.peek(node, globals).map(|(clause, _)| clause)
        }
    }

    /// The clause and default focus the node would produce next.
    pub fn peek(
        &self,
        node: NodeId,
        globals: &Bindings<'f>,
    ) -> Result<(Fd, Option<&'f Frame>), PlannerError> {
        let (predicate, _) = self.predicate_node(node)?;
        let key = CacheKey::new(self.network, node, globals);
        let values = self
            .cache
            .fetch(&key)
            .ok_or_else(|| self.uninitialized(node))?;
        let assignment = values.front().ok_or_else(|| self.exhausted(node))?;
        let clause = instantiate_clause(&predicate.output, assignment, self.frames);
        let focus = assignment.get(&predicate.default_focus).copied();
        Ok((clause, focus))
    }

    /// Consume the node's first cached assignment and return its clause.
    pub fn commit(&mut self, node: NodeId, globals: &mut Bindings<'f>) -> Result<Fd, PlannerError> {
        let (predicate, bindings) = self.predicate_node(node)?;
        let key = CacheKey::new(self.network, node, globals);
        let assignment = match self.cache.pop(&key) {
            None => return Err(self.uninitialized(node)),
            Some(None) => return Err(self.exhausted(node)),
            Some(Some(assignment)) => assignment,
        };
        for (local, global) in bindings {
            if let Some(&frame) = assignment.get(local) {
                globals.insert(global.clone(), frame);
            }
        }
        Ok(instantiate_clause(&predicate.output, &assignment, self.frames))
    }

    fn predicate_node(
        &self,
        node: NodeId,
    ) -> Result<(&'a Predicate, &'a IndexMap<String, String>), PlannerError> {
        let network = self.network;
        network
            .predicate_of(node)
            .ok_or_else(|| self.uninitialized(node))
    }

    fn uninitialized(&self, node: NodeId) -> PlannerError {
        PlannerError::UninitializedNode(self.network.describe(node).to_string())
    }

    fn exhausted(&self, node: NodeId) -> PlannerError {
        PlannerError::ExhaustedNode(self.network.describe(node).to_string())
    }
}

/// `var=id;` over the assignment's variables in name order.
fn canonical_key(assignment: &Assignment<'_>) -> String {
    let mut key = String::new();
    for (var, frame) in assignment {
        key.push_str(var);
        key.push('=');
        key.push_str(frame.id());
        key.push(';');
    }
    key
}

/// Replace every reference in `template` by the data it denotes.
///
/// Frames are boxed as `{"object-id": id}`. A path yielding nothing becomes
/// [`FdValue::Absent`], a single value is unwrapped, and several values form
/// a list.
pub fn instantiate_clause<'f>(
    template: &Fd,
    assignment: &Assignment<'f>,
    frames: &'f dyn FrameSet,
) -> Fd {
    template
        .iter()
        .map(|(name, value)| {
            let value = match value {
                FdValue::Tree(inner) => FdValue::Tree(instantiate_clause(inner, assignment, frames)),
                FdValue::Var(var_ref) => resolve_reference(var_ref, assignment, frames),
                other => other.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

fn resolve_reference<'f>(
    var_ref: &VarRef,
    assignment: &Assignment<'f>,
    frames: &'f dyn FrameSet,
) -> FdValue {
    let Some(&frame) = assignment.get(var_ref.var()) else {
        return FdValue::Absent;
    };
    let mut values: Vec<FdValue> = follow_path(frames, frame, var_ref.path())
        .into_iter()
        .map(|resolved| match resolved {
            Resolved::Frame(frame) => FdValue::boxed_frame(frame.id()),
            Resolved::Dangling(id) => FdValue::boxed_frame(id),
            Resolved::Literal(literal) => FdValue::Ground(literal.clone()),
        })
        .collect();
    match values.len() {
        0 => FdValue::Absent,
        1 => values.remove(0),
        _ => FdValue::List(values),
    }
}
