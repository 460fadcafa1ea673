//! Schema networks
//!
//! A schema definition is lowered once into a directed graph of nodes stored
//! in an arena. Repetition constructs introduce back-edges, so the graph may
//! be cyclic; nodes are identified by their index and never removed.
//!
//! Lowering follows one rule per construct (`in`/`out` are the entry and exit
//! of the subnetwork being built):
//! - predicate reference, boundary: a single node linked from the previous one
//! - sequence, optional, star, plus: the children form a chain ending in a
//!   fresh node; star and plus link that node back to the chain's entry,
//!   star and optional link the entry forward to it
//! - choice: every alternative links from the shared entry to a fresh node
//!
//! Inside a chain an empty buffer node follows each element, which keeps loop
//! back-edges from reaching further than one element.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use rhetor_dsl::{SchemaDefinition, SchemaNodeDecl};

use crate::error::PlannerError;
use crate::predicate::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Empty,
    Predicate {
        /// Index into the network's predicate table.
        predicate: usize,
        /// Local variable → global variable, declared at the reference site.
        bindings: IndexMap<String, String>,
    },
    AggregationBoundary,
    ParagraphBoundary,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub kind: NodeKind,
    pub outgoing: Vec<NodeId>,
}

impl Node {
    pub fn is_predicate(&self) -> bool {
        matches!(self.kind, NodeKind::Predicate { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SchemaNetwork {
    name: Option<String>,
    predicates: Vec<Predicate>,
    predicate_index: HashMap<String, usize>,
    nodes: Vec<Node>,
    top: NodeId,
    exit: NodeId,
}

impl SchemaNetwork {
    pub fn build(definition: &SchemaDefinition) -> Result<Self, PlannerError> {
        let mut predicates = Vec::with_capacity(definition.predicates.len());
        let mut predicate_index = HashMap::new();
        for decl in &definition.predicates {
            if predicate_index.contains_key(&decl.id) {
                return Err(PlannerError::DuplicatePredicate(decl.id.clone()));
            }
            predicate_index.insert(decl.id.clone(), predicates.len());
            predicates.push(Predicate::compile(decl)?);
        }

        let mut network = Self {
            name: definition.name.clone(),
            predicates,
            predicate_index,
            nodes: Vec::new(),
            top: NodeId(0),
            exit: NodeId(0),
        };
        network.top = network.add_node("top", NodeKind::Empty);
        network.exit = network.add_node("exit", NodeKind::Empty);
        network.lower(network.top, network.exit, &definition.root, false)?;
        Ok(network)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn top(&self) -> NodeId {
        self.top
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn predicate(&self, id: &str) -> Option<&Predicate> {
        self.predicate_index.get(id).map(|&i| &self.predicates[i])
    }

    /// The predicate and reference-site bindings of a predicate node.
    pub fn predicate_of(&self, id: NodeId) -> Option<(&Predicate, &IndexMap<String, String>)> {
        match &self.node(id).kind {
            NodeKind::Predicate {
                predicate,
                bindings,
            } => Some((&self.predicates[*predicate], bindings)),
            _ => None,
        }
    }

    fn add_node(&mut self, prefix: &str, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            label: format!("{prefix}-{}", id.0),
            kind,
            outgoing: Vec::new(),
        });
        id
    }

    fn link(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.0].outgoing.push(to);
    }

    fn lower(
        &mut self,
        input: NodeId,
        output: NodeId,
        decls: &[SchemaNodeDecl],
        is_choice: bool,
    ) -> Result<(), PlannerError> {
        let mut previous = input;
        for decl in decls {
            let current = match decl {
                SchemaNodeDecl::Predicate { name, bindings } => {
                    let index = *self
                        .predicate_index
                        .get(name)
                        .ok_or_else(|| PlannerError::UnknownPredicate(name.clone()))?;
                    let predicate = &self.predicates[index];
                    let mut map = IndexMap::new();
                    for binding in bindings {
                        if !predicate.has_var(&binding.local) {
                            return Err(PlannerError::UnknownVariable {
                                predicate: name.clone(),
                                variable: binding.local.clone(),
                            });
                        }
                        map.insert(binding.local.clone(), binding.global.clone());
                    }
                    let current = self.add_node(
                        name,
                        NodeKind::Predicate {
                            predicate: index,
                            bindings: map,
                        },
                    );
                    self.link(previous, current);
                    current
                }
                SchemaNodeDecl::AggregationBoundary => {
                    let current = self.add_node("aggr", NodeKind::AggregationBoundary);
                    self.link(previous, current);
                    current
                }
                SchemaNodeDecl::ParagraphBoundary => {
                    let current = self.add_node("par", NodeKind::ParagraphBoundary);
                    self.link(previous, current);
                    current
                }
                SchemaNodeDecl::Sequence { nodes }
                | SchemaNodeDecl::Optional { nodes }
                | SchemaNodeDecl::KleeneStar { nodes }
                | SchemaNodeDecl::KleenePlus { nodes } => {
                    let current = self.add_node("recurse", NodeKind::Empty);
                    self.lower(previous, current, nodes, false)?;
                    if matches!(
                        decl,
                        SchemaNodeDecl::KleeneStar { .. } | SchemaNodeDecl::KleenePlus { .. }
                    ) {
                        self.link(current, previous);
                    }
                    if matches!(
                        decl,
                        SchemaNodeDecl::KleeneStar { .. } | SchemaNodeDecl::Optional { .. }
                    ) {
                        self.link(previous, current);
                    }
                    current
                }
                SchemaNodeDecl::Choice { nodes } => {
                    let current = self.add_node("option", NodeKind::Empty);
                    self.lower(previous, current, nodes, true)?;
                    current
                }
            };

            if is_choice {
                self.link(current, output);
            } else {
                let buffer = self.add_node("extra", NodeKind::Empty);
                self.link(current, buffer);
                previous = buffer;
            }
        }
        if !is_choice {
            self.link(previous, output);
        }
        Ok(())
    }

    /// Nodes reachable from `top`, depth-first in edge order.
    fn reachable(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.top];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.node(id).outgoing.iter().rev().copied());
        }
        order
    }

    /// Text listing of every reachable node and its outgoing edges.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for id in self.reachable() {
            let _ = writeln!(out, "{}", self.describe(id));
            out.push_str("connects to:\n");
            for &next in &self.node(id).outgoing {
                let _ = writeln!(out, "\t{}", self.describe(next));
            }
        }
        out
    }

    /// Graphviz rendering of the reachable network.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph schema {\n");
        for id in self.reachable() {
            let node = self.node(id);
            let shape = if matches!(node.kind, NodeKind::Empty) {
                "ellipse"
            } else {
                "box"
            };
            let _ = writeln!(
                out,
                "\t{} [label=\"{}\", shape={shape}];",
                dot_id(&node.label),
                self.describe(id)
            );
            for &next in &node.outgoing {
                let _ = writeln!(
                    out,
                    "\t{}->{};",
                    dot_id(&node.label),
                    dot_id(&self.node(next).label)
                );
            }
        }
        out.push_str("}\n");
        out
    }

    pub fn describe(&self, id: NodeId) -> NodeDisplay<'_> {
        NodeDisplay { network: self, id }
    }
}

fn dot_id(label: &str) -> String {
    let body: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("n_{body}")
}

/// `label[KIND/out-degree|predicate:{local|global, ...}]`
pub struct NodeDisplay<'a> {
    network: &'a SchemaNetwork,
    id: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.network.node(self.id);
        let kind = match node.kind {
            NodeKind::Empty => "EMPTY",
            NodeKind::Predicate { .. } => "PRED",
            NodeKind::AggregationBoundary => "AGGR",
            NodeKind::ParagraphBoundary => "PAR",
        };
        write!(f, "{}[{kind}/{}", node.label, node.outgoing.len())?;
        if let Some((predicate, bindings)) = self.network.predicate_of(self.id) {
            let bindings: Vec<String> = bindings
                .iter()
                .map(|(local, global)| format!("{local}|{global}"))
                .collect();
            write!(f, "|{}:{{{}}}", predicate.id, bindings.join(", "))?;
        }
        f.write_str("]")
    }
}
