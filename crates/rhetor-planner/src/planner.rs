//! The planning loop
//!
//! Each step computes the confusion set at the cursor, previews every
//! candidate's clause, lets the chooser pick one, commits it, and appends the
//! clause (stamped with the focus state) to the plan. The run ends when the
//! confusion set is empty; there is no step bound, so a schema whose loops
//! never run out of data does not terminate.

use indexmap::IndexMap;
use rhetor_dsl::SchemaDefinition;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::chooser::{
    ChoiceContext, ChooserPolicy, GreedyChooser, LocalChooser, RandomChooser, SimpleFocusChooser,
};
use crate::error::PlannerError;
use crate::fd::{Fd, FdValue};
use crate::frame::{Frame, FrameSet};
use crate::network::SchemaNetwork;
use crate::ontology::Ontology;
use crate::plan::DocumentPlan;
use crate::search::{Bindings, Search};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    pub chooser: ChooserPolicy,
    /// Seed for the random chooser; fresh entropy when unset.
    pub seed: Option<u64>,
}

impl PlannerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn build_chooser<'o>(&self, ontology: &'o dyn Ontology) -> Box<dyn LocalChooser + 'o> {
        match self.chooser {
            ChooserPolicy::Greedy => Box::new(GreedyChooser),
            ChooserPolicy::Random => Box::new(RandomChooser::new(self.seed)),
            ChooserPolicy::SimpleFocus => Box::new(SimpleFocusChooser::new(ontology)),
        }
    }
}

/// Focus history with stack discipline: a focus that recurs drops every
/// focus pushed after its most recent occurrence.
#[derive(Debug, Clone, Default)]
pub struct FocusStack<'f> {
    entries: Vec<&'f Frame>,
}

impl<'f> FocusStack<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, focus: &'f Frame) {
        match self.entries.iter().rposition(|f| f.id() == focus.id()) {
            Some(pos) => self.entries.truncate(pos + 1),
            None => self.entries.push(focus),
        }
    }

    /// Oldest first.
    pub fn as_slice(&self) -> &[&'f Frame] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|f| f.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Planner {
    network: SchemaNetwork,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(definition: &SchemaDefinition, config: PlannerConfig) -> Result<Self, PlannerError> {
        Ok(Self::from_network(SchemaNetwork::build(definition)?, config))
    }

    pub fn from_network(network: SchemaNetwork, config: PlannerConfig) -> Self {
        Self { network, config }
    }

    pub fn network(&self) -> &SchemaNetwork {
        &self.network
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan a document with the configured chooser.
    ///
    /// The first initial binding, if any, is the initial focus.
    pub fn instantiate<'f>(
        &self,
        frames: &'f dyn FrameSet,
        initial: &IndexMap<String, &'f Frame>,
        ontology: &dyn Ontology,
    ) -> Result<DocumentPlan, PlannerError> {
        let mut chooser = self.config.build_chooser(ontology);
        self.instantiate_with(frames, initial, ontology, chooser.as_mut())
    }

    pub fn instantiate_with<'f>(
        &self,
        frames: &'f dyn FrameSet,
        initial: &IndexMap<String, &'f Frame>,
        ontology: &dyn Ontology,
        chooser: &mut dyn LocalChooser,
    ) -> Result<DocumentPlan, PlannerError> {
        let span = info_span!(
            "instantiate",
            schema = self.network.name().unwrap_or_default()
        );
        let _enter = span.enter();

        let mut search = Search::new(&self.network, frames, ontology);
        let mut globals: Bindings<'f> = initial
            .iter()
            .map(|(name, &frame)| (name.clone(), frame))
            .collect();
        let mut current_focus: Option<&'f Frame> = initial.values().next().copied();
        let mut potential_foci: Vec<&'f Frame> = Vec::new();
        let mut stack = FocusStack::new();
        let mut plan = DocumentPlan::new();
        let mut cursor = self.network.top();

        loop {
            debug!(cursor = %self.network.describe(cursor), "planning step");
            let confusion = search.confusion_set(cursor, &globals);
            debug!(size = confusion.len(), "confusion set");
            if confusion.is_empty() {
                break;
            }

            let mut clauses = Vec::with_capacity(confusion.len());
            let mut default_foci = Vec::with_capacity(confusion.len());
            for candidate in &confusion {
                let (clause, focus) = search.peek(candidate.node, &globals)?;
                clauses.push(clause);
                default_foci.push(focus);
            }

            let decision = chooser.choose(ChoiceContext {
                clauses: &clauses,
                default_foci: &default_foci,
                current_focus,
                potential_foci: &potential_foci,
                focus_stack: stack.as_slice(),
                frames,
            });
            let chosen = *confusion.get(decision.position).ok_or(
                PlannerError::EmptyConfusionChoice {
                    position: decision.position,
                    candidates: confusion.len(),
                },
            )?;

            current_focus = decision.current_focus;
            potential_foci = decision.potential_foci;
            if let Some(focus) = current_focus {
                stack.push(focus);
            }

            let mut clause = search.commit(chosen.node, &mut globals)?;
            if chosen.aggregation {
                plan.add_aggregation_boundary();
            }
            if chosen.paragraph {
                plan.add_paragraph_boundary();
            }

            stamp_focus(&mut clause, current_focus, &stack, &potential_foci);
            debug!(
                node = %self.network.describe(chosen.node),
                focus = current_focus.map(Frame::id).unwrap_or_default(),
                "committed clause"
            );
            plan.add_clause(clause);
            cursor = chosen.node;
        }

        plan.finish();
        Ok(plan)
    }
}

fn focus_entry(frame: &Frame) -> FdValue {
    let mut fd = Fd::new();
    fd.insert("focus".to_string(), FdValue::text(frame.id()));
    FdValue::Tree(fd)
}

/// Record the focus state on the clause for later stages (referring
/// expressions and the like).
fn stamp_focus(
    clause: &mut Fd,
    current_focus: Option<&Frame>,
    stack: &FocusStack<'_>,
    potential_foci: &[&Frame],
) {
    clause.insert(
        "focus".to_string(),
        current_focus.map_or(FdValue::Absent, |f| FdValue::text(f.id())),
    );
    clause.insert(
        "focus-stack".to_string(),
        FdValue::List(stack.as_slice().iter().rev().map(|f| focus_entry(f)).collect()),
    );
    clause.insert(
        "potential-focus-list".to_string(),
        FdValue::List(potential_foci.iter().map(|f| focus_entry(f)).collect()),
    );
}
