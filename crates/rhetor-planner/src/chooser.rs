//! Continuation choosers
//!
//! When more than one predicate node can continue the plan, a chooser picks
//! one and decides where the discourse focus moves. Choosers keep no history
//! of their own: the planner hands them the focus state on every call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fd::{Fd, FdValue};
use crate::frame::{Frame, FrameSet};
use crate::ontology::Ontology;

/// Everything a chooser sees for one decision. `clauses[i]` and
/// `default_foci[i]` describe the i-th candidate.
#[derive(Clone, Copy)]
pub struct ChoiceContext<'c, 'f> {
    pub clauses: &'c [Fd],
    pub default_foci: &'c [Option<&'f Frame>],
    pub current_focus: Option<&'f Frame>,
    pub potential_foci: &'c [&'f Frame],
    pub focus_stack: &'c [&'f Frame],
    pub frames: &'f dyn FrameSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision<'f> {
    pub position: usize,
    pub current_focus: Option<&'f Frame>,
    pub potential_foci: Vec<&'f Frame>,
}

pub trait LocalChooser {
    fn choose<'f>(&mut self, ctx: ChoiceContext<'_, 'f>) -> Decision<'f>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChooserPolicy {
    Greedy,
    Random,
    #[default]
    SimpleFocus,
}

impl std::str::FromStr for ChooserPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(ChooserPolicy::Greedy),
            "random" => Ok(ChooserPolicy::Random),
            "simple-focus" => Ok(ChooserPolicy::SimpleFocus),
            other => Err(format!(
                "unknown chooser `{other}` (expected greedy, random or simple-focus)"
            )),
        }
    }
}

fn same_frame(a: &Frame, b: &Frame) -> bool {
    a.id() == b.id()
}

fn contains(list: &[&Frame], frame: &Frame) -> bool {
    list.iter().any(|other| same_frame(other, frame))
}

/// Frames mentioned by a clause, in first-seen order.
///
/// Any ground value whose text is the id of a frame in `frames` counts, so
/// boxed references (`{"object-id": id}`) are found through their nesting.
pub fn extract_potential_foci<'f>(clause: &Fd, frames: &'f dyn FrameSet) -> Vec<&'f Frame> {
    fn walk<'f>(value: &FdValue, frames: &'f dyn FrameSet, out: &mut Vec<&'f Frame>) {
        match value {
            FdValue::Tree(fd) => fd.values().for_each(|v| walk(v, frames, out)),
            FdValue::List(items) => items.iter().for_each(|v| walk(v, frames, out)),
            FdValue::Ground(literal) => {
                if let Some(frame) = frames.get_frame(&literal.text()) {
                    if !contains(out, frame) {
                        out.push(frame);
                    }
                }
            }
            FdValue::Var(_) | FdValue::Absent => {}
        }
    }

    let mut out = Vec::new();
    for value in clause.values() {
        walk(value, frames, &mut out);
    }
    out
}

fn greedy<'f>(ctx: &ChoiceContext<'_, 'f>) -> Decision<'f> {
    Decision {
        position: 0,
        current_focus: ctx.default_foci.first().copied().flatten(),
        potential_foci: ctx
            .clauses
            .first()
            .map(|clause| extract_potential_foci(clause, ctx.frames))
            .unwrap_or_default(),
    }
}

/// Always the first candidate, keeping its default focus.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyChooser;

impl LocalChooser for GreedyChooser {
    fn choose<'f>(&mut self, ctx: ChoiceContext<'_, 'f>) -> Decision<'f> {
        greedy(&ctx)
    }
}

/// A uniformly random candidate, focusing on a random frame it mentions.
#[derive(Debug, Clone)]
pub struct RandomChooser {
    rng: StdRng,
}

impl RandomChooser {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl LocalChooser for RandomChooser {
    fn choose<'f>(&mut self, ctx: ChoiceContext<'_, 'f>) -> Decision<'f> {
        let position = if ctx.clauses.is_empty() {
            0
        } else {
            self.rng.gen_range(0..ctx.clauses.len())
        };
        let potential_foci = ctx
            .clauses
            .get(position)
            .map(|clause| extract_potential_foci(clause, ctx.frames))
            .unwrap_or_default();
        let current_focus = if potential_foci.is_empty() {
            ctx.default_foci.get(position).copied().flatten()
        } else {
            Some(potential_foci[self.rng.gen_range(0..potential_foci.len())])
        };
        Decision {
            position,
            current_focus,
            potential_foci,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    /// The focus moves to something the previous clause introduced.
    Shift,
    /// The focus stays where it is.
    Retention,
    /// The focus returns to an earlier focus.
    Return,
}

const TIERS: [Tier; 3] = [Tier::Shift, Tier::Retention, Tier::Return];

/// Focus-tracking chooser.
///
/// Candidates are filtered by tiers in order, first on their default focus
/// and then on every frame their clause mentions; the first non-empty tier
/// wins and ties go to the candidate whose frames link best to the previous
/// potential foci. With no match at all it behaves like [`GreedyChooser`].
pub struct SimpleFocusChooser<'o> {
    ontology: &'o dyn Ontology,
}

impl<'o> SimpleFocusChooser<'o> {
    pub fn new(ontology: &'o dyn Ontology) -> Self {
        Self { ontology }
    }

    fn matches(tier: Tier, focus: &Frame, ctx: &ChoiceContext<'_, '_>) -> bool {
        let is_current = ctx.current_focus.is_some_and(|c| same_frame(c, focus));
        match tier {
            Tier::Shift => {
                !is_current
                    && !contains(ctx.focus_stack, focus)
                    && contains(ctx.potential_foci, focus)
            }
            Tier::Retention => is_current,
            Tier::Return => contains(ctx.focus_stack, focus),
        }
    }

    /// Sum over `new` of the best link into `previous`: `1` for the same
    /// frame, otherwise `0.9` minus the concept distance when positive.
    pub fn link_score(&self, new: &[&Frame], previous: &[&Frame]) -> f64 {
        new.iter()
            .map(|candidate| {
                previous
                    .iter()
                    .map(|old| self.link(candidate, old))
                    .fold(0.0, f64::max)
            })
            .filter(|best| *best > 0.0)
            .sum()
    }

    fn link(&self, new: &Frame, old: &Frame) -> f64 {
        if same_frame(new, old) {
            return 1.0;
        }
        match (new.concept(), old.concept()) {
            (Some(a), Some(b)) => {
                let distance = self.ontology.distance(a, b);
                if distance < 0.9 {
                    0.9 - distance
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn by_links<'f>(
        &self,
        candidates: &[(usize, &'f Frame)],
        ctx: &ChoiceContext<'_, 'f>,
    ) -> Decision<'f> {
        let mut best: Option<(f64, Decision<'f>)> = None;
        for &(position, focus) in candidates {
            let potential_foci = extract_potential_foci(&ctx.clauses[position], ctx.frames);
            let links = self.link_score(&potential_foci, ctx.potential_foci);
            tracing::trace!(position, links, "continuation links");
            if best.as_ref().map_or(true, |(max, _)| links > *max) {
                best = Some((
                    links,
                    Decision {
                        position,
                        current_focus: Some(focus),
                        potential_foci,
                    },
                ));
            }
        }
        best.map(|(_, decision)| decision)
            .unwrap_or_else(|| greedy(ctx))
    }
}

impl LocalChooser for SimpleFocusChooser<'_> {
    fn choose<'f>(&mut self, ctx: ChoiceContext<'_, 'f>) -> Decision<'f> {
        for tier in TIERS {
            let candidates: Vec<(usize, &'f Frame)> = ctx
                .default_foci
                .iter()
                .copied()
                .enumerate()
                .filter_map(|(i, focus)| focus.map(|f| (i, f)))
                .filter(|(_, focus)| Self::matches(tier, focus, &ctx))
                .collect();
            if !candidates.is_empty() {
                tracing::debug!(?tier, candidates = candidates.len(), "focus on default");
                return self.by_links(&candidates, &ctx);
            }
        }

        let extracted: Vec<Vec<&'f Frame>> = ctx
            .clauses
            .iter()
            .map(|clause| extract_potential_foci(clause, ctx.frames))
            .collect();
        for tier in TIERS {
            let candidates: Vec<(usize, &'f Frame)> = extracted
                .iter()
                .enumerate()
                .filter_map(|(i, foci)| {
                    foci.iter()
                        .find(|focus| Self::matches(tier, focus, &ctx))
                        .map(|&focus| (i, focus))
                })
                .collect();
            if !candidates.is_empty() {
                tracing::debug!(?tier, candidates = candidates.len(), "focus on mentioned frame");
                return self.by_links(&candidates, &ctx);
            }
        }

        greedy(&ctx)
    }
}
