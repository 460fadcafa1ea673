//! Frames and frame sets
//!
//! A frame is an identified, typed record with ordered multi-valued
//! attributes. Values are either literals or references to other frames by
//! id. The planner only ever reads frames; the mutators exist for loaders.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::fd::Literal;

pub type FrameId = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Literal(Literal),
    Frame(FrameId),
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        Value::Literal(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: FrameId,
    concept: Option<String>,
    attributes: IndexMap<String, Vec<Value>>,
}

impl Frame {
    pub fn new(id: impl Into<FrameId>) -> Self {
        Self {
            id: id.into(),
            concept: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    pub fn with(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add(attr, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn concept(&self) -> Option<&str> {
        self.concept.as_deref()
    }

    /// All values of `attr`, empty if undefined.
    pub fn get(&self, attr: &str) -> &[Value] {
        self.attributes.get(attr).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.attributes
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn set_concept(&mut self, concept: impl Into<String>) {
        self.concept = Some(concept.into());
    }

    pub fn set(&mut self, attr: impl Into<String>, values: Vec<Value>) {
        self.attributes.insert(attr.into(), values);
    }

    pub fn add(&mut self, attr: impl Into<String>, value: impl Into<Value>) {
        self.attributes
            .entry(attr.into())
            .or_default()
            .push(value.into());
    }
}

pub trait FrameSet {
    fn get_frame(&self, id: &str) -> Option<&Frame>;

    /// Every frame, in an order that is stable across calls.
    fn frames(&self) -> Box<dyn Iterator<Item = &Frame> + '_>;
}

/// Insertion-ordered in-memory frame store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSet {
    frames: IndexMap<FrameId, Frame>,
}

impl MemoryFrameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a frame.
    pub fn insert(&mut self, frame: Frame) {
        self.frames.insert(frame.id.clone(), frame);
    }

    /// The frame with `id`, created empty if missing.
    pub fn get_or_insert(&mut self, id: &str) -> &mut Frame {
        self.frames
            .entry(id.to_string())
            .or_insert_with(|| Frame::new(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Frame> {
        self.frames.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FromIterator<Frame> for MemoryFrameSet {
    fn from_iter<T: IntoIterator<Item = Frame>>(iter: T) -> Self {
        let mut set = MemoryFrameSet::new();
        for frame in iter {
            set.insert(frame);
        }
        set
    }
}

impl FrameSet for MemoryFrameSet {
    fn get_frame(&self, id: &str) -> Option<&Frame> {
        self.frames.get(id)
    }

    fn frames(&self) -> Box<dyn Iterator<Item = &Frame> + '_> {
        Box::new(self.frames.values())
    }
}

// ============================================================================
// Path resolution
// ============================================================================

/// A value reached by following an attribute path.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'f> {
    Frame(&'f Frame),
    /// Reference to an id missing from the frame set; it keeps its identity
    /// but cannot be followed further.
    Dangling(&'f str),
    Literal(&'f Literal),
}

impl<'f> Resolved<'f> {
    /// Frames compare by id, literals by lexical form.
    pub fn identity(&self) -> (bool, Cow<'f, str>) {
        match *self {
            Resolved::Frame(frame) => (true, Cow::Borrowed(frame.id())),
            Resolved::Dangling(id) => (true, Cow::Borrowed(id)),
            Resolved::Literal(literal) => (false, literal.text()),
        }
    }

    pub fn frame_id(&self) -> Option<&'f str> {
        match *self {
            Resolved::Frame(frame) => Some(frame.id()),
            Resolved::Dangling(id) => Some(id),
            Resolved::Literal(_) => None,
        }
    }
}

/// Follow `path` from `start`, flattening through multi-valued attributes.
///
/// Results are de-duplicated by identity, keeping first-seen order.
pub fn follow_path<'f>(
    frames: &'f dyn FrameSet,
    start: &'f Frame,
    path: &[String],
) -> Vec<Resolved<'f>> {
    let mut current = vec![Resolved::Frame(start)];
    for segment in path {
        let mut next: Vec<Resolved<'f>> = Vec::new();
        for item in current.iter().copied() {
            let Resolved::Frame(frame) = item else {
                continue;
            };
            for value in frame.get(segment) {
                let resolved = match value {
                    Value::Literal(literal) => Resolved::Literal(literal),
                    Value::Frame(id) => match frames.get_frame(id) {
                        Some(target) => Resolved::Frame(target),
                        None => Resolved::Dangling(id),
                    },
                };
                let identity = resolved.identity();
                if !next.iter().any(|seen| seen.identity() == identity) {
                    next.push(resolved);
                }
            }
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryFrameSet {
        [
            Frame::new("a")
                .with_concept("c-person")
                .with("child", Value::Frame("b".to_string()))
                .with("child", Value::Frame("c".to_string()))
                .with("child", Value::Frame("ghost".to_string())),
            Frame::new("b").with("name", Literal::from("Bo")),
            Frame::new("c")
                .with("name", Literal::from("Cy"))
                .with("name", Literal::from("Bo")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn follows_and_flattens_paths() {
        let frames = sample();
        let a = frames.get_frame("a").unwrap();

        let children = follow_path(&frames, a, &["child".to_string()]);
        let ids: Vec<_> = children.iter().filter_map(|r| r.frame_id()).collect();
        assert_eq!(ids, vec!["b", "c", "ghost"]);

        let names = follow_path(&frames, a, &["child".to_string(), "name".to_string()]);
        let texts: Vec<_> = names.iter().map(|r| r.identity().1.into_owned()).collect();
        assert_eq!(texts, vec!["Bo", "Cy"]);

        assert!(follow_path(&frames, a, &["missing".to_string(), "name".to_string()]).is_empty());
    }

    #[test]
    fn undefined_attributes_read_as_empty() {
        let frame = Frame::new("x");
        assert!(frame.get("anything").is_empty());
    }
}
