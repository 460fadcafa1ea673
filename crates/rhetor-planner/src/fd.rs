//! Expression trees (FDs)
//!
//! An FD is an ordered mapping from attribute names to values. Predicates
//! carry one as their output template, where leaves may reference the
//! predicate's variables; instantiated clauses are FDs whose references have
//! been replaced by data.

use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type Fd = IndexMap<String, FdValue>;

/// Attribute holding a frame id inside a boxed frame reference.
pub const OBJECT_ID: &str = "object-id";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl Literal {
    /// Lexical form, used for comparisons against ground values.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Literal::Integer(n) => Cow::Owned(n.to_string()),
            Literal::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

/// Reference to a predicate variable, optionally followed by an attribute
/// path (`entity.kind.name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum VarRef {
    Var { var: String },
    Path { var: String, path: Vec<String> },
}

impl VarRef {
    /// Classify `text` as a variable or path reference.
    ///
    /// Returns `None` for anything else, which callers treat as ground text.
    pub fn parse(text: &str, is_var: impl Fn(&str) -> bool) -> Option<VarRef> {
        if is_var(text) {
            return Some(VarRef::Var {
                var: text.to_string(),
            });
        }
        let (var, rest) = text.split_once('.')?;
        if !is_var(var) {
            return None;
        }
        let path: Vec<String> = rest.split('.').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return None;
        }
        Some(VarRef::Path {
            var: var.to_string(),
            path,
        })
    }

    pub fn var(&self) -> &str {
        match self {
            VarRef::Var { var } | VarRef::Path { var, .. } => var,
        }
    }

    pub fn path(&self) -> &[String] {
        match self {
            VarRef::Var { .. } => &[],
            VarRef::Path { path, .. } => path,
        }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.var())?;
        for segment in self.path() {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FdValue {
    Absent,
    Ground(Literal),
    List(Vec<FdValue>),
    Var(VarRef),
    Tree(Fd),
}

impl FdValue {
    pub fn text(value: impl Into<String>) -> Self {
        FdValue::Ground(Literal::Text(value.into()))
    }

    /// `{"object-id": id}`, the only form in which frames appear in clauses.
    pub fn boxed_frame(id: &str) -> Self {
        let mut fd = Fd::new();
        fd.insert(OBJECT_ID.to_string(), FdValue::text(id));
        FdValue::Tree(fd)
    }

    /// Frame id of a boxed frame reference.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            FdValue::Tree(fd) if fd.len() == 1 => match fd.get(OBJECT_ID) {
                Some(FdValue::Ground(Literal::Text(id))) => Some(id),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            FdValue::Ground(literal) => Some(literal),
            _ => None,
        }
    }
}

impl From<Literal> for FdValue {
    fn from(value: Literal) -> Self {
        FdValue::Ground(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(name: &str) -> bool {
        matches!(name, "entity" | "kind")
    }

    #[test]
    fn classifies_references() {
        assert_eq!(
            VarRef::parse("entity", vars),
            Some(VarRef::Var {
                var: "entity".to_string()
            })
        );
        assert_eq!(
            VarRef::parse("entity.kind.name", vars),
            Some(VarRef::Path {
                var: "entity".to_string(),
                path: vec!["kind".to_string(), "name".to_string()],
            })
        );
        assert_eq!(VarRef::parse("other.kind", vars), None);
        assert_eq!(VarRef::parse("entity.", vars), None);
        assert_eq!(VarRef::parse("3.14", vars), None);
    }

    #[test]
    fn boxed_frames_serialize_as_object_maps() {
        let value = FdValue::boxed_frame("frame-1");
        assert_eq!(value.object_id(), Some("frame-1"));
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"object-id":"frame-1"}"#
        );
        assert_eq!(serde_json::to_string(&FdValue::Absent).unwrap(), "null");
    }
}
