//! Predicate properties
//!
//! Properties constrain the variables of a predicate. They are limited to
//! equality, ontological subsumption and their negations:
//!
//! ```text
//! entity.kind == kind
//! entity != other
//! kind UNDER c-animal
//! kind !UNDER c-abstract
//! ```

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use crate::fd::VarRef;
use crate::frame::{follow_path, FrameSet, Resolved};
use crate::ontology::Ontology;
use crate::search::Assignment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Ref(VarRef),
    Ground(String),
}

impl Operand {
    fn classify(text: &str, is_var: &impl Fn(&str) -> bool) -> Operand {
        match VarRef::parse(text, is_var) {
            Some(var_ref) => Operand::Ref(var_ref),
            None => Operand::Ground(text.to_string()),
        }
    }

    /// Identities of every value the operand denotes under `assignment`.
    fn resolve<'f>(
        &self,
        assignment: &Assignment<'f>,
        frames: &'f dyn FrameSet,
    ) -> Vec<(bool, Cow<'f, str>)> {
        match self {
            Operand::Ground(text) => vec![(false, Cow::Owned(text.clone()))],
            Operand::Ref(var_ref) => resolve_ref(var_ref, assignment, frames)
                .iter()
                .map(Resolved::identity)
                .collect(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ref(var_ref) => write!(f, "{var_ref}"),
            Operand::Ground(text) => f.write_str(text),
        }
    }
}

fn resolve_ref<'f>(
    var_ref: &VarRef,
    assignment: &Assignment<'f>,
    frames: &'f dyn FrameSet,
) -> Vec<Resolved<'f>> {
    match assignment.get(var_ref.var()) {
        Some(&frame) => follow_path(frames, frame, var_ref.path()),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// The value sets of both sides intersect.
    Equal(Operand, Operand),
    /// Some frame on the left falls under the concept.
    Under(Operand, String),
    Not(Box<Property>),
}

const OPERATORS: [&str; 4] = ["==", "!=", "!UNDER", "UNDER"];

impl Property {
    /// Parse a property, classifying operands with `is_var`.
    ///
    /// Operators are tried in the order `==`, `!=`, `!UNDER`, `UNDER`, and the
    /// text is split at the first occurrence of the operator found.
    pub fn parse(text: &str, is_var: impl Fn(&str) -> bool) -> Result<Property, String> {
        let (operator, (left, right)) = OPERATORS
            .iter()
            .find_map(|op| text.split_once(op).map(|parts| (*op, parts)))
            .ok_or_else(|| "expected one of `==`, `!=`, `!UNDER`, `UNDER`".to_string())?;

        let left = left.trim();
        let right = right.trim();
        if left.is_empty() || right.is_empty() {
            return Err(format!("`{operator}` needs two operands"));
        }

        let lhs = Operand::classify(left, &is_var);
        let property = match operator {
            "==" | "!=" => {
                let equal = Property::Equal(lhs, Operand::classify(right, &is_var));
                if operator == "==" {
                    equal
                } else {
                    Property::Not(Box::new(equal))
                }
            }
            _ => {
                let under = Property::Under(lhs, right.to_string());
                if operator == "UNDER" {
                    under
                } else {
                    Property::Not(Box::new(under))
                }
            }
        };
        Ok(property)
    }

    /// Variables the property reads.
    pub fn variables(&self) -> BTreeSet<&str> {
        fn var_of(operand: &Operand) -> Option<&str> {
            match operand {
                Operand::Ref(var_ref) => Some(var_ref.var()),
                Operand::Ground(_) => None,
            }
        }
        match self {
            Property::Equal(a, b) => var_of(a).into_iter().chain(var_of(b)).collect(),
            Property::Under(a, _) => var_of(a).into_iter().collect(),
            Property::Not(inner) => inner.variables(),
        }
    }

    pub fn check<'f>(
        &self,
        assignment: &Assignment<'f>,
        frames: &'f dyn FrameSet,
        ontology: &dyn Ontology,
    ) -> bool {
        match self {
            Property::Equal(left, right) => {
                let left = left.resolve(assignment, frames);
                let right = right.resolve(assignment, frames);
                left.iter().any(|value| right.contains(value))
            }
            Property::Under(Operand::Ref(var_ref), concept) => {
                resolve_ref(var_ref, assignment, frames)
                    .iter()
                    .any(|value| match value {
                        Resolved::Frame(frame) => frame
                            .concept()
                            .is_some_and(|c| ontology.is_a(c, concept)),
                        _ => false,
                    })
            }
            Property::Under(Operand::Ground(_), _) => false,
            Property::Not(inner) => !inner.check(assignment, frames, ontology),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Equal(a, b) => write!(f, "{a} == {b}"),
            Property::Under(a, concept) => write!(f, "{a} UNDER {concept}"),
            Property::Not(inner) => write!(f, "!({inner})"),
        }
    }
}
