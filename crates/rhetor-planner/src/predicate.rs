//! Compiled rhetorical predicates

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rhetor_dsl::{OutputAttr, OutputValue, PredicateDecl};

use crate::error::PlannerError;
use crate::fd::{Fd, FdValue, Literal, VarRef};
use crate::property::Property;

/// A reusable step template: typed variables, the properties they must
/// satisfy, and the output template instantiated from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub id: String,
    /// Local variable whose frame becomes the clause's default focus.
    pub default_focus: String,
    /// Local variable name → ontology concept, in declaration order.
    pub vars: IndexMap<String, String>,
    pub required_vars: BTreeSet<String>,
    pub properties: Vec<Property>,
    pub output: Fd,
}

impl Predicate {
    pub fn compile(decl: &PredicateDecl) -> Result<Self, PlannerError> {
        let mut vars = IndexMap::new();
        let mut required_vars = BTreeSet::new();
        let mut default_focus: Option<&str> = None;
        for variable in &decl.variables {
            if default_focus.is_none() || variable.default_focus {
                default_focus = Some(&variable.name);
            }
            vars.insert(variable.name.clone(), variable.ty.clone());
            if variable.required {
                required_vars.insert(variable.name.clone());
            }
        }
        let default_focus = default_focus.map(str::to_string).unwrap_or_default();

        let is_var = |name: &str| vars.contains_key(name);
        let properties = decl
            .properties
            .iter()
            .map(|text| {
                Property::parse(text, is_var).map_err(|message| PlannerError::PropertyParse {
                    predicate: decl.id.clone(),
                    property: text.clone(),
                    message,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let output = compile_output(&decl.output, &is_var);

        Ok(Self {
            id: decl.id.clone(),
            default_focus,
            vars,
            required_vars,
            properties,
            output,
        })
    }

    pub fn has_var(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }
}

fn compile_output(attrs: &[OutputAttr], is_var: &impl Fn(&str) -> bool) -> Fd {
    attrs
        .iter()
        .map(|attr| {
            let value = match &attr.value {
                OutputValue::Nested { attrs } => FdValue::Tree(compile_output(attrs, is_var)),
                OutputValue::Ground { text } => match VarRef::parse(text, is_var) {
                    Some(var_ref) => FdValue::Var(var_ref),
                    None => FdValue::Ground(Literal::Text(text.clone())),
                },
            };
            (attr.name.clone(), value)
        })
        .collect()
}
