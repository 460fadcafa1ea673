//! Template rendering for planned clauses
//!
//! A clause that carries a `template` attribute renders by substituting each
//! `@name` placeholder with the text of the clause's `name` attribute. A dot
//! right after the name ends the placeholder and is dropped, so `@who.s`
//! renders the `who` value followed by `s`. Clauses without a template
//! render to nothing.

use rhetor_planner::{DocumentPlan, Fd, FdValue};

pub const TEMPLATE_ATTR: &str = "template";

fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Text inserted for a clause value.
pub fn value_text(value: &FdValue) -> String {
    match value {
        FdValue::Absent => String::new(),
        FdValue::Ground(literal) => strip_quotes(&literal.text()).to_string(),
        FdValue::List(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        FdValue::Var(var_ref) => var_ref.to_string(),
        FdValue::Tree(fd) => match value.object_id() {
            Some(id) => id.to_string(),
            None => serde_json::to_string(fd).unwrap_or_default(),
        },
    }
}

pub fn render_clause(clause: &Fd) -> Option<String> {
    let template = clause.get(TEMPLATE_ATTR)?.as_literal()?.text();
    let template = strip_quotes(&template);

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '@' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if !is_name_char(next) {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            out.push('@');
            continue;
        }
        if chars.peek() == Some(&'.') {
            chars.next();
        }
        if let Some(value) = clause.get(&name) {
            out.push_str(&value_text(value));
        }
    }
    Some(out)
}

/// Render every paragraph as the concatenation of its clauses' text,
/// ignoring aggregation boundaries. Paragraphs are separated by a blank line.
pub fn render_plan(plan: &DocumentPlan) -> String {
    plan.paragraphs()
        .iter()
        .map(|paragraph| {
            paragraph
                .iter()
                .flatten()
                .filter_map(render_clause)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
