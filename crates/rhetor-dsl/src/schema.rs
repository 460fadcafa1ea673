//! `.schema` surface syntax
//!
//! A schema file declares a library of rhetorical predicates followed by a
//! single `schema` block describing the legal orderings of those predicates.
//! Structure is carried by indentation:
//!
//! ```text
//! predicate identification
//!   variables
//!     def entity : c-entity
//!     req kind : c-kind
//!   properties
//!     entity.kind == kind
//!   output
//!     pred identification
//!     template "@name. is a @kind."
//!     name entity.name
//!     kind kind.name
//!
//! schema describe
//!   identification(entity|main)
//!   star
//!     attribute(entity|main)
//!   paragraph-boundary
//!   optional
//!     example(entity|main)
//! ```
//!
//! Notes:
//! - `;` starts a comment that runs to the end of the line.
//! - A line ending in `\` continues on the next line.
//! - The parser only builds the typed AST. Property expressions are kept as
//!   text and compiled by the planner, which knows the variable names.

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char as pchar, multispace0, multispace1},
    combinator::{all_consuming, opt},
    multi::separated_list0,
    sequence::{delimited, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Name = String;

// ============================================================================
// AST
// ============================================================================

/// A complete schema definition: the predicate library plus the root
/// combinator tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Name>,
    pub predicates: Vec<PredicateDecl>,
    pub root: Vec<SchemaNodeDecl>,
}

impl SchemaDefinition {
    pub fn predicate(&self, id: &str) -> Option<&PredicateDecl> {
        self.predicates.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredicateDecl {
    pub id: Name,
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub output: Vec<OutputAttr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: Name,
    /// Ontology concept the bound frame must fall under.
    pub ty: Name,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_focus: bool,
}

/// One attribute of a predicate's output template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputAttr {
    pub name: Name,
    pub value: OutputValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum OutputValue {
    /// Raw text; variable and path references are resolved by the planner.
    Ground { text: String },
    Nested { attrs: Vec<OutputAttr> },
}

/// Binding declared at a predicate reference site: the predicate's local
/// variable `local` reads and writes the schema-level variable `global`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VarBindingDecl {
    pub local: Name,
    pub global: Name,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum SchemaNodeDecl {
    Predicate {
        name: Name,
        #[serde(default)]
        bindings: Vec<VarBindingDecl>,
    },
    AggregationBoundary,
    ParagraphBoundary,
    Sequence {
        nodes: Vec<SchemaNodeDecl>,
    },
    Choice {
        nodes: Vec<SchemaNodeDecl>,
    },
    Optional {
        nodes: Vec<SchemaNodeDecl>,
    },
    KleeneStar {
        nodes: Vec<SchemaNodeDecl>,
    },
    KleenePlus {
        nodes: Vec<SchemaNodeDecl>,
    },
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaParseError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },
    #[error("schema block missing")]
    MissingSchema,
}

/// A logical line: comments stripped, continuations joined.
#[derive(Debug, Clone)]
struct SourceLine {
    line: usize,
    indent: usize,
    text: String,
}

fn line_error(line: &SourceLine, message: impl Into<String>) -> SchemaParseError {
    SchemaParseError::Line {
        line: line.line,
        message: message.into(),
    }
}

pub fn parse_schema(text: &str) -> Result<SchemaDefinition, SchemaParseError> {
    let lines = logical_lines(text);
    let mut definition = SchemaDefinition::default();
    let mut seen_schema = false;

    let mut i = 0usize;
    while i < lines.len() {
        let line = &lines[i];
        if let Some(id) = keyword_arg(&line.text, "predicate") {
            let (predicate, next) = parse_predicate(&lines, i, id)?;
            if definition.predicate(&predicate.id).is_some() {
                return Err(line_error(
                    line,
                    format!("duplicate predicate `{}`", predicate.id),
                ));
            }
            definition.predicates.push(predicate);
            i = next;
            continue;
        }

        if let Some(name) = keyword_arg(&line.text, "schema") {
            if seen_schema {
                return Err(line_error(line, "only one schema block is allowed"));
            }
            seen_schema = true;
            definition.name = Some(name.to_string());
            let (nodes, next) = parse_nodes(&lines, i + 1, line.indent)?;
            definition.root = nodes;
            i = next;
            continue;
        }

        return Err(line_error(
            line,
            format!("expected `predicate` or `schema`, found: {}", line.text),
        ));
    }

    if !seen_schema {
        return Err(SchemaParseError::MissingSchema);
    }
    Ok(definition)
}

fn logical_lines(text: &str) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut pending: Option<SourceLine> = None;

    for (index, raw) in text.lines().enumerate() {
        let without_comment = match raw.find(';') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let trimmed_end = without_comment.trim_end();

        let (body, continues) = match trimmed_end.strip_suffix('\\') {
            Some(body) => (body, true),
            None => (trimmed_end, false),
        };

        match pending.as_mut() {
            Some(open) => {
                open.text.push(' ');
                open.text.push_str(body.trim());
            }
            None => {
                if body.trim().is_empty() && !continues {
                    continue;
                }
                let indent = body.chars().take_while(|c| *c == ' ' || *c == '\t').count();
                pending = Some(SourceLine {
                    line: index + 1,
                    indent,
                    text: body.trim().to_string(),
                });
            }
        }

        if !continues {
            if let Some(done) = pending.take() {
                if !done.text.trim().is_empty() {
                    out.push(done);
                }
            }
        }
    }

    if let Some(done) = pending.take() {
        if !done.text.trim().is_empty() {
            out.push(done);
        }
    }
    out
}

/// `keyword rest` → `Some(rest)`, requiring a non-empty argument.
fn keyword_arg<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    text.strip_prefix(keyword)
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(|rest| rest.trim().trim_end_matches(':').trim())
        .filter(|rest| !rest.is_empty())
}

fn is_keyword(text: &str, keyword: &str) -> bool {
    text.trim_end_matches(':').trim() == keyword
}

/// Index of the first line at or after `start` whose indent is not deeper
/// than `parent_indent`.
fn block_end(lines: &[SourceLine], start: usize, parent_indent: usize) -> usize {
    let mut i = start;
    while i < lines.len() && lines[i].indent > parent_indent {
        i += 1;
    }
    i
}

fn parse_predicate(
    lines: &[SourceLine],
    header_index: usize,
    id: &str,
) -> Result<(PredicateDecl, usize), SchemaParseError> {
    let header = &lines[header_index];
    let mut predicate = PredicateDecl {
        id: id.to_string(),
        variables: vec![],
        properties: vec![],
        output: vec![],
    };

    let end = block_end(lines, header_index + 1, header.indent);
    let mut i = header_index + 1;
    while i < end {
        let section = &lines[i];
        let section_end = block_end(lines, i + 1, section.indent).min(end);
        let body = &lines[i + 1..section_end];

        if is_keyword(&section.text, "variables") {
            for line in body {
                let variable = parse_variable_decl(&line.text)
                    .map_err(|message| line_error(line, message))?;
                if predicate.variables.iter().any(|v| v.name == variable.name) {
                    return Err(line_error(
                        line,
                        format!("duplicate variable `{}`", variable.name),
                    ));
                }
                predicate.variables.push(variable);
            }
        } else if is_keyword(&section.text, "properties") {
            predicate
                .properties
                .extend(body.iter().map(|line| line.text.clone()));
        } else if is_keyword(&section.text, "output") {
            let (attrs, _) = parse_output_attrs(lines, i + 1, section.indent, section_end)?;
            predicate.output = attrs;
        } else {
            return Err(line_error(
                section,
                format!(
                    "expected `variables`, `properties` or `output` in predicate `{id}`, found: {}",
                    section.text
                ),
            ));
        }
        i = section_end;
    }

    Ok((predicate, end))
}

fn parse_output_attrs(
    lines: &[SourceLine],
    start: usize,
    parent_indent: usize,
    limit: usize,
) -> Result<(Vec<OutputAttr>, usize), SchemaParseError> {
    let mut attrs = Vec::new();
    let mut i = start;
    while i < limit && lines[i].indent > parent_indent {
        let line = &lines[i];
        let mut parts = line.text.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_string();
        let value = parts.next().map(str::trim).filter(|v| !v.is_empty());

        match value {
            Some(text) => {
                attrs.push(OutputAttr {
                    name,
                    value: OutputValue::Ground {
                        text: text.to_string(),
                    },
                });
                i += 1;
            }
            None => {
                let (nested, next) = parse_output_attrs(lines, i + 1, line.indent, limit)?;
                if nested.is_empty() {
                    return Err(line_error(
                        line,
                        format!("output attribute `{name}` has neither a value nor nested attributes"),
                    ));
                }
                attrs.push(OutputAttr {
                    name,
                    value: OutputValue::Nested { attrs: nested },
                });
                i = next;
            }
        }
    }
    Ok((attrs, i))
}

fn parse_nodes(
    lines: &[SourceLine],
    start: usize,
    parent_indent: usize,
) -> Result<(Vec<SchemaNodeDecl>, usize), SchemaParseError> {
    let mut nodes = Vec::new();
    let mut i = start;
    while i < lines.len() && lines[i].indent > parent_indent {
        let line = &lines[i];
        let text = line.text.as_str();

        if is_keyword(text, "aggregation-boundary") {
            nodes.push(SchemaNodeDecl::AggregationBoundary);
            i += 1;
            continue;
        }
        if is_keyword(text, "paragraph-boundary") {
            nodes.push(SchemaNodeDecl::ParagraphBoundary);
            i += 1;
            continue;
        }

        let combinator: Option<fn(Vec<SchemaNodeDecl>) -> SchemaNodeDecl> =
            match text.trim_end_matches(':').trim() {
                "sequence" => Some(|nodes| SchemaNodeDecl::Sequence { nodes }),
                "choice" => Some(|nodes| SchemaNodeDecl::Choice { nodes }),
                "optional" => Some(|nodes| SchemaNodeDecl::Optional { nodes }),
                "star" | "kleene-star" => Some(|nodes| SchemaNodeDecl::KleeneStar { nodes }),
                "plus" | "kleene-plus" => Some(|nodes| SchemaNodeDecl::KleenePlus { nodes }),
                _ => None,
            };

        if let Some(make) = combinator {
            let (children, next) = parse_nodes(lines, i + 1, line.indent)?;
            if children.is_empty() {
                return Err(line_error(line, format!("`{text}` has no nested nodes")));
            }
            nodes.push(make(children));
            i = next;
            continue;
        }

        let node = parse_predicate_ref(text).map_err(|message| line_error(line, message))?;
        nodes.push(node);
        i += 1;
    }
    Ok((nodes, i))
}

// ============================================================================
// Line-level grammars
// ============================================================================

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char)(input)
}

fn parse_variable_decl(text: &str) -> Result<VariableDecl, String> {
    fn parser(input: &str) -> IResult<&str, VariableDecl> {
        let (input, required) = opt(tuple((tag("req"), multispace1)))(input)?;
        let (input, default_focus) = opt(tuple((tag("def"), multispace1)))(input)?;
        let (input, name) = parse_name(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = pchar(':')(input)?;
        let (input, _) = multispace0(input)?;
        let (input, ty) = take_while1(|c: char| !c.is_whitespace())(input)?;
        let (input, _) = multispace0(input)?;
        Ok((
            input,
            VariableDecl {
                name: name.to_string(),
                ty: ty.to_string(),
                required: required.is_some(),
                default_focus: default_focus.is_some(),
            },
        ))
    }

    all_consuming(parser)(text.trim())
        .map(|(_, v)| v)
        .map_err(|_| "variable expects: `[req] [def] <name> : <type>`".to_string())
}

fn parse_predicate_ref(text: &str) -> Result<SchemaNodeDecl, String> {
    fn binding(input: &str) -> IResult<&str, VarBindingDecl> {
        let (input, _) = multispace0(input)?;
        let (input, local) = parse_name(input)?;
        let (input, _) = multispace0(input)?;
        let (input, _) = pchar('|')(input)?;
        let (input, _) = multispace0(input)?;
        let (input, global) = parse_name(input)?;
        let (input, _) = multispace0(input)?;
        Ok((
            input,
            VarBindingDecl {
                local: local.to_string(),
                global: global.to_string(),
            },
        ))
    }

    fn parser(input: &str) -> IResult<&str, SchemaNodeDecl> {
        let (input, name) = parse_name(input)?;
        let (input, _) = multispace0(input)?;
        let (input, bindings) = opt(delimited(
            pchar('('),
            tuple((separated_list0(pchar(','), binding), multispace0)),
            pchar(')'),
        ))(input)?;
        Ok((
            input,
            SchemaNodeDecl::Predicate {
                name: name.to_string(),
                bindings: bindings.map(|(b, _)| b).unwrap_or_default(),
            },
        ))
    }

    all_consuming(parser)(text.trim())
        .map(|(_, v)| v)
        .map_err(|_| {
            format!("expected a combinator, a boundary or `predicate(local|global, ...)`, found: {text}")
        })
}

// ============================================================================
// Formatter
// ============================================================================

/// Render a definition back to `.schema` text, two spaces per level.
///
/// Output attributes and property lines are written verbatim, so text
/// containing `;` does not survive a format/parse cycle.
pub fn format_schema(definition: &SchemaDefinition) -> String {
    let mut out = String::new();
    for predicate in &definition.predicates {
        out.push_str(&format!("predicate {}\n", predicate.id));
        if !predicate.variables.is_empty() {
            out.push_str("  variables\n");
        }
        for variable in &predicate.variables {
            out.push_str("    ");
            if variable.required {
                out.push_str("req ");
            }
            if variable.default_focus {
                out.push_str("def ");
            }
            out.push_str(&format!("{} : {}\n", variable.name, variable.ty));
        }
        if !predicate.properties.is_empty() {
            out.push_str("  properties\n");
            for property in &predicate.properties {
                out.push_str(&format!("    {property}\n"));
            }
        }
        if !predicate.output.is_empty() {
            out.push_str("  output\n");
            format_output_attrs(&predicate.output, 2, &mut out);
        }
        out.push('\n');
    }

    out.push_str("schema");
    if let Some(name) = &definition.name {
        out.push(' ');
        out.push_str(name);
    } else {
        out.push_str(" schema");
    }
    out.push('\n');
    format_nodes(&definition.root, 1, &mut out);
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn format_output_attrs(attrs: &[OutputAttr], level: usize, out: &mut String) {
    for attr in attrs {
        indent(level, out);
        match &attr.value {
            OutputValue::Ground { text } => out.push_str(&format!("{} {}\n", attr.name, text)),
            OutputValue::Nested { attrs } => {
                out.push_str(&format!("{}\n", attr.name));
                format_output_attrs(attrs, level + 1, out);
            }
        }
    }
}

fn format_nodes(nodes: &[SchemaNodeDecl], level: usize, out: &mut String) {
    for node in nodes {
        indent(level, out);
        let (keyword, children) = match node {
            SchemaNodeDecl::Predicate { name, bindings } => {
                let bindings: Vec<String> = bindings
                    .iter()
                    .map(|b| format!("{}|{}", b.local, b.global))
                    .collect();
                out.push_str(&format!("{}({})\n", name, bindings.join(", ")));
                continue;
            }
            SchemaNodeDecl::AggregationBoundary => {
                out.push_str("aggregation-boundary\n");
                continue;
            }
            SchemaNodeDecl::ParagraphBoundary => {
                out.push_str("paragraph-boundary\n");
                continue;
            }
            SchemaNodeDecl::Sequence { nodes } => ("sequence", nodes),
            SchemaNodeDecl::Choice { nodes } => ("choice", nodes),
            SchemaNodeDecl::Optional { nodes } => ("optional", nodes),
            SchemaNodeDecl::KleeneStar { nodes } => ("star", nodes),
            SchemaNodeDecl::KleenePlus { nodes } => ("plus", nodes),
        };
        out.push_str(keyword);
        out.push('\n');
        format_nodes(children, level + 1, out);
    }
}
