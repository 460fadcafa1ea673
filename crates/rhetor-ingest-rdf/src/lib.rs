//! RDF ingestion for Rhetor (boundary adapter).
//!
//! Turns RDF graphs into the planner's two data collaborators:
//!
//! - a [`MemoryFrameSet`]: every subject becomes a frame, `rdf:type` (or a
//!   predicate whose local name is `TYPE`) sets its concept, IRI objects
//!   become frame references and literals become values;
//! - a [`Taxonomy`]: every statement `s p o` records `o` as a parent of `s`,
//!   whatever the predicate (an RDFS `subClassOf` file reads naturally).
//!
//! Inputs are N-Triples (`.nt`), Turtle (`.ttl`) and RDF/XML (`.rdf`,
//! `.rdfs`, `.owl`, `.xml`), all parsed by **Sophia**, plus plain
//! `subject,predicate,value` rows (`.csv`). IRIs are reduced to their
//! fragment or last path segment, so `<http://example.org/people#alice>`
//! becomes the frame id `alice`.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use rhetor_planner::{Literal, MemoryFrameSet, Taxonomy, Value};
use sophia::api::prelude::*;
use tracing::debug;

pub const RDF_TYPE_IRI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_INTEGER_IRI: &str = "http://www.w3.org/2001/XMLSchema#integer";

/// Local name of the loader-level type predicate.
pub const TYPE_PREDICATE: &str = "TYPE";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RdfIngestError {
    #[error("failed to read RDF input: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: RdfFormat,
        message: String,
    },
    #[error("unsupported RDF format: .{0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct RdfSinkError {
    message: String,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
    /// Comma-separated `subject,predicate,value` rows.
    Csv,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Result<Self, RdfIngestError> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "nt" | "ntriples" => Ok(RdfFormat::NTriples),
            "ttl" | "turtle" => Ok(RdfFormat::Turtle),
            "rdf" | "rdfs" | "owl" | "xml" => Ok(RdfFormat::RdfXml),
            "csv" => Ok(RdfFormat::Csv),
            other => Err(RdfIngestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RdfFormat::NTriples => f.write_str("N-Triples"),
            RdfFormat::Turtle => f.write_str("Turtle"),
            RdfFormat::RdfXml => f.write_str("RDF/XML"),
            RdfFormat::Csv => f.write_str("CSV triples"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Node(String),
    Literal(Literal),
}

/// One triple over local names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
    /// Whether the predicate is `rdf:type` or the `TYPE` shorthand.
    pub is_type: bool,
}

/// Frame ids, concepts and attribute names are the part of an IRI after
/// its last `#` or `/`.
fn iri_suffix(iri: &str) -> &str {
    iri.rfind(['#', '/']).map_or(iri, |at| &iri[at + 1..])
}

/// Decode the backslash escapes of a quoted lexical form. Unknown escapes
/// are kept as written.
fn lexical_form(quoted: &str) -> Cow<'_, str> {
    let Some(first) = quoted.find('\\') else {
        return Cow::Borrowed(quoted);
    };
    let mut decoded = String::with_capacity(quoted.len());
    decoded.push_str(&quoted[..first]);
    let mut rest = quoted[first..].chars();
    while let Some(c) = rest.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        let escape = rest.next();
        match escape.and_then(escaped_char) {
            Some(plain) => decoded.push(plain),
            None => {
                decoded.push('\\');
                decoded.extend(escape);
            }
        }
    }
    Cow::Owned(decoded)
}

fn escaped_char(c: char) -> Option<char> {
    Some(match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '"' | '\\' => c,
        _ => return None,
    })
}

enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    fn into_node(self, display: &str) -> Result<String, RdfSinkError> {
        match self {
            Term::Iri(iri) => Ok(iri_suffix(&iri).to_string()),
            Term::Blank(label) => Ok(format!("_:{label}")),
            Term::Literal(_) => Err(RdfSinkError {
                message: format!("expected IRI or blank node, got literal: {display}"),
            }),
        }
    }
}

/// Parse the display form Sophia gives its terms.
fn parse_term_display(term: &str) -> Result<Term, RdfSinkError> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::Iri(rest.to_string()));
    }
    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(Term::Blank(rest.to_string()));
    }
    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if ch == '"' && !escaped {
                end_quote = Some(i);
                break;
            }
            escaped = ch == '\\' && !escaped;
        }
        let Some(end) = end_quote else {
            return Err(RdfSinkError {
                message: format!("invalid literal term (missing closing quote): {s}"),
            });
        };

        let lexical = lexical_form(&s[1..end]);
        let rest = s[end + 1..].trim();
        let datatype = rest
            .strip_prefix("^^")
            .map(|dt| dt.trim().trim_start_matches('<').trim_end_matches('>'));

        if datatype == Some(XSD_INTEGER_IRI) {
            if let Ok(n) = lexical.parse::<i64>() {
                return Ok(Term::Literal(Literal::Integer(n)));
            }
        }
        // Language tags and other datatypes keep the lexical form only.
        return Ok(Term::Literal(Literal::Text(lexical.into_owned())));
    }

    Err(RdfSinkError {
        message: format!("unsupported RDF term form: {s}"),
    })
}

fn statement_from_display(s: &str, p: &str, o: &str) -> Result<Statement, RdfSinkError> {
    let subject = parse_term_display(s)?.into_node(s)?;
    let (predicate, is_type) = match parse_term_display(p)? {
        Term::Iri(iri) => {
            let name = iri_suffix(&iri);
            (name.to_string(), iri == RDF_TYPE_IRI || name == TYPE_PREDICATE)
        }
        _ => {
            return Err(RdfSinkError {
                message: format!("predicate must be an IRI: {p}"),
            })
        }
    };
    let object = match parse_term_display(o)? {
        Term::Literal(lit) => Object::Literal(lit),
        node => Object::Node(node.into_node(o)?),
    };
    Ok(Statement {
        subject,
        predicate,
        object,
        is_type,
    })
}

/// Rows of `subject,predicate,value` with no header.
///
/// A value naming the subject of some row is a frame reference, anything
/// else is a text literal. Commas past the second stay in the value.
fn csv_statements(bytes: &[u8]) -> Result<Vec<Statement>, RdfIngestError> {
    let csv_error = |message: String| RdfIngestError::Parse {
        format: RdfFormat::Csv,
        message,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows: Vec<[String; 3]> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(e.to_string()))?;
        if record.len() < 3 {
            let line = record.position().map_or(0, |p| p.line());
            return Err(csv_error(format!(
                "line {line}: expected subject,predicate,value, found {} field(s)",
                record.len()
            )));
        }
        let value = record.iter().skip(2).collect::<Vec<_>>().join(",");
        rows.push([record[0].to_string(), record[1].to_string(), value]);
    }

    let subjects: HashSet<&str> = rows.iter().map(|row| row[0].as_str()).collect();
    Ok(rows
        .iter()
        .map(|[subject, predicate, value]| Statement {
            subject: subject.clone(),
            predicate: predicate.clone(),
            object: if subjects.contains(value.as_str()) {
                Object::Node(value.clone())
            } else {
                Object::Literal(Literal::Text(value.clone()))
            },
            is_type: predicate == TYPE_PREDICATE,
        })
        .collect())
}

pub fn parse_statements(bytes: &[u8], format: RdfFormat) -> Result<Vec<Statement>, RdfIngestError> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut out: Vec<Statement> = Vec::new();

    let mut sink = |t: [String; 3]| -> Result<(), RdfSinkError> {
        out.push(statement_from_display(&t[0], &t[1], &t[2])?);
        Ok(())
    };

    let result = match format {
        RdfFormat::NTriples => sophia::turtle::parser::nt::parse_bufread(reader)
            .try_for_each_triple(|t| {
                sink([t.s().to_string(), t.p().to_string(), t.o().to_string()])
            })
            .map_err(|e| e.to_string()),
        RdfFormat::Turtle => sophia::turtle::parser::turtle::parse_bufread(reader)
            .try_for_each_triple(|t| {
                sink([t.s().to_string(), t.p().to_string(), t.o().to_string()])
            })
            .map_err(|e| e.to_string()),
        RdfFormat::RdfXml => sophia::xml::parser::parse_bufread(reader)
            .try_for_each_triple(|t| {
                sink([t.s().to_string(), t.p().to_string(), t.o().to_string()])
            })
            .map_err(|e| e.to_string()),
        RdfFormat::Csv => {
            out = csv_statements(bytes)?;
            Ok(())
        }
    };
    result.map_err(|message| RdfIngestError::Parse { format, message })?;

    debug!(%format, statements = out.len(), "parsed RDF input");
    Ok(out)
}

// ============================================================================
// Frame sets and taxonomies
// ============================================================================

/// Build a frame set from statements.
///
/// Frames appear in first-mention order; a frame referenced only as an
/// object still exists (with no concept) so references never dangle.
pub fn frames_from_statements(statements: &[Statement]) -> MemoryFrameSet {
    let mut frames = MemoryFrameSet::new();
    for stmt in statements {
        frames.get_or_insert(&stmt.subject);
        match &stmt.object {
            Object::Node(target) if stmt.is_type => {
                frames.get_or_insert(&stmt.subject).set_concept(target.clone());
            }
            Object::Literal(lit) if stmt.is_type => {
                frames.get_or_insert(&stmt.subject).set_concept(lit.text());
            }
            Object::Node(target) => {
                frames.get_or_insert(target);
                frames
                    .get_or_insert(&stmt.subject)
                    .add(stmt.predicate.clone(), Value::Frame(target.clone()));
            }
            Object::Literal(lit) => {
                frames
                    .get_or_insert(&stmt.subject)
                    .add(stmt.predicate.clone(), Value::Literal(lit.clone()));
            }
        }
    }
    frames
}

pub fn taxonomy_from_statements(statements: &[Statement]) -> Taxonomy {
    let mut taxonomy = Taxonomy::new();
    for stmt in statements {
        let parent = match &stmt.object {
            Object::Node(node) => node.clone(),
            Object::Literal(lit) => lit.text().into_owned(),
        };
        taxonomy.add_parent(stmt.subject.clone(), parent);
    }
    taxonomy
}

pub fn load_frames(bytes: &[u8], format: RdfFormat) -> Result<MemoryFrameSet, RdfIngestError> {
    Ok(frames_from_statements(&parse_statements(bytes, format)?))
}

pub fn load_taxonomy(bytes: &[u8], format: RdfFormat) -> Result<Taxonomy, RdfIngestError> {
    Ok(taxonomy_from_statements(&parse_statements(bytes, format)?))
}

/// Read a frame set, choosing the format from the file extension.
pub fn read_frames(path: &Path) -> Result<MemoryFrameSet, RdfIngestError> {
    let format = RdfFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load_frames(&bytes, format)
}

/// Read a taxonomy, choosing the format from the file extension.
pub fn read_taxonomy(path: &Path) -> Result<Taxonomy, RdfIngestError> {
    let format = RdfFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    load_taxonomy(&bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhetor_planner::{FrameSet, Ontology};

    const PEOPLE: &str = r#"
<http://example.org/p#alice> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/c#person> .
<http://example.org/p#alice> <http://example.org/r#name> "Alice \"Al\" Smith" .
<http://example.org/p#alice> <http://example.org/r#age> "42"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.org/p#alice> <http://example.org/r#friend> <http://example.org/p#bob> .
<http://example.org/p#bob> <http://example.org/r#TYPE> <http://example.org/c#person> .
<http://example.org/p#bob> <http://example.org/r#nick> "bobby"@en .
"#;

    #[test]
    fn iri_suffix_cuts_at_last_separator() {
        assert_eq!(iri_suffix("http://example.org/a/b#c"), "c");
        assert_eq!(iri_suffix("http://example.org/a/b"), "b");
        assert_eq!(iri_suffix("plain"), "plain");
    }

    #[test]
    fn lexical_form_decodes_escapes() {
        assert!(matches!(lexical_form("plain"), Cow::Borrowed("plain")));
        assert_eq!(lexical_form(r#"a\"b\nc"#), "a\"b\nc");
        assert_eq!(lexical_form(r"x\qy"), r"x\qy");
        assert_eq!(lexical_form(r"tail\"), "tail\\");
    }

    #[test]
    fn parses_literal_display_forms() {
        let Term::Literal(lit) = parse_term_display(r#""7"^^<http://www.w3.org/2001/XMLSchema#integer>"#)
            .expect("parse")
        else {
            panic!("expected literal");
        };
        assert_eq!(lit, Literal::Integer(7));

        let Term::Literal(lit) = parse_term_display(r#""hi"@en"#).expect("parse") else {
            panic!("expected literal");
        };
        assert_eq!(lit, Literal::Text("hi".to_string()));

        assert!(parse_term_display(r#""open"#).is_err());
    }

    #[test]
    fn frames_carry_concepts_attributes_and_references() {
        let frames = load_frames(PEOPLE.as_bytes(), RdfFormat::NTriples).expect("load");
        assert_eq!(frames.len(), 2);

        let alice = frames.get_frame("alice").expect("alice");
        assert_eq!(alice.concept(), Some("person"));
        assert_eq!(
            alice.get("name"),
            &[Value::Literal(Literal::Text("Alice \"Al\" Smith".to_string()))]
        );
        assert_eq!(alice.get("age"), &[Value::Literal(Literal::Integer(42))]);
        assert_eq!(alice.get("friend"), &[Value::Frame("bob".to_string())]);

        let bob = frames.get_frame("bob").expect("bob");
        assert_eq!(bob.concept(), Some("person"));
        assert_eq!(bob.get("nick"), &[Value::Literal(Literal::from("bobby"))]);
    }

    #[test]
    fn taxonomy_ignores_the_predicate() {
        let text = r#"
<http://e.org/c#dog> <http://www.w3.org/2000/01/rdf-schema#subClassOf> <http://e.org/c#mammal> .
<http://e.org/c#mammal> <http://e.org/anything> <http://e.org/c#animal> .
"#;
        let taxonomy = load_taxonomy(text.as_bytes(), RdfFormat::NTriples).expect("load");
        assert!(taxonomy.is_a("dog", "animal"));
        assert!(!taxonomy.is_a("animal", "dog"));
        assert_eq!(taxonomy.len(), 2);
    }

    #[test]
    fn turtle_is_accepted() {
        let text = r#"
@prefix ex: <http://example.org/> .
ex:carol a ex:person ;
    ex:name "Carol" .
"#;
        let frames = load_frames(text.as_bytes(), RdfFormat::Turtle).expect("load");
        let carol = frames.get_frame("carol").expect("carol");
        assert_eq!(carol.concept(), Some("person"));
        assert_eq!(carol.get("name").len(), 1);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = load_frames(b"<a> <b> .\n", RdfFormat::NTriples).unwrap_err();
        assert!(
            matches!(err, RdfIngestError::Parse { format: RdfFormat::NTriples, .. }),
            "err={err}"
        );
    }

    #[test]
    fn csv_values_naming_subjects_are_references() {
        let text = "ann,TYPE,c-person\nann,friend,bob\nann,motto,carpe, diem\nbob,TYPE,c-buddy\n";
        let statements = parse_statements(text.as_bytes(), RdfFormat::Csv).expect("csv");
        assert_eq!(statements.len(), 4);
        assert!(statements[0].is_type);
        assert_eq!(statements[1].object, Object::Node("bob".to_string()));
        assert_eq!(
            statements[2].object,
            Object::Literal(Literal::Text("carpe, diem".to_string()))
        );
        assert_eq!(
            statements[0].object,
            Object::Literal(Literal::Text("c-person".to_string()))
        );
    }

    #[test]
    fn short_csv_row_is_a_parse_error() {
        let err = parse_statements(b"ann,TYPE,c-person\nann,friend\n", RdfFormat::Csv).unwrap_err();
        assert!(
            matches!(&err, RdfIngestError::Parse { format: RdfFormat::Csv, message } if message.starts_with("line 2:")),
            "err={err}"
        );
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            RdfFormat::from_path(Path::new("data.nt")).expect("nt"),
            RdfFormat::NTriples
        );
        assert_eq!(
            RdfFormat::from_path(Path::new("data.TTL")).expect("ttl"),
            RdfFormat::Turtle
        );
        assert_eq!(
            RdfFormat::from_path(Path::new("onto.rdfs")).expect("rdfs"),
            RdfFormat::RdfXml
        );
        assert_eq!(
            RdfFormat::from_path(Path::new("data.csv")).expect("csv"),
            RdfFormat::Csv
        );
        assert!(matches!(
            RdfFormat::from_path(Path::new("data.json")),
            Err(RdfIngestError::UnsupportedFormat(ext)) if ext == "json"
        ));
    }
}
