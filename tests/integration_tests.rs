//! Integration tests for the complete Rhetor pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - `.schema` DSL → JSON form → compiled network
//! - RDF files → frame set + taxonomy
//! - Planning → document plan → JSON
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::path::Path;

use rhetor_dsl::{format_schema, parse_schema, parse_schema_json};
use rhetor_ingest_rdf::{read_frames, read_taxonomy};
use rhetor_planner::{
    ChooserPolicy, DocumentPlan, FdValue, FlatOntology, FrameSet, Ontology, Planner,
    PlannerConfig, PlannerError,
};
use tempfile::tempdir;

const FRIENDS: &str = r#"
; introduce someone, then continue with a loner or a buddy
predicate intro
  variables
    def who : c-person
    friend : c-person
  properties
    who.friend == friend
  output
    pred intro
    who who
    friend friend

predicate loner
  variables
    who : c-loner
  output
    pred loner
    who who

predicate buddy
  variables
    who : c-buddy
  output
    pred buddy
    who who

schema friends
  intro(who|main)
  choice
    loner
    buddy
"#;

const PEOPLE: &str = r#"
<http://example.org/p#ann> <http://example.org/r#TYPE> <http://example.org/c#c-person> .
<http://example.org/p#ann> <http://example.org/r#friend> <http://example.org/p#bob> .
<http://example.org/p#bob> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/c#c-buddy> .
<http://example.org/p#zed> <http://example.org/r#TYPE> <http://example.org/c#c-loner> .
"#;

const CONCEPTS: &str = r#"
@prefix c: <http://example.org/c#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
c:c-buddy rdfs:subClassOf c:c-person .
c:c-loner rdfs:subClassOf c:c-person .
"#;

fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

fn preds(plan: &DocumentPlan) -> Vec<String> {
    plan.clauses()
        .map(|c| match &c["pred"] {
            FdValue::Ground(literal) => literal.to_string(),
            other => panic!("unexpected pred {other:?}"),
        })
        .collect()
}

// ============================================================================
// Schema surface forms
// ============================================================================

#[test]
fn test_schema_text_and_json_forms_agree() {
    let parsed = parse_schema(FRIENDS).expect("parse");
    let reparsed = parse_schema(&format_schema(&parsed)).expect("reparse");
    assert_eq!(parsed, reparsed);

    let json = serde_json::to_string(&parsed).expect("serialize");
    let from_json = parse_schema_json(&json).expect("json");
    assert_eq!(parsed, from_json);

    let text_planner = Planner::new(&parsed, PlannerConfig::default()).expect("compile");
    let json_planner = Planner::new(&from_json, PlannerConfig::default()).expect("compile");
    assert_eq!(text_planner.network().dump(), json_planner.network().dump());
}

// ============================================================================
// RDF → planning
// ============================================================================

#[test]
fn test_rdf_pipeline_focus_follows_introduction() {
    let dir = tempdir().expect("tempdir");
    let data = write(dir.path(), "people.nt", PEOPLE);
    let concepts = write(dir.path(), "concepts.ttl", CONCEPTS);

    let frames = read_frames(&data).expect("frames");
    let taxonomy = read_taxonomy(&concepts).expect("taxonomy");
    assert!(taxonomy.is_a("c-buddy", "c-person"));

    let definition = parse_schema(FRIENDS).expect("parse");
    let mut initial = indexmap::IndexMap::new();
    initial.insert("main".to_string(), frames.get_frame("ann").expect("ann"));

    let run = |chooser| {
        Planner::new(
            &definition,
            PlannerConfig {
                chooser,
                seed: None,
            },
        )
        .expect("compile")
        .instantiate(&frames, &initial, &taxonomy)
        .expect("plan")
    };

    assert_eq!(preds(&run(ChooserPolicy::Greedy)), vec!["intro", "loner"]);

    let plan = run(ChooserPolicy::SimpleFocus);
    assert_eq!(preds(&plan), vec!["intro", "buddy"]);

    let json = serde_json::to_value(&plan).expect("json");
    assert_eq!(json[0][0][0]["friend"], serde_json::json!({"object-id": "bob"}));
    assert_eq!(json[0][0][1]["focus"], serde_json::json!("bob"));
    assert_eq!(
        json[0][0][1]["focus-stack"],
        serde_json::json!([{"focus": "bob"}, {"focus": "ann"}])
    );
}

#[test]
fn test_without_taxonomy_subtypes_are_not_people() {
    let dir = tempdir().expect("tempdir");
    let data = write(dir.path(), "people.nt", PEOPLE);
    let frames = read_frames(&data).expect("frames");

    let definition = parse_schema(FRIENDS).expect("parse");
    let mut initial = indexmap::IndexMap::new();
    initial.insert("main".to_string(), frames.get_frame("ann").expect("ann"));

    // Without subsumption ann is the only c-person, and she is not her own
    // friend, so the intro step has no assignment.
    let plan = Planner::new(&definition, PlannerConfig::default())
        .expect("compile")
        .instantiate(&frames, &initial, &FlatOntology)
        .expect("plan");
    assert!(plan.is_empty());
}

#[test]
fn test_unknown_predicate_reference_is_rejected() {
    let schema = format!("{FRIENDS}    stranger\n");
    let definition = parse_schema(&schema).expect("parse");
    let err = Planner::new(&definition, PlannerConfig::default())
        .err()
        .expect("missing predicate");
    assert_eq!(err, PlannerError::UnknownPredicate("stranger".to_string()));
}
