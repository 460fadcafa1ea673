use std::io::Write;

use rhetor_ingest_rdf::{read_frames, read_taxonomy, RdfIngestError};
use rhetor_planner::{FrameSet, Literal, Ontology, Value};

fn write_temp(suffix: &str, text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("tempfile");
    file.write_all(text.as_bytes()).expect("write");
    file
}

#[test]
fn reads_frames_from_an_ntriples_file() {
    let file = write_temp(
        ".nt",
        r#"# people
<http://example.org/x#ann> <http://example.org/r#TYPE> <http://example.org/c#person> .
<http://example.org/x#ann> <http://example.org/r#pet> _:rex .
_:rex <http://example.org/r#TYPE> <http://example.org/c#dog> .
"#,
    );

    let frames = read_frames(file.path()).expect("read");
    let ann = frames.get_frame("ann").expect("ann");
    assert_eq!(ann.concept(), Some("person"));
    let pet = match &ann.get("pet")[0] {
        Value::Frame(id) => id.clone(),
        other => panic!("expected frame reference, got {other:?}"),
    };
    let rex = frames.get_frame(&pet).expect("blank node frame");
    assert_eq!(rex.concept(), Some("dog"));
}

#[test]
fn reads_a_taxonomy_from_a_turtle_file() {
    let file = write_temp(
        ".ttl",
        r#"@prefix c: <http://example.org/c#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
c:dog rdfs:subClassOf c:mammal .
c:cat rdfs:subClassOf c:mammal .
c:mammal rdfs:subClassOf c:animal .
"#,
    );

    let taxonomy = read_taxonomy(file.path()).expect("read");
    assert!(taxonomy.is_a("cat", "animal"));
    assert_eq!(taxonomy.distance("dog", "cat"), 0.6);
}

#[test]
fn reads_frames_from_an_rdf_xml_file() {
    let file = write_temp(
        ".rdf",
        r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:r="http://example.org/r#">
  <rdf:Description rdf:about="http://example.org/x#ann">
    <rdf:type rdf:resource="http://example.org/c#person"/>
    <r:name>Ann</r:name>
    <r:age rdf:datatype="http://www.w3.org/2001/XMLSchema#integer">42</r:age>
    <r:friend rdf:resource="http://example.org/x#bob"/>
  </rdf:Description>
</rdf:RDF>
"#,
    );

    let frames = read_frames(file.path()).expect("read");
    let ann = frames.get_frame("ann").expect("ann");
    assert_eq!(ann.concept(), Some("person"));
    assert_eq!(ann.get("name"), &[Value::Literal(Literal::from("Ann"))]);
    assert_eq!(ann.get("age"), &[Value::Literal(Literal::Integer(42))]);
    assert_eq!(ann.get("friend"), &[Value::Frame("bob".to_string())]);
    assert_eq!(frames.get_frame("bob").expect("bob").concept(), None);
}

#[test]
fn reads_frames_from_a_csv_triples_file() {
    let file = write_temp(
        ".csv",
        "ann,TYPE,c-person\nann,friend,bob\nann,name,Ann\nbob,TYPE,c-buddy\n",
    );

    let frames = read_frames(file.path()).expect("read");
    let ann = frames.get_frame("ann").expect("ann");
    assert_eq!(ann.concept(), Some("c-person"));
    assert_eq!(ann.get("friend"), &[Value::Frame("bob".to_string())]);
    assert_eq!(ann.get("name"), &[Value::Literal(Literal::from("Ann"))]);
    assert_eq!(frames.get_frame("bob").expect("bob").concept(), Some("c-buddy"));
}

#[test]
fn reads_a_taxonomy_from_an_rdfs_file() {
    let file = write_temp(
        ".rdfs",
        r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
  <rdfs:Class rdf:about="http://example.org/c#c-buddy">
    <rdfs:subClassOf rdf:resource="http://example.org/c#c-person"/>
  </rdfs:Class>
</rdf:RDF>
"#,
    );

    let taxonomy = read_taxonomy(file.path()).expect("read");
    assert!(taxonomy.is_a("c-buddy", "c-person"));
    assert!(!taxonomy.is_a("c-person", "c-buddy"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = read_frames(&dir.path().join("absent.nt")).unwrap_err();
    assert!(matches!(err, RdfIngestError::Io(_)), "err={err}");
}
