use rhetor_dsl::parse_schema;
use rhetor_planner::{
    Bindings, FlatOntology, Frame, FrameSet, Literal, MemoryFrameSet, NodeId, PlannerError,
    SchemaNetwork, Search,
};

const PAIRS: &str = r#"
predicate pair
  variables
    def left : c-num
    right : c-num
  properties
    left != right
  output
    left left.n
    right right.n

schema pairs
  plus
    pair(left|anchor)
"#;

fn numbers(count: i64) -> MemoryFrameSet {
    (1..=count)
        .map(|i| {
            Frame::new(format!("n{i}"))
                .with_concept("c-num")
                .with("n", Literal::from(i))
        })
        .collect()
}

fn setup() -> (SchemaNetwork, NodeId) {
    let network = SchemaNetwork::build(&parse_schema(PAIRS).expect("parse")).expect("build");
    let node = network
        .node_ids()
        .find(|&id| network.node(id).is_predicate())
        .expect("predicate node");
    (network, node)
}

#[test]
fn search_is_idempotent_before_commit() {
    let (network, node) = setup();
    let frames = numbers(3);
    let mut search = Search::new(&network, &frames, &FlatOntology);
    let globals = Bindings::new();

    assert!(search.cached(node, &globals).is_none());
    assert!(search.can_be_instantiated(node, &globals));
    let first = search.cached(node, &globals).expect("cached").clone();
    assert!(search.can_be_instantiated(node, &globals));
    let second = search.cached(node, &globals).expect("cached").clone();
    assert_eq!(first, second);
    // 3 × 3 candidates minus the diagonal.
    assert_eq!(first.len(), 6);
}

#[test]
fn assignments_come_in_canonical_order() {
    let (network, node) = setup();
    let frames = numbers(3);
    let search = Search::new(&network, &frames, &FlatOntology);
    let values = search.search_values(node, &Bindings::new());
    let rendered: Vec<String> = values
        .iter()
        .map(|a| format!("{}{}", a["left"].id(), a["right"].id()))
        .collect();
    assert_eq!(rendered, vec!["n1n2", "n1n3", "n2n1", "n2n3", "n3n1", "n3n2"]);
}

#[test]
fn commits_consume_one_assignment_each() {
    let (network, node) = setup();
    let frames = numbers(3);
    let mut search = Search::new(&network, &frames, &FlatOntology);
    let mut globals = Bindings::new();
    globals.insert("anchor".to_string(), frames.get_frame("n2").expect("n2"));

    assert!(search.can_be_instantiated(node, &globals));
    let initial = search.cached(node, &globals).expect("cached").len();
    assert_eq!(initial, 2);

    let clause = search.commit(node, &mut globals).expect("commit");
    assert_eq!(
        serde_json::to_value(&clause).unwrap(),
        serde_json::json!({"left": 2, "right": 1})
    );
    assert_eq!(search.cached(node, &globals).expect("cached").len(), initial - 1);

    search.commit(node, &mut globals).expect("commit");
    assert_eq!(search.cached(node, &globals).expect("cached").len(), 0);
    assert!(!search.can_be_instantiated(node, &globals));
    assert!(matches!(
        search.commit(node, &mut globals),
        Err(PlannerError::ExhaustedNode(_))
    ));
}

#[test]
fn different_bindings_get_fresh_entries() {
    let (network, node) = setup();
    let frames = numbers(3);
    let mut search = Search::new(&network, &frames, &FlatOntology);

    let mut first = Bindings::new();
    first.insert("anchor".to_string(), frames.get_frame("n1").expect("n1"));
    assert!(search.can_be_instantiated(node, &first));
    search.commit(node, &mut first).expect("commit");

    let mut second = Bindings::new();
    second.insert("anchor".to_string(), frames.get_frame("n3").expect("n3"));
    assert!(search.cached(node, &second).is_none());
    assert!(search.can_be_instantiated(node, &second));
    assert_eq!(search.cached(node, &second).expect("cached").len(), 2);
    assert_eq!(search.cached(node, &first).expect("cached").len(), 1);

    // Globals the node does not reference do not split the cache.
    first.insert("unrelated".to_string(), frames.get_frame("n2").expect("n2"));
    assert_eq!(search.cached(node, &first).expect("cached").len(), 1);
}

#[test]
fn committing_an_unsearched_node_is_an_error() {
    let (network, node) = setup();
    let frames = numbers(2);
    let mut search = Search::new(&network, &frames, &FlatOntology);
    let mut globals = Bindings::new();
    assert!(matches!(
        search.commit(node, &mut globals),
        Err(PlannerError::UninitializedNode(_))
    ));
    assert!(matches!(
        search.peek(node, &globals),
        Err(PlannerError::UninitializedNode(_))
    ));
}

#[test]
fn confusion_set_skips_unsatisfiable_nodes() {
    let (network, node) = setup();
    let single = numbers(1);
    let mut search = Search::new(&network, &single, &FlatOntology);
    // A single number cannot differ from itself.
    assert!(search.confusion_set(network.top(), &Bindings::new()).is_empty());

    let two = numbers(2);
    let mut search = Search::new(&network, &two, &FlatOntology);
    let confusion = search.confusion_set(network.top(), &Bindings::new());
    assert_eq!(confusion.len(), 1);
    assert_eq!(confusion[0].node, node);
    assert!(!confusion[0].aggregation && !confusion[0].paragraph);
}
