//! Rhetor CLI
//!
//! Command-line interface for:
//! - Planning a document from a schema and an RDF frame set
//! - Rendering the plan through clause templates, as JSON, or as a plan dump
//! - Inspecting the compiled schema network (text or Graphviz)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indexmap::IndexMap;
use rhetor_dsl::{parse_schema, parse_schema_json, SchemaDefinition};
use rhetor_ingest_rdf::{read_frames, read_taxonomy};
use rhetor_planner::{
    ChooserPolicy, FlatOntology, Frame, FrameSet, Ontology, Planner, PlannerConfig,
    SchemaNetwork,
};
use tracing::{info, Level};

mod template;

#[derive(Parser)]
#[command(name = "rhetor")]
#[command(author, version, about = "Rhetor: schema-driven document planning")]
struct Cli {
    /// Log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a document: schema + RDF data → clauses
    Plan {
        /// Schema file (`.schema` DSL or `.json`)
        schema: PathBuf,
        /// Frame set (`.nt`, `.ttl`, `.rdf`/`.owl`/`.xml` or `.csv`)
        #[arg(long)]
        data: PathBuf,
        /// Concept hierarchy (`.nt`, `.ttl`, `.rdf`/`.rdfs`/`.owl`/`.xml` or `.csv`); flat when omitted
        #[arg(long)]
        ontology: Option<PathBuf>,
        /// Planner config JSON; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,
        /// Continuation policy: greedy, random or simple-focus
        #[arg(long)]
        chooser: Option<ChooserPolicy>,
        /// Seed for the random policy
        #[arg(long)]
        seed: Option<u64>,
        /// Initial binding of a global variable to a frame id
        #[arg(long = "bind", value_name = "VAR=FRAME")]
        bindings: Vec<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the compiled schema network
    Network {
        /// Schema file (`.schema` DSL or `.json`)
        schema: PathBuf,
        /// Emit Graphviz DOT instead of the text dump
        #[arg(long)]
        dot: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Clause templates rendered as running text
    Text,
    /// The plan as nested JSON arrays of clauses
    Json,
    /// One numbered line per clause
    Plan,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Plan {
            schema,
            data,
            ontology,
            config,
            chooser,
            seed,
            bindings,
            format,
        } => {
            let mut planner_config = match &config {
                Some(path) => load_config(path)?,
                None => PlannerConfig::default(),
            };
            if let Some(chooser) = chooser {
                planner_config.chooser = chooser;
            }
            if seed.is_some() {
                planner_config.seed = seed;
            }
            cmd_plan(
                &schema,
                &data,
                ontology.as_deref(),
                planner_config,
                &bindings,
                format,
            )?;
        }
        Commands::Network { schema, dot } => {
            cmd_network(&schema, dot)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("{} tracing subscriber already installed", "warning:".yellow().bold());
    }
}

// ============================================================================
// Loading
// ============================================================================

fn load_schema(path: &Path) -> Result<SchemaDefinition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let definition = if is_json {
        parse_schema_json(&text)
            .with_context(|| format!("invalid schema JSON in {}", path.display()))?
    } else {
        parse_schema(&text).with_context(|| format!("invalid schema in {}", path.display()))?
    };
    info!(
        schema = definition.name.as_deref().unwrap_or_default(),
        predicates = definition.predicates.len(),
        "loaded schema"
    );
    Ok(definition)
}

fn load_config(path: &Path) -> Result<PlannerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    PlannerConfig::from_json(&text)
        .with_context(|| format!("invalid planner config in {}", path.display()))
}

/// Resolve `VAR=FRAME` arguments against the frame set, in argument order.
fn parse_bindings<'f>(
    args: &[String],
    frames: &'f dyn FrameSet,
) -> Result<IndexMap<String, &'f Frame>> {
    let mut out = IndexMap::new();
    for arg in args {
        let (var, id) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("binding `{arg}` is not of the form VAR=FRAME"))?;
        let (var, id) = (var.trim(), id.trim());
        if var.is_empty() {
            bail!("binding `{arg}` has an empty variable name");
        }
        let Some(frame) = frames.get_frame(id) else {
            bail!("binding `{var}`: frame `{id}` not found");
        };
        out.insert(var.to_string(), frame);
    }
    Ok(out)
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_plan(
    schema: &Path,
    data: &Path,
    ontology: Option<&Path>,
    config: PlannerConfig,
    bindings: &[String],
    format: OutputFormat,
) -> Result<()> {
    let definition = load_schema(schema)?;
    let planner = Planner::new(&definition, config)
        .with_context(|| format!("failed to compile schema {}", schema.display()))?;

    let frames = read_frames(data)
        .with_context(|| format!("failed to load frames from {}", data.display()))?;
    let ontology: Box<dyn Ontology> = match ontology {
        Some(path) => Box::new(
            read_taxonomy(path)
                .with_context(|| format!("failed to load ontology from {}", path.display()))?,
        ),
        None => Box::new(FlatOntology),
    };
    let initial = parse_bindings(bindings, &frames)?;

    eprintln!(
        "{} {} over {} frames ({:?})",
        "Planning".green().bold(),
        schema.display(),
        frames.len(),
        planner.config().chooser
    );
    let plan = planner.instantiate(&frames, &initial, ontology.as_ref())?;
    eprintln!(
        "{} {} clauses in {} paragraphs",
        "ok".green().bold(),
        plan.clause_count(),
        plan.paragraphs().len()
    );

    match format {
        OutputFormat::Text => println!("{}", template::render_plan(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Plan => print!("{plan}"),
    }
    Ok(())
}

fn cmd_network(schema: &Path, dot: bool) -> Result<()> {
    let definition = load_schema(schema)?;
    let network = SchemaNetwork::build(&definition)
        .with_context(|| format!("failed to compile schema {}", schema.display()))?;
    if dot {
        print!("{}", network.to_dot());
    } else {
        print!("{}", network.dump());
    }
    Ok(())
}
