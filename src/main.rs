//! CLI entry point for jla: a JSONL relational-algebra engine.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use jla::command::{parse_agg_spec, parse_join_mode, parse_join_pairs, parse_path_list, parse_rename_map};
use jla::error::{Error, Result};
use jla::expr::{FilterExpr, JmespathQuery};
use jla::io::{KeyOrder, LineMode, Reader, Writer};
use jla::ops::select::EvalPolicy;
use jla::ops::{project::OutputShape, Relation};
use jla::pipeline::{Operator, Pipeline};

#[derive(Debug, Parser)]
#[command(name = "jla", version, about = "A streaming relational-algebra engine for JSONL")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write output to PATH instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Serialize output objects with keys sorted rather than insertion order.
    #[arg(long, global = true)]
    sorted_keys: bool,

    /// Report fatal errors as one JSON object per line instead of plain text.
    #[arg(long, global = true)]
    error_format_json: bool,

    /// Skip malformed input lines instead of aborting.
    #[arg(long, global = true)]
    lenient_input: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Filter records by a boolean expression.
    Select {
        expr: String,
        file: Option<PathBuf>,
        /// Use the JMESPath advanced query sub-language instead of the filter grammar.
        #[arg(long)]
        jmespath: bool,
        /// Drop rows that error during evaluation instead of aborting.
        #[arg(long)]
        lenient: bool,
    },
    /// Emit a record per input record containing exactly the given fields.
    Project {
        fields: String,
        file: Option<PathBuf>,
        /// Force dotted-string output keys (the engine's default shape).
        #[arg(long)]
        flatten: bool,
        /// Nest dotted output keys into structured objects.
        #[arg(long)]
        nested: bool,
        /// Serialize missing fields as `null` instead of omitting them.
        #[arg(long)]
        null_absent: bool,
    },
    /// Rename fields via comma-separated `from=to` pairs.
    Rename {
        map: String,
        file: Option<PathBuf>,
        /// Fail instead of passing a record through unchanged when a
        /// source path is absent from it.
        #[arg(long)]
        strict: bool,
    },
    /// Remove duplicate records, keeping first-seen order.
    Distinct { file: Option<PathBuf> },
    /// Sort by comma-separated dotted-path keys.
    Sort {
        keys: String,
        file: Option<PathBuf>,
        #[arg(long)]
        desc: bool,
        /// Sort within fixed-size windows instead of globally.
        #[arg(long)]
        window: Option<usize>,
    },
    /// Concatenate two relations without deduplication.
    Union { a: PathBuf, b: PathBuf },
    /// Keep records (by full structural equality) present in both relations.
    Intersection { a: PathBuf, b: PathBuf },
    /// Keep records from `a` not present in `b`, respecting multiplicity.
    Difference { a: PathBuf, b: PathBuf },
    /// Cartesian product of two relations, right overwriting left on key collision.
    Product { a: PathBuf, b: PathBuf },
    /// Equi-join two relations on comma-separated `l_path=r_path` pairs.
    Join {
        a: PathBuf,
        b: PathBuf,
        #[arg(long)]
        on: String,
        #[arg(long, default_value = "inner")]
        mode: String,
    },
    /// Annotate records with `_groups`/`_group_size`/`_group_index` metadata.
    Groupby {
        key: String,
        file: Option<PathBuf>,
        /// `name=fn(path)` or `name=fn`; repeatable. When present, aggregation
        /// runs immediately after grouping instead of emitting metadata records.
        #[arg(long = "agg")]
        agg: Vec<String>,
    },
    /// Consume group-annotated records and emit one aggregated record per group.
    Agg {
        #[arg(long = "agg", required = true)]
        agg: Vec<String>,
        file: Option<PathBuf>,
    },
    /// Inspect or validate a relation's shape.
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Enter interactive workspace mode.
    Repl { file: Option<PathBuf> },
}

#[derive(Debug, Subcommand)]
enum SchemaAction {
    /// Infer a JSON-Schema-shaped description from a relation.
    Infer { file: Option<PathBuf> },
    /// Validate a relation against a JSON-Schema document.
    Validate { schema: PathBuf, file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let error_format_json = cli.error_format_json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, error_format_json);
            e.exit_code()
        }
    }
}

fn report_error(e: &Error, json: bool) {
    if json {
        eprintln!("{}", e.to_json_line());
    } else {
        eprintln!("Error: {e}");
    }
}

fn open_input(file: Option<&PathBuf>, lenient: bool) -> Result<Relation> {
    let mode = if lenient { LineMode::Lenient } else { LineMode::Strict };
    let reader = Reader::open(file.map(PathBuf::as_path), mode)?;
    Ok(Box::new(reader))
}

fn write_output(relation: Relation, output: Option<&PathBuf>, sorted_keys: bool) -> Result<()> {
    let key_order = if sorted_keys { KeyOrder::Sorted } else { KeyOrder::Insertion };
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let mut writer = Writer::new(std::io::BufWriter::new(file), key_order);
            for record in relation {
                writer.write_record(&record?)?;
            }
            writer.flush()
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = Writer::new(std::io::BufWriter::new(stdout.lock()), key_order);
            for record in relation {
                writer.write_record(&record?)?;
            }
            writer.flush()
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Select { expr, file, jmespath, lenient } => {
            let policy = if lenient { EvalPolicy::Lenient } else { EvalPolicy::Strict };
            let operator = if jmespath {
                let query = JmespathQuery::compile(&expr)?;
                Operator::select_jmespath(query, policy)
            } else {
                let filter = FilterExpr::compile(&expr)?;
                Operator::select_filter(&filter, policy)
            };
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let out = Pipeline::new().then(operator).run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Project { fields, file, flatten, nested, null_absent } => {
            let shape = if nested && !flatten { OutputShape::Nested } else { OutputShape::Flat };
            let absent = if null_absent {
                jla::ops::project::AbsentPolicy::Null
            } else {
                jla::ops::project::AbsentPolicy::Omit
            };
            let parsed = jla::expr::parse_fields(&fields)?;
            let operator = Operator::Project { fields: parsed, absent, shape };
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let out = Pipeline::new().then(operator).run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Rename { map, file, strict } => {
            let mapping = parse_rename_map(&map)?;
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Rename { mapping, strict }).run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Distinct { file } => {
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Distinct).run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Sort { keys, file, desc, window } => {
            let keys = parse_path_list(&keys);
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let (mode, warnings) =
                jla::planner::plan(&[jla::pipeline::OperatorKind::Sort], window, false, file.as_deref())?;
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            let out = match mode {
                jla::planner::ExecutionMode::Windowed { window } => {
                    run_windowed(input, window, || Operator::Sort { keys: keys.clone(), desc })?
                }
                _ => Pipeline::new().then(Operator::Sort { keys, desc }).run(input)?,
            };
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Union { a, b } => {
            let lhs = open_input(Some(&a), cli.lenient_input)?;
            let rhs = open_input(Some(&b), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Union { rhs }).run(lhs)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Intersection { a, b } => {
            let lhs = open_input(Some(&a), cli.lenient_input)?;
            let rhs = open_input(Some(&b), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Intersection { rhs }).run(lhs)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Difference { a, b } => {
            let lhs = open_input(Some(&a), cli.lenient_input)?;
            let rhs = open_input(Some(&b), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Difference { rhs }).run(lhs)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Product { a, b } => {
            let lhs = open_input(Some(&a), cli.lenient_input)?;
            let rhs = open_input(Some(&b), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Product { rhs }).run(lhs)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Join { a, b, on, mode } => {
            let on = parse_join_pairs(&on)?;
            let mode = parse_join_mode(&mode)?;
            let lhs = open_input(Some(&a), cli.lenient_input)?;
            let rhs = open_input(Some(&b), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Join { rhs, on, mode }).run(lhs)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Groupby { key, file, agg } => {
            let keys = parse_path_list(&key);
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let mut pipeline = Pipeline::new().then(Operator::GroupBy { keys });
            if !agg.is_empty() {
                let specs = agg.iter().map(|s| parse_agg_spec(s)).collect::<Result<Vec<_>>>()?;
                pipeline = pipeline.then(Operator::Aggregate { specs });
            }
            let out = pipeline.run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Agg { agg, file } => {
            let specs = agg.iter().map(|s| parse_agg_spec(s)).collect::<Result<Vec<_>>>()?;
            let input = open_input(file.as_ref(), cli.lenient_input)?;
            let out = Pipeline::new().then(Operator::Aggregate { specs }).run(input)?;
            write_output(out, cli.output.as_ref(), cli.sorted_keys)
        }
        Command::Schema { action } => run_schema(action, cli.output.as_ref()),
        Command::Repl { file } => {
            let mut workspace = jla::workspace::Workspace::new()?;
            if let Some(path) = file {
                workspace.load(&path, None)?;
            }
            if std::io::stdin().is_terminal() {
                jla::repl::start_interactive(&mut workspace)
            } else {
                jla::repl::run_piped(&mut workspace)
            }
        }
    }
}

fn run_schema(action: SchemaAction, output: Option<&PathBuf>) -> Result<()> {
    match action {
        SchemaAction::Infer { file } => {
            let input = open_input(file.as_ref(), false)?;
            let records = jla::ops::collect(input)?;
            let schema = jla::schema::infer_schema(&records);
            let json = schema_to_json(&schema);
            emit_json(&json, output)
        }
        SchemaAction::Validate { schema, file } => {
            let schema_text = std::fs::read_to_string(&schema)?;
            let schema_json: serde_json::Value = serde_json::from_str(&schema_text)?;
            let input = open_input(Some(&file), false)?;
            let records = jla::ops::collect(input)?;
            jla::schema::validate(&schema_json, &records)?;
            println!("ok: {} record(s) valid", records.len());
            Ok(())
        }
    }
}

fn schema_to_json(schema: &jla::schema::InferredSchema) -> serde_json::Value {
    fn field_to_json(field: &jla::schema::FieldSchema) -> serde_json::Value {
        let children: serde_json::Map<String, serde_json::Value> =
            field.children.iter().map(|(k, v)| (k.clone(), field_to_json(v))).collect();
        serde_json::json!({
            "types": field.types.iter().collect::<Vec<_>>(),
            "nullable": field.nullable,
            "required": field.required,
            "children": children,
        })
    }
    let fields: serde_json::Map<String, serde_json::Value> =
        schema.fields.iter().map(|(k, v)| (k.clone(), field_to_json(v))).collect();
    serde_json::Value::Object(fields)
}

fn emit_json(value: &serde_json::Value, output: Option<&PathBuf>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, text + "\n")?;
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Run `build_operator` over `input` in fixed-size windows, concatenating
/// each window's output.
fn run_windowed(input: Relation, window: usize, build_operator: impl Fn() -> Operator) -> Result<Relation> {
    let records = jla::ops::collect(input)?;
    let mut out = Vec::new();
    for chunk in records.chunks(window.max(1)) {
        let chunk_input = jla::ops::from_vec(chunk.to_vec());
        let result = Pipeline::new().then(build_operator()).run(chunk_input)?;
        out.extend(jla::ops::collect(result)?);
    }
    Ok(jla::ops::from_vec(out))
}
