//! Interactive REPL and piped pipeline execution over a `Workspace`.

use std::io::{self, BufWriter, Read, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::command::{parse_agg_spec, parse_join_mode, parse_join_pairs, parse_path_list, parse_rename_map, tokenize};
use crate::error::{Error, Result};
use crate::expr::{parse_fields, FilterExpr, JmespathQuery};
use crate::ops::project::{AbsentPolicy, OutputShape};
use crate::ops::select::EvalPolicy;
use crate::pipeline::{Operator, Pipeline};
use crate::workspace::Workspace;

const HISTORY_FILE: &str = ".jla_history";
const PROMPT: &str = "jla> ";
const CONTINUATION_PROMPT: &str = "  -> ";
const PREVIEW_ROWS: usize = 20;

enum DotCommandResult {
    Continue,
    Exit,
}

/// Start an interactive REPL session.
///
/// # Errors
/// Returns an error if REPL initialization or I/O fails.
pub fn start_interactive(workspace: &mut Workspace) -> Result<()> {
    let history_path = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No home directory"))?
        .join(HISTORY_FILE);

    let mut editor = DefaultEditor::new()?;
    let _ = editor.load_history(&history_path);

    print_banner(workspace);

    let result = run_repl_loop(&mut editor, workspace);

    let _ = editor.save_history(&history_path);

    result
}

fn print_banner(workspace: &Workspace) {
    let count = workspace.datasets().len();
    println!("{count} dataset(s) loaded. Type \".help\" for usage hints.\n");
}

fn run_repl_loop(editor: &mut DefaultEditor, workspace: &mut Workspace) -> Result<()> {
    let mut multiline_buffer = String::new();

    loop {
        let prompt = if multiline_buffer.is_empty() { PROMPT } else { CONTINUATION_PROMPT };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim_end();

                if !multiline_buffer.is_empty() {
                    multiline_buffer.push_str(trimmed);
                    if multiline_buffer.trim_end().ends_with('|') {
                        multiline_buffer.push('\n');
                        continue;
                    }
                    let _ = editor.add_history_entry(&multiline_buffer);
                    run_line(workspace, &std::mem::take(&mut multiline_buffer));
                    continue;
                }

                if trimmed.trim().is_empty() {
                    continue;
                }

                if trimmed.trim_start().starts_with('.') {
                    let _ = editor.add_history_entry(trimmed);
                    if matches!(handle_dot_command(trimmed, workspace), DotCommandResult::Exit) {
                        break;
                    }
                } else if trimmed.ends_with('|') {
                    multiline_buffer.push_str(trimmed);
                    multiline_buffer.push('\n');
                } else {
                    let _ = editor.add_history_entry(trimmed);
                    run_line(workspace, trimmed);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn run_line(workspace: &mut Workspace, line: &str) {
    match run_pipeline_command(workspace, line) {
        Ok(()) => {}
        Err(e) => eprintln!("Error: {e}"),
    }
}

/// Parse and run one `stage | stage | ...` pipeline command against the
/// current dataset, spilling its result to a new derived dataset and
/// printing a preview.
///
/// # Errors
/// Returns the first parse or execution error encountered.
fn run_pipeline_command(workspace: &mut Workspace, line: &str) -> Result<()> {
    let mut pipeline = Pipeline::new();
    for segment in line.split('|') {
        let tokens = tokenize(segment);
        if tokens.is_empty() {
            continue;
        }
        let operator = parse_stage(workspace, &tokens)?;
        pipeline = pipeline.then(operator);
    }

    let name = workspace.run_into("q", pipeline)?;
    let rows = workspace.ls(Some(&name), PREVIEW_ROWS)?;
    println!("-> {name}");
    println!("{}", crate::formatter::render_table(&rows));
    Ok(())
}

fn flag_present(tokens: &[String], name: &str) -> bool {
    tokens.iter().any(|t| t == name)
}

fn flag_value<'a>(tokens: &'a [String], name: &str) -> Option<&'a str> {
    tokens.iter().position(|t| t == name).and_then(|i| tokens.get(i + 1)).map(String::as_str)
}

fn flag_values<'a>(tokens: &'a [String], name: &str) -> Vec<&'a str> {
    tokens
        .iter()
        .zip(tokens.iter().skip(1))
        .filter_map(|(flag, value)| (flag == name).then_some(value.as_str()))
        .collect()
}

fn positional(tokens: &[String]) -> Option<&str> {
    tokens.get(1).filter(|t| !t.starts_with("--")).map(String::as_str)
}

fn parse_stage(workspace: &Workspace, tokens: &[String]) -> Result<Operator> {
    let keyword = tokens[0].as_str();
    match keyword {
        "select" => {
            let expr = positional(tokens)
                .ok_or_else(|| Error::Usage("select requires an expression".to_string()))?;
            let policy = if flag_present(tokens, "--lenient") { EvalPolicy::Lenient } else { EvalPolicy::Strict };
            if flag_present(tokens, "--jmespath") {
                Ok(Operator::select_jmespath(JmespathQuery::compile(expr)?, policy))
            } else {
                Ok(Operator::select_filter(&FilterExpr::compile(expr)?, policy))
            }
        }
        "project" => {
            let fields = positional(tokens)
                .ok_or_else(|| Error::Usage("project requires a field list".to_string()))?;
            let shape = if flag_present(tokens, "--nested") { OutputShape::Nested } else { OutputShape::Flat };
            let absent = if flag_present(tokens, "--null-absent") { AbsentPolicy::Null } else { AbsentPolicy::Omit };
            Ok(Operator::Project { fields: parse_fields(fields)?, absent, shape })
        }
        "rename" => {
            let map = positional(tokens).ok_or_else(|| Error::Usage("rename requires a mapping".to_string()))?;
            Ok(Operator::Rename { mapping: parse_rename_map(map)?, strict: flag_present(tokens, "--strict") })
        }
        "distinct" => Ok(Operator::Distinct),
        "sort" => {
            let keys = positional(tokens).ok_or_else(|| Error::Usage("sort requires key(s)".to_string()))?;
            Ok(Operator::Sort { keys: parse_path_list(keys), desc: flag_present(tokens, "--desc") })
        }
        "take" => {
            let n = parse_usize(positional(tokens), "take")?;
            Ok(Operator::Take { n })
        }
        "skip" => {
            let n = parse_usize(positional(tokens), "skip")?;
            Ok(Operator::Skip { n })
        }
        "explode" => {
            let path = positional(tokens).ok_or_else(|| Error::Usage("explode requires a path".to_string()))?;
            Ok(Operator::Explode { path: crate::path::Path::parse(path) })
        }
        "groupby" => {
            let key = positional(tokens).ok_or_else(|| Error::Usage("groupby requires key(s)".to_string()))?;
            Ok(Operator::GroupBy { keys: parse_path_list(key) })
        }
        "agg" => {
            let specs = flag_values(tokens, "--agg").iter().map(|s| parse_agg_spec(s)).collect::<Result<Vec<_>>>()?;
            Ok(Operator::Aggregate { specs })
        }
        "union" | "intersection" | "difference" | "product" => {
            let other = positional(tokens)
                .ok_or_else(|| Error::Usage(format!("{keyword} requires a dataset name")))?;
            let rhs = workspace.open(Some(other))?;
            Ok(match keyword {
                "union" => Operator::Union { rhs },
                "intersection" => Operator::Intersection { rhs },
                "difference" => Operator::Difference { rhs },
                _ => Operator::Product { rhs },
            })
        }
        "join" => {
            let other = positional(tokens).ok_or_else(|| Error::Usage("join requires a dataset name".to_string()))?;
            let on = flag_value(tokens, "--on").ok_or_else(|| Error::Usage("join requires --on".to_string()))?;
            let mode = flag_value(tokens, "--mode").map_or(Ok(crate::ops::join::JoinMode::Inner), parse_join_mode)?;
            let rhs = workspace.open(Some(other))?;
            Ok(Operator::Join { rhs, on: parse_join_pairs(on)?, mode })
        }
        other => Err(Error::Usage(format!("unknown operator {other:?}"))),
    }
}

fn parse_usize(value: Option<&str>, keyword: &str) -> Result<usize> {
    value
        .ok_or_else(|| Error::Usage(format!("{keyword} requires a count")))?
        .parse()
        .map_err(|_| Error::Usage(format!("{keyword} expects a non-negative integer")))
}

fn handle_dot_command(command: &str, workspace: &mut Workspace) -> DotCommandResult {
    let trimmed = command.trim();
    let cmd = trimmed.to_lowercase();

    if cmd == ".quit" || cmd == ".exit" || cmd == ".q" {
        return DotCommandResult::Exit;
    }
    if cmd == ".help" || cmd == ".h" {
        print_help();
        return DotCommandResult::Continue;
    }
    if cmd == ".datasets" {
        for (name, dataset, is_current) in workspace.datasets() {
            let marker = if is_current { "*" } else { " " };
            println!("{marker} {name} ({:?}) {:?}", dataset.kind, dataset.path);
        }
        return DotCommandResult::Continue;
    }
    if cmd == ".pwd" {
        println!("{}", workspace.pwd().unwrap_or("<none>"));
        return DotCommandResult::Continue;
    }
    if cmd == ".info" || cmd.starts_with(".info ") {
        let name = trimmed.split_whitespace().nth(1);
        match workspace.info(name) {
            Ok(info) => {
                println!("rows: {}", info.row_count);
                println!("size: {} bytes", info.size_bytes);
                println!("top-level keys: {}", info.top_level_keys.join(", "));
                if let Some(preview) = info.preview {
                    println!("preview: {}", crate::value::Value::Object(preview));
                }
            }
            Err(e) => eprintln!("Error: {e}"),
        }
        return DotCommandResult::Continue;
    }
    if cmd.starts_with(".cd ") {
        let name = trimmed.split_whitespace().nth(1).unwrap_or("");
        if let Err(e) = workspace.cd(name) {
            eprintln!("Error: {e}");
        }
        return DotCommandResult::Continue;
    }

    println!("Unknown command: {command}. Type .help for usage.");
    DotCommandResult::Continue
}

fn print_help() {
    println!(
        r"
Commands:
  .help, .h        Show this help
  .datasets        List registered datasets
  .info [name]     Row count, size, and sampled keys for a dataset
  .cd name         Move the current-dataset pointer
  .pwd             Show the current-dataset pointer
  .quit, .exit, .q Exit

Pipeline commands:
  stage [| stage]...
  e.g. select 'a > 1' | project b,total=a+b | take 5

Stages: select, project, rename, distinct, sort, take, skip, explode,
groupby, agg, union, intersection, difference, product, join.
Binary stages (union/intersection/difference/product/join) name the
other side as an already-loaded dataset, not a file.

A line ending in `|` continues the pipeline on the next line.
"
    );
}

/// Execute piped pipeline commands from stdin, one per line (lines
/// ending in `|` continue onto the next), against `workspace`.
///
/// # Errors
/// Returns an error if stdin cannot be read.
pub fn run_piped(workspace: &mut Workspace) -> Result<()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    let mut pending = String::new();
    for line in input.lines() {
        pending.push_str(line);
        if pending.trim_end().ends_with('|') {
            pending.push('\n');
            continue;
        }
        let command = std::mem::take(&mut pending);
        let trimmed = command.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('.') {
            writer.flush()?;
            if matches!(handle_dot_command(trimmed, workspace), DotCommandResult::Exit) {
                break;
            }
        } else {
            writer.flush()?;
            run_line(workspace, trimmed);
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_stops_before_flags() {
        let tokens = vec!["select".to_string(), "a > 1".to_string(), "--lenient".to_string()];
        assert_eq!(positional(&tokens), Some("a > 1"));
    }

    #[test]
    fn flag_values_collects_repeated_agg_flags() {
        let tokens: Vec<String> = vec!["agg", "--agg", "cnt=count", "--agg", "total=sum(x)"]
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(flag_values(&tokens, "--agg"), vec!["cnt=count", "total=sum(x)"]);
    }
}
