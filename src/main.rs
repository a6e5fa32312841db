use clap::{Parser as ClapParser, Subcommand};
use pipeform::cli::{self, CliError, EvalOptions};
use pipeform::output::format_trace;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "pipeform")]
#[command(about = "Pipeform - compile spreadsheet-style formulas into pipelines and evaluate them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a formula and print the pipeline as JSON
    Parse {
        /// The formula to compile
        formula: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Evaluate a formula against a record
    Eval {
        /// The formula to evaluate
        formula: String,

        /// JSON record (reads from stdin if not provided)
        #[arg(short, long)]
        record: Option<String>,

        /// Workbook providing sets and nodes
        #[arg(short, long)]
        workbook: Option<PathBuf>,

        /// Print every executed step
        #[arg(short, long)]
        trace: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Describe each step a formula compiles to
    Inspect {
        /// The formula to describe
        formula: String,
    },

    /// Evaluate every node of a workbook
    Run {
        /// Workbook JSON file
        workbook: PathBuf,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'pipeform docs' to list categories)
        category: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { formula, pretty } => run_parse(&formula, pretty),
        Commands::Eval {
            formula,
            record,
            workbook,
            trace,
            pretty,
        } => run_eval(formula, record, workbook, trace, pretty),
        Commands::Inspect { formula } => {
            for line in cli::execute_inspect(&formula) {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Run { workbook, pretty } => run_workbook(&workbook, pretty),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => match cli::get_doc_category(&category) {
            Ok(content) => {
                print!("{}", content);
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }?;
    println!("{}", json);
    Ok(())
}

fn run_parse(formula: &str, pretty: bool) -> Result<(), CliError> {
    print_json(&cli::execute_parse(formula)?, pretty)
}

fn run_eval(
    formula: String,
    record: Option<String>,
    workbook: Option<PathBuf>,
    trace: bool,
    pretty: bool,
) -> Result<(), CliError> {
    let record = match record {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer).filter(|s| !s.trim().is_empty())
        }
        None => None,
    };

    let options = EvalOptions {
        formula,
        record,
        workbook,
    };
    let evaluation = cli::execute_eval(&options)?;

    if trace {
        eprint!("{}", format_trace(&evaluation.steps));
    }
    print_json(&cli::evaluation_to_json(&evaluation, false), pretty)?;

    match evaluation.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn run_workbook(path: &PathBuf, pretty: bool) -> Result<(), CliError> {
    let results = cli::execute_run(path)?;
    let report: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(id, evaluation)| (id.clone(), cli::evaluation_to_json(evaluation, false)))
        .collect();
    print_json(&serde_json::Value::Object(report), pretty)
}
