//! DIL CLI - Command line interface for DIL
//!
//! # Usage
//!
//! ```text
//! dil run <file>                Execute a DIL script, printing each `Get` result
//! dil run <file> -f json        Print results as JSON, one per line
//! dil run <file> -f yaml        Print results as YAML documents
//! dil parse <file>              Show the AST
//! dil expr "<expression>"       Evaluate a single expression
//! ```
//!
//! Set `DIL_LOG` (for example `DIL_LOG=debug`) to see execution traces on stderr.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand, ValueEnum};
use dil_parser::{parse_expression, parse_program, ParseError, Span};
use dil_runtime::{
    EvalError, EvalResult, ExecError, Interpreter, InterpreterOptions, OutputSink, ValueView,
};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dil")]
#[command(author, version, about = "DIL scripting language interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a DIL script
    Run {
        /// The DIL file to execute
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Nesting depth after which composites render as `...`
        #[arg(long, default_value_t = InterpreterOptions::default().max_render_depth)]
        max_render_depth: usize,
    },

    /// Parse a DIL file and show AST (for debugging)
    Parse {
        /// The DIL file to parse
        file: PathBuf,
    },

    /// Evaluate a DIL expression
    Expr {
        /// The expression to evaluate
        expression: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{error}")]
    Parse {
        name: String,
        code: String,
        error: ParseError,
    },

    #[error("{error}")]
    Runtime {
        name: String,
        code: String,
        error: ExecError,
    },

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize output: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Io { .. } => 3,
            CliError::Parse { .. } => 2,
            CliError::Runtime { .. } | CliError::Json(_) | CliError::Yaml(_) => 1,
        }
    }

    fn report(&self) {
        match self {
            CliError::Parse { name, code, error } => {
                let span = error.span().unwrap_or_default();
                let message = match error {
                    ParseError::Syntax(_) => "Syntax error".to_string(),
                    other => other.to_string(),
                };
                print_diagnostic(name, code, span, &message, &error.reason());
            }
            CliError::Runtime { name, code, error } => {
                let message = error.to_string();
                print_diagnostic(name, code, error.span, &message, &message);
            }
            other => eprintln!("Error: {}", other),
        }
    }
}

fn print_diagnostic(name: &str, code: &str, span: Span, message: &str, label: &str) {
    let result = Report::build(ReportKind::Error, (name, span.range()))
        .with_config(Config::default().with_index_type(IndexType::Byte))
        .with_message(message)
        .with_label(Label::new((name, span.range())).with_message(label))
        .finish()
        .eprint((name, Source::from(code)));

    if result.is_err() {
        eprintln!("Error: {}", message);
    }
}

/// Prints each `Get` result as soon as it is produced
struct PrintSink {
    format: OutputFormat,
}

impl OutputSink for PrintSink {
    fn emit(&mut self, value: ValueView<'_>, _span: Span) -> EvalResult<()> {
        let text = render(&value, self.format).map_err(|e| EvalError::Output(e.to_string()))?;
        writeln!(std::io::stdout().lock(), "{}", text).map_err(|e| EvalError::Output(e.to_string()))
    }
}

fn render(value: &ValueView<'_>, format: OutputFormat) -> Result<String, CliError> {
    let text = match format {
        OutputFormat::Text => value.to_string(),
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(value)?.trim_end()),
    };
    Ok(text)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("DIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            ExitCode::from(e.exit_code())
        }
    }
}

fn read_source(file: &Path) -> Result<String, CliError> {
    fs::read_to_string(file).map_err(|source| CliError::Io {
        path: file.to_path_buf(),
        source,
    })
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Run {
            file,
            format,
            max_render_depth,
        } => {
            let name = file.display().to_string();
            let code = read_source(&file)?;
            let program = match parse_program(&code) {
                Ok(program) => program,
                Err(error) => return Err(CliError::Parse { name, code, error }),
            };
            tracing::debug!(file = %name, statements = program.statements.len(), "parsed");

            let mut interpreter =
                Interpreter::with_options(InterpreterOptions { max_render_depth });
            let mut sink = PrintSink { format };
            if let Err(error) = interpreter.run(&program, &mut sink) {
                return Err(CliError::Runtime { name, code, error });
            }
        }

        Commands::Parse { file } => {
            let name = file.display().to_string();
            let code = read_source(&file)?;
            match parse_program(&code) {
                Ok(program) => println!("{:#?}", program),
                Err(error) => return Err(CliError::Parse { name, code, error }),
            }
        }

        Commands::Expr { expression, format } => {
            let name = "<expr>".to_string();
            let expr = match parse_expression(&expression) {
                Ok(expr) => expr,
                Err(error) => {
                    return Err(CliError::Parse {
                        name,
                        code: expression,
                        error,
                    })
                }
            };

            let mut interpreter = Interpreter::new();
            let value = match interpreter.eval(&expr) {
                Ok(value) => value,
                Err(error) => {
                    return Err(CliError::Runtime {
                        name,
                        code: expression,
                        error: error.at(expr.span),
                    })
                }
            };

            println!("{}", render(&interpreter.view(&value), format)?);
        }
    }

    Ok(())
}
