//! saferule CLI - check and evaluate restricted formulas

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use saferule::{
    evaluate, parse_formula, render_diagnostic, tokenize, Bindings, Decimal, FormulaError, Limits,
    TokenKind,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saferule")]
#[command(
    author,
    version,
    about = "Check and evaluate restricted pricing formulas"
)]
struct Cli {
    #[command(flatten)]
    limits: LimitArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LimitArgs {
    /// JSON file with limits; missing fields use defaults
    #[arg(long, global = true)]
    limits: Option<PathBuf>,

    /// Maximum formula length in characters
    #[arg(long, global = true)]
    max_length: Option<usize>,

    /// Maximum number of tokens
    #[arg(long, global = true)]
    max_tokens: Option<usize>,

    /// Maximum nesting / tree depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Maximum evaluation steps
    #[arg(long, global = true)]
    max_steps: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a formula and print its canonical form
    Check {
        /// Formula text
        formula: String,

        /// Declared variable (repeatable)
        #[arg(short, long = "var")]
        vars: Vec<String>,
    },

    /// Evaluate a formula
    Eval {
        /// Formula text
        formula: String,

        /// Variable binding as NAME=VALUE (repeatable); declares the variable
        #[arg(short, long = "bind", value_parser = parse_binding)]
        bindings: Vec<(String, Decimal)>,
    },

    /// Print the token stream of a formula
    Tokens {
        /// Formula text
        formula: String,

        /// Declared variable (repeatable)
        #[arg(short, long = "var")]
        vars: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let limits = load_limits(&cli.limits)?;

    match cli.command {
        Commands::Check { formula, vars } => Ok(check(&formula, &vars, &limits)),
        Commands::Eval { formula, bindings } => Ok(eval(&formula, &bindings, &limits)),
        Commands::Tokens { formula, vars } => Ok(tokens(&formula, &vars, &limits)),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warn)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_limits(args: &LimitArgs) -> Result<Limits> {
    let mut limits = match &args.limits {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse limits in '{}'", path.display()))?
        }
        None => Limits::default(),
    };

    if let Some(max) = args.max_length {
        limits.max_formula_length = max;
    }
    if let Some(max) = args.max_tokens {
        limits.max_token_count = max;
    }
    if let Some(max) = args.max_depth {
        limits.max_tree_depth = max;
    }
    if let Some(max) = args.max_steps {
        limits.max_eval_steps = max;
    }

    limits.validate().context("Invalid limits")?;
    tracing::debug!(?limits, "limits loaded");
    Ok(limits)
}

fn parse_binding(arg: &str) -> std::result::Result<(String, Decimal), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let value = Decimal::from_str(value.trim())
        .map_err(|e| format!("invalid number '{}': {e}", value.trim()))?;
    Ok((name.trim().to_string(), value))
}

fn report(err: impl Into<FormulaError>, formula: &str) -> ExitCode {
    eprintln!("{}", render_diagnostic(&err.into(), formula));
    ExitCode::FAILURE
}

fn check(formula: &str, vars: &[String], limits: &Limits) -> ExitCode {
    match parse_formula(formula, vars, limits) {
        Ok(handle) => {
            println!("{handle}");
            eprintln!(
                "ok: {} nodes, depth {}",
                handle.node_count(),
                handle.depth()
            );
            ExitCode::SUCCESS
        }
        Err(err) => report(err, formula),
    }
}

fn eval(formula: &str, bindings: &[(String, Decimal)], limits: &Limits) -> ExitCode {
    let vars: Vec<&str> = bindings.iter().map(|(name, _)| name.as_str()).collect();
    let handle = match parse_formula(formula, &vars, limits) {
        Ok(handle) => handle,
        Err(err) => return report(err, formula),
    };

    let bindings: Bindings = bindings.iter().cloned().collect();
    match evaluate(&handle, &bindings, limits) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => report(err, formula),
    }
}

fn tokens(formula: &str, vars: &[String], limits: &Limits) -> ExitCode {
    match tokenize(formula, vars, limits) {
        Ok(tokens) => {
            for token in tokens {
                let kind = match token.kind {
                    TokenKind::Number => "number",
                    TokenKind::Identifier => "identifier",
                    TokenKind::Operator(_) => "operator",
                    TokenKind::LParen | TokenKind::RParen => "paren",
                    TokenKind::Question | TokenKind::Colon => "ternary",
                };
                println!("{:>4}  {:<10}  {}", token.position, kind, token.text);
            }
            ExitCode::SUCCESS
        }
        Err(err) => report(err, formula),
    }
}
