use std::{io::Write, path::PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about = "Evaluate predicate expressions against JSON data")]
struct Cli {
    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(self) -> Command {
        self.command
            .unwrap_or_else(|| Command::Repl(ContextArgs::default()))
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate one expression and print the result
    Eval(EvalArgs),
    /// Print the tokens of an expression
    Tokens(TokensArgs),
    /// Evaluate expressions line by line
    Repl(ContextArgs),
}

#[derive(Debug, Default, Args)]
struct ContextArgs {
    /// JSON file holding the context object
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Set a top-level context entry; VALUE is read as JSON, or as a plain
    /// string if it is not valid JSON
    #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, serde_json::Value)>,
}

#[derive(Debug, Args)]
struct EvalArgs {
    expression: String,

    #[command(flatten)]
    context: ContextArgs,
}

#[derive(Debug, Args)]
struct TokensArgs {
    expression: String,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Epl(#[from] epl::Error),
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid context: {0}")]
    Json(#[from] serde_json::Error),
    #[error("The context must be a JSON object")]
    NotAnObject,
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose);

    let result = match args.command() {
        Command::Eval(args) => eval_command(&args),
        Command::Tokens(args) => {
            tokens_command(&args);
            Ok(())
        }
        Command::Repl(args) => repl_command(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn parse_assignment(arg: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {arg:?}"))?;
    if name.is_empty() {
        return Err(format!("missing name in {arg:?}"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

fn load_context(args: &ContextArgs) -> Result<epl::Value, CliError> {
    let mut object = match &args.context {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str(&text)? {
                serde_json::Value::Object(object) => object,
                _ => return Err(CliError::NotAnObject),
            }
        }
        None => serde_json::Map::new(),
    };

    for (name, value) in &args.set {
        object.insert(name.clone(), value.clone());
    }

    log::debug!("context has {} top-level entries", object.len());
    Ok(serde_json::Value::Object(object).into())
}

fn eval_command(args: &EvalArgs) -> Result<(), CliError> {
    let context = load_context(&args.context)?;
    let value = epl::evaluate(&args.expression, context)?;
    println!("{value}");
    Ok(())
}

fn tokens_command(args: &TokensArgs) {
    for token in epl::tokenizer::tokens(&args.expression) {
        println!(
            "{:4} {:4} {:<24} {}",
            token.span.offset,
            token.span.length,
            format!("{:?}", token.token_type),
            token.span.excerpt()
        );
    }
}

fn repl_command(args: &ContextArgs) -> Result<(), CliError> {
    let context = load_context(args)?;

    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut input = String::new();
    loop {
        print!("> ");
        std::io::stdout()
            .flush()
            .expect("should be able to flush stdout");

        let read = std::io::stdin()
            .read_line(&mut input)
            .expect("should be able to read line from stdin");

        if read == 0 {
            break;
        }

        let source = input.trim();
        if !source.is_empty() {
            match epl::evaluate(source, context.clone()) {
                Ok(value) => println!("{value}"),
                Err(e) => println!("Error: {e}"),
            }
        }

        input.clear();
    }

    Ok(())
}
