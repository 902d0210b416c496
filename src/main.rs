//! Purpose: `pob-bridge` entry point: sidecar loop plus one-shot encode/decode helpers.
//! Role: Binary crate root; parses args, initializes logging, picks the stats backend.
//! Invariants: stdout carries only protocol lines (serve) or command output (one-shot).
//! Invariants: Logs and non-interactive errors go to stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use pob_bridge::bridge::Dispatcher;
use pob_bridge::core::build::Build;
use pob_bridge::core::codec;
use pob_bridge::core::error::{Error, ErrorKind, to_exit_code};
use pob_bridge::sidecar;
use pob_bridge::stats::StatsBackend;

const STATS_COMMAND_ENV: &str = "POB_BRIDGE_STATS_COMMAND";

#[derive(Parser)]
#[command(
    name = "pob-bridge",
    version,
    about = "Path of Building import-code bridge",
    long_about = None,
    after_help = r#"EXAMPLES
  $ pob-bridge                         # serve line-delimited JSON on stdin/stdout
  $ echo '{"command":"ping","data":{}}' | pob-bridge serve
  $ pob-bridge encode build.json
  $ pob-bridge decode eNrtV...

ENVIRONMENT
  POB_BRIDGE_STATS_COMMAND   stats backend program (same as --stats-command)
  RUST_LOG                   log filter for stderr diagnostics (default: info)"#
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Program that computes build stats (JSON build on stdin, stats on stdout)",
        value_hint = ValueHint::CommandName
    )]
    stats_command: Option<PathBuf>,
    #[arg(
        long = "stats-arg",
        global = true,
        allow_hyphen_values = true,
        help = "Extra argument passed to the stats program (repeatable)"
    )]
    stats_args: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Serve JSON requests on stdin, one response line per request (default)")]
    Serve,
    #[command(about = "Encode a build JSON document into an import code")]
    Encode {
        #[arg(help = "Build JSON file (default: stdin)", value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
    },
    #[command(about = "Decode an import code and print the build XML")]
    Decode {
        #[arg(help = "Import code (default: stdin)")]
        code: Option<String>,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let program = cli.stats_command.or_else(stats_command_from_env);
            let backend = StatsBackend::detect(program.as_deref(), cli.stats_args);
            let dispatcher = Dispatcher::new(backend);
            let stdin = io::stdin();
            let stdout = io::stdout();
            sidecar::serve(&dispatcher, stdin.lock(), stdout.lock())
        }
        Command::Encode { input } => {
            let text = read_input(input.as_deref())?;
            let value: Value = serde_json::from_str(&text).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("build input is not valid JSON")
                    .with_source(err)
            })?;
            let code = codec::encode(&Build::from_value(value)?)?;
            println!("{code}");
            Ok(())
        }
        Command::Decode { code } => {
            let code = match code {
                Some(code) => code,
                None => read_input(None)?,
            };
            let decoded = codec::decode(&code)?;
            println!("{}", decoded.raw_xml());
            Ok(())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "pob-bridge", &mut io::stdout());
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn stats_command_from_env() -> Option<PathBuf> {
    std::env::var_os(STATS_COMMAND_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        }),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            Ok(text)
        }
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        return;
    }

    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(err.to_string()));
    let json = serde_json::to_string(&json!({ "error": Value::Object(inner) })).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}
