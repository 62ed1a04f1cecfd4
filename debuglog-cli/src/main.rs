//! Debuglog CLI - Command line interface
//!
//! Append records to the daily log file, inspect stack text and error codes,
//! and print runtime data.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use debuglog_config::LoggerConfig;
use debuglog_core::{
    catalog, install_panic_hook, stacktrace, EnrichedError, Error, ExitGuard, FormatOptions,
    Logger, RuntimeData, StackFrame, StdConsole, Value,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

mod config;
mod logging;
mod platform;

use crate::config::DiagnosticsConfig;
use crate::logging::LogFormat;
use crate::platform::{print_error, print_source_context};

#[derive(Parser)]
#[command(
    name = "debuglog",
    about = "Structured logging and error enrichment",
    version
)]
struct Cli {
    /// JSON config file (keys: debug, logDirectory, stackCap)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory for the daily log files
    #[arg(long, value_name = "DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// Forward debug records to the console
    #[arg(long, global = true)]
    debug: bool,

    /// Internal diagnostics verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Internal diagnostics format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    format: FormatArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a record to today's log file
    Log {
        #[arg(long, value_enum, default_value = "info")]
        level: LevelArg,

        /// Console-origin tag; tagged records are echoed to the console
        #[arg(long, value_enum)]
        tag: Option<TagArg>,

        /// Attach the catalog error for this code (expanded as a traceback at error level)
        #[arg(long, value_name = "CODE")]
        code: Option<String>,

        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Parse stack text (from FILE or stdin) and print the formatted frames
    Stack {
        file: Option<PathBuf>,

        #[arg(long, default_value_t = stacktrace::DEFAULT_MAX_ENTRIES)]
        max: usize,

        #[arg(long, default_value_t = 0)]
        indent: usize,

        #[arg(long, default_value = "\n")]
        delimiter: String,

        /// Print the frames as JSON
        #[arg(long)]
        json: bool,

        /// Show the source around the innermost located frame
        #[arg(long)]
        source: bool,
    },

    /// Describe an error code
    Code {
        code: String,

        /// Template arguments
        args: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// List every catalog entry
    Codes,

    /// Print runtime data as JSON
    Env,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Info,
    Debug,
    Warning,
    Error,
}

#[derive(Clone, Copy, ValueEnum)]
enum TagArg {
    Log,
    Error,
    Debug,
    Info,
    Trace,
}

impl TagArg {
    fn as_str(self) -> &'static str {
        match self {
            TagArg::Log => "log",
            TagArg::Error => "error",
            TagArg::Debug => "debug",
            TagArg::Info => "info",
            TagArg::Trace => "trace",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<FormatArg> for LogFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pretty => LogFormat::Pretty,
            FormatArg::Compact => LogFormat::Compact,
            FormatArg::Json => LogFormat::Json,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(&DiagnosticsConfig::from_verbosity(cli.verbose), cli.format.into());

    let result = match &cli.command {
        Command::Log {
            level,
            tag,
            code,
            message,
        } => load_config(&cli)
            .and_then(|config| handle_log(config, *level, *tag, code.as_deref(), message)),
        Command::Stack {
            file,
            max,
            indent,
            delimiter,
            json,
            source,
        } => {
            let options = FormatOptions::default()
                .with_max_entries(*max)
                .with_indent(*indent)
                .with_delimiter(delimiter.as_str());
            handle_stack(file.as_deref(), &options, *json, *source)
        }
        Command::Code { code, args, json } => handle_code(code, args, *json),
        Command::Codes => {
            handle_codes();
            Ok(())
        }
        Command::Env => handle_env(),
    };

    if let Err(e) = result {
        print_error(&e);
        process::exit(1);
    }
}

/// Config file (if any), then `DEBUGLOG_*` variables, then command line flags
fn load_config(cli: &Cli) -> Result<LoggerConfig, Error> {
    let base = match &cli.config {
        Some(path) => LoggerConfig::from_json_file(path)?,
        None => LoggerConfig::default(),
    };
    let mut config = base.merge_env()?;
    if let Some(dir) = &cli.log_dir {
        config = config.with_log_directory(dir);
    }
    if cli.debug {
        config = config.with_debug(true);
    }
    tracing::debug!(?config, "resolved logger configuration");
    Ok(config)
}

fn handle_log(
    config: LoggerConfig,
    level: LevelArg,
    tag: Option<TagArg>,
    code: Option<&str>,
    message: &[String],
) -> Result<(), Error> {
    let logger = Logger::init(config)?;
    install_panic_hook(logger);
    logger.set_console_sink(StdConsole);
    let mut guard = ExitGuard::new(logger);

    let mut args: Vec<Value> = Vec::with_capacity(message.len() + 2);
    if let Some(tag) = tag {
        args.push(Value::from(tag.as_str()));
    }
    args.extend(message.iter().map(Value::from));
    if let Some(code) = code {
        args.push(Value::from(EnrichedError::from_code(code)));
    }

    let echoed = match level {
        LevelArg::Info => logger.log(&args),
        LevelArg::Debug => logger.log_debug(&args),
        LevelArg::Warning => logger.log_warning(&args),
        LevelArg::Error => logger.log_error(&args),
    }?;
    tracing::debug!(
        directory = %logger.log_directory().display(),
        echoed = echoed.is_some(),
        "record written"
    );

    guard.set_code(0);
    Ok(())
}

fn handle_stack(
    file: Option<&Path>,
    options: &FormatOptions,
    json: bool,
    source: bool,
) -> Result<(), Error> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let frames = stacktrace::parse(&text);
    tracing::debug!(frames = frames.len(), "parsed stack text");

    if json {
        let shown: Vec<_> = frames.iter().take(options.max_entries).collect();
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        println!("{}", stacktrace::format(&frames, options));
    }

    if source {
        let top = frames.iter().find_map(|frame| match frame {
            StackFrame::Location {
                file, line, column, ..
            } => Some((file.clone(), *line as usize, *column as usize)),
            StackFrame::Raw { .. } => None,
        });
        if let Some((file, line, column)) = top {
            let content = std::fs::read_to_string(&file)?;
            print_source_context(&content, line, column);
        }
    }
    Ok(())
}

fn handle_code(code: &str, args: &[String], json: bool) -> Result<(), Error> {
    let entry = catalog::lookup(code);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let message = entry.render(&args);

    if json {
        let output = serde_json::json!({
            "code": code,
            "resolvedCode": entry.code,
            "name": entry.name,
            "category": entry.category().as_str(),
            "message": message,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {} [{}]", entry.code, entry.name, entry.category());
        println!("{}", message);
        if entry.code != code {
            println!("(unknown code '{}', showing fallback)", code);
        }
    }
    Ok(())
}

fn handle_codes() {
    for entry in catalog::entries() {
        println!(
            "{:<8} {:<28} {:<12} {}",
            entry.code,
            entry.name,
            entry.category().as_str(),
            entry.render(&[])
        );
    }
}

fn handle_env() -> Result<(), Error> {
    let data = RuntimeData::collect(Instant::now());
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
