use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use task_context::app::default_rc_path;
use task_context::{App, Command, Prompt};
use tracing_subscriber::EnvFilter;

/// Task list with named contexts.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file (defaults to ~/.taskrc)
    #[arg(long, env = "TASKRC", global = true)]
    rc: Option<PathBuf>,
    /// Directory holding tasks.json
    #[arg(long, env = "TASKDATA", global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// define <name> <filter...> | delete <name> | list | show | none | <name>
    Context {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Defined context names, one per line (shell completion)
    #[command(name = "_context", hide = true)]
    CompletionContext,
    /// Add a pending task
    Add {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Record an already completed task
    Log {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Pending tasks matching a filter and the active context
    List {
        /// Report name, for report.<name>.context
        #[arg(long, default_value = "list")]
        report: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        filter: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TCTX_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    init_tracing();

    // Parse CLI arguments.
    let args = Args::parse();

    let Some(rc) = args.rc.or_else(default_rc_path) else {
        eprintln!("Cannot locate the home directory; use --rc.");
        std::process::exit(1);
    };

    let command = match args.command {
        Cmd::Context { args } => Command::Context(args),
        Cmd::CompletionContext => Command::CompletionContext,
        Cmd::Add { args } => Command::Add(args),
        Cmd::Log { args } => Command::Log(args),
        Cmd::List { report, filter } => Command::List { report, filter },
    };

    let app = App::new(rc, args.data);
    let mut confirm = Prompt::new(io::stdin().lock(), io::stdout());

    match app.run(command, &mut confirm) {
        Ok(out) => {
            let out = out.trim_end();
            if !out.is_empty() {
                println!("{out}");
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
