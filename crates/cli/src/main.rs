mod config;
mod error;
mod repl;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::AgentSession;
use runtime::providers::HttpBackend;
use runtime::tools::InvocationRequest;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use toolkit::Profile;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};
use repl::Exit;

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Expose local tools to a hosted conversational agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./concierge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Agent profile: weather, real-estate or all
        #[arg(short, long, default_value_t = Profile::All)]
        agent: Profile,
    },
    /// Stream one or more queries through a single session, then exit
    Ask {
        /// Agent profile: weather, real-estate or all
        #[arg(short, long, default_value_t = Profile::All)]
        agent: Profile,
        /// Queries to send in order (defaults to a real-estate demo)
        queries: Vec<String>,
    },
    /// Show the tools an agent profile exposes
    Tools {
        /// Agent profile: weather, real-estate or all
        #[arg(short, long, default_value_t = Profile::All)]
        agent: Profile,
    },
    /// Invoke one tool locally and print the result
    Call {
        /// Tool name
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };
    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Chat { agent }) => cmd_chat(cli.config, agent).await,
        None => cmd_chat(cli.config, Profile::default()).await,
        Some(Commands::Ask { agent, queries }) => cmd_ask(cli.config, agent, queries).await,
        Some(Commands::Tools { agent }) => cmd_tools(agent),
        Some(Commands::Call { tool, args }) => cmd_call(&tool, &args).await,
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build a session for `profile`. Configuration is resolved before any
/// registry or backend exists.
fn open_session(
    config_path: Option<PathBuf>,
    profile: Profile,
) -> Result<(Config, AgentSession<HttpBackend>)> {
    let config = Config::load(config_path.as_deref())?;
    let registry = Arc::new(profile.registry()?);

    let backend = HttpBackend::builder(&config.endpoint, &config.model)
        .auth(config.auth.clone())
        .max_tokens(config.max_tokens)
        .build();
    let system = config
        .system
        .clone()
        .unwrap_or_else(|| profile.instructions().to_string());
    let session = AgentSession::new(backend, registry)
        .with_system(system)
        .with_max_tool_rounds(config.max_tool_rounds);
    Ok((config, session))
}

/// Forward Ctrl+C presses into a channel.
fn interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

fn finish(session: AgentSession<HttpBackend>, exit: Exit) -> Result<()> {
    let usage = session.usage();
    session.end();
    if exit == Exit::SessionClosed {
        eprintln!("Session closed by the agent runtime.");
    }
    println!("Goodbye! ({} tokens used)", usage.total_tokens());
    io::stdout().flush()?;
    Ok(())
}

async fn cmd_chat(config_path: Option<PathBuf>, profile: Profile) -> Result<()> {
    let (config, mut session) = open_session(config_path, profile)?;

    println!("concierge v{}", env!("CARGO_PKG_VERSION"));
    println!("Session ID: {}", session.id);
    println!("Endpoint: {}", config.endpoint);
    println!("Model: {}", config.model);
    let tools: Vec<_> = session.registry().descriptors().map(|d| d.name()).collect();
    println!("Agent: {profile} ({})", tools.join(", "));
    println!(
        "Type {} or Ctrl+D to exit. Ctrl+C cancels a reply.\n",
        repl::EXIT_KEYWORDS.join(", ")
    );

    let mut interrupts = interrupts();
    let input = BufReader::new(tokio::io::stdin());
    let exit = repl::run(&mut session, input, &mut io::stdout(), &mut interrupts).await?;
    finish(session, exit)
}

async fn cmd_ask(
    config_path: Option<PathBuf>,
    profile: Profile,
    queries: Vec<String>,
) -> Result<()> {
    let (_, mut session) = open_session(config_path, profile)?;
    let queries = if queries.is_empty() {
        repl::DEMO_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        queries
    };

    let mut interrupts = interrupts();
    let exit = repl::ask(&mut session, &queries[..], &mut io::stdout(), &mut interrupts).await?;
    finish(session, exit)
}

fn cmd_tools(profile: Profile) -> Result<()> {
    let registry = profile.registry()?;
    println!("{profile}: {} tools\n", registry.len());
    for descriptor in registry.descriptors() {
        println!("{}", descriptor.render_doc());
    }
    Ok(())
}

async fn cmd_call(tool: &str, args: &str) -> Result<()> {
    let registry = Profile::All.registry()?;
    let arguments: serde_json::Value = serde_json::from_str(args)?;
    let result = registry
        .dispatch(&InvocationRequest::new(tool, arguments))
        .await;
    if result.is_failure() {
        return Err(Error::Invocation(result));
    }
    println!("{result}");
    Ok(())
}
