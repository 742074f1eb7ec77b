use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use linescout::config::CliOverrides;
use linescout::{EncodingMode, SearchConfig, SearchEngine, SearchOutput, SearchQuery};
use linescout_cli::http::{self, ServerConfig, DEFAULT_BIND, DEFAULT_REQUEST_TIMEOUT};
use linescout_cli::{logging, McpServer};
use std::io::IsTerminal;
use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'j', long, global = true)]
    threads: Option<NonZeroUsize>,

    /// File extensions to include (e.g. go,rs)
    #[arg(short = 'e', long = "ext", global = true)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format)
    #[arg(short, long, global = true)]
    ignore: Vec<String>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, global = true)]
    encoding: Option<EncodingMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CliSearchArgs {
    /// Regular expression to search for
    #[arg(short = 'p', long)]
    pattern: String,

    /// Files or directories to search
    #[arg(default_value = ".")]
    paths: Vec<String>,

    /// Maximum number of matches (0 uses the configured default)
    #[arg(short = 'm', long, default_value_t = 0, allow_negative_numbers = true)]
    max_results: i64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search files for lines matching a pattern
    Search(CliSearchArgs),

    /// Serve the HTTP API
    Http {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,

        /// Port to listen on (overrides the port in --bind)
        #[arg(long)]
        port: Option<u16>,

        /// Cancel searches running longer than this (e.g. 30s, 2m)
        #[arg(long, default_value = DEFAULT_REQUEST_TIMEOUT)]
        timeout: String,
    },

    /// Serve the search tool over stdio (JSON-RPC)
    Mcp {
        /// Cancel searches running longer than this (e.g. 30s, 2m)
        #[arg(long, default_value = DEFAULT_REQUEST_TIMEOUT)]
        timeout: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_extensions = cli.extensions.as_ref().map(|e| {
        e.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    let config = SearchConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(CliOverrides {
            thread_count: cli.threads,
            file_extensions,
            ignore_patterns: cli.ignore,
            encoding_mode: cli.encoding,
            log_level: cli.log_level,
        });

    // stdout carries the protocol in MCP mode; keep stderr free of color codes there
    let ansi = !matches!(cli.command, Commands::Mcp { .. }) && std::io::stderr().is_terminal();
    logging::init(&config.log_level, ansi);

    let engine = Arc::new(SearchEngine::new(config)?);

    match cli.command {
        Commands::Search(args) => run_search(&engine, args),
        Commands::Http {
            bind,
            port,
            timeout,
        } => {
            let mut server = ServerConfig::parse(&bind, &timeout)?;
            if let Some(port) = port {
                server.bind.set_port(port);
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(http::serve(server, engine))?;
            Ok(())
        }
        Commands::Mcp { timeout } => {
            let timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("invalid timeout '{timeout}'"))?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(McpServer::new(engine, timeout).run())?;
            Ok(())
        }
    }
}

fn run_search(engine: &SearchEngine, args: CliSearchArgs) -> Result<()> {
    let query = SearchQuery::new(args.pattern, args.paths, args.max_results);
    let output = engine.search_uncancellable(&query)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_search_results(&output);
    }
    Ok(())
}

fn print_search_results(output: &SearchOutput) {
    let mut current_file: Option<&str> = None;

    for m in &output.matches {
        if current_file != Some(m.file.as_str()) {
            println!("\n{}", m.file.blue());
            current_file = Some(m.file.as_str());
        }
        println!("{}: {}", m.line.to_string().green(), m.content);
    }

    println!("\nFound {} matches", output.total);
}
