//! MyDas CLI - DAS annotation server entrypoint

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{CheckCommand, ServeCommand};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MYDAS_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "MYDAS_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the DAS HTTP server
    Serve(ServeCommand),
    /// Validate a configuration and load its data sources
    Check(CheckCommand),
}

/// Log filter from `RUST_LOG` when set, otherwise `level` for the mydas crates
fn log_filter(rust_log: Option<String>, level: &str) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = rust_log {
        return EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid RUST_LOG environment variable: {}", directives));
    }

    Ok(EnvFilter::new(format!(
        "mydas={level},\
         mydas_cli={level},\
         mydas_core={level},\
         mydas_query={level},\
         mydas_memory={level},\
         mydas_commands={level},\
         mydas_server={level},\
         tower_http={level},\
         h2=warn,\
         tower=warn,\
         hyper=warn"
    )))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = log_filter(std::env::var("RUST_LOG").ok(), &cli.log_level)?;

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
        Commands::Check(check_cmd) => check_cmd.execute(),
    }
}
