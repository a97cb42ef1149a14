mod client;
mod output;
mod query_server;
mod telemetry;

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fnlog_core::config::Config;
use fnlog_core::query::ListParams;
use fnlog_ingest::pipeline::Pipeline;
use fnlog_store::Store;
use serde::Serialize;

use crate::client::QueryClient;
use crate::output::{print_entry_human, print_logs_human, print_stats_human};
use crate::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "fnlog")]
#[command(about = "Collect and query function-execution logs sent over OTLP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Query server address (host:port)")]
    addr: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run OTLP ingest and query servers")]
    Run {
        #[arg(long)]
        otlp_grpc_addr: Option<String>,
        #[arg(long)]
        otlp_http_addr: Option<String>,
        #[arg(long)]
        query_http_addr: Option<String>,
        #[arg(long, help = "Maximum number of stored log entries")]
        capacity: Option<usize>,
    },
    #[command(about = "List stored logs, newest first")]
    Logs {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        function: Option<String>,
        #[arg(long)]
        preview: bool,
    },
    #[command(about = "Show one log entry by id")]
    Get { id: String },
    #[command(about = "Show store statistics")]
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            otlp_grpc_addr,
            otlp_http_addr,
            query_http_addr,
            capacity,
        } => {
            init_tracing(None);
            let mut cfg = Config::load().context("load config")?;
            if let Some(v) = otlp_grpc_addr {
                cfg.otlp_grpc_addr = v;
            }
            if let Some(v) = otlp_http_addr {
                cfg.otlp_http_addr = v;
            }
            if let Some(v) = query_http_addr {
                cfg.query_http_addr = v;
            }
            if let Some(v) = capacity {
                cfg.store_capacity = v;
            }
            cfg.validate()?;
            run_server(cfg).await
        }
        Commands::Logs {
            limit,
            function,
            preview,
        } => {
            init_tracing(Some("warn"));
            let client = QueryClient::new(cli.addr);
            let params = ListParams {
                limit,
                function_name: function,
                preview,
            };
            let logs = client.list(&params).await?;
            print_or_json(&logs, cli.json, print_logs_human)
        }
        Commands::Get { id } => {
            init_tracing(Some("warn"));
            let entry = QueryClient::new(cli.addr).get(&id).await?;
            print_or_json(&entry, cli.json, print_entry_human)
        }
        Commands::Stats => {
            init_tracing(Some("warn"));
            let stats = QueryClient::new(cli.addr).stats().await?;
            print_or_json(&stats, cli.json, print_stats_human)
        }
    }
}

async fn run_server(cfg: Config) -> anyhow::Result<()> {
    let grpc_addr: SocketAddr = parse_addr(&cfg.otlp_grpc_addr, "otlp gRPC")?;
    let http_addr: SocketAddr = parse_addr(&cfg.otlp_http_addr, "otlp HTTP")?;
    let query_addr: SocketAddr = parse_addr(&cfg.query_http_addr, "query HTTP")?;

    let store = Store::new(cfg.store_capacity)?;

    eprintln!("fnlog run");
    eprintln!("  capacity: {}", cfg.store_capacity);
    eprintln!("  ingest grpc: {}", cfg.otlp_grpc_addr);
    eprintln!("  ingest http: {}", cfg.otlp_http_addr);
    eprintln!("  query http: {}", cfg.query_http_addr);

    let pipeline = Pipeline::new(store.clone()).with_max_request_bytes(cfg.max_request_bytes);
    let ingest_task = tokio::spawn(fnlog_ingest::server::run_ingest_servers(
        pipeline, grpc_addr, http_addr,
    ));
    let query_task = tokio::spawn(query_server::run_query_http_server(
        store,
        query_addr,
        cfg.default_query_limit,
    ));

    tokio::select! {
        res = ingest_task => {
            res??;
        }
        res = query_task => {
            res??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }
    Ok(())
}

fn parse_addr(raw: &str, what: &str) -> anyhow::Result<SocketAddr> {
    raw.parse()
        .with_context(|| format!("invalid {what} address {raw:?}"))
}

fn print_or_json<T: Serialize>(value: &T, json: bool, human: fn(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}
