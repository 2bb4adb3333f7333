use clap::{Parser, Subcommand};
use saas_nodes::app::App;
use saas_nodes::mcp::server::McpServer;
use saas_nodes::services::credentials::Provider;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "saas-nodes")]
#[command(version, about = "Postiz and Growchief nodes over JSON-RPC stdio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve both nodes over stdio (default)
    Serve,

    /// Test the configured credentials of one provider
    Check {
        /// postiz or growchief
        provider: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app = match App::initialize() {
        Ok(app) => Arc::new(app),
        Err(err) => {
            eprintln!("saas-nodes: {}", err);
            process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(err) = McpServer::new(app).run_stdio().await {
                eprintln!("saas-nodes: {}", err);
                process::exit(1);
            }
        }
        Commands::Check { provider } => {
            let Some(provider) = Provider::by_name(&provider) else {
                eprintln!("saas-nodes: unknown provider '{}' (use postiz or growchief)", provider);
                process::exit(2);
            };
            let result = app.gateway_for(&provider).test_credentials().await;
            if result.ok {
                println!("{}: {}", provider.node, result.message);
            } else {
                eprintln!("{}: {}", provider.node, result.message);
                process::exit(1);
            }
        }
    }
}
