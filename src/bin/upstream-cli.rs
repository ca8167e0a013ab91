use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use dyn_upstream::operation::OpRequest;

#[derive(Parser)]
#[command(name = "upstream-cli")]
#[command(about = "Management CLI for dynamic upstream groups", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Bearer token, if the admin API requires one
    #[arg(short, long)]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status and region usage
    Status,
    /// List servers of an upstream (every upstream as JSON when omitted)
    List {
        upstream: Option<String>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Add a server to an upstream
    Add {
        upstream: String,
        server: String,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Remove a server from an upstream
    Remove { upstream: String, server: String },
    /// Change parameters of a server
    Update {
        upstream: String,
        server: String,
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Args)]
struct ParamArgs {
    #[arg(long)]
    weight: Option<u32>,
    #[arg(long)]
    max_fails: Option<u32>,
    #[arg(long)]
    fail_timeout: Option<u32>,
    #[arg(long, conflicts_with = "down")]
    up: bool,
    #[arg(long)]
    down: bool,
}

impl ParamArgs {
    fn apply(&self, mut request: OpRequest) -> OpRequest {
        if let Some(weight) = self.weight {
            request = request.weight(weight);
        }
        if let Some(max_fails) = self.max_fails {
            request = request.max_fails(max_fails);
        }
        if let Some(fail_timeout) = self.fail_timeout {
            request = request.fail_timeout(fail_timeout);
        }
        if self.up {
            request = request.flag_up();
        }
        if self.down {
            request = request.flag_down();
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))?,
        );
    }

    let request = match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            return print_json(res).await;
        }
        Commands::List { upstream: None, .. } => {
            let res = client.get(format!("{}/admin/upstreams", cli.url))
                .headers(headers)
                .send()
                .await?;
            return print_json(res).await;
        }
        Commands::List { upstream: Some(upstream), verbose } => {
            let request = OpRequest::new(upstream);
            if verbose { request.flag_verbose() } else { request }
        }
        Commands::Add { upstream, server, params } => {
            params.apply(OpRequest::new(upstream).server(server).flag_add())
        }
        Commands::Remove { upstream, server } => {
            OpRequest::new(upstream).server(server).flag_remove()
        }
        Commands::Update { upstream, server, params } => {
            params.apply(OpRequest::new(upstream).server(server))
        }
    };

    let res = client.get(format!("{}/dynamic", cli.url))
        .headers(headers)
        .query(&request)
        .send()
        .await?;
    print_text(res).await
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        eprint!("{}", text);
        std::process::exit(1);
    }
    print!("{}", text);
    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
