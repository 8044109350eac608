use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crawler::{FormValues, RequestClient};

/// Send a GET or POST request and print the response body.
#[derive(Debug, Parser)]
#[command(name = "crawler", version)]
struct Cli {
    /// Base URL, e.g. https://www.baidu.com
    base_url: String,

    /// Path appended to the base URL
    #[arg(default_value = "")]
    path: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Form value as key=value, sent as the query (GET) or body (POST)
    #[arg(short, long = "data", value_name = "KEY=VALUE")]
    data: Vec<String>,

    /// Header sent with the request, as 'Name: value'
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    headers: Vec<String>,

    #[arg(long)]
    proxy: Option<String>,

    /// Request timeout in seconds, 0 for none
    #[arg(long, default_value_t = crawler::client::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Accept any server certificate
    #[arg(short = 'k', long, conflicts_with = "ca_cert")]
    insecure: bool,

    #[arg(long, requires_all = ["cert", "key"])]
    ca_cert: Option<PathBuf>,

    #[arg(long, requires = "ca_cert")]
    cert: Option<PathBuf>,

    #[arg(long, requires = "ca_cert")]
    key: Option<PathBuf>,

    /// Print the status code before the body
    #[arg(short, long)]
    include_status: bool,
}

fn initialize_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn parse_form(data: &[String]) -> Result<FormValues> {
    let mut form = FormValues::new();
    for pair in data {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid form value {:?}, expected KEY=VALUE", pair);
        };
        form.add(key, value);
    }
    Ok(form)
}

fn build_client(cli: &Cli) -> Result<RequestClient> {
    let mut client = RequestClient::new(&cli.base_url);
    client.set_timeout(cli.timeout);
    for header in &cli.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("invalid header {:?}, expected 'Name: value'", header);
        };
        client.add_header(name.trim(), value.trim())?;
    }
    if let (Some(ca_cert), Some(cert), Some(key)) = (&cli.ca_cert, &cli.cert, &cli.key) {
        client
            .set_certificate(ca_cert, cert, key)
            .context("failed to load certificates")?;
    } else if cli.insecure {
        client.skip_certificate_verification();
    }
    if let Some(proxy) = &cli.proxy {
        client.set_proxy(proxy);
    }
    Ok(client)
}

async fn run(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;
    let form = parse_form(&cli.data)?;
    let response = client.send(&cli.method, &cli.path, &form).await?;
    if cli.include_status {
        println!("{}", response.status);
    }
    println!("{}", response.body);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    initialize_tracing();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
