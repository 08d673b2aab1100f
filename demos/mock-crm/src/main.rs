//! Mock CRM backend for the lead activity stream.
//!
//! Serves seeded demo data for the `leadstream` CLI and client tests.
//!
//! Run:
//!   cargo run -p leadstream-mock-crm -- --port 8001 --name "Demo CRM"
//!
//! Then:
//!   curl localhost:8001/api/leads/lead-1/activity
//!   curl -H 'Authorization: Bearer u3' localhost:8001/api/leads/lead-2/activity
//!   curl -X POST localhost:8001/queue -H 'content-type: application/json' \
//!        -d '{"pending":3,"processing":1,"failed":0,"total":4}'

use leadstream_mock_crm::MockCrm;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("leadstream_mock_crm=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = parse_arg(&args, "--port").unwrap_or(8001);
    let name = parse_arg_string(&args, "--name").unwrap_or_else(|| "Mock CRM".to_string());

    tracing::info!("Starting '{}' on port {}", name, port);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    MockCrm::seeded(name).serve(listener).await?;
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<u16> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_arg_string(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
