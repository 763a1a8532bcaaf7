use broadcast_node::broadcast::service::serve;
use broadcast_node::config::NodeConfig;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::from_env()?;

    // stdout carries protocol traffic, so logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(
        "Starting broadcast node (rpc timeout {:?}, retry backoff {:?}, drain timeout {:?})",
        config.rpc_timeout,
        config.retry_backoff,
        config.drain_timeout
    );

    // 1. Serve until the harness closes stdin, 2. drain pending gossip, 3. exit.
    serve(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    Ok(())
}
