//! Cluster coordinator binary.
//!
//! Binds a listener, optionally registers with an external catalog, and
//! accepts clients forever.

use gridkeep::cluster_server;
use gridkeep::config::ClusterConfig;

#[tokio::main]
async fn main() -> Result<(), gridkeep::GridkeepError> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let project_name = if args.first().is_some_and(|a| !a.starts_with("--")) {
        args.remove(0)
    } else {
        "gridkeep".to_string()
    };
    let config = ClusterConfig::from_args(project_name, &args);

    let listener = cluster_server::bind(&config.bind_addr).await?;
    cluster_server::run(listener, config).await
}
