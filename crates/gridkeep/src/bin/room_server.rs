//! Standalone room server binary.
//!
//! Normally a room is spawned by the cluster via [`gridkeep::cluster_server`],
//! but this binary exposes the same entry point directly for local
//! testing.

use gridkeep::config::RoomConfig;
use gridkeep::room_server;

#[tokio::main]
async fn main() -> Result<(), gridkeep::GridkeepError> {
    tracing_subscriber::fmt::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let project_name = if args.first().is_some_and(|a| !a.starts_with("--")) {
        args.remove(0)
    } else {
        "gridkeep".to_string()
    };
    let config = RoomConfig::from_args(project_name, &args);

    let listener = room_server::bind(&config.bind_addr).await?;
    room_server::run(listener, config).await
}
