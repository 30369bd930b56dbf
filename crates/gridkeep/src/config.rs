//! Process configuration for the two gridkeep binaries.
//!
//! These structs carry just enough to bind a listener, name a project,
//! and point a room at its cluster. `from_args` is a deliberately small
//! hand-rolled parser over `--flag value` pairs, not a full CLI argument
//! parser — a terminal UI's flags (`--gui`, curses) have no counterpart
//! here.

use std::path::PathBuf;
use std::time::Duration;

use gridkeep_protocol::RoomId;
use gridkeep_tick::{BeaconInterval, DEFAULT_SHUTDOWN_TIMEOUT};

/// Configuration for one room server process or a cluster-spawned room.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Address to bind the room's stream listener to, e.g. `"0.0.0.0:0"`
    /// for an ephemeral port.
    pub bind_addr: String,
    /// This room's id; determines the default log/checkpoint file names
    /// and is the value reported back to the cluster in `shutdown_room`.
    pub id: RoomId,
    pub log_path: PathBuf,
    pub ckpt_path: PathBuf,
    /// Address of the cluster coordinator this room reports to when it
    /// shuts itself down.
    pub nameserver_addr: String,
    /// Whether to broadcast per-round UDP snapshots to registered
    /// `broadcast_addr`s.
    pub broadcast_with_udp: bool,
    /// Grace period between idle-eligibility and actual shutdown
    /// (default 5s).
    pub shutdown_timeout: Duration,
}

impl RoomConfig {
    /// Configuration for a standalone room server (a testing-only CLI),
    /// not one spawned by a cluster.
    pub fn standalone(project_name: String, port: u16) -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            id: RoomId(0),
            log_path: PathBuf::from("game.log"),
            ckpt_path: PathBuf::from("game.ckpt"),
            nameserver_addr: "catalog.cse.nd.edu:9097".to_string(),
            broadcast_with_udp: false,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
        .named(project_name)
    }

    fn named(self, _project_name: String) -> Self {
        // project_name only matters for the catalog beacon, which room
        // servers never send (their beacon interval is always negative,
        // which disables registration).
        self
    }

    /// Minimal `--flag value` parser for the `gridkeep-room-server` binary.
    pub fn from_args(project_name: String, args: &[String]) -> Self {
        let mut config = Self::standalone(project_name, 0);
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.bind_addr = format!("0.0.0.0:{v}");
                    }
                    i += 2;
                }
                "--id" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.id = RoomId(v);
                        config.log_path = PathBuf::from(format!("game{v}.log"));
                        config.ckpt_path = PathBuf::from(format!("game{v}.ckpt"));
                    }
                    i += 2;
                }
                "--nameserver" => {
                    if let Some(v) = args.get(i + 1) {
                        config.nameserver_addr = v.clone();
                    }
                    i += 2;
                }
                "--use_udp" => {
                    config.broadcast_with_udp = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        config
    }
}

/// Configuration for the cluster coordinator process.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub bind_addr: String,
    /// Address of the external catalog to register with.
    pub catalog_addr: String,
    pub project_name: String,
    pub owner: String,
    /// `None` disables catalog registration entirely.
    pub beacon_interval: Option<BeaconInterval>,
    /// Whether spawned rooms broadcast UDP snapshots.
    pub broadcast_with_udp: bool,
}

impl ClusterConfig {
    pub fn new(project_name: String, port: u16) -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{port}"),
            catalog_addr: "catalog.cse.nd.edu:9097".to_string(),
            project_name,
            owner: "me".to_string(),
            beacon_interval: BeaconInterval::from_secs(600),
            broadcast_with_udp: false,
        }
    }

    /// Minimal `--flag value` parser for the `gridkeep-cluster` binary.
    pub fn from_args(project_name: String, args: &[String]) -> Self {
        let mut config = Self::new(project_name, 0);
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--port" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.bind_addr = format!("0.0.0.0:{v}");
                    }
                    i += 2;
                }
                "--nameserver" => {
                    if let Some(v) = args.get(i + 1) {
                        config.catalog_addr = v.clone();
                    }
                    i += 2;
                }
                "--owner" => {
                    if let Some(v) = args.get(i + 1) {
                        config.owner = v.clone();
                    }
                    i += 2;
                }
                "--broadcast_interval" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.beacon_interval = BeaconInterval::from_secs(v);
                    }
                    i += 2;
                }
                "--use_udp" => {
                    config.broadcast_with_udp = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        config
    }
}
