//! The cluster coordinator: network front-end around a [`ClusterEngine`].
//!
//! Structurally this mirrors [`crate::room_server`] — an accept loop plus
//! per-connection reader/writer tasks funneling into one central loop —
//! but the command handlers are async: `get_room_server` may need to bind
//! a fresh [`crate::room_server::RoomListener`] and `shutdown_room` awaits
//! a spawned room's `JoinHandle`. Room `JoinHandle`s live in this loop's
//! own state, not in [`ClusterEngine`], which stays pure bookkeeping —
//! one room server per `tokio::spawn`, tracked in a `HashMap` this task
//! alone owns.

use std::collections::HashMap;
use std::net::SocketAddr;

use gridkeep_protocol::{CatalogBeacon, ClientId, Codec, JsonCodec, Request, Response, RoomId};
use gridkeep_room::{ClusterEngine, RoomError, RoomLookup};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{ClusterConfig, RoomConfig};
use crate::GridkeepError;

pub struct ClusterListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ClusterListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

pub async fn bind(bind_addr: &str) -> Result<ClusterListener, GridkeepError> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    Ok(ClusterListener { listener, local_addr })
}

enum ClusterEvent {
    Request { payload: Vec<u8>, reply_tx: oneshot::Sender<Vec<u8>> },
}

/// Runs the cluster coordinator to completion (in practice: forever, until
/// the process is killed — idle shutdown is a room-only concept, and the
/// cluster deliberately has no idle-shutdown path of its own).
pub async fn run(listener: ClusterListener, config: ClusterConfig) -> Result<(), GridkeepError> {
    let self_addr = listener.local_addr.to_string();
    info!(addr = %self_addr, "cluster listening");

    let mut engine = ClusterEngine::new();
    let mut room_handles: HashMap<RoomId, JoinHandle<()>> = HashMap::new();
    let (event_tx, mut event_rx) = mpsc::channel::<ClusterEvent>(256);

    if config.beacon_interval.is_some() {
        send_catalog_beacon(&config, listener.local_addr.port()).await;
    }
    let mut beacon_ticker = config.beacon_interval.map(|b| tokio::time::interval(b.duration()));

    loop {
        tokio::select! {
            accepted = listener.listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        tokio::spawn(handle_connection(stream, event_tx.clone()));
                    }
                    Err(e) => warn!(error = %e, "cluster accept failed"),
                }
            }
            Some(event) = event_rx.recv() => {
                match event {
                    ClusterEvent::Request { payload, reply_tx } => {
                        let response_bytes = handle_payload(&mut engine, &mut room_handles, &config, &self_addr, &payload).await;
                        let _ = reply_tx.send(response_bytes);
                    }
                }
            }
            _ = tick_beacon(&mut beacon_ticker) => {
                send_catalog_beacon(&config, listener.local_addr.port()).await;
            }
        }
    }
}

async fn tick_beacon(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn send_catalog_beacon(config: &ClusterConfig, port: u16) {
    let beacon = CatalogBeacon {
        kind: "game_server".to_string(),
        owner: config.owner.clone(),
        port,
        project: config.project_name.clone(),
    };
    crate::catalog::send_registration(&config.catalog_addr, &beacon).await;
}

async fn handle_payload(
    engine: &mut ClusterEngine,
    room_handles: &mut HashMap<RoomId, JoinHandle<()>>,
    config: &ClusterConfig,
    self_addr: &str,
    payload: &[u8],
) -> Vec<u8> {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(v) => v,
        Err(_) => return encode(&Response::error("must be formatted as json")),
    };
    let request: Request = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(_) => return encode(&Response::error("malformed incoming command")),
    };

    if !gridkeep_room::is_known_cluster_method(&request.method) {
        return encode(&Response::error(format!(
            "method {} does not exist for engine: Cluster",
            request.method
        )));
    }

    let response = match request.method.as_str() {
        "register_new_client" => engine.register_new_client(request.client.clone()),
        "get_room_server" => handle_get_room_server(engine, room_handles, config, self_addr, &request.client).await,
        "shutdown_room" => handle_shutdown_room(engine, room_handles, &request.client).await,
        _ => unreachable!("validated by is_known_cluster_method"),
    };

    encode(&response)
}

/// `get_room_server`/`shutdown_room` receive the room id through the
/// wire's `client` field rather than a dedicated field — both methods
/// overload that field to carry a room id instead of a client id.
fn parse_room_id(client: &ClientId) -> Option<RoomId> {
    client.as_str().parse::<u64>().ok().map(RoomId)
}

async fn handle_get_room_server(
    engine: &mut ClusterEngine,
    room_handles: &mut HashMap<RoomId, JoinHandle<()>>,
    config: &ClusterConfig,
    self_addr: &str,
    client: &ClientId,
) -> Response {
    let Some(room_id) = parse_room_id(client) else {
        return Response::error("malformed room id");
    };

    match engine.get_room_server(room_id) {
        RoomLookup::Existing(response) => response,
        RoomLookup::NeedsSpawn => match spawn_room(room_id, config, self_addr).await {
            Ok((addr, handle)) => {
                room_handles.insert(room_id, handle);
                engine.bind_room(room_id, addr)
            }
            Err(e) => {
                warn!(%room_id, error = %e, "failed to spawn room");
                Response::error(e.to_string())
            }
        },
    }
}

async fn handle_shutdown_room(
    engine: &mut ClusterEngine,
    room_handles: &mut HashMap<RoomId, JoinHandle<()>>,
    client: &ClientId,
) -> Response {
    let Some(room_id) = parse_room_id(client) else {
        return Response::error("malformed room id");
    };

    info!(%room_id, "starting removal process for room");
    let Some(handle) = room_handles.remove(&room_id) else {
        return Response::error(RoomError::NotFound(room_id).to_string());
    };

    if !handle.is_finished() {
        warn!(%room_id, "room reported shutdown but its task has not finished yet");
    }
    if let Err(e) = handle.await {
        warn!(%room_id, error = %e, "room task ended abnormally");
    }
    engine.remove_room(room_id)
}

async fn spawn_room(
    room_id: RoomId,
    config: &ClusterConfig,
    self_addr: &str,
) -> Result<(String, JoinHandle<()>), RoomError> {
    let room_config = RoomConfig {
        bind_addr: "0.0.0.0:0".to_string(),
        id: room_id,
        log_path: format!("game{room_id}.log").into(),
        ckpt_path: format!("game{room_id}.ckpt").into(),
        nameserver_addr: self_addr.to_string(),
        broadcast_with_udp: config.broadcast_with_udp,
        shutdown_timeout: gridkeep_tick::DEFAULT_SHUTDOWN_TIMEOUT,
    };

    let listener = crate::room_server::bind(&room_config.bind_addr)
        .await
        .map_err(|e| RoomError::SpawnFailed(room_id, e.to_string()))?;
    let addr = listener.local_addr().to_string();
    info!(%room_id, addr, "spawning room server");
    let handle = tokio::spawn(async move {
        if let Err(e) = crate::room_server::run(listener, room_config).await {
            tracing::error!(%room_id, error = %e, "room server exited with an error");
        }
    });
    Ok((addr, handle))
}

async fn handle_connection(mut stream: TcpStream, event_tx: mpsc::Sender<ClusterEvent>) {
    loop {
        match gridkeep_transport::read_message(&mut stream, gridkeep_transport::DEFAULT_RECEIVE_TIMEOUT).await {
            Ok(Some(payload)) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if event_tx.send(ClusterEvent::Request { payload, reply_tx }).await.is_err() {
                    break;
                }
                match reply_rx.await {
                    Ok(bytes) => {
                        if gridkeep_transport::write_message(&mut stream, &bytes).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read from client");
                break;
            }
        }
    }
}

fn encode(response: &Response) -> Vec<u8> {
    JsonCodec
        .encode(response)
        .unwrap_or_else(|_| br#"{"error":"failed to encode response"}"#.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkeep_protocol::{ClientId as Cid, RoomId as Rid};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn spawn_cluster() -> (SocketAddr, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = ClusterConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            catalog_addr: "127.0.0.1:1".to_string(),
            project_name: "test".to_string(),
            owner: "me".to_string(),
            beacon_interval: None,
            broadcast_with_udp: false,
        };
        let listener = bind(&config.bind_addr).await.unwrap();
        let addr = listener.local_addr();
        tokio::spawn(run(listener, config));
        std::env::set_current_dir(original).unwrap();
        (addr, dir)
    }

    #[tokio::test]
    async fn register_new_client_starts_at_room_zero() {
        let (addr, _dir) = spawn_cluster().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let req = Request::new("register_new_client", Cid::from("a"));
        gridkeep_transport::write_message(&mut stream, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = gridkeep_transport::read_message(&mut stream, Duration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        assert_eq!(resp, Response::ClientRegistered { client_id: Cid::from("a"), last_room: Rid(0) });
    }

    #[tokio::test]
    async fn get_room_server_lazily_spawns_and_returns_an_address() {
        let (addr, dir) = spawn_cluster().await;
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let req = Request::new("get_room_server", Cid::from("3"));
        gridkeep_transport::write_message(&mut stream, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = gridkeep_transport::read_message(&mut stream, Duration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        match resp {
            Response::RoomServer { addr } => assert!(addr.contains(':')),
            other => panic!("expected a room server address, got {other:?}"),
        }

        std::env::set_current_dir(original).unwrap();
    }

    #[tokio::test]
    async fn unknown_cluster_method_is_an_error() {
        let (addr, _dir) = spawn_cluster().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let req = Request::new("teleport_room", Cid::from("3"));
        gridkeep_transport::write_message(&mut stream, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = gridkeep_transport::read_message(&mut stream, Duration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        assert!(resp.is_error());
    }
}
