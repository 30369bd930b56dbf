//! The room server: network front-end around one [`RoomEngine`].
//!
//! Every accepted connection gets its own reader/writer task, but those
//! tasks only ever *forward* framed payloads to one central loop over an
//! `mpsc` channel and wait for a reply on a `oneshot` — the engine itself
//! is touched from that one loop alone, so the engine's "not reentrant"
//! contract holds even with one task per connection funneling messages
//! into a single room task.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use gridkeep_durability::Durability;
use gridkeep_protocol::{ClientId, Codec, JsonCodec, Position, Request, Response, RoomId};
use gridkeep_room::RoomEngine;
use gridkeep_tick::{IdleTracker, POLL_INTERVAL};
use gridkeep_transport::{read_message, write_message, DEFAULT_RECEIVE_TIMEOUT};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::RoomConfig;
use crate::GridkeepError;

/// A bound-but-not-yet-running room listener. Splitting bind from run lets
/// the cluster learn a freshly spawned room's address — the room is bound
/// to a port before its long-lived loop actually starts.
pub struct RoomListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl RoomListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

pub async fn bind(bind_addr: &str) -> Result<RoomListener, GridkeepError> {
    let listener = TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    Ok(RoomListener { listener, local_addr })
}

enum RoomEvent {
    Request { conn_id: u64, payload: Vec<u8>, reply_tx: oneshot::Sender<Vec<u8>> },
    Disconnected { conn_id: u64 },
}

/// Runs one room's life cycle to completion: loads durable state, accepts
/// connections, dispatches commands, broadcasts snapshots, and shuts
/// itself down on idle.
pub async fn run(listener: RoomListener, config: RoomConfig) -> Result<(), GridkeepError> {
    let mut durability = Durability::open(&config.log_path, &config.ckpt_path)?;
    let mut rng = StdRng::from_os_rng();
    let mut engine = RoomEngine::new(gridkeep_room::DIMENSION, &mut rng);

    if let Some(ckpt) = durability.load_checkpoint()? {
        info!(room_id = %config.id, "checkpoint found, overwriting the randomly generated room");
        engine.apply_checkpoint_items(&ckpt.items);
        engine.apply_checkpoint_clients(&ckpt.clients);
    }

    // Replay without re-logging, and without repopulating broadcast_addr
    // bindings, which would be stale after a restart (see DESIGN.md).
    let mut replay_errors = 0u64;
    durability.replay(|entry| {
        if let Some(request) = decode_logged_request(&entry) {
            apply_mutating(&mut engine, &mut rng, &request);
        } else {
            replay_errors += 1;
        }
    })?;
    if replay_errors > 0 {
        warn!(room_id = %config.id, replay_errors, "dropped malformed entries during replay");
    }

    info!(room_id = %config.id, addr = %listener.local_addr, "room server listening");

    let (event_tx, mut event_rx) = mpsc::channel::<RoomEvent>(256);
    let mut connections: HashMap<u64, Option<ClientId>> = HashMap::new();
    let mut broadcast_addrs: HashMap<ClientId, String> = HashMap::new();
    let mut idle = IdleTracker::new(config.shutdown_timeout);
    let mut errors = 0u64;
    let mut next_conn_id = 0u64;
    let mut frame = 0u64;
    let mut had_traffic_this_round = false;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            accepted = listener.listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        connections.insert(conn_id, None);
                        idle.mark_active();
                        tokio::spawn(handle_connection(stream, conn_id, event_tx.clone(), DEFAULT_RECEIVE_TIMEOUT));
                    }
                    Err(e) => warn!(room_id = %config.id, error = %e, "accept failed"),
                }
            }
            Some(event) = event_rx.recv() => {
                had_traffic_this_round = true;
                idle.mark_active();
                match event {
                    RoomEvent::Request { conn_id, payload, reply_tx } => {
                        let response_bytes = handle_payload(
                            &mut engine,
                            &mut durability,
                            &mut rng,
                            &mut connections,
                            &mut broadcast_addrs,
                            &mut errors,
                            conn_id,
                            &payload,
                        )?;
                        let _ = reply_tx.send(response_bytes);
                    }
                    RoomEvent::Disconnected { conn_id } => {
                        if let Some(Some(client_id)) = connections.remove(&conn_id) {
                            debug!(room_id = %config.id, %client_id, "client disconnected");
                            broadcast_addrs.remove(&client_id);
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                engine.clear_empty_markers();
                if config.broadcast_with_udp && had_traffic_this_round && !broadcast_addrs.is_empty() {
                    frame += 1;
                    broadcast_snapshot(&engine, &connections, &broadcast_addrs, frame, config.id).await;
                }
                had_traffic_this_round = false;

                if connections.is_empty() {
                    idle.mark_idle_round(tokio::time::Instant::now());
                } else {
                    idle.mark_active();
                }
                if idle.should_shut_down(tokio::time::Instant::now()) {
                    info!(room_id = %config.id, "idle timeout elapsed, shutting down");
                    break;
                }
            }
        }
    }

    send_shutdown_message(&config.nameserver_addr, config.id).await?;
    info!(room_id = %config.id, errors, "room server shut down");
    Ok(())
}

/// Parses a logged entry back into a `Request` for replay, rejecting
/// anything that wouldn't have passed the original malformed-request
/// checks (so a hand-edited log can't replay garbage).
fn decode_logged_request(entry: &serde_json::Value) -> Option<Request> {
    serde_json::from_value(entry.clone()).ok()
}

fn apply_mutating(engine: &mut RoomEngine, rng: &mut StdRng, request: &Request) {
    match request.method.as_str() {
        "add_client" => {
            engine.add_client(request.client.clone());
        }
        "up" => {
            engine.up(request.client.clone());
        }
        "down" => {
            engine.down(request.client.clone());
        }
        "left" => {
            engine.left(request.client.clone());
        }
        "right" => {
            engine.right(request.client.clone());
        }
        "interact" => {
            engine.interact(request.client.clone(), rng);
        }
        other => warn!(method = other, "unexpected method in replayed log entry"),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_payload(
    engine: &mut RoomEngine,
    durability: &mut Durability,
    rng: &mut StdRng,
    connections: &mut HashMap<u64, Option<ClientId>>,
    broadcast_addrs: &mut HashMap<ClientId, String>,
    errors: &mut u64,
    conn_id: u64,
    payload: &[u8],
) -> Result<Vec<u8>, GridkeepError> {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(v) => v,
        Err(_) => {
            *errors += 1;
            return encode(&Response::error("must be formatted as json"));
        }
    };
    let request: Request = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(_) => {
            *errors += 1;
            return encode(&Response::error("malformed incoming command"));
        }
    };

    if let Some(addr) = &request.broadcast_addr {
        broadcast_addrs.insert(request.client.clone(), addr.clone());
    }
    connections.insert(conn_id, Some(request.client.clone()));

    if !gridkeep_room::is_known_method(&request.method) {
        *errors += 1;
        return encode(&Response::error(format!(
            "method {} does not exist for engine: Game",
            request.method
        )));
    }

    let response = if request.method == "get_room" {
        let alive = alive_positions(engine, connections);
        engine.get_room(&alive)
    } else {
        match request.method.as_str() {
            "add_client" => engine.add_client(request.client.clone()),
            "up" => engine.up(request.client.clone()),
            "down" => engine.down(request.client.clone()),
            "left" => engine.left(request.client.clone()),
            "right" => engine.right(request.client.clone()),
            "interact" => engine.interact(request.client.clone(), rng),
            _ => unreachable!("validated by is_known_method"),
        }
    };

    if response.is_error() {
        *errors += 1;
    }

    // get_room is read-only and never logged.
    if request.method != "get_room" {
        let entry = serde_json::to_value(&request).map_err(gridkeep_protocol::ProtocolError::Encode)?;
        durability.append_and_maybe_checkpoint(
            &entry,
            || engine.checkpoint_items(),
            || engine.checkpoint_clients(),
        )?;
    }

    encode(&response)
}

fn alive_positions(
    engine: &RoomEngine,
    connections: &HashMap<u64, Option<ClientId>>,
) -> HashMap<ClientId, Position> {
    let live: std::collections::HashSet<&ClientId> = connections.values().flatten().collect();
    engine
        .client_positions()
        .iter()
        .filter(|(client, _)| live.contains(client))
        .map(|(client, pos)| (client.clone(), *pos))
        .collect()
}

async fn broadcast_snapshot(
    engine: &RoomEngine,
    connections: &HashMap<u64, Option<ClientId>>,
    broadcast_addrs: &HashMap<ClientId, String>,
    frame: u64,
    room_id: RoomId,
) {
    let alive = alive_positions(engine, connections);
    let snapshot = gridkeep_protocol::Snapshot {
        room: engine.merged_room_map(&alive),
        frame,
        room_id: room_id.0,
    };
    let payload = match JsonCodec.encode(&snapshot) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(room_id = %room_id, error = %e, "failed to encode snapshot");
            return;
        }
    };
    let socket = match tokio::net::UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(e) => {
            warn!(room_id = %room_id, error = %e, "failed to bind broadcast socket");
            return;
        }
    };
    for addr in broadcast_addrs.values() {
        if let Err(e) = gridkeep_transport::send_snapshot(&socket, addr, &payload).await {
            warn!(room_id = %room_id, addr, error = %e, "failed to send snapshot");
        }
    }
}

async fn send_shutdown_message(nameserver_addr: &str, room_id: RoomId) -> Result<(), GridkeepError> {
    info!(room_id = %room_id, nameserver_addr, "connecting to cluster to report shutdown");
    let mut stream = TcpStream::connect(nameserver_addr).await?;
    let request = Request::new("shutdown_room", ClientId::from(room_id.0));
    let payload = JsonCodec.encode(&request)?;
    write_message(&mut stream, &payload).await?;
    info!(room_id = %room_id, "shutdown message sent");
    Ok(())
}

async fn handle_connection(
    mut stream: TcpStream,
    conn_id: u64,
    event_tx: mpsc::Sender<RoomEvent>,
    receive_timeout: Duration,
) {
    loop {
        match read_message(&mut stream, receive_timeout).await {
            Ok(Some(payload)) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                if event_tx.send(RoomEvent::Request { conn_id, payload, reply_tx }).await.is_err() {
                    break;
                }
                match reply_rx.await {
                    Ok(bytes) => {
                        if write_message(&mut stream, &bytes).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            Ok(None) => {
                debug!(conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                warn!(conn_id, error = %e, "failed to read from client");
                break;
            }
        }
    }
    let _ = event_tx.send(RoomEvent::Disconnected { conn_id }).await;
}

fn encode(response: &Response) -> Result<Vec<u8>, GridkeepError> {
    Ok(JsonCodec.encode(response)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkeep_protocol::{ClientId as Cid, Request as Req};
    use std::time::Duration as StdDuration;

    fn test_config(dir: &std::path::Path) -> RoomConfig {
        RoomConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            id: RoomId(7),
            log_path: dir.join("game7.log"),
            ckpt_path: dir.join("game7.ckpt"),
            nameserver_addr: "127.0.0.1:1".to_string(), // unused in this test
            broadcast_with_udp: false,
            shutdown_timeout: StdDuration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn a_client_can_add_itself_and_walk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let listener = bind(&config.bind_addr).await.unwrap();
        let addr = listener.local_addr();
        let nameserver = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config;
        config.nameserver_addr = nameserver.local_addr().unwrap().to_string();

        let server = tokio::spawn(run(listener, config));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let req = Req::new("add_client", Cid::from("a"));
        write_message(&mut client, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = read_message(&mut client, StdDuration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        assert_eq!(resp, Response::ClientAdded { client_id: Cid::from("a"), pos: Position::new(4, 4) });

        let req = Req::new("up", Cid::from("a"));
        write_message(&mut client, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = read_message(&mut client, StdDuration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        assert_eq!(resp, Response::success("move up"));

        drop(client);
        server.abort();
    }

    #[tokio::test]
    async fn unknown_method_returns_an_error_without_crashing() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let listener = bind(&config.bind_addr).await.unwrap();
        let addr = listener.local_addr();
        let nameserver = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config;
        config.nameserver_addr = nameserver.local_addr().unwrap().to_string();
        let server = tokio::spawn(run(listener, config));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let req = Req::new("teleport", Cid::from("a"));
        write_message(&mut client, &JsonCodec.encode(&req).unwrap()).await.unwrap();
        let resp_bytes = read_message(&mut client, StdDuration::from_secs(1)).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&resp_bytes).unwrap();
        assert!(resp.is_error());

        drop(client);
        server.abort();
    }
}
