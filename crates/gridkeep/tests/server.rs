//! End-to-end tests driving the room server and cluster coordinator over
//! real TCP/UDP sockets.

use std::path::Path;
use std::time::Duration;

use gridkeep::config::{ClusterConfig, RoomConfig};
use gridkeep::{cluster_server, room_server};
use gridkeep_protocol::{ClientId, Codec, JsonCodec, Position, Request, Response, RoomId};
use gridkeep_transport::{read_message, write_message};
use tokio::net::{TcpListener, TcpStream};

async fn send_recv(stream: &mut TcpStream, req: &Request) -> Response {
    let bytes = JsonCodec.encode(req).unwrap();
    write_message(stream, &bytes).await.unwrap();
    let reply = read_message(stream, Duration::from_secs(2)).await.unwrap().unwrap();
    serde_json::from_slice(&reply).unwrap()
}

fn room_config(dir: &Path, id: u64, nameserver: String) -> RoomConfig {
    RoomConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        id: RoomId(id),
        log_path: dir.join(format!("game{id}.log")),
        ckpt_path: dir.join(format!("game{id}.ckpt")),
        nameserver_addr: nameserver,
        broadcast_with_udp: false,
        shutdown_timeout: Duration::from_millis(100),
    }
}

/// Scenario: a single client adds itself, walks in one direction, and
/// interacts — the idle room keeps serving it round after round.
#[tokio::test]
async fn single_client_walks_and_interacts() {
    let dir = tempfile::tempdir().unwrap();
    let sink = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sink_addr = sink.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = sink.accept().await;
    });

    let config = room_config(dir.path(), 1, sink_addr);
    let listener = room_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    let server = tokio::spawn(room_server::run(listener, config));

    let mut client = TcpStream::connect(addr).await.unwrap();
    let resp = send_recv(&mut client, &Request::new("add_client", ClientId::from("alice"))).await;
    assert_eq!(resp, Response::ClientAdded { client_id: ClientId::from("alice"), pos: Position::new(4, 4) });

    let resp = send_recv(&mut client, &Request::new("right", ClientId::from("alice"))).await;
    assert!(matches!(resp, Response::Success { .. }) || resp.is_error());

    let resp = send_recv(&mut client, &Request::new("interact", ClientId::from("alice"))).await;
    assert!(matches!(resp, Response::Interact { .. }));

    drop(client);
    server.abort();
}

/// Scenario: the cluster respawns the same room on a second request rather
/// than double-spawning it, and routes two different clients into their
/// own rooms independently.
#[tokio::test]
async fn cluster_reuses_an_already_spawned_room() {
    let dir = tempfile::tempdir().unwrap();
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let config = ClusterConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        catalog_addr: "127.0.0.1:1".to_string(),
        project_name: "gridkeep".to_string(),
        owner: "me".to_string(),
        beacon_interval: None,
        broadcast_with_udp: false,
    };
    let listener = cluster_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    tokio::spawn(cluster_server::run(listener, config));

    let mut client = TcpStream::connect(addr).await.unwrap();
    let resp = send_recv(&mut client, &Request::new("get_room_server", ClientId::from(5u64))).await;
    let first_addr = match resp {
        Response::RoomServer { addr } => addr,
        other => panic!("expected a room server address, got {other:?}"),
    };

    let resp = send_recv(&mut client, &Request::new("get_room_server", ClientId::from(5u64))).await;
    let second_addr = match resp {
        Response::RoomServer { addr } => addr,
        other => panic!("expected a room server address, got {other:?}"),
    };
    assert_eq!(first_addr, second_addr);

    std::env::set_current_dir(original).unwrap();
}

/// Scenario: registering a brand new client always starts it in room 0,
/// and registering again returns the same room rather than resetting it.
#[tokio::test]
async fn register_new_client_is_idempotent_over_the_wire() {
    let dir = tempfile::tempdir().unwrap();
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let config = ClusterConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        catalog_addr: "127.0.0.1:1".to_string(),
        project_name: "gridkeep".to_string(),
        owner: "me".to_string(),
        beacon_interval: None,
        broadcast_with_udp: false,
    };
    let listener = cluster_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    tokio::spawn(cluster_server::run(listener, config));

    let mut client = TcpStream::connect(addr).await.unwrap();
    let resp1 = send_recv(&mut client, &Request::new("register_new_client", ClientId::from("bob"))).await;
    let resp2 = send_recv(&mut client, &Request::new("register_new_client", ClientId::from("bob"))).await;
    assert_eq!(resp1, resp2);
    assert_eq!(resp1, Response::ClientRegistered { client_id: ClientId::from("bob"), last_room: RoomId(0) });

    std::env::set_current_dir(original).unwrap();
}

/// Scenario: a crashed room's log is replayed on restart and the client's
/// position survives, without re-appending the replayed commands.
#[tokio::test]
async fn restart_replays_the_log_without_duplicating_it() {
    let dir = tempfile::tempdir().unwrap();
    let sink = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sink_addr = sink.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        loop {
            let _ = sink.accept().await;
        }
    });

    let config = room_config(dir.path(), 9, sink_addr.clone());
    let listener = room_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    let server = tokio::spawn(room_server::run(listener, config.clone()));

    let mut client = TcpStream::connect(addr).await.unwrap();
    send_recv(&mut client, &Request::new("add_client", ClientId::from("carol"))).await;
    send_recv(&mut client, &Request::new("right", ClientId::from("carol"))).await;
    drop(client);
    server.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Same log/checkpoint paths, fresh process.
    let config2 = room_config(dir.path(), 9, sink_addr);
    let listener2 = room_server::bind(&config2.bind_addr).await.unwrap();
    let addr2 = listener2.local_addr();
    let server2 = tokio::spawn(room_server::run(listener2, config2));

    let mut client2 = TcpStream::connect(addr2).await.unwrap();
    let resp = send_recv(&mut client2, &Request::new("get_room", ClientId::from("carol"))).await;
    match resp {
        Response::Room { room } => assert!(room.contains_key("carol")),
        other => panic!("expected a room snapshot, got {other:?}"),
    }

    let log_len_before = std::fs::metadata(&config.log_path).unwrap().len();
    let _ = send_recv(&mut client2, &Request::new("get_room", ClientId::from("carol"))).await;
    let log_len_after = std::fs::metadata(&config.log_path).unwrap().len();
    assert_eq!(log_len_before, log_len_after, "get_room must never be logged");

    drop(client2);
    server2.abort();
}

/// Scenario: an idle room (no live connections) shuts itself down within
/// its configured grace period and reports back to its nameserver.
#[tokio::test]
async fn idle_room_shuts_itself_down_and_reports_to_its_nameserver() {
    let dir = tempfile::tempdir().unwrap();
    let sink = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sink_addr = sink.local_addr().unwrap().to_string();

    let config = room_config(dir.path(), 2, sink_addr);
    let listener = room_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    let server = tokio::spawn(room_server::run(listener, config));

    // Touch the room once, then disconnect, then leave it idle.
    let client = TcpStream::connect(addr).await.unwrap();
    drop(client);

    let (mut accepted, _) = tokio::time::timeout(Duration::from_secs(5), sink.accept())
        .await
        .expect("room should report shutdown to its nameserver")
        .unwrap();
    let payload = read_message(&mut accepted, Duration::from_secs(1)).await.unwrap().unwrap();
    let req: Request = serde_json::from_slice(&payload).unwrap();
    assert_eq!(req.method, "shutdown_room");
    assert_eq!(req.client, ClientId::from(2u64));

    tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap().unwrap();
}

/// Scenario: malformed and unknown requests produce the documented error
/// shapes instead of tearing down the connection.
#[tokio::test]
async fn malformed_and_unknown_requests_return_errors_not_crashes() {
    let dir = tempfile::tempdir().unwrap();
    let sink = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sink_addr = sink.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = sink.accept().await;
    });

    let config = room_config(dir.path(), 4, sink_addr);
    let listener = room_server::bind(&config.bind_addr).await.unwrap();
    let addr = listener.local_addr();
    let server = tokio::spawn(room_server::run(listener, config));

    let mut client = TcpStream::connect(addr).await.unwrap();

    write_message(&mut client, b"not json at all").await.unwrap();
    let reply = read_message(&mut client, Duration::from_secs(1)).await.unwrap().unwrap();
    let resp: Response = serde_json::from_slice(&reply).unwrap();
    assert_eq!(resp, Response::error("must be formatted as json"));

    write_message(&mut client, br#"{"not_method": 1}"#).await.unwrap();
    let reply = read_message(&mut client, Duration::from_secs(1)).await.unwrap().unwrap();
    let resp: Response = serde_json::from_slice(&reply).unwrap();
    assert_eq!(resp, Response::error("malformed incoming command"));

    let resp = send_recv(&mut client, &Request::new("fly", ClientId::from("a"))).await;
    assert_eq!(resp, Response::error("method fly does not exist for engine: Game"));

    drop(client);
    server.abort();
}
