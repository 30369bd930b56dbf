//! Wire types for the gridkeep protocol.
//!
//! These are the structures that travel between clients, room servers, and
//! the cluster coordinator, either over a framed TCP stream (request/
//! response) or as a single UDP datagram (snapshot, catalog beacon).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// ClientId
// ---------------------------------------------------------------------------

/// A client's external identifier.
///
/// The original protocol treats `client` as an opaque dict key that is
/// sometimes a CLI-supplied string and sometimes a cluster-assigned
/// integer. Internally everything hashes on one `String` key so the room
/// and cluster directories only ever deal with one type; the
/// [`Deserialize`] impl below accepts either JSON shape on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ClientId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for ClientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct ClientIdVisitor;

impl<'de> Visitor<'de> for ClientIdVisitor {
    type Value = ClientId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a client id, either a string or an integer")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ClientId(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ClientId(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ClientId(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(ClientId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for ClientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ClientIdVisitor)
    }
}

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// A room's numeric identifier. Room ids are always numeric: the room's
/// log and checkpoint are named `game<id>.log` / `game<id>.ckpt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A grid cell, serialized on the wire as the string `"x:y"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

/// Error returned when a `"x:y"` string can't be parsed as a [`Position`].
#[derive(Debug, thiserror::Error)]
#[error("invalid position string: {0:?}")]
pub struct ParsePositionError(pub String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(':')
            .ok_or_else(|| ParsePositionError(s.to_string()))?;
        let x = x.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        let y = y.parse().map_err(|_| ParsePositionError(s.to_string()))?;
        Ok(Position { x, y })
    }
}

impl Serialize for Position {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Request — client/server-bound stream message
// ---------------------------------------------------------------------------

/// A framed stream request from a client to a room server or the cluster.
///
/// `row`/`col` are carried for wire compatibility but are not consumed by
/// any current method; negative values are a client-side precondition and
/// are never validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub client: ClientId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub broadcast_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub col: Option<i64>,
}

impl Request {
    pub fn new(method: impl Into<String>, client: ClientId) -> Self {
        Self {
            method: method.into(),
            client,
            broadcast_addr: None,
            row: None,
            col: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response — server-bound stream reply
// ---------------------------------------------------------------------------

/// A framed stream response. `#[serde(untagged)]` lets each variant match
/// the bare JSON shape the spec describes (`{"error": ...}`,
/// `{"success": ...}`, ...) without an extra discriminant field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    ClientAdded { client_id: ClientId, pos: Position },
    ClientRegistered { client_id: ClientId, last_room: RoomId },
    Success { success: String },
    Error { error: String },
    Interact { msg: String },
    Room { room: BTreeMap<String, String> },
    RoomServer { addr: String },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { error: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Response::Success { success: message.into() }
    }
}

// ---------------------------------------------------------------------------
// Snapshot — UDP broadcast of room state
// ---------------------------------------------------------------------------

/// A UDP snapshot sent to every client that registered a `broadcast_addr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub room: BTreeMap<String, String>,
    pub frame: u64,
    pub room_id: u64,
}

// ---------------------------------------------------------------------------
// CatalogBeacon — UDP registration with the external catalog
// ---------------------------------------------------------------------------

/// The periodic UDP datagram announcing this process to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBeacon {
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: String,
    pub port: u16,
    pub project: String,
}
