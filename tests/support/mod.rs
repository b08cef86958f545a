// Shared helpers: boot a server on an ephemeral port and talk to it over WebSocket.
use std::net::SocketAddr;
use std::time::Duration;

use dogfight_server::config::Config;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// Start a server on its own task and return the bound address.
pub async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");

    // A quick idle rate so fresh connections see their first update promptly.
    let config = Config {
        server_addr: addr,
        idle_tick_rate: 10.0,
        ..Config::default()
    };
    tokio::spawn(async move {
        dogfight_server::run(listener, config)
            .await
            .expect("server failed");
    });
    addr
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("websocket handshake");
    ws
}

pub async fn send_json(ws: &mut Client, value: Value) {
    ws.send(Message::Text(value.to_string()))
        .await
        .expect("send message");
}

// Read messages until one satisfies `pred`, failing after a timeout.
pub async fn wait_for(ws: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            let msg = ws
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(&text).expect("server sent json");
                if pred(&value) {
                    return value;
                }
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

// Ask for the player info and return the player's entity id.
pub async fn own_id(ws: &mut Client) -> u64 {
    send_json(ws, serde_json::json!({"action": "player"})).await;
    let reply = wait_for(ws, |v| v["action"] == "player").await;
    reply["info"]["id"].as_u64().expect("numeric id")
}

// Find the snapshot for `id` inside an update message.
pub fn snapshot_of(update: &Value, id: u64) -> Option<&Value> {
    update["updates"]
        .as_array()?
        .iter()
        .find(|s| s["object_id"].as_u64() == Some(id))
}
