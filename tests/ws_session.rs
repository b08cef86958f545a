mod support;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use support::{connect, own_id, send_json, snapshot_of, spawn_server, wait_for};

#[tokio::test]
async fn test_new_connection_gets_player_and_updates() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;

    let id = own_id(&mut ws).await;
    let update = wait_for(&mut ws, |v| v["action"] == "update" && snapshot_of(v, id).is_some()).await;

    let me = snapshot_of(&update, id).unwrap();
    assert_eq!(me["type"], "player");
    assert_eq!(me["pos_x"], 0.0);
    assert_eq!(me["pos_y"], 0.0);
}

#[tokio::test]
async fn test_player_info_reply() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, json!({"action": "player"})).await;
    let reply = wait_for(&mut ws, |v| v["action"] == "player").await;
    let info = &reply["info"];
    assert_eq!(info["health"], 10);
    assert_eq!(info["max_health"], 10);
    assert_eq!(info["turn_rate"], 180.0);
    assert_eq!(info["accel"], 25.0);
    assert_eq!(info["max_speed"], 50.0);
}

#[tokio::test]
async fn test_thrust_moves_the_player() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;
    let id = own_id(&mut ws).await;

    send_json(
        &mut ws,
        json!({"action": "controls", "controls": {"thrust": 1, "turning": 0, "attack": 0}}),
    )
    .await;

    let update = wait_for(&mut ws, |v| {
        snapshot_of(v, id).and_then(|s| s["vel_y"].as_f64()).unwrap_or(0.0) > 1.0
    })
    .await;
    let me = snapshot_of(&update, id).unwrap();
    assert!(me["pos_y"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_malformed_messages_are_dropped() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;

    send_json(&mut ws, json!({"action": "warp_drive"})).await;
    send_json(&mut ws, json!({"action": "controls", "controls": {"turning": 7}})).await;
    send_json(&mut ws, json!({"action": "collide", "size": 2})).await;

    // The session survives and still answers
    let id = own_id(&mut ws).await;
    assert!(id > 0);
}

#[tokio::test]
async fn test_disconnect_broadcasts_delete() {
    let addr = spawn_server().await;
    let mut stays = connect(addr).await;
    let mut leaves = connect(addr).await;
    let _ = own_id(&mut stays).await;
    let leaving_id = own_id(&mut leaves).await;

    leaves.close(None).await.expect("close handshake");
    drop(leaves);

    let delete = wait_for(&mut stays, |v| v["action"] == "delete").await;
    assert_eq!(delete["object_id"].as_u64(), Some(leaving_id));
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_server().await;
    let mut ws = connect(addr).await;
    // A reply proves the session is registered
    let _ = own_id(&mut ws).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#""status":"ok""#));
    assert!(response.contains(r#""connected_clients":1"#));
}
