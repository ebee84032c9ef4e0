mod support;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};

use support::spawn_server;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn next_event(socket: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("event within timeout")
            .expect("stream open")
            .expect("frame");
        if let TungsteniteMessage::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn assert_silent(socket: &mut Socket) {
    let waited = timeout(Duration::from_millis(200), socket.next()).await;
    assert!(waited.is_err(), "unexpected frame: {:?}", waited);
}

async fn emit(socket: &mut Socket, frame: Value) {
    socket
        .send(TungsteniteMessage::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

async fn post(client: &Client, url: String, body: Value) -> Value {
    client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request")
        .json::<Value>()
        .await
        .expect("json")
}

#[tokio::test]
async fn websocket_room_and_direct_flow() {
    let (addr, shutdown) = spawn_server().await;
    let base_http = format!("http://{}", addr);
    let client = Client::new();

    let alice = post(&client, format!("{base_http}/users"), json!({"login": "alice"})).await;
    let bob = post(&client, format!("{base_http}/users"), json!({"login": "bob"})).await;
    let room = post(&client, format!("{base_http}/rooms"), json!({"nome": "geral"})).await;
    let alice_id = alice["id"].as_str().unwrap().to_string();
    let bob_id = bob["id"].as_str().unwrap().to_string();

    let (mut alice_ws, _) = connect_async(format!("ws://{}/ws?userId={}", addr, alice_id))
        .await
        .expect("alice connect");
    assert_eq!(
        next_event(&mut alice_ws).await,
        json!({"event": "identified", "data": {"userId": alice_id}})
    );

    emit(
        &mut alice_ws,
        json!({"event": "joinRoom", "data": {"roomId": room["id"], "userId": alice_id}}),
    )
    .await;
    let joined = next_event(&mut alice_ws).await;
    assert_eq!(joined["event"], "roomJoined");
    assert_eq!(joined["data"]["nome"], "geral");

    let (mut bob_ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("bob connect");
    emit(
        &mut bob_ws,
        json!({"event": "joinRoom", "data": {"roomId": room["id"], "userId": bob_id}}),
    )
    .await;
    assert_eq!(next_event(&mut bob_ws).await["event"], "roomJoined");
    assert_eq!(
        next_event(&mut alice_ws).await,
        json!({"event": "userJoined", "data": {"roomId": room["id"], "userId": bob_id}})
    );

    emit(
        &mut alice_ws,
        json!({"event": "sendRoomMessage", "data": {"roomId": room["id"], "senderId": alice_id, "mensagem": "oi"}}),
    )
    .await;
    for socket in [&mut alice_ws, &mut bob_ws] {
        let event = next_event(socket).await;
        assert_eq!(event["event"], "newRoomMessage");
        assert_eq!(event["data"]["senderLogin"], "alice");
        assert_eq!(event["data"]["conteudo"], "oi");
    }

    // bob 通过 joinRoom 已声明身份，私信只投递给他
    emit(
        &mut alice_ws,
        json!({"event": "sendDirectMessage", "data": {"receiverId": bob_id, "senderId": alice_id, "mensagem": "segredo"}}),
    )
    .await;
    let direct = next_event(&mut bob_ws).await;
    assert_eq!(direct["event"], "newDirectMessage");
    assert_eq!(direct["data"]["receiverId"], bob_id);
    assert_silent(&mut alice_ws).await;

    // HTTP 发送的消息同样实时推送
    post(
        &client,
        format!("{base_http}/rooms/{}/messages", room["id"].as_str().unwrap()),
        json!({"senderId": bob_id, "mensagem": "via http"}),
    )
    .await;
    assert_eq!(
        next_event(&mut alice_ws).await["data"]["conteudo"],
        "via http"
    );
    assert_eq!(next_event(&mut bob_ws).await["data"]["conteudo"], "via http");

    emit(
        &mut bob_ws,
        json!({"event": "leaveRoom", "data": {"roomId": room["id"], "userId": bob_id}}),
    )
    .await;
    assert_eq!(
        next_event(&mut bob_ws).await,
        json!({"event": "roomLeft", "data": {"roomId": room["id"]}})
    );
    assert_eq!(
        next_event(&mut alice_ws).await,
        json!({"event": "userLeft", "data": {"roomId": room["id"], "userId": bob_id}})
    );

    let _ = shutdown.send(());
}

#[tokio::test]
async fn websocket_errors_go_only_to_the_origin() {
    let (addr, shutdown) = spawn_server().await;
    let base_http = format!("http://{}", addr);
    let client = Client::new();

    let alice = post(&client, format!("{base_http}/users"), json!({"login": "alice"})).await;
    let room = post(&client, format!("{base_http}/rooms"), json!({"nome": "geral"})).await;

    let (mut watcher, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("watcher connect");
    emit(
        &mut watcher,
        json!({"event": "joinRoom", "data": {"roomId": room["id"], "userId": alice["id"]}}),
    )
    .await;
    assert_eq!(next_event(&mut watcher).await["event"], "roomJoined");

    let (mut origin, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("origin connect");

    emit(
        &mut origin,
        json!({"event": "sendRoomMessage", "data": {"roomId": room["id"], "senderId": alice["id"]}}),
    )
    .await;
    assert_eq!(
        next_event(&mut origin).await,
        json!({"event": "error", "data": {"error": "roomId, senderId e mensagem são obrigatórios."}})
    );

    origin
        .send(TungsteniteMessage::Text("isto não é json".to_string().into()))
        .await
        .expect("send garbage");
    assert_eq!(next_event(&mut origin).await["event"], "error");

    emit(
        &mut origin,
        json!({"event": "joinRoom", "data": {"roomId": "99", "userId": alice["id"]}}),
    )
    .await;
    assert_eq!(
        next_event(&mut origin).await["data"]["error"],
        "Sala não encontrada."
    );

    assert_silent(&mut watcher).await;
    let _ = shutdown.send(());
}

#[tokio::test]
async fn deleting_a_room_notifies_live_subscribers() {
    let (addr, shutdown) = spawn_server().await;
    let base_http = format!("http://{}", addr);
    let client = Client::new();

    let alice = post(&client, format!("{base_http}/users"), json!({"login": "alice"})).await;
    let room = post(&client, format!("{base_http}/rooms"), json!({"nome": "geral"})).await;
    let room_id = room["id"].as_str().unwrap().to_string();

    let (mut socket, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("connect");
    emit(
        &mut socket,
        json!({"event": "joinRoom", "data": {"roomId": room_id, "userId": alice["id"]}}),
    )
    .await;
    assert_eq!(next_event(&mut socket).await["event"], "roomJoined");

    let response = client
        .delete(format!("{base_http}/rooms/{room_id}"))
        .send()
        .await
        .expect("delete room");
    assert!(response.status().is_success());

    assert_eq!(
        next_event(&mut socket).await,
        json!({"event": "roomDeleted", "data": {"roomId": room_id}})
    );
    let _ = shutdown.send(());
}
