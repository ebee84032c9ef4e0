use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use application::{
    AppendDirectMessageRequest, AppendRoomMessageRequest, AuthenticateUserRequest,
    CreateRoomRequest, RegisterUserRequest,
};
use domain::{ChatRoom, Message, RoomId, User, UserId};

use crate::{
    error::ApiError,
    extract::{self, JsonBody},
    state::AppState,
    ws_connection::WebSocketConnection,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginPayload {
    login: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateRoomPayload {
    nome: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MembershipPayload {
    user_id: Option<UserId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SendMessagePayload {
    sender_id: Option<UserId>,
    mensagem: Option<String>,
}

impl SendMessagePayload {
    fn required(self) -> Result<(UserId, String), ApiError> {
        let mensagem = self.mensagem.filter(|text| !text.trim().is_empty());
        self.sender_id
            .zip(mensagem)
            .ok_or_else(|| ApiError::bad_request("senderId e mensagem são obrigatórios."))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WebSocketQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users/{user_id}", get(get_user))
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{room_id}", delete(delete_room))
        .route("/rooms/{room_id}/enter", post(enter_room))
        .route("/rooms/{room_id}/leave", post(leave_room))
        .route("/rooms/{room_id}/users/{user_id}", delete(remove_user))
        .route(
            "/rooms/{room_id}/messages",
            post(send_room_message).get(room_history),
        )
        .route(
            "/messages/direct/{user_id}",
            post(send_direct_message).get(direct_history),
        )
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .users
        .register(RegisterUserRequest {
            login: payload.login.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> Result<Json<User>, ApiError> {
    let login = payload
        .login
        .filter(|login| !login.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Login é obrigatório para autenticação."))?;

    let user = state
        .users
        .authenticate(AuthenticateUserRequest { login })
        .await?;
    Ok(Json(user))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.get_by_id(extract::user_id(&user_id)?).await?;
    Ok(Json(user))
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<ChatRoom>> {
    Json(state.rooms.list_rooms().await)
}

async fn create_room(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateRoomPayload>,
) -> Result<(StatusCode, Json<ChatRoom>), ApiError> {
    let room = state
        .rooms
        .create_room(CreateRoomRequest {
            name: payload.nome.unwrap_or_default(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(room)))
}

async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.delivery.delete_room(extract::room_id(&room_id)?).await?;
    Ok(Json(DeletedResponse {
        message: "Sala removida com sucesso.",
    }))
}

async fn enter_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    JsonBody(payload): JsonBody<MembershipPayload>,
) -> Result<Json<ChatRoom>, ApiError> {
    let room_id = extract::room_id(&room_id)?;
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::bad_request("userId é obrigatório para entrar na sala."))?;

    let room = state.rooms.join(room_id, user_id).await?;
    Ok(Json(room))
}

async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    JsonBody(payload): JsonBody<MembershipPayload>,
) -> Result<Json<ChatRoom>, ApiError> {
    let room_id = extract::room_id(&room_id)?;
    let user_id = payload
        .user_id
        .ok_or_else(|| ApiError::bad_request("userId é obrigatório para sair da sala."))?;

    let room = state.rooms.leave(room_id, user_id).await?;
    Ok(Json(room))
}

async fn remove_user(
    State(state): State<AppState>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<Json<ChatRoom>, ApiError> {
    let room_id = extract::room_id(&room_id)?;
    let user_id = extract::user_id(&user_id)?;
    let room = state.rooms.admin_remove_user(room_id, user_id).await?;
    Ok(Json(room))
}

async fn send_room_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    JsonBody(payload): JsonBody<SendMessagePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let room_id = extract::room_id(&room_id)?;
    let (sender_id, body) = payload.required()?;
    let delivery = state
        .delivery
        .send_room_message(AppendRoomMessageRequest {
            room_id,
            sender_id,
            body,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(delivery.message)))
}

async fn room_history(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Json<Vec<Message>> {
    match room_id.parse::<RoomId>() {
        Ok(room_id) => Json(state.messages.room_history(room_id).await),
        Err(_) => Json(Vec::new()),
    }
}

async fn send_direct_message(
    State(state): State<AppState>,
    Path(receiver_id): Path<String>,
    JsonBody(payload): JsonBody<SendMessagePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let receiver_id = extract::user_id(&receiver_id)?;
    let (sender_id, body) = payload.required()?;
    let delivery = state
        .delivery
        .send_direct_message(AppendDirectMessageRequest {
            receiver_id,
            sender_id,
            body,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(delivery.message)))
}

async fn direct_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<Message>> {
    match user_id.parse::<UserId>() {
        Ok(user_id) => Json(state.messages.direct_history(user_id).await),
        Err(_) => Json(Vec::new()),
    }
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WebSocketQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    // 无法解析的 userId 按匿名连接处理
    let claimed = query.user_id.and_then(|raw| raw.parse::<UserId>().ok());
    ws.on_upgrade(move |socket| async move {
        WebSocketConnection::open(state, claimed)
            .await
            .run(socket)
            .await;
    })
}
