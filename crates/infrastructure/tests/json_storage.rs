use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use config::StorageConfig;
use domain::{
    ChatRoomRepository, Login, MembershipChange, MessageBody, MessageRepository, MessageTarget,
    NewMessage, NewRoom, NewUser, RepositoryError, RoomId, RoomName, UserId, UserRepository,
};
use infrastructure::{sequence_path, Infrastructure, ROOMS_FILE, USERS_FILE};
use uuid::Uuid;

fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("chat-storage-{}", Uuid::new_v4()))
}

fn storage(dir: &Path) -> StorageConfig {
    StorageConfig {
        data_dir: dir.to_path_buf(),
        persist: true,
    }
}

fn new_user(login: &str) -> NewUser {
    NewUser {
        login: Login::parse(login).unwrap(),
        created_at: Utc::now(),
    }
}

fn new_room(name: &str) -> NewRoom {
    NewRoom {
        name: RoomName::parse(name).unwrap(),
        created_at: Utc::now(),
    }
}

fn room_message(sender: UserId, room: RoomId, body: &str) -> NewMessage {
    NewMessage {
        sender_id: sender,
        sender_login: format!("user-{sender}"),
        target: MessageTarget::Room(room),
        body: MessageBody::new(body).unwrap(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn concurrent_registrations_get_unique_ids() {
    let infra = Infrastructure::in_memory();

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let users = infra.users.clone();
            tokio::spawn(async move { users.create(new_user(&format!("user{i}"))).await })
        })
        .collect();

    let ids: HashSet<UserId> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().id)
        .collect();

    assert_eq!(ids.len(), 50);
}

#[tokio::test]
async fn duplicate_login_conflicts_regardless_of_ordering() {
    let infra = Infrastructure::in_memory();

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let users = infra.users.clone();
            tokio::spawn(async move { users.create(new_user("alice")).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|err| *err == RepositoryError::Conflict));
}

#[tokio::test]
async fn concurrent_appends_are_strictly_increasing() {
    let infra = Infrastructure::in_memory();
    let messages = infra.messages.clone();

    let tasks: Vec<_> = (0..100u64)
        .map(|i| {
            let messages = messages.clone();
            tokio::spawn(async move {
                messages
                    .append(room_message(UserId::new(i % 3 + 1), RoomId::new(1), "oi"))
                    .await
            })
        })
        .collect();

    for joined in futures::future::join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    let history = messages.list_room(RoomId::new(1)).await.unwrap();
    assert_eq!(history.len(), 100);
    assert!(history.windows(2).all(|pair| pair[0].id < pair[1].id));
}

#[tokio::test]
async fn state_survives_reopen_and_ids_are_never_reused() {
    let dir = temp_data_dir();

    {
        let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
        let alice = infra.users.create(new_user("alice")).await.unwrap();
        let first = infra.rooms.create(new_room("geral")).await.unwrap();
        let second = infra.rooms.create(new_room("random")).await.unwrap();
        infra
            .rooms
            .update_members(first.id, MembershipChange::Add(alice.id))
            .await
            .unwrap();
        infra.rooms.delete(second.id).await.unwrap();
        infra
            .messages
            .append(room_message(alice.id, first.id, "ola"))
            .await
            .unwrap();
    }

    let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
    let alice = infra.users.find_by_login("alice").await.unwrap().unwrap();
    let rooms = infra.rooms.list().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert!(rooms[0].has_member(alice.id));

    let third = infra.rooms.create(new_room("nova")).await.unwrap();
    assert_eq!(third.id, RoomId::new(3));

    let history = infra.messages.list_room(rooms[0].id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].body, "ola");

    let raw = std::fs::read_to_string(dir.join(ROOMS_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value[0]["nome"], "geral");

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn deleted_newest_room_id_is_not_reissued_after_restart() {
    let dir = temp_data_dir();

    let deleted = {
        let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
        let alice = infra.users.create(new_user("alice")).await.unwrap();
        infra.rooms.create(new_room("geral")).await.unwrap();
        let newest = infra.rooms.create(new_room("secreta")).await.unwrap();
        infra
            .messages
            .append(room_message(alice.id, newest.id, "segredo"))
            .await
            .unwrap();
        infra.rooms.delete(newest.id).await.unwrap();
        newest.id
    };

    let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
    let fresh = infra.rooms.create(new_room("nova")).await.unwrap();
    assert_ne!(fresh.id, deleted);
    assert_eq!(fresh.id, RoomId::new(3));
    assert!(infra.messages.list_room(fresh.id).await.unwrap().is_empty());

    let raw = std::fs::read_to_string(sequence_path(&dir.join(ROOMS_FILE))).unwrap();
    let sequence: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(sequence["lastId"], 3);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn data_without_sequence_file_resumes_after_highest_id() {
    let dir = temp_data_dir();
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(USERS_FILE),
        r#"[{"id": "4", "login": "alice", "criadoEm": "2024-01-01T00:00:00Z"}]"#,
    )
    .unwrap();

    let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
    let bob = infra.users.create(new_user("bob")).await.unwrap();
    assert_eq!(bob.id, UserId::new(5));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn corrupt_file_is_moved_aside_and_keeps_original_bytes() {
    let dir = temp_data_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let original = "{ not json";
    std::fs::write(dir.join(USERS_FILE), original).unwrap();
    std::fs::write(sequence_path(&dir.join(USERS_FILE)), r#"{"lastId": 7}"#).unwrap();

    let infra = Infrastructure::open(&storage(&dir)).await.unwrap();
    assert!(infra.users.find_by_login("alice").await.unwrap().is_none());
    let alice = infra.users.create(new_user("alice")).await.unwrap();
    // 序列保留，旧消息中的 senderId 不会指向新用户
    assert_eq!(alice.id, UserId::new(8));

    let preserved: Vec<String> = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("users.json.corrupt-"))
        .collect();
    assert_eq!(preserved.len(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.join(&preserved[0])).unwrap(),
        original
    );

    let rewritten: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join(USERS_FILE)).unwrap()).unwrap();
    assert_eq!(rewritten[0]["login"], "alice");

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn missing_room_operations_report_not_found() {
    let infra = Infrastructure::in_memory();
    let rooms: Arc<dyn ChatRoomRepository> = infra.room_repository();

    assert_eq!(
        rooms.delete(RoomId::new(9)).await.unwrap_err(),
        RepositoryError::NotFound
    );
    assert_eq!(
        rooms
            .update_members(RoomId::new(9), MembershipChange::Add(UserId::new(1)))
            .await
            .unwrap_err(),
        RepositoryError::NotFound
    );
}
