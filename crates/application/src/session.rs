//! 会话注册表
//!
//! 跟踪每个存活连接的身份声明、房间订阅以及出站事件通道。
//! 这里只维护实时订阅，房间的持久成员关系由房间目录负责。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::{ConnectionId, DomainError, RoomId, ServerEvent, Session, Timestamp, UserId};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::clock::Clock;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

struct SessionEntry {
    session: Session,
    outbound: EventSender,
}

impl SessionEntry {
    fn push(&self, event: ServerEvent) -> bool {
        self.outbound.send(event).is_ok()
    }
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ConnectionId, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建匿名、无订阅的新会话，返回其出站事件接收端。
    pub async fn connect(&self, now: Timestamp) -> (Session, EventReceiver) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let session = Session::connect(ConnectionId::generate(), now);

        self.sessions.write().await.insert(
            session.connection_id,
            SessionEntry {
                session: session.clone(),
                outbound,
            },
        );

        tracing::debug!(connection_id = %session.connection_id, "session registered");
        (session, receiver)
    }

    pub async fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .map(|entry| entry.session.clone())
    }

    pub async fn identify(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
    ) -> Result<Session, DomainError> {
        self.with_session(connection_id, |session| {
            session.identify(user_id);
            session.clone()
        })
        .await
    }

    pub async fn subscribe(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, DomainError> {
        self.with_session(connection_id, |session| session.subscribe(room_id))
            .await
    }

    pub async fn unsubscribe(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<bool, DomainError> {
        self.with_session(connection_id, |session| session.unsubscribe(room_id))
            .await
    }

    /// 记录入站活动时间，供空闲回收使用。
    pub async fn touch(&self, connection_id: ConnectionId, now: Timestamp) {
        if let Some(entry) = self.sessions.write().await.get_mut(&connection_id) {
            entry.session.touch(now);
        }
    }

    /// 移除会话并清空其订阅。出站通道随之关闭。
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions
            .write()
            .await
            .remove(&connection_id)
            .map(|entry| entry.session)
    }

    /// 房间删除后的级联：通知订阅者并取消订阅，返回受影响的会话数。
    pub async fn drop_room(&self, room_id: RoomId) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut affected = 0;
        for entry in sessions.values_mut() {
            if entry.session.unsubscribe(room_id) {
                entry.push(ServerEvent::room_deleted(room_id));
                affected += 1;
            }
        }
        affected
    }

    pub async fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        self.sessions
            .read()
            .await
            .get(&connection_id)
            .is_some_and(|entry| entry.push(event))
    }

    /// 推送给订阅了该房间的所有会话（可排除一个），返回送达数。
    pub async fn deliver_to_room(
        &self,
        room_id: RoomId,
        event: ServerEvent,
        except: Option<ConnectionId>,
    ) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|entry| entry.session.is_subscribed(room_id))
            .filter(|entry| Some(entry.session.connection_id) != except)
            .filter(|entry| entry.push(event.clone()))
            .count()
    }

    /// 只推送给身份为该用户的会话。
    pub async fn deliver_to_user(&self, user_id: UserId, event: ServerEvent) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|entry| entry.session.is_identified_as(user_id))
            .filter(|entry| entry.push(event.clone()))
            .count()
    }

    /// 回收 `cutoff` 之前再无入站活动的会话。
    pub async fn reap_idle(&self, cutoff: Timestamp) -> Vec<ConnectionId> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<ConnectionId> = sessions
            .values()
            .filter(|entry| entry.session.last_seen < cutoff)
            .map(|entry| entry.session.connection_id)
            .collect();

        for connection_id in &idle {
            sessions.remove(connection_id);
        }
        idle
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// 启动后台空闲会话回收任务。
    pub fn spawn_reaper(
        self: Arc<Self>,
        clock: Arc<dyn Clock>,
        idle_timeout: Duration,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Ok(idle_timeout) = chrono::Duration::from_std(idle_timeout) else {
                tracing::warn!("idle timeout out of range, session reaper not started");
                return;
            };

            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let reaped = self.reap_idle(clock.now() - idle_timeout).await;
                if !reaped.is_empty() {
                    tracing::info!(count = reaped.len(), "reaped idle sessions");
                }
            }
        })
    }

    async fn with_session<R>(
        &self,
        connection_id: ConnectionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, DomainError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&connection_id)
            .ok_or(DomainError::SessionNotFound)?;
        Ok(f(&mut entry.session))
    }
}
