use std::collections::HashMap;

use domain::{RoomName, Username};
use tokio::sync::RwLock;

/// 房间在线状态表：房间名 → 按加入顺序排列、不重复的用户名。
///
/// 每次变更只持有一次写锁，锁内没有 await 点。
/// 按用户名而不是连接记账，同一用户的多个连接只占一个位置。
/// 成员清空的房间会被立即移除。
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    rooms: RwLock<HashMap<RoomName, Vec<Username>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 幂等加入，返回房间当前完整成员列表
    pub async fn join(&self, room: &RoomName, username: &Username) -> Vec<Username> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.clone()).or_default();
        if !members.contains(username) {
            members.push(username.clone());
        }
        members.clone()
    }

    /// 离开房间。
    ///
    /// 房间不存在时返回 `None`（调用方据此跳过广播），否则返回更新后的成员列表。
    pub async fn leave(&self, room: &RoomName, username: &Username) -> Option<Vec<Username>> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.get_mut(room)?;
        members.retain(|member| member != username);
        let remaining = members.clone();
        if remaining.is_empty() {
            rooms.remove(room);
        }
        Some(remaining)
    }

    /// 把用户从所有房间移除，只返回受影响的房间及其更新后的成员列表
    pub async fn remove_everywhere(&self, username: &Username) -> Vec<(RoomName, Vec<Username>)> {
        let mut rooms = self.rooms.write().await;
        let mut affected = Vec::new();

        for (room, members) in rooms.iter_mut() {
            if let Some(position) = members.iter().position(|member| member == username) {
                members.remove(position);
                affected.push((room.clone(), members.clone()));
            }
        }

        rooms.retain(|_, members| !members.is_empty());
        affected.sort_by(|(left, _), (right, _)| left.cmp(right));
        affected
    }

    /// 房间当前成员；不存在的房间视为空
    pub async fn members(&self, room: &RoomName) -> Vec<Username> {
        let rooms = self.rooms.read().await;
        rooms.get(room).cloned().unwrap_or_default()
    }

    /// 当前有成员的房间数
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn room(name: &str) -> RoomName {
        RoomName::parse(name).unwrap()
    }

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[tokio::test]
    async fn join_is_idempotent_and_keeps_insertion_order() {
        let registry = PresenceRegistry::new();
        let general = room("general");

        registry.join(&general, &user("alice")).await;
        registry.join(&general, &user("bob")).await;
        let members = registry.join(&general, &user("alice")).await;

        assert_eq!(members, vec![user("alice"), user("bob")]);
    }

    #[tokio::test]
    async fn leave_removes_member_and_prunes_empty_room() {
        let registry = PresenceRegistry::new();
        let general = room("general");

        registry.join(&general, &user("alice")).await;
        registry.join(&general, &user("bob")).await;

        assert_eq!(
            registry.leave(&general, &user("alice")).await,
            Some(vec![user("bob")])
        );
        assert_eq!(registry.leave(&general, &user("bob")).await, Some(vec![]));
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.members(&general).await.is_empty());
    }

    #[tokio::test]
    async fn leave_unknown_room_is_a_no_op() {
        let registry = PresenceRegistry::new();
        assert_eq!(registry.leave(&room("nowhere"), &user("alice")).await, None);
    }

    #[tokio::test]
    async fn leave_absent_user_leaves_membership_unchanged() {
        let registry = PresenceRegistry::new();
        let general = room("general");
        registry.join(&general, &user("alice")).await;

        assert_eq!(
            registry.leave(&general, &user("carol")).await,
            Some(vec![user("alice")])
        );
    }

    #[tokio::test]
    async fn remove_everywhere_reports_only_affected_rooms() {
        let registry = PresenceRegistry::new();
        let (a, b, c) = (room("a"), room("b"), room("c"));

        registry.join(&a, &user("alice")).await;
        registry.join(&a, &user("bob")).await;
        registry.join(&b, &user("bob")).await;
        registry.join(&c, &user("alice")).await;

        let affected = registry.remove_everywhere(&user("alice")).await;

        assert_eq!(affected, vec![(a.clone(), vec![user("bob")]), (c.clone(), vec![])]);
        assert_eq!(registry.members(&b).await, vec![user("bob")]);
        assert_eq!(registry.room_count().await, 2);
    }

    #[tokio::test]
    async fn join_then_leave_never_leaves_residue() {
        let registry = PresenceRegistry::new();
        let general = room("general");

        for _ in 0..3 {
            registry.join(&general, &user("alice")).await;
        }
        registry.leave(&general, &user("alice")).await;

        assert!(!registry.members(&general).await.contains(&user("alice")));
    }

    #[tokio::test]
    async fn concurrent_joins_are_all_applied_once() {
        let registry = Arc::new(PresenceRegistry::new());
        let general = room("general");

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let registry = registry.clone();
                let general = general.clone();
                tokio::spawn(async move {
                    // 每个用户名加入两次
                    let name = user(&format!("user{}", i % 10));
                    registry.join(&general, &name).await;
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap();
        }

        let members = registry.members(&general).await;
        assert_eq!(members.len(), 10);
    }
}
