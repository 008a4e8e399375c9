use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo::UserStore,
    repo_types::{NewUser, StoreError, User},
};

/// In-process user store for local runs (`USER_STORE=memory`) and tests.
/// The write lock is held across the uniqueness check and the insert.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::Duplicate);
        }
        let row = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            paid: false,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(row.clone());
        Ok(row)
    }

    async fn mark_paid(&self, email: &str) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.email == email) {
            Some(u) => {
                u.paid = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.users.read().await.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryUserStore::new();
        let created = store.create(new_user("alice", "a@x.com")).await.unwrap();
        assert!(!created.paid);
        assert!(!created.is_admin);

        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_or_email_leaves_store_unchanged() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", "a@x.com")).await.unwrap();

        let same_name = store.create(new_user("alice", "other@x.com")).await;
        assert!(matches!(same_name, Err(StoreError::Duplicate)));
        let same_email = store.create(new_user("bob", "a@x.com")).await;
        assert!(matches!(same_email, Err(StoreError::Duplicate)));

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mark_paid_is_idempotent() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", "a@x.com")).await.unwrap();

        assert!(store.mark_paid("a@x.com").await.unwrap());
        assert!(store.mark_paid("a@x.com").await.unwrap());
        assert!(!store.mark_paid("nobody@x.com").await.unwrap());

        let alice = store.find_by_username("alice").await.unwrap().unwrap();
        assert!(alice.paid);
    }
}
