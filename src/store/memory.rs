use super::UserStore;
use crate::error::ApiError;
use crate::models::{NewUser, User};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process user store. Each method holds the lock for its whole
/// read-modify-write, which gives the same single-row atomicity as Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, ApiError> {
        let users = self.users.read().await;
        let user = users
            .values()
            .filter(|u| {
                username.is_some_and(|name| u.username == name)
                    || email.is_some_and(|mail| u.email == mail)
            })
            .min_by_key(|u| u.created_at)
            .cloned();
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(ApiError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            password_hash: new_user.password_hash,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), ApiError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.refresh_token = token.map(str::to_owned);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, ApiError> {
        let mut users = self.users.write().await;

        match users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(current) => {
                user.refresh_token = Some(next.to_owned());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), ApiError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.password_hash = password_hash.to_owned();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_account(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, ApiError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.id != id && u.email == email) {
            return Err(ApiError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        Ok(users.get_mut(&id).map(|user| {
            user.full_name = full_name.to_owned();
            user.email = email.to_owned();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            full_name: "Test User".into(),
            password_hash: "hash".into(),
            avatar: None,
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let by_name = store
            .find_by_username_or_email(Some("alice"), None)
            .await
            .unwrap();
        let by_mail = store
            .find_by_username_or_email(None, Some("alice@example.com"))
            .await
            .unwrap();

        assert_eq!(by_name.unwrap().id, user.id);
        assert_eq!(by_mail.unwrap().id, user.id);
        assert!(store
            .find_by_username_or_email(Some("bob"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let store = MemoryUserStore::new();
        store.create(new_user("alice", "alice@example.com")).await.unwrap();

        let err = store
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_refresh_token_is_compare_and_set() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();
        store.set_refresh_token(user.id, Some("r1")).await.unwrap();

        assert!(store.replace_refresh_token(user.id, "r1", "r2").await.unwrap());
        assert!(!store.replace_refresh_token(user.id, "r1", "r3").await.unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("r2"));
    }

    #[tokio::test]
    async fn test_clear_refresh_token() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("alice", "alice@example.com")).await.unwrap();
        store.set_refresh_token(user.id, Some("r1")).await.unwrap();
        store.set_refresh_token(user.id, None).await.unwrap();

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
        assert!(!store.replace_refresh_token(user.id, "r1", "r2").await.unwrap());
    }
}
