use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::{
    repo::{StoreError, StoreResult, UserStore},
    repo_types::{NewUser, User, UserPatch, UserWithPassword},
};

/// Mutex-backed store with the same email uniqueness rule as the users table.
#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<Vec<UserWithPassword>>,
}

impl InMemoryUserStore {
    pub fn count_by_email(&self, email: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user.email == email)
            .count()
    }

    pub fn password_hash(&self, id: Uuid) -> Option<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.password_hash.clone())
    }

    pub fn snapshot(&self, id: Uuid) -> Option<User> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_by_email_with_password(email).await?.map(|u| u.user))
    }

    async fn find_by_email_with_password(
        &self,
        email: &str,
    ) -> StoreResult<Option<UserWithPassword>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.snapshot(id))
    }

    async fn find_by_id_with_password(&self, id: Uuid) -> StoreResult<Option<UserWithPassword>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.user.id == id).cloned())
    }

    async fn create(&self, u: NewUser) -> StoreResult<User> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.user.email == u.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: u.name,
            email: u.email,
            phone: u.phone,
            address: u.address,
            niches: u.niches,
            cover_letter: u.cover_letter,
            resume: u.resume,
            role: u.role,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(UserWithPassword {
            user: user.clone(),
            password_hash: u.password_hash,
        });
        Ok(user)
    }

    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> StoreResult<Option<User>> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(email) = &patch.email {
            if rows.iter().any(|r| r.user.id != id && &r.user.email == email) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(row) = rows.iter_mut().find(|r| r.user.id == id) else {
            return Ok(None);
        };
        let u = &mut row.user;
        if let Some(v) = patch.name {
            u.name = v;
        }
        if let Some(v) = patch.email {
            u.email = v;
        }
        if let Some(v) = patch.phone {
            u.phone = v;
        }
        if let Some(v) = patch.address {
            u.address = v;
        }
        if let Some(v) = patch.cover_letter {
            u.cover_letter = Some(v);
        }
        if let Some(v) = patch.niches.first_niche {
            u.niches.first_niche = Some(v);
        }
        if let Some(v) = patch.niches.second_niche {
            u.niches.second_niche = Some(v);
        }
        if let Some(v) = patch.niches.third_niche {
            u.niches.third_niche = Some(v);
        }
        if let Some(v) = patch.resume {
            u.resume = Some(v);
        }
        Ok(Some(u.clone()))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.user.id == id) {
            row.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}
