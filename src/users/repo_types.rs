use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "Job Seeker")]
    JobSeeker,
    #[serde(rename = "Employer")]
    Employer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::JobSeeker => "Job Seeker",
            Role::Employer => "Employer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Job Seeker" => Ok(Role::JobSeeker),
            "Employer" => Ok(Role::Employer),
            other => anyhow::bail!("unknown role {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Niches {
    pub first_niche: Option<String>,
    pub second_niche: Option<String>,
    pub third_niche: Option<String>,
}

impl Niches {
    /// True when every slot holds a non-empty value.
    pub fn is_complete(&self) -> bool {
        [&self.first_niche, &self.second_niche, &self.third_niche]
            .iter()
            .all(|n| n.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resume {
    pub public_id: String,
    pub url: String,
}

/// A user as returned to clients. Carries no password material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub niches: Niches,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<Resume>,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A user loaded together with their password hash, for credential checks only.
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

impl UserWithPassword {
    pub fn compare_password(&self, plain: &str) -> anyhow::Result<bool> {
        password::verify_password(plain, &self.password_hash)
    }
}

/// Fields needed to create a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password_hash: String,
    pub role: Role,
    pub niches: Niches,
    pub cover_letter: Option<String>,
    pub resume: Option<Resume>,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cover_letter: Option<String>,
    pub niches: Niches,
    pub resume: Option<Resume>,
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password_hash: String,
    pub role: String,
    pub first_niche: Option<String>,
    pub second_niche: Option<String>,
    pub third_niche: Option<String>,
    pub cover_letter: Option<String>,
    pub resume_public_id: Option<String>,
    pub resume_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for UserWithPassword {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let resume = match (r.resume_public_id, r.resume_url) {
            (Some(public_id), Some(url)) => Some(Resume { public_id, url }),
            _ => None,
        };
        Ok(Self {
            user: User {
                id: r.id,
                name: r.name,
                email: r.email,
                phone: r.phone,
                address: r.address,
                niches: Niches {
                    first_niche: r.first_niche,
                    second_niche: r.second_niche,
                    third_niche: r.third_niche,
                },
                cover_letter: r.cover_letter,
                resume,
                role: r.role.parse()?,
                created_at: r.created_at,
            },
            password_hash: r.password_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
            phone: "1".into(),
            address: "addr".into(),
            niches: Niches::default(),
            cover_letter: None,
            resume: None,
            role: Role::Employer,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn role_uses_display_names_on_the_wire() {
        assert_eq!(serde_json::to_string(&Role::JobSeeker).unwrap(), "\"Job Seeker\"");
        assert_eq!("Employer".parse::<Role>().unwrap(), Role::Employer);
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn niches_complete_only_when_all_slots_filled() {
        let mut n = Niches {
            first_niche: Some("rust".into()),
            second_niche: Some("go".into()),
            third_niche: Some("ops".into()),
        };
        assert!(n.is_complete());
        n.second_niche = Some(String::new());
        assert!(!n.is_complete());
        n.second_niche = None;
        assert!(!n.is_complete());
    }

    #[test]
    fn user_json_is_camel_case_and_omits_missing_resume() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("createdAt").unwrap().is_string());
        assert!(json.get("niches").unwrap().get("firstNiche").is_some());
        assert!(json.get("resume").is_none());
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn row_without_complete_resume_has_none() {
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
            phone: "1".into(),
            address: "addr".into(),
            password_hash: "h".into(),
            role: "Job Seeker".into(),
            first_niche: Some("a".into()),
            second_niche: None,
            third_niche: None,
            cover_letter: None,
            resume_public_id: Some("id".into()),
            resume_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let u = UserWithPassword::try_from(row).unwrap();
        assert_eq!(u.user.role, Role::JobSeeker);
        assert!(u.user.resume.is_none());
        assert_eq!(u.password_hash, "h");
    }
}
