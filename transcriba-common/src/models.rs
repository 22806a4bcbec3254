//! Domain records as stored in the database
//!
//! Field names serialize in camelCase to stay compatible with existing
//! web clients.

use crate::TeiElement;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;

/// Highest transcription stage an object can reach
pub const HIGHEST_STAGE: i64 = 3;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub password_salt: String,
    pub email_verified: bool,
    #[serde(skip)]
    pub verification_token: Option<String>,
    pub score: i64,
    pub busy: bool,
    pub completed_tutorial: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// Kind of principal a role is mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum PrincipalType {
    User,
    Role,
}

#[derive(Debug, Clone, FromRow)]
pub struct RoleMapping {
    pub id: String,
    pub principal_type: PrincipalType,
    pub principal_id: String,
    pub role_id: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccessToken {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Lifetime in seconds
    pub ttl: i64,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at + Duration::seconds(self.ttl) <= now
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Source {
    pub id: String,
    pub title: String,
    /// Metadata URL template, `{id}` is replaced by the external id
    pub url: String,
    pub info_url: Option<String>,
    pub logo_url: Option<String>,
}

/// Publicly visible part of a source
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub title: String,
    pub info_url: Option<String>,
    pub logo_url: Option<String>,
}

impl From<Source> for SourceSummary {
    fn from(source: Source) -> Self {
        Self {
            id: source.id,
            title: source.title,
            info_url: source.info_url,
            logo_url: source.logo_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: String,
    pub public: bool,
    /// Locked collections are maintained by the import only
    pub locked: bool,
    pub source_id: Option<String>,
}

/// Editing state of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ObjectStatus {
    /// Anyone may occupy the object
    Free,
    /// A user is working on a new revision
    Occupied,
    /// A published revision waits for community votes
    Voting,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TranscribaObject {
    pub id: String,
    pub title: String,
    pub source_id: String,
    pub main_author: String,
    #[serde(rename = "externalID")]
    pub external_id: String,
    pub created_at: DateTime<Utc>,
    pub released: bool,
    pub status: ObjectStatus,
    pub occupied_at: Option<DateTime<Utc>>,
    pub stage: i64,
    pub public_tags: Json<Vec<String>>,
    pub generated_tags: Json<Vec<String>>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub discussion_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    pub id: String,
    #[serde(rename = "transcribaObjectId")]
    pub object_id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Json<Value>,
    pub content: Json<TeiElement>,
    pub published: bool,
    pub approved: bool,
}

/// Entry of an object's revision history
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChronicItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub published: bool,
    pub approved: bool,
}

/// Record type a vote refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum VotingModel {
    Comment,
    Revision,
}

impl VotingModel {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Comment" => Some(Self::Comment),
            "Revision" => Some(Self::Revision),
            _ => None,
        }
    }

    /// Vote values accepted for this model
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Self::Comment => &["like", "dislike", "unwanted"],
            Self::Revision => &["accept", "refuse"],
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Voting {
    pub id: String,
    pub object_type: VotingModel,
    pub object_id: String,
    pub user_id: String,
    pub vote: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Discussion {
    pub id: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub discussion_id: String,
    #[serde(rename = "appUserId")]
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InfoPage {
    pub id: String,
    pub name: String,
    pub title: Option<String>,
    pub content: String,
    pub discussion_id: Option<String>,
}
