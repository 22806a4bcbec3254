//! Accounts, sessions, score and voting permissions

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use transcriba_common::config::{TranscribaConfig, TRUSTED_ROLE};
use transcriba_common::credentials::{generate_salt, generate_token, hash_password, verify_password};
use transcriba_common::db::{begin_write, is_unique_violation, new_id, revisions, tokens, users, votings};
use transcriba_common::db::users::LeaderboardEntry;
use transcriba_common::models::{AccessToken, AppUser, Revision, VotingModel};
use transcriba_common::{Entity, Error, Result};

use super::rbac;

/// Points granted once for finishing the tutorial
pub const TUTORIAL_REWARD: i64 = 15;

/// Number of users shown on the leaderboard by default
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Whether a user may vote on a revision, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePermission {
    pub allow_vote: bool,
    pub details: VotePermissionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePermissionDetails {
    pub eligible_voter: bool,
    pub maximum_votes_reached: bool,
    pub is_owner: bool,
}

impl VotePermission {
    /// Answer for visitors without an account
    pub fn guest() -> Self {
        Self {
            allow_vote: false,
            details: VotePermissionDetails::default(),
        }
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::WrongInput(name.to_string())),
    }
}

/// Create an unverified account
///
/// No mail is sent; the verification token is logged for the operator.
pub async fn register(pool: &SqlitePool, registration: Registration) -> Result<AppUser> {
    let username = required(registration.username, "username")?;
    let email = required(registration.email, "email")?;
    let password = required(registration.password, "password")?;

    if users::find_by_username(pool, &username).await?.is_some() {
        return Err(Error::Duplicate("username".to_string()));
    }
    if users::find_by_email(pool, &email).await?.is_some() {
        return Err(Error::Duplicate("email".to_string()));
    }

    let salt = generate_salt();
    let user = AppUser {
        id: new_id(),
        username,
        email,
        password_hash: hash_password(&password, &salt),
        password_salt: salt,
        email_verified: false,
        verification_token: Some(generate_token()),
        score: 0,
        busy: false,
        completed_tutorial: false,
        created_at: Utc::now(),
    };

    match users::insert(pool, &user).await {
        Ok(()) => {}
        Err(Error::Database(e)) if is_unique_violation(&e) => {
            return Err(Error::Duplicate("user".to_string()));
        }
        Err(e) => return Err(e),
    }

    info!(
        "Registered user {} ({}); confirm with uid={} token={}",
        user.username,
        user.email,
        user.id,
        user.verification_token.as_deref().unwrap_or_default()
    );
    Ok(user)
}

/// Confirm the email address and grant the default role
pub async fn confirm(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    uid: &str,
    token: &str,
) -> Result<()> {
    let user = users::find_by_id(pool, uid)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    if user.verification_token.as_deref() != Some(token) {
        return Err(Error::Unauthorized("invalid verification token".to_string()));
    }

    let mut tx = begin_write(pool).await?;
    users::mark_verified(&mut *tx, &user.id).await?;
    rbac::set_role(&mut tx, &config.rbac, &user.id, &config.rbac.default_role).await?;
    tx.commit().await?;

    info!("User {} confirmed the email address", user.username);
    Ok(())
}

/// Issue an access token for username or email plus password
pub async fn login(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    credentials: Credentials,
) -> Result<AccessToken> {
    let is_bot = credentials.username.as_deref() == Some(config.bot.username.as_str())
        || credentials.email.as_deref() == Some(config.bot.email.as_str());
    if is_bot {
        return Err(Error::Forbidden);
    }

    let password = credentials.password.unwrap_or_default();
    let user = match (&credentials.username, &credentials.email) {
        (Some(username), _) => users::find_by_username(pool, username).await?,
        (None, Some(email)) => users::find_by_email(pool, email).await?,
        (None, None) => return Err(Error::WrongInput("username or email".to_string())),
    };

    let user = match user {
        Some(user) if verify_password(&password, &user.password_salt, &user.password_hash) => user,
        _ => return Err(Error::Unauthorized("login failed".to_string())),
    };
    if !user.email_verified {
        return Err(Error::Unauthorized("email address not verified".to_string()));
    }

    let token = AccessToken {
        id: generate_token(),
        user_id: user.id.clone(),
        ttl: config.auth.token_ttl_secs,
        created_at: Utc::now(),
    };
    tokens::insert(pool, &token).await?;
    info!("User {} logged in", user.username);
    Ok(token)
}

pub async fn logout(pool: &SqlitePool, token_id: &str) -> Result<()> {
    tokens::delete(pool, token_id).await
}

/// Best users by score
pub async fn leaderboard(pool: &SqlitePool, max: Option<i64>) -> Result<Vec<LeaderboardEntry>> {
    let limit = max.unwrap_or(DEFAULT_LEADERBOARD_SIZE).max(0);
    users::leaderboard(pool, limit).await
}

/// Set the tutorial flag, rewarding the user the first time; returns the score
pub async fn complete_tutorial(pool: &SqlitePool, user_id: &str) -> Result<i64> {
    if users::complete_tutorial(pool, user_id, TUTORIAL_REWARD).await? {
        info!("User {} completed the tutorial", user_id);
    }
    let user = users::find_by_id(pool, user_id)
        .await?
        .ok_or(Error::NotFound(Entity::User))?;
    Ok(user.score)
}

/// Users whose score allows revision votes
pub async fn num_eligible_voters(pool: &SqlitePool, config: &TranscribaConfig) -> Result<i64> {
    users::count_with_min_score(pool, config.game.voting_requirements.minimum_score).await
}

/// Trusted users and users with enough score may vote
pub async fn is_eligible_voter(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    user: &AppUser,
) -> Result<bool> {
    if rbac::has_role(pool, &user.id, TRUSTED_ROLE).await? {
        return Ok(true);
    }
    Ok(user.score >= config.game.voting_requirements.minimum_score)
}

/// Votes of a user on this record type within the last 24 hours
pub async fn num_recent_votes(
    pool: &SqlitePool,
    user_id: &str,
    model: VotingModel,
) -> Result<i64> {
    let since = Utc::now() - Duration::hours(24);
    votings::count_since(pool, user_id, model, since).await
}

pub async fn is_allowed_to_vote_for_revision(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    user: &AppUser,
    revision: &Revision,
) -> Result<VotePermission> {
    let eligible_voter = is_eligible_voter(pool, config, user).await?;
    let recent = num_recent_votes(pool, &user.id, VotingModel::Revision).await?;
    let maximum_votes_reached = recent >= config.game.voting_requirements.maximum_votes_per_day;
    let is_owner = revision.owner_id == user.id;

    Ok(VotePermission {
        allow_vote: eligible_voter && !maximum_votes_reached && !is_owner,
        details: VotePermissionDetails {
            eligible_voter,
            maximum_votes_reached,
            is_owner,
        },
    })
}

/// Permissions on the newest revision of an object; guests may never vote
pub async fn latest_permissions(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    user: Option<&AppUser>,
    object_id: &str,
) -> Result<VotePermission> {
    let Some(user) = user else {
        return Ok(VotePermission::guest());
    };
    let revision = revisions::latest(pool, object_id)
        .await?
        .ok_or(Error::NotFound(Entity::Revision))?;
    is_allowed_to_vote_for_revision(pool, config, user, &revision).await
}
