//! Community votes on comments and revisions
//!
//! Comment votes are recorded without further consequence. Revision votes
//! decide whether a published revision becomes the new stable version:
//! a trusted voter decides alone, otherwise the majority decides once
//! enough votes were cast.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use transcriba_common::config::{TranscribaConfig, TRUSTED_ROLE};
use transcriba_common::db::{begin_write, objects, revisions, users, votings};
use transcriba_common::models::{AppUser, ObjectStatus, Revision, Voting, VotingModel};
use transcriba_common::{Entity, Error, Result};

use super::objects::ACCEPTED_REWARD;
use super::{rbac, users as accounts};

/// Points lost when a revision is refused
pub const REFUSED_PENALTY: i64 = -2;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub vote: Option<String>,
}

/// State of a revision after a vote was counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionOutcome {
    Accepted,
    Refused,
    Pending,
}

/// Revision votes required before the majority decides
pub fn votes_needed(eligible_voters: i64) -> i64 {
    if eligible_voters < 20 {
        2
    } else if eligible_voters < 50 {
        8
    } else {
        12
    }
}

/// Outcome after a vote; trusted voters decide immediately
pub fn decide(
    trusted_voter: bool,
    vote: &str,
    accept: i64,
    refuse: i64,
    needed: i64,
) -> RevisionOutcome {
    if trusted_voter {
        return if vote == "accept" {
            RevisionOutcome::Accepted
        } else {
            RevisionOutcome::Refused
        };
    }
    if accept + refuse < needed {
        RevisionOutcome::Pending
    } else if accept >= refuse {
        RevisionOutcome::Accepted
    } else {
        RevisionOutcome::Refused
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| Error::WrongInput(name.to_string()))
}

/// Cast or change a vote of `user`
pub async fn vote(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    user: &AppUser,
    request: VoteRequest,
) -> Result<Voting> {
    let object_type = required(request.object_type, "objectType")?;
    let object_id = required(request.object_id, "objectId")?;
    let vote = required(request.vote, "vote")?;

    let model = VotingModel::parse(&object_type).ok_or(Error::WrongFormat)?;
    if !model.candidates().contains(&vote.as_str()) {
        return Err(Error::WrongFormat);
    }

    let trusted = rbac::has_role(pool, &user.id, TRUSTED_ROLE).await?;
    if model == VotingModel::Revision {
        let revision = revisions::find_by_id(pool, &object_id)
            .await?
            .ok_or(Error::NotFound(Entity::Revision))?;
        validate_revision_vote(pool, config, user, trusted, &revision).await?;
    }

    let mut tx = begin_write(pool).await?;
    let voting = votings::upsert(&mut tx, model, &object_id, &user.id, &vote, Utc::now()).await?;
    if model == VotingModel::Revision {
        resolve_revision(&mut tx, config, trusted, &voting).await?;
    }
    tx.commit().await?;

    Ok(voting)
}

async fn validate_revision_vote(
    pool: &SqlitePool,
    config: &TranscribaConfig,
    user: &AppUser,
    trusted: bool,
    revision: &Revision,
) -> Result<()> {
    if !revision.published {
        return Err(Error::Occupied);
    }
    if revision.approved {
        return Err(Error::Replay);
    }
    if trusted {
        return Ok(());
    }
    let permission = accounts::is_allowed_to_vote_for_revision(pool, config, user, revision).await?;
    if !permission.allow_vote {
        return Err(Error::Unauthorized("user is not permitted to vote".to_string()));
    }
    Ok(())
}

/// Apply the outcome of the votes on a revision
async fn resolve_revision(
    conn: &mut SqliteConnection,
    config: &TranscribaConfig,
    trusted: bool,
    voting: &Voting,
) -> Result<RevisionOutcome> {
    // Another vote may have decided the revision meanwhile
    let revision = match revisions::find_by_id(&mut *conn, &voting.object_id).await? {
        Some(revision) if !revision.approved => revision,
        _ => return Ok(RevisionOutcome::Pending),
    };

    let accept = votings::count(&mut *conn, VotingModel::Revision, &revision.id, "accept").await?;
    let refuse = votings::count(&mut *conn, VotingModel::Revision, &revision.id, "refuse").await?;
    let eligible = users::count_with_min_score(
        &mut *conn,
        config.game.voting_requirements.minimum_score,
    )
    .await?;

    let outcome = decide(trusted, &voting.vote, accept, refuse, votes_needed(eligible));
    match outcome {
        RevisionOutcome::Accepted => {
            revisions::approve(&mut *conn, &revision.id).await?;
            objects::set_status(&mut *conn, &revision.object_id, ObjectStatus::Free).await?;
            users::add_score(&mut *conn, &revision.owner_id, ACCEPTED_REWARD).await?;
            info!("Revision {} accepted ({}:{})", revision.id, accept, refuse);
        }
        RevisionOutcome::Refused => {
            revisions::delete(&mut *conn, &revision.id).await?;
            votings::delete_for_object(&mut *conn, VotingModel::Revision, &revision.id).await?;
            objects::set_status(&mut *conn, &revision.object_id, ObjectStatus::Free).await?;
            users::add_score(&mut *conn, &revision.owner_id, REFUSED_PENALTY).await?;
            info!("Revision {} refused ({}:{})", revision.id, accept, refuse);
        }
        RevisionOutcome::Pending => {}
    }
    Ok(outcome)
}

/// Number of votes per candidate
pub async fn outcome(
    pool: &SqlitePool,
    object_type: &str,
    object_id: &str,
) -> Result<Map<String, Value>> {
    let model = VotingModel::parse(object_type).ok_or(Error::WrongFormat)?;
    let mut counts = Map::new();
    for candidate in model.candidates() {
        let count = votings::count(pool, model, object_id, candidate).await?;
        counts.insert(candidate.to_string(), Value::from(count));
    }
    Ok(counts)
}
