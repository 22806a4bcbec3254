//! Discussions, comments and info pages

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use transcriba_common::db::{begin_write, discussions, info_pages, is_unique_violation, new_id};
use transcriba_common::models::{Comment, Discussion, InfoPage};
use transcriba_common::{Entity, Error, Result};

use super::markdown;
use crate::pagination::{calculate_pagination, PAGE_SIZE};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoPageInput {
    pub name: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub discussion_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_comments: i64,
    pub comments: Vec<Comment>,
}

async fn find_discussion(pool: &SqlitePool, id: &str) -> Result<Discussion> {
    discussions::find_by_id(pool, id)
        .await?
        .ok_or(Error::NotFound(Entity::Discussion))
}

pub async fn post_comment(
    pool: &SqlitePool,
    user_id: &str,
    discussion_id: &str,
    content: Option<String>,
) -> Result<Comment> {
    find_discussion(pool, discussion_id).await?;
    let content = match content {
        Some(c) if !c.trim().is_empty() => c,
        _ => return Err(Error::WrongInput("content".to_string())),
    };
    let comment = Comment {
        id: new_id(),
        discussion_id: discussion_id.to_string(),
        user_id: user_id.to_string(),
        content,
        created_at: Utc::now(),
    };
    discussions::insert_comment(pool, &comment).await?;
    Ok(comment)
}

pub async fn comments(
    pool: &SqlitePool,
    discussion_id: &str,
    requested_page: i64,
) -> Result<CommentPage> {
    find_discussion(pool, discussion_id).await?;
    let total = discussions::count_comments(pool, discussion_id).await?;
    let pagination = calculate_pagination(total, requested_page);
    let comments =
        discussions::comments(pool, discussion_id, PAGE_SIZE, pagination.offset).await?;
    Ok(CommentPage {
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        total_comments: total,
        comments,
    })
}

/// Create an info page; a discussion named after the page is created when none is given
pub async fn create_info_page(pool: &SqlitePool, input: InfoPageInput) -> Result<InfoPage> {
    let name = match input.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(Error::WrongInput("name".to_string())),
    };
    if info_pages::find_by_name(pool, &name).await?.is_some() {
        return Err(Error::Duplicate("info page".to_string()));
    }

    let mut tx = begin_write(pool).await?;
    let discussion_id = match input.discussion_id {
        Some(id) => {
            discussions::find_by_id(&mut *tx, &id)
                .await?
                .ok_or(Error::NotFound(Entity::Discussion))?;
            id
        }
        None => {
            let discussion = Discussion {
                id: new_id(),
                title: Some(name.clone()),
            };
            discussions::insert(&mut *tx, &discussion).await?;
            discussion.id
        }
    };
    let page = InfoPage {
        id: new_id(),
        name,
        title: input.title,
        content: input.content.unwrap_or_default(),
        discussion_id: Some(discussion_id),
    };
    match info_pages::insert(&mut *tx, &page).await {
        Ok(()) => {}
        Err(Error::Database(e)) if is_unique_violation(&e) => {
            return Err(Error::Duplicate("info page".to_string()));
        }
        Err(e) => return Err(e),
    }
    tx.commit().await?;
    Ok(page)
}

pub async fn list_info_pages(pool: &SqlitePool) -> Result<Vec<InfoPage>> {
    info_pages::list(pool).await
}

/// Info page with its markdown content rendered to HTML
pub async fn parsed_info_page(pool: &SqlitePool, name: &str) -> Result<InfoPage> {
    let mut page = info_pages::find_by_name(pool, name)
        .await?
        .ok_or(Error::NotFound(Entity::InfoPage))?;
    page.content = markdown::render(&page.content);
    Ok(page)
}
