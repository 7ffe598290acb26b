use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use super::{
    dto::{ListQuery, PaginationMeta, PostMeta, PostRequest},
    repo::PostRepo,
    repo_types::{Post, PostDraft, PostWithCategory},
};
use crate::{
    categories::repo::CategoryRepo,
    config::SiteConfig,
    error::{ApiError, StoreError},
};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;
const META_DESCRIPTION_LEN: usize = 160;

/// Validated paging and filter parameters of a public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub category_id: Option<Uuid>,
    pub page: i64,
    pub limit: i64,
}

impl ListParams {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

pub fn parse_list_query(q: &ListQuery) -> Result<ListParams, ApiError> {
    let category_id = match q.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ApiError::Validation("Invalid category.".into()))?,
        ),
    };
    let page = parse_positive(q.page.as_deref(), 1, "page")?;
    let limit = parse_positive(q.limit.as_deref(), DEFAULT_PAGE_SIZE, "limit")?.min(MAX_PAGE_SIZE);
    // offset() must not overflow
    if (page - 1).checked_mul(limit).is_none() {
        return Err(ApiError::Validation("page is out of range.".into()));
    }
    Ok(ListParams {
        category_id,
        page,
        limit,
    })
}

fn parse_positive(raw: Option<&str>, default: i64, field: &str) -> Result<i64, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ApiError::Validation(format!("{field} must be a positive integer."))),
    }
}

pub fn pagination(page: i64, limit: i64, total: i64) -> PaginationMeta {
    let total_pages = if total <= 0 { 0 } else { (total + limit - 1) / limit };
    PaginationMeta {
        current_page: page,
        total_pages,
        total_posts: total.max(0),
        has_next_page: page < total_pages,
        has_prev_page: page > 1,
    }
}

/// Removes markup tags, leaving the text between them.
pub fn strip_tags(html: &str) -> String {
    lazy_static! {
        static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    }
    TAG_RE.replace_all(html, "").trim().to_string()
}

/// Cuts `text` to `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Excerpt when present, otherwise the start of the plain-text content.
pub fn summary(post: &Post, max: usize) -> String {
    match post.excerpt.as_deref().map(str::trim) {
        Some(excerpt) if !excerpt.is_empty() => excerpt.to_string(),
        _ => truncate_chars(&strip_tags(&post.content), max),
    }
}

pub fn post_meta(site: &SiteConfig, item: &PostWithCategory) -> PostMeta {
    let post = &item.post;
    PostMeta {
        title: format!("{} - {}", post.title, site.title),
        description: summary(post, META_DESCRIPTION_LEN),
        canonical: format!("{}/post/{}", site.base_url, post.id),
        section: item.category_name.clone().unwrap_or_else(|| "Other".into()),
        published_time: post.published_at.unwrap_or(post.created_at),
        modified_time: post.updated_at,
    }
}

/// Validates an admin create/update body.
pub async fn validate_draft(
    categories: &dyn CategoryRepo,
    body: PostRequest,
) -> Result<PostDraft, ApiError> {
    let title = body.title.trim().to_string();
    if title.is_empty() || body.content.trim().is_empty() {
        return Err(ApiError::Validation("Title and content are required.".into()));
    }

    let category_id = match body.category_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let id = Uuid::parse_str(raw)
                .map_err(|_| ApiError::Validation("Invalid category.".into()))?;
            let exists = categories
                .find(id)
                .await
                .map_err(|e| ApiError::internal("Failed to save post.", e))?
                .is_some();
            if !exists {
                return Err(ApiError::Validation("Unknown category.".into()));
            }
            Some(id)
        }
    };

    Ok(PostDraft {
        title,
        content: body.content,
        excerpt: body
            .excerpt
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
        category_id,
        published: body.published,
    })
}

fn map_write_error(e: StoreError, action: &str) -> ApiError {
    match e {
        StoreError::ForeignKeyViolation(_) => ApiError::Validation("Unknown category.".into()),
        StoreError::UniqueViolation(_) => ApiError::Conflict(
            "A post with this title and publication time already exists.".into(),
        ),
        other => ApiError::internal(format!("Failed to {action} post."), other),
    }
}

pub async fn create_post(
    posts: &dyn PostRepo,
    categories: &dyn CategoryRepo,
    body: PostRequest,
) -> Result<Post, ApiError> {
    let draft = validate_draft(categories, body).await?;
    let post = posts
        .create(&draft)
        .await
        .map_err(|e| map_write_error(e, "create"))?;
    info!(post_id = post.id, published = post.published, "post created");
    Ok(post)
}

pub async fn update_post(
    posts: &dyn PostRepo,
    categories: &dyn CategoryRepo,
    id: i64,
    body: PostRequest,
) -> Result<Post, ApiError> {
    let draft = validate_draft(categories, body).await?;
    let post = posts
        .update(id, &draft)
        .await
        .map_err(|e| map_write_error(e, "update"))?
        .ok_or_else(|| ApiError::NotFound("Post not found.".into()))?;
    info!(post_id = post.id, published = post.published, "post updated");
    Ok(post)
}

pub async fn set_published(posts: &dyn PostRepo, id: i64, published: bool) -> Result<Post, ApiError> {
    let post = posts
        .set_published(id, published)
        .await
        .map_err(|e| map_write_error(e, "update"))?
        .ok_or_else(|| ApiError::NotFound("Post not found.".into()))?;
    info!(post_id = post.id, published, "post publish state changed");
    Ok(post)
}

pub async fn delete_post(posts: &dyn PostRepo, id: i64) -> Result<(), ApiError> {
    let deleted = posts
        .delete(id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete post.", e))?;
    if !deleted {
        return Err(ApiError::NotFound("Post not found.".into()));
    }
    info!(post_id = id, "post deleted");
    Ok(())
}
