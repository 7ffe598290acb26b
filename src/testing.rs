//! In-memory repositories and scripted clients for tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use axum::{body::to_bytes, response::Response};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{repo::AdminRepo, repo_types::Admin, session::SessionKeys},
    categories::{repo::CategoryRepo, repo_types::Category},
    error::StoreError,
    posts::{
        repo::PostRepo,
        repo_types::{IngestedPost, Post, PostDraft, PostPage, PostWithCategory, SitemapRow},
    },
    scrape::{
        gemini::{GenerationError, TextGenerator},
        newsapi::{FeedArticle, FeedError, HeadlineFeed},
    },
    state::AppState,
};

#[derive(Default)]
struct Tables {
    posts: Vec<Post>,
    last_post_id: i64,
    categories: Vec<Category>,
    admins: Vec<Admin>,
}

/// Implements every repository trait over plain vectors.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    hide_existing: AtomicBool,
}

impl MemoryStore {
    /// Makes every read return a database error.
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    /// Makes every insert, update and delete return a database error.
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Makes `exists_by_title_and_date` answer `false`, so only the insert
    /// conflict guards against duplicates.
    pub fn hide_from_existence_checks(&self, on: bool) {
        self.hide_existing.store(on, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    fn read(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables())
    }

    fn write(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables())
    }
}

impl Tables {
    fn with_category(&self, post: &Post) -> PostWithCategory {
        let category_name = post
            .category_id
            .and_then(|id| self.categories.iter().find(|c| c.id == id))
            .map(|c| c.name.clone());
        PostWithCategory {
            post: post.clone(),
            category_name,
        }
    }

    fn published_sorted(&self, category_id: Option<Uuid>) -> Vec<&Post> {
        let mut rows: Vec<&Post> = self
            .posts
            .iter()
            .filter(|p| p.published && category_id.map_or(true, |c| p.category_id == Some(c)))
            .collect();
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
        rows
    }

    fn title_date_taken(&self, title: &str, at: Option<OffsetDateTime>, except: Option<i64>) -> bool {
        at.is_some()
            && self
                .posts
                .iter()
                .any(|p| Some(p.id) != except && p.title == title && p.published_at == at)
    }

    fn next_post_id(&mut self) -> i64 {
        self.last_post_id += 1;
        self.last_post_id
    }
}

fn post_conflict() -> StoreError {
    StoreError::UniqueViolation("news_posts_title_published_at_key".into())
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn list_published(
        &self,
        category_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<PostPage, StoreError> {
        let t = self.read()?;
        let rows = t.published_sorted(category_id);
        let total = rows.len() as i64;
        let posts = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| t.with_category(p))
            .collect();
        Ok(PostPage { posts, total })
    }

    async fn find_published(&self, id: i64) -> Result<Option<PostWithCategory>, StoreError> {
        let t = self.read()?;
        Ok(t
            .posts
            .iter()
            .find(|p| p.id == id && p.published)
            .map(|p| t.with_category(p)))
    }

    async fn sitemap_rows(&self) -> Result<Vec<SitemapRow>, StoreError> {
        let t = self.read()?;
        Ok(t
            .published_sorted(None)
            .into_iter()
            .map(|p| SitemapRow {
                id: p.id,
                updated_at: p.updated_at,
            })
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<PostWithCategory>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<&Post> = t.posts.iter().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows.into_iter().map(|p| t.with_category(p)).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StoreError> {
        Ok(self.read()?.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, draft: &PostDraft) -> Result<Post, StoreError> {
        let mut t = self.write()?;
        let now = OffsetDateTime::now_utc();
        let published_at = draft.published.then_some(now);
        if t.title_date_taken(&draft.title, published_at, None) {
            return Err(post_conflict());
        }
        let post = Post {
            id: t.next_post_id(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            excerpt: draft.excerpt.clone(),
            category_id: draft.category_id,
            published: draft.published,
            published_at,
            analysis: None,
            created_at: now,
            updated_at: now,
        };
        t.posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, id: i64, draft: &PostDraft) -> Result<Option<Post>, StoreError> {
        let mut t = self.write()?;
        let Some(idx) = t.posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        let published_at = if draft.published {
            Some(t.posts[idx].published_at.unwrap_or(now))
        } else {
            None
        };
        if t.title_date_taken(&draft.title, published_at, Some(id)) {
            return Err(post_conflict());
        }
        let post = &mut t.posts[idx];
        post.title = draft.title.clone();
        post.content = draft.content.clone();
        post.excerpt = draft.excerpt.clone();
        post.category_id = draft.category_id;
        post.published = draft.published;
        post.published_at = published_at;
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<Option<Post>, StoreError> {
        let mut t = self.write()?;
        let Some(idx) = t.posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        let published_at = published.then_some(now);
        let title = t.posts[idx].title.clone();
        if t.title_date_taken(&title, published_at, Some(id)) {
            return Err(post_conflict());
        }
        let post = &mut t.posts[idx];
        post.published = published;
        post.published_at = published_at;
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        Ok(t.posts.len() != before)
    }

    async fn any_in_category(&self, category_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .posts
            .iter()
            .any(|p| p.category_id == Some(category_id)))
    }

    async fn exists_by_title_and_date(
        &self,
        title: &str,
        published_at: OffsetDateTime,
    ) -> Result<bool, StoreError> {
        let t = self.read()?;
        if self.hide_existing.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(t.title_date_taken(title, Some(published_at), None))
    }

    async fn insert_ingested(&self, article: &IngestedPost) -> Result<Option<Post>, StoreError> {
        let mut t = self.write()?;
        if t.title_date_taken(&article.title, Some(article.published_at), None) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let post = Post {
            id: t.next_post_id(),
            title: article.title.clone(),
            content: article.content.clone(),
            excerpt: Some(article.excerpt.clone()),
            category_id: None,
            published: true,
            published_at: Some(article.published_at),
            analysis: Some(article.analysis.clone()),
            created_at: now,
            updated_at: now,
        };
        t.posts.push(post.clone());
        Ok(Some(post))
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn list(&self) -> Result<Vec<Category>, StoreError> {
        let mut rows = self.read()?.categories.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, name: &str, description: Option<&str>) -> Result<Category, StoreError> {
        let mut t = self.write()?;
        if t.categories.iter().any(|c| c.name == name) {
            return Err(StoreError::UniqueViolation("news_categories_name_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn update(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Option<Category>, StoreError> {
        let mut t = self.write()?;
        if t.categories.iter().any(|c| c.id != id && c.name == name) {
            return Err(StoreError::UniqueViolation("news_categories_name_key".into()));
        }
        let Some(category) = t.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = name.to_string();
        category.description = description.map(str::to_string);
        category.updated_at = OffsetDateTime::now_utc();
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        // ON DELETE RESTRICT
        if t.posts.iter().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::ForeignKeyViolation("news_posts_category_id_fkey".into()));
        }
        let before = t.categories.len();
        t.categories.retain(|c| c.id != id);
        Ok(t.categories.len() != before)
    }
}

#[async_trait]
impl AdminRepo for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Admin>, StoreError> {
        Ok(self
            .read()?
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn upsert(&self, username: &str, password_hash: &str) -> Result<Admin, StoreError> {
        let mut t = self.write()?;
        let now = OffsetDateTime::now_utc();
        if let Some(admin) = t.admins.iter_mut().find(|a| a.username == username) {
            admin.password_hash = password_hash.to_string();
            admin.updated_at = now;
            return Ok(admin.clone());
        }
        let admin = Admin {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.admins.push(admin.clone());
        Ok(admin)
    }
}

enum FeedScript {
    Articles(Vec<FeedArticle>),
    Rejected(String),
    Invalid,
}

/// Headline feed returning the same canned answer on every call.
pub struct ScriptedFeed {
    script: FeedScript,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    fn new(script: FeedScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn articles(articles: Vec<FeedArticle>) -> Self {
        Self::new(FeedScript::Articles(articles))
    }

    pub fn rejected(message: &str) -> Self {
        Self::new(FeedScript::Rejected(message.into()))
    }

    pub fn invalid() -> Self {
        Self::new(FeedScript::Invalid)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HeadlineFeed for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<FeedArticle>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            FeedScript::Articles(a) => Ok(a.clone()),
            FeedScript::Rejected(m) => Err(FeedError::Rejected(m.clone())),
            FeedScript::Invalid => Err(FeedError::Invalid(
                serde_json::from_str::<serde_json::Value>("not json").unwrap_err(),
            )),
        }
    }
}

/// Text generator with a fixed outcome.
pub struct ScriptedGenerator {
    outcome: Result<Option<String>, String>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(outcome: Result<Option<String>, String>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Ok(Some(text.into())))
    }

    pub fn empty() -> Self {
        Self::new(Ok(None))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Err(message.into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<Option<String>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(GenerationError::Api)
    }
}

/// `Cookie` header value carrying a valid admin session for `state`.
pub fn admin_cookie(state: &AppState) -> String {
    let keys = SessionKeys::from_config(&state.config.session);
    let token = keys.sign(Uuid::new_v4(), "editor").unwrap();
    format!("admin-session={token}")
}

pub async fn body_json(res: Response) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
