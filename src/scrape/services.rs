use serde::Serialize;
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use super::{
    gemini::TextGenerator,
    newsapi::{FeedArticle, FeedError, HeadlineFeed},
};
use crate::{
    error::StoreError,
    posts::{repo::PostRepo, repo_types::IngestedPost},
    state::AppState,
};

pub const ANALYSIS_FAILED: &str = "Analysis failed";
pub const NO_ANALYSIS: &str = "No analysis result.";

const PROMPT_PREAMBLE: &str = "Analyze the following news article. Even if only a snippet is provided, \
always do your best to generate a plausible, creative, and detailed analysis as if you had the full article. \
Never say that the content is missing, insufficient, or that a full analysis is impossible. \
Always provide a summary, perspectives, and insights based on the available information, even if it is limited.";

const PROMPT_SECTIONS: [&str; 5] = [
    "Key summary",
    "Positive perspectives",
    "Negative perspectives",
    "Social impact",
    "Additional insights",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct IngestPolicy {
    /// Stop after this many new articles; 0 processes the whole page.
    pub max_new: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub saved: usize,
    pub skipped: usize,
    pub post_ids: Vec<i64>,
}

impl IngestReport {
    pub fn message(&self) -> String {
        if self.saved == 0 {
            "No new articles found.".to_string()
        } else {
            format!("{} news articles saved.", self.saved)
        }
    }
}

/// Prompt sent to the text generator for one article.
pub fn build_prompt(article: &FeedArticle) -> String {
    let mut text = String::new();
    if let Some(content) = non_empty(article.content.as_deref()) {
        text.push_str(content);
        text.push('\n');
    }
    if let Some(description) = non_empty(article.description.as_deref()) {
        if !text.contains(description) {
            text.push_str(description);
            text.push('\n');
        }
    }
    if let Some(url) = non_empty(article.url.as_deref()) {
        text.push_str(&format!("Original URL: {url}\n"));
    }

    let mut prompt = format!("{PROMPT_PREAMBLE}\n\n");
    for (i, section) in PROMPT_SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {section}\n", i + 1));
    }
    prompt.push_str("\nArticle:\n");
    prompt.push_str(&text);
    prompt
}

/// Enrichment never fails ingestion: errors become the analysis text.
pub async fn analyze(generator: &dyn TextGenerator, article: &FeedArticle) -> String {
    match generator.generate(&build_prompt(article)).await {
        Ok(Some(text)) => text,
        Ok(None) => NO_ANALYSIS.to_string(),
        Err(e) => {
            warn!(error = %e, title = ?article.title, "article analysis failed");
            format!("{ANALYSIS_FAILED}: {e}")
        }
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Pulls one page of headlines and stores the unseen ones with an analysis.
#[instrument(skip_all, fields(max_new = policy.max_new))]
pub async fn ingest(
    posts: &dyn PostRepo,
    feed: &dyn HeadlineFeed,
    generator: &dyn TextGenerator,
    policy: IngestPolicy,
) -> Result<IngestReport, IngestError> {
    let articles = feed.fetch().await?;
    info!(count = articles.len(), "headlines fetched");

    let mut report = IngestReport::default();
    for article in &articles {
        if policy.max_new > 0 && report.saved >= policy.max_new {
            break;
        }

        let Some(title) = non_empty(article.title.as_deref()) else {
            warn!(url = ?article.url, "skipping article without title");
            report.skipped += 1;
            continue;
        };

        let published_at = match non_empty(article.published_at.as_deref()) {
            None => OffsetDateTime::now_utc(),
            Some(raw) => match OffsetDateTime::parse(raw, &Rfc3339) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(error = %e, title, raw, "skipping article with unreadable publish time");
                    report.skipped += 1;
                    continue;
                }
            },
        };

        if posts.exists_by_title_and_date(title, published_at).await? {
            debug!(title, "article already stored");
            report.skipped += 1;
            continue;
        }

        let analysis = analyze(generator, article).await;
        let row = IngestedPost {
            title: title.to_string(),
            content: non_empty(article.content.as_deref())
                .or(non_empty(article.description.as_deref()))
                .unwrap_or_default()
                .to_string(),
            excerpt: non_empty(article.description.as_deref())
                .unwrap_or_default()
                .to_string(),
            published_at,
            analysis,
        };

        match posts.insert_ingested(&row).await? {
            Some(post) => {
                info!(post_id = post.id, title, "article stored");
                report.saved += 1;
                report.post_ids.push(post.id);
            }
            None => {
                debug!(title, "article stored concurrently; skipping");
                report.skipped += 1;
            }
        }
    }

    info!(saved = report.saved, skipped = report.skipped, "ingestion finished");
    Ok(report)
}

/// Runs [`ingest`] with the clients and policy held in `state`.
pub async fn run_ingest(state: &AppState) -> Result<IngestReport, IngestError> {
    ingest(
        state.posts.as_ref(),
        state.headlines.as_ref(),
        state.generator.as_ref(),
        IngestPolicy {
            max_new: state.config.scrape.max_new,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::repo_types::PostDraft;
    use crate::testing::{MemoryStore, ScriptedFeed, ScriptedGenerator};
    use time::macros::datetime;

    fn article(title: &str, published_at: Option<&str>) -> FeedArticle {
        FeedArticle {
            title: Some(title.into()),
            description: Some(format!("{title} description")),
            content: None,
            url: Some(format!("https://news.example/{}", title.len())),
            published_at: published_at.map(Into::into),
        }
    }

    async fn stored_titles(store: &MemoryStore) -> Vec<String> {
        store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.post.title)
            .collect()
    }

    #[test]
    fn prompt_contains_sections_and_best_text() {
        let a = FeedArticle {
            title: Some("T".into()),
            content: Some("Full body".into()),
            description: Some("Full".into()),
            url: Some("https://news.example/t".into()),
            published_at: None,
        };
        let prompt = build_prompt(&a);
        assert!(prompt.starts_with("Analyze the following news article."));
        assert!(prompt.contains("Never say that the content is missing"));
        for (i, s) in PROMPT_SECTIONS.iter().enumerate() {
            assert!(prompt.contains(&format!("{}. {s}", i + 1)));
        }
        // description already inside content is not repeated
        assert!(prompt.ends_with("Article:\nFull body\nOriginal URL: https://news.example/t\n"));
    }

    #[test]
    fn prompt_falls_back_to_description_or_nothing() {
        let mut a = article("T", None);
        a.url = None;
        assert!(build_prompt(&a).ends_with("Article:\nT description\n"));
        a.description = None;
        assert!(build_prompt(&a).ends_with("Article:\n"));
    }

    #[tokio::test]
    async fn already_stored_article_is_not_inserted() {
        let store = MemoryStore::default();
        let ts = datetime!(2024-05-01 12:00:00 UTC);
        store
            .insert_ingested(&IngestedPost {
                title: "Markets rally".into(),
                content: "".into(),
                excerpt: "".into(),
                published_at: ts,
                analysis: "old".into(),
            })
            .await
            .unwrap();
        let feed = ScriptedFeed::articles(vec![article("Markets rally", Some("2024-05-01T12:00:00Z"))]);
        let generator = ScriptedGenerator::text("fresh");

        let report = ingest(&store, &feed, &generator, IngestPolicy { max_new: 1 })
            .await
            .unwrap();
        assert_eq!(report.saved, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.message(), "No new articles found.");
        assert_eq!(generator.calls(), 0);
        assert_eq!(stored_titles(&store).await.len(), 1);
    }

    #[tokio::test]
    async fn failing_enrichment_still_stores_article() {
        let store = MemoryStore::default();
        let feed = ScriptedFeed::articles(vec![article("Chip shortage", Some("2024-05-02T08:30:00Z"))]);
        let generator = ScriptedGenerator::failing("quota exceeded");

        let report = ingest(&store, &feed, &generator, IngestPolicy { max_new: 1 })
            .await
            .unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(report.message(), "1 news articles saved.");

        let post = PostRepo::find(&store, report.post_ids[0]).await.unwrap().unwrap();
        assert_eq!(post.analysis.as_deref(), Some("Analysis failed: quota exceeded"));
        assert!(post.published);
        assert_eq!(post.published_at, Some(datetime!(2024-05-02 08:30:00 UTC)));
        assert_eq!(post.content, "Chip shortage description");
        assert_eq!(post.excerpt.as_deref(), Some("Chip shortage description"));
    }

    #[tokio::test]
    async fn one_new_article_per_run_by_default() {
        let store = MemoryStore::default();
        let feed = ScriptedFeed::articles(vec![
            article("Seen", Some("2024-05-01T00:00:00Z")),
            article("First new", Some("2024-05-02T00:00:00Z")),
            article("Second new", Some("2024-05-03T00:00:00Z")),
        ]);
        store
            .insert_ingested(&IngestedPost {
                title: "Seen".into(),
                content: "".into(),
                excerpt: "".into(),
                published_at: datetime!(2024-05-01 00:00:00 UTC),
                analysis: "".into(),
            })
            .await
            .unwrap();
        let generator = ScriptedGenerator::text("analysis");

        let report = ingest(&store, &feed, &generator, IngestPolicy { max_new: 1 })
            .await
            .unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(generator.calls(), 1);
        let titles = stored_titles(&store).await;
        assert!(titles.contains(&"First new".to_string()));
        assert!(!titles.contains(&"Second new".to_string()));

        let report = ingest(&store, &feed, &generator, IngestPolicy { max_new: 0 })
            .await
            .unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(stored_titles(&store).await.len(), 3);
    }

    #[tokio::test]
    async fn missing_publish_time_defaults_to_now_and_untitled_is_skipped() {
        let store = MemoryStore::default();
        let mut untitled = article("x", None);
        untitled.title = Some("  ".into());
        let feed = ScriptedFeed::articles(vec![untitled, article("Dateless", None)]);
        let generator = ScriptedGenerator::empty();

        let before = OffsetDateTime::now_utc();
        let report = ingest(&store, &feed, &generator, IngestPolicy { max_new: 0 })
            .await
            .unwrap();
        assert_eq!(report.saved, 1);
        assert_eq!(report.skipped, 1);

        let post = PostRepo::find(&store, report.post_ids[0]).await.unwrap().unwrap();
        assert!(post.published_at.unwrap() >= before);
        assert_eq!(post.analysis.as_deref(), Some(NO_ANALYSIS));
    }

    #[tokio::test]
    async fn insert_conflict_counts_as_already_stored() {
        let store = MemoryStore::default();
        store.hide_from_existence_checks(true);
        let ts = datetime!(2024-05-01 12:00:00 UTC);
        store
            .insert_ingested(&IngestedPost {
                title: "Race".into(),
                content: "".into(),
                excerpt: "".into(),
                published_at: ts,
                analysis: "".into(),
            })
            .await
            .unwrap();
        let feed = ScriptedFeed::articles(vec![article("Race", Some("2024-05-01T12:00:00Z"))]);

        let report = ingest(&store, &feed, &ScriptedGenerator::text("a"), IngestPolicy { max_new: 1 })
            .await
            .unwrap();
        assert_eq!(report.saved, 0);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn feed_failure_is_fatal() {
        let store = MemoryStore::default();
        let err = ingest(
            &store,
            &ScriptedFeed::rejected("rateLimited"),
            &ScriptedGenerator::text("a"),
            IngestPolicy { max_new: 1 },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Feed(FeedError::Rejected(_))));
    }

    #[tokio::test]
    async fn store_failure_aborts_the_run() {
        let store = MemoryStore::default();
        PostRepo::create(
            &store,
            &PostDraft {
                title: "x".into(),
                content: "y".into(),
                excerpt: None,
                category_id: None,
                published: false,
            },
        )
        .await
        .unwrap();
        store.fail_reads(true);
        let feed = ScriptedFeed::articles(vec![article("New", Some("2024-05-01T12:00:00Z"))]);
        let err = ingest(&store, &feed, &ScriptedGenerator::text("a"), IngestPolicy { max_new: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
    }

    #[tokio::test]
    async fn insert_failure_aborts_after_enrichment() {
        let store = MemoryStore::default();
        store.fail_writes(true);
        let feed = ScriptedFeed::articles(vec![
            article("First", Some("2024-05-01T12:00:00Z")),
            article("Second", Some("2024-05-02T12:00:00Z")),
        ]);
        let generator = ScriptedGenerator::text("a");

        let err = ingest(&store, &feed, &generator, IngestPolicy { max_new: 0 })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Store(StoreError::Database(_))));
        assert_eq!(err.to_string(), sqlx::Error::PoolTimedOut.to_string());
        assert_eq!(generator.calls(), 1);

        store.fail_writes(false);
        assert!(stored_titles(&store).await.is_empty());
    }
}
