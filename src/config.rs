use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub title: String,
    pub description: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsApiConfig {
    pub url: String,
    pub api_key: String,
    pub country: String,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    pub url: String,
    pub model: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Upper bound on newly stored articles per run; 0 means no bound.
    pub max_new: usize,
    pub interval_minutes: Option<u64>,
    pub token: Option<String>,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub site: SiteConfig,
    pub news_api: NewsApiConfig,
    pub gemini: GeminiConfig,
    pub scrape: ScrapeConfig,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: env_or("SESSION_ISSUER", "newsroom"),
            audience: env_or("SESSION_AUDIENCE", "newsroom-admin"),
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 24),
            cookie_secure: env_parse("SESSION_COOKIE_SECURE").unwrap_or(false),
        };
        let site = SiteConfig {
            base_url: env_or("SITE_BASE_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            title: env_or("SITE_TITLE", "News Blog"),
            description: env_or(
                "SITE_DESCRIPTION",
                "Headlines and in-depth analysis on business, technology and everyday life.",
            ),
            language: env_or("SITE_LANGUAGE", "en-US"),
        };
        let news_api = NewsApiConfig {
            url: env_or("NEWS_API_URL", "https://newsapi.org/v2/top-headlines"),
            api_key: env_secret("NEWS_API_KEY"),
            country: env_or("NEWS_API_COUNTRY", "us"),
            category: env_or("NEWS_API_CATEGORY", "business"),
        };
        let gemini = GeminiConfig {
            url: env_or(
                "GEMINI_API_URL",
                "https://generativelanguage.googleapis.com/v1/models",
            )
            .trim_end_matches('/')
            .to_string(),
            model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
            api_key: env_secret("GEMINI_API_KEY"),
        };
        let scrape = ScrapeConfig {
            max_new: env_parse("SCRAPE_MAX_NEW").unwrap_or(1),
            interval_minutes: env_parse("SCRAPE_INTERVAL_MINUTES").filter(|m| *m > 0),
            token: std::env::var("SCRAPE_TOKEN").ok().filter(|t| !t.is_empty()),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS").unwrap_or(30),
        };
        let admin = match (std::env::var("ADMIN_USERNAME"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap { username, password })
            }
            _ => None,
        };
        Ok(Self {
            database_url,
            session,
            site,
            news_api,
            gemini,
            scrape,
            admin,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn env_secret(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        tracing::warn!(key, "not set; calls depending on it will fail");
        String::new()
    })
}
