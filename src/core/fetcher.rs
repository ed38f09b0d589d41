//! Video metadata fetching
//!
//! [`MetadataFetcher`] is the only network-facing seam of the pipeline. The
//! HTTP implementation knows two platforms:
//!
//! - YouTube: title from the public oEmbed endpoint, thumbnail by checking the
//!   image CDN from the highest quality tier down
//! - Twitch: `og:title` / `og:image` scraped from the video page
//!
//! Anything else comes back as `unknown` without touching the network.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::core::models::{FetchError, FetchedMetadata, MetadataSource};
use crate::parsers::meta_tags::{MarkupExtractor, MetaTagExtractor};
use crate::utils::network::{build_http_client, default_user_agent, DEFAULT_TIMEOUT};

/// Thumbnail file names, best quality first
pub const THUMBNAIL_TIERS: &[&str] = &["maxresdefault", "hqdefault", "mqdefault", "sddefault"];

/// Tier returned when no candidate answers
pub const FALLBACK_THUMBNAIL_TIER: &str = "hqdefault";

/// Fetch capability: metadata for one canonical URL.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedMetadata, FetchError>;
}

#[async_trait]
impl<T: MetadataFetcher + ?Sized> MetadataFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedMetadata, FetchError> {
        (**self).fetch(url).await
    }
}

/// 元数据抓取配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// 两次抓取之间的间隔（毫秒）
    pub delay_ms: u64,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 用户代理
    pub user_agent: String,
    /// oEmbed 接口地址
    pub oembed_endpoint: String,
    /// 缩略图 CDN 前缀，拼接为 `<base>/<id>/<tier>.jpg`
    pub thumbnail_base: String,
    /// 视为无效的占位图片地址
    pub placeholder_images: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            delay_ms: 200,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            user_agent: default_user_agent().to_string(),
            oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
            thumbnail_base: "https://i.ytimg.com/vi".to_string(),
            placeholder_images: vec![
                "https://static-cdn.jtvnw.net/ttv-static-metadata/twitch_logo3.jpg".to_string(),
            ],
        }
    }
}

impl FetchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which metadata strategy applies to a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Youtube,
    Twitch,
    Unknown,
}

/// Classify a canonical URL by host.
pub fn classify_platform(url: &str) -> Platform {
    let host = match Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or("").to_ascii_lowercase(),
        Err(_) => return Platform::Unknown,
    };

    if host.contains("youtube.com") || host.contains("youtu.be") {
        Platform::Youtube
    } else if host.contains("twitch.tv") {
        Platform::Twitch
    } else {
        Platform::Unknown
    }
}

fn youtube_path_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:v=|/shorts/|/embed/)([A-Za-z0-9_-]{6,})").expect("valid video id pattern")
    })
}

/// Extract the video id from a YouTube URL (`watch?v=`, `/shorts/`, `/embed/`, `youtu.be/`).
pub fn youtube_video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host.contains("youtube.com") {
        if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            if !id.is_empty() {
                return Some(id.into_owned());
            }
        }
        return youtube_path_id_pattern()
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
    }

    if host.contains("youtu.be") {
        return parsed
            .path_segments()?
            .find(|segment| !segment.is_empty())
            .map(str::to_string);
    }

    None
}

#[derive(Debug, Deserialize)]
struct OembedResponse {
    title: Option<String>,
}

/// [`MetadataFetcher`] over HTTP
pub struct HttpMetadataFetcher {
    client: Client,
    config: FetchConfig,
    extractor: Arc<dyn MarkupExtractor>,
}

impl HttpMetadataFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = build_http_client(&config.user_agent, config.timeout())?;

        info!(
            "🌐 Metadata fetcher ready (timeout {}s, delay {}ms)",
            config.timeout_secs, config.delay_ms
        );

        Ok(Self {
            client,
            config,
            extractor: Arc::new(MetaTagExtractor),
        })
    }

    /// Replace the markup extractor used for Open Graph pages.
    pub fn with_extractor(mut self, extractor: Arc<dyn MarkupExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    async fn fetch_youtube(&self, url: &str) -> Result<FetchedMetadata, FetchError> {
        let mut metadata = FetchedMetadata::empty(MetadataSource::Unknown);

        if let Some(video_id) = youtube_video_id(url) {
            metadata.thumbnail = Some(self.best_thumbnail(&video_id).await);
            metadata.source = MetadataSource::YoutubeThumb;
        }

        if let Some(title) = self.oembed_title(url).await? {
            metadata.title = Some(title);
            metadata.source = MetadataSource::YoutubeOembed;
        }

        Ok(metadata)
    }

    /// First thumbnail tier that answers a HEAD with 2xx; `hqdefault` if none do.
    pub async fn best_thumbnail(&self, video_id: &str) -> String {
        let base = self.config.thumbnail_base.trim_end_matches('/');

        for tier in THUMBNAIL_TIERS {
            let candidate = format!("{}/{}/{}.jpg", base, video_id, tier);
            match self.client.head(&candidate).send().await {
                Ok(response) if response.status().is_success() => return candidate,
                Ok(response) => debug!("Thumbnail {} -> {}", candidate, response.status()),
                Err(err) => debug!("Thumbnail check failed for {}: {}", candidate, err),
            }
        }

        format!("{}/{}/{}.jpg", base, video_id, FALLBACK_THUMBNAIL_TIER)
    }

    /// Title from oEmbed. A non-200 answer or an unreadable body means "no title";
    /// only a transport failure is an error.
    pub async fn oembed_title(&self, url: &str) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(&self.config.oembed_endpoint)
            .query(&[("url", url), ("format", "json")])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            debug!("oEmbed returned {} for {}", response.status(), url);
            return Ok(None);
        }

        let title = match response.json::<OembedResponse>().await {
            Ok(body) => body.title,
            Err(err) => {
                debug!("Unreadable oEmbed body for {}: {}", url, err);
                None
            }
        };

        Ok(title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    /// Scrape `og:title` and `og:image` from a page. Placeholder images are dropped.
    pub async fn fetch_open_graph(&self, url: &str) -> Result<FetchedMetadata, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        let title = self.extractor.extract(&html, "og:title");
        let thumbnail = self
            .extractor
            .extract(&html, "og:image")
            .filter(|image| !self.is_placeholder(image));

        Ok(FetchedMetadata {
            title,
            thumbnail,
            source: MetadataSource::TwitchOg,
        })
    }

    fn is_placeholder(&self, image: &str) -> bool {
        self.config
            .placeholder_images
            .iter()
            .any(|placeholder| placeholder == image)
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMetadata, FetchError> {
        match classify_platform(url) {
            Platform::Youtube => self.fetch_youtube(url).await,
            Platform::Twitch => self.fetch_open_graph(url).await,
            Platform::Unknown => Ok(FetchedMetadata::empty(MetadataSource::Unknown)),
        }
    }
}
