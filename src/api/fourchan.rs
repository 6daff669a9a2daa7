//! 4chan read-only JSON API client

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::models::{Attachment, Board, Post, Thread, ThreadStats};

use super::{ApiError, ImageboardApi};

/// Default API host
pub const DEFAULT_API_URL: &str = "https://a.4cdn.org";

/// Default media host
pub const DEFAULT_MEDIA_URL: &str = "https://i.4cdn.org";

/// 4chan API client
pub struct FourChanClient {
    client: Client,
    api_url: String,
}

impl FourChanClient {
    /// Create a client against `api_url` with reqwest defaults
    pub fn new(api_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from user configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("lurk/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        tracing::debug!("GET {url}");

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ApiError::NotFound(url.to_string())),
            status if !status.is_success() => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl ImageboardApi for FourChanClient {
    async fn list_boards(&self) -> Result<Vec<Board>, ApiError> {
        let response: BoardsResponse = self.get_json(&self.api_url("boards.json")).await?;
        Ok(response.into_boards())
    }

    async fn fetch_catalog(&self, board: &str) -> Result<Vec<Thread>, ApiError> {
        let pages: Vec<CatalogPage> = self
            .get_json(&self.api_url(&format!("{board}/catalog.json")))
            .await?;
        Ok(catalog_threads(board, pages))
    }

    async fn fetch_posts(&self, thread: &Thread) -> Result<Vec<Post>, ApiError> {
        let response: ThreadResponse = self
            .get_json(&self.api_url(&format!("{}/thread/{}.json", thread.board, thread.id)))
            .await?;
        Ok(response.into_posts(&thread.board))
    }
}

// ==================== API Types ====================

#[derive(Debug, Deserialize)]
struct BoardsResponse {
    boards: Vec<FourChanBoard>,
}

#[derive(Debug, Deserialize)]
struct FourChanBoard {
    board: String,
    title: String,
    #[serde(default)]
    meta_description: String,
    #[serde(default)]
    ws_board: u8,
    #[serde(default)]
    pages: u32,
    #[serde(default)]
    per_page: u32,
    #[serde(default)]
    code_tags: u8,
    #[serde(default)]
    spoilers: u8,
}

#[derive(Debug, Deserialize)]
struct CatalogPage {
    page: u32,
    threads: Vec<FourChanPost>,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    posts: Vec<FourChanPost>,
}

#[derive(Debug, Deserialize)]
struct FourChanPost {
    no: u64,
    #[serde(default)]
    resto: u64,
    #[serde(default)]
    time: i64,
    name: Option<String>,
    trip: Option<String>,
    sub: Option<String>,
    com: Option<String>,
    #[serde(default)]
    sticky: u8,
    #[serde(default)]
    closed: u8,
    #[serde(default)]
    spoiler: u8,
    tim: Option<i64>,
    filename: Option<String>,
    ext: Option<String>,
    #[serde(default)]
    fsize: u64,
    #[serde(default)]
    w: u32,
    #[serde(default)]
    h: u32,
    #[serde(default)]
    tn_w: u32,
    #[serde(default)]
    tn_h: u32,
    #[serde(default)]
    filedeleted: u8,
    replies: Option<u32>,
    images: Option<u32>,
    unique_ips: Option<u32>,
    #[serde(default)]
    bumplimit: u8,
    #[serde(default)]
    imagelimit: u8,
    #[serde(default)]
    archived: u8,
    archived_on: Option<i64>,
}

impl BoardsResponse {
    fn into_boards(self) -> Vec<Board> {
        self.boards
            .into_iter()
            .map(|b| Board {
                id: b.board,
                title: decode(&b.title),
                description: decode(&b.meta_description),
                code_tags: b.code_tags != 0,
                spoilers: b.spoilers != 0,
                worksafe: b.ws_board != 0,
                pages: b.pages,
                per_page: b.per_page,
            })
            .collect()
    }
}

impl ThreadResponse {
    fn into_posts(self, board: &str) -> Vec<Post> {
        self.posts
            .into_iter()
            .map(|p| p.into_post(board, None))
            .collect()
    }
}

fn catalog_threads(board: &str, pages: Vec<CatalogPage>) -> Vec<Thread> {
    pages
        .into_iter()
        .flat_map(|page| {
            let number = page.page;
            page.threads
                .into_iter()
                .map(move |p| p.into_post(board, Some(number)).to_thread())
        })
        .collect()
}

impl FourChanPost {
    fn into_post(self, board: &str, page: Option<u32>) -> Post {
        let is_root = self.resto == 0;
        let thread_id = if is_root { self.no } else { self.resto };

        let attachment = self.tim.map(|media_id| Attachment {
            media_id,
            filename: self.filename.as_deref().map(decode).unwrap_or_default(),
            extension: self.ext.clone().unwrap_or_default(),
            size: self.fsize,
            width: self.w,
            height: self.h,
            thumbnail_width: self.tn_w,
            thumbnail_height: self.tn_h,
            deleted: self.filedeleted != 0,
        });

        // Only the root post carries aggregate statistics
        let stats = is_root.then(|| ThreadStats {
            replies: self.replies.unwrap_or(0),
            images: self.images.unwrap_or(0),
            unique_posters: self.unique_ips,
            bump_limit: self.bumplimit != 0,
            image_limit: self.imagelimit != 0,
            page,
        });

        Post {
            id: self.no,
            thread_id,
            board: board.to_string(),
            is_root,
            author: self
                .name
                .as_deref()
                .map_or_else(|| "Anonymous".to_string(), decode),
            tripcode: self.trip,
            created_at: timestamp(self.time),
            subject: self.sub.as_deref().map(decode),
            content_raw: self.com,
            content: None,
            body: ratatui::text::Text::default(),
            sticky: self.sticky != 0,
            closed: self.closed != 0,
            spoiler: self.spoiler != 0,
            attachment,
            stats,
            archived: self.archived != 0,
            archived_at: self.archived_on.map(timestamp),
            replies: Vec::new(),
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREAD_JSON: &str = r##"{"posts":[
        {"no":570368,"resto":0,"sticky":1,"closed":1,"time":1546293948,"name":"Anonymous",
         "sub":"The &quot;/g/&quot; Wiki","com":"Read this<wbr> first","tim":1546293948883,
         "filename":"wiki","ext":".png","fsize":2048,"w":400,"h":300,"tn_w":250,"tn_h":187,
         "replies":2,"images":0,"unique_ips":2,"archived":1,"archived_on":1546400000},
        {"no":570369,"resto":570368,"time":1546294000,
         "com":"<a href=\"#p570368\" class=\"quotelink\">&gt;&gt;570368</a><br>thanks"},
        {"no":570370,"resto":570368,"time":1546294100,"name":"Anonymous","trip":"!Ep8pui8Vw2"}
    ]}"##;

    #[test]
    fn test_decode_thread() {
        let response: ThreadResponse = serde_json::from_str(THREAD_JSON).unwrap();
        let posts = response.into_posts("g");

        assert_eq!(posts.len(), 3);

        let root = &posts[0];
        assert!(root.is_root);
        assert!(root.sticky && root.closed && root.archived);
        assert_eq!(root.thread_id, 570_368);
        assert_eq!(root.subject.as_deref(), Some("The \"/g/\" Wiki"));
        assert_eq!(root.stats.as_ref().map(|s| s.replies), Some(2));
        assert_eq!(root.stats.as_ref().and_then(|s| s.unique_posters), Some(2));
        assert!(root.archived_at.is_some());

        let attachment = root.attachment.as_ref().unwrap();
        assert_eq!(attachment.display_name(), "wiki.png");
        assert_eq!(
            attachment.url(DEFAULT_MEDIA_URL, "g"),
            "https://i.4cdn.org/g/1546293948883.png"
        );
        assert_eq!(
            attachment.thumbnail_url(DEFAULT_MEDIA_URL, "g"),
            "https://i.4cdn.org/g/1546293948883s.jpg"
        );

        let reply = &posts[1];
        assert!(!reply.is_root);
        assert_eq!(reply.thread_id, 570_368);
        assert_eq!(reply.author, "Anonymous");
        assert!(reply.stats.is_none());
        assert!(reply.attachment.is_none());

        assert_eq!(posts[2].tripcode.as_deref(), Some("!Ep8pui8Vw2"));
    }

    #[test]
    fn test_decode_catalog() {
        let json = r#"[
            {"page":1,"threads":[{"no":1,"resto":0,"time":0,"sub":"first","replies":10,"images":3,"bumplimit":1}]},
            {"page":2,"threads":[{"no":2,"resto":0,"time":0,"com":"second"}]}
        ]"#;
        let pages: Vec<CatalogPage> = serde_json::from_str(json).unwrap();
        let threads = catalog_threads("g", pages);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].stats.page, Some(1));
        assert_eq!(threads[0].stats.replies, 10);
        assert!(threads[0].stats.bump_limit);
        assert_eq!(threads[1].stats.page, Some(2));
        assert_eq!(threads[1].content.as_deref(), Some("second"));
    }

    #[test]
    fn test_decode_boards() {
        let json = r#"{"boards":[
            {"board":"g","title":"Technology","ws_board":1,"per_page":15,"pages":10,
             "meta_description":"&quot;/g/&quot; is for technology","code_tags":1},
            {"board":"b","title":"Random","ws_board":0,"per_page":15,"pages":10}
        ]}"#;
        let response: BoardsResponse = serde_json::from_str(json).unwrap();
        let boards = response.into_boards();

        assert!(boards[0].supports_code());
        assert!(boards[0].worksafe);
        assert_eq!(boards[0].description, "\"/g/\" is for technology");
        assert!(!boards[1].supports_code());
        assert!(!boards[1].worksafe);
    }

    #[test]
    fn test_api_url() {
        let client = FourChanClient::new("https://a.4cdn.org/");
        assert_eq!(
            client.api_url("/g/catalog.json"),
            "https://a.4cdn.org/g/catalog.json"
        );
    }
}
