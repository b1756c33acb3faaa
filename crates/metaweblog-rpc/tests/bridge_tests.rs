//! End-to-end tests for the bridge: dispatcher, operations and the
//! HTTP router, over the in-memory collaborators.

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;

use metaweblog_rpc::{router, ApiMethod, Collaborators, Dispatcher, MetaWeblogService, RawArgs};
use metaweblog_store::{
    ContentStore, MediaStore, MemoryMediaStore, MemoryResponseCache, MemoryStore, PageDefaults,
    PageQuery, PartStore, ResponseCache, SaveOutcome, StaticAuthenticator, StaticSite,
    StoredResource,
};
use metaweblog_types::config::{BridgeConfig, EditFailurePolicy};
use metaweblog_types::{
    ContentPage, PageId, PagePart, Result, Timestamp, WeblogError, PART_BODY, PART_EXTENDED,
};

type TestResult = std::result::Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const USER: &str = "admin";
const PASS: &str = "secret";

/// Store wrapper counting every storage access.
struct CountingStore {
    inner: MemoryStore,
    media: MemoryMediaStore,
    hits: AtomicUsize,
}

impl CountingStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            media: MemoryMediaStore::default(),
            hits: AtomicUsize::new(0),
        }
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn find(&self, id: PageId) -> Result<Option<ContentPage>> {
        self.hit();
        self.inner.find(id).await
    }

    async fn find_all(&self, query: &PageQuery) -> Result<Vec<ContentPage>> {
        self.hit();
        self.inner.find_all(query).await
    }

    async fn find_by_kind_and_title(&self, kind: &str, title: &str) -> Result<Option<ContentPage>> {
        self.hit();
        self.inner.find_by_kind_and_title(kind, title).await
    }

    async fn create(&self, defaults: PageDefaults) -> Result<ContentPage> {
        self.hit();
        self.inner.create(defaults).await
    }

    async fn save(&self, page: &mut ContentPage) -> Result<SaveOutcome> {
        self.hit();
        self.inner.save(page).await
    }

    async fn destroy(&self, id: PageId) -> Result<()> {
        self.hit();
        self.inner.destroy(id).await
    }
}

#[async_trait]
impl PartStore for CountingStore {
    async fn part(&self, page_id: PageId, name: &str) -> Result<PagePart> {
        self.hit();
        self.inner.part(page_id, name).await
    }

    async fn save_part(&self, part: &PagePart) -> Result<()> {
        self.hit();
        self.inner.save_part(part).await
    }
}

#[async_trait]
impl MediaStore for CountingStore {
    async fn persist(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: &[u8],
        created_at: Timestamp,
    ) -> Result<StoredResource> {
        self.hit();
        self.media.persist(filename, mime_type, bytes, created_at).await
    }
}

/// Cache that is always unavailable.
struct OfflineCache;

#[async_trait]
impl ResponseCache for OfflineCache {
    async fn invalidate(&self, _url: &str) -> Result<()> {
        Err(WeblogError::CacheError {
            reason: "cache offline".into(),
        })
    }
}

struct Harness {
    dispatcher: Arc<Dispatcher>,
    store: Arc<CountingStore>,
    cache: Arc<MemoryResponseCache>,
    news: ContentPage,
    misc: ContentPage,
}

async fn seeded_store() -> Result<(MemoryStore, ContentPage, ContentPage)> {
    let store = MemoryStore::new();
    let root = store.seed_page("Page", "Home", "/", None).await?;
    let news = store
        .seed_page("PaginatedArchive", "News", "news", Some(root.id))
        .await?;
    let misc = store
        .seed_page("PaginatedArchive", "Misc", "misc", Some(root.id))
        .await?;
    Ok((store, news, misc))
}

async fn harness_with(config: BridgeConfig, cache: Option<Arc<dyn ResponseCache>>) -> Result<Harness> {
    let (inner, news, misc) = seeded_store().await?;
    let store = Arc::new(CountingStore::new(inner));
    let memory_cache = Arc::new(MemoryResponseCache::new());
    let cache: Arc<dyn ResponseCache> = match cache {
        Some(cache) => cache,
        None => memory_cache.clone(),
    };

    let service = MetaWeblogService::new(
        Collaborators {
            authenticator: Arc::new(StaticAuthenticator::new().with_user(USER, PASS)),
            content: store.clone(),
            parts: store.clone(),
            media: store.clone(),
            cache,
            site: Arc::new(StaticSite::new("http://blog.test")),
        },
        config,
    )?;
    Ok(Harness {
        dispatcher: Arc::new(Dispatcher::new(service)),
        store,
        cache: memory_cache,
        news,
        misc,
    })
}

async fn harness() -> Result<Harness> {
    harness_with(BridgeConfig::default(), None).await
}

fn args(values: Value) -> RawArgs {
    match values {
        Value::Array(v) => RawArgs::Positional(v),
        Value::Object(m) => RawArgs::Named(m),
        _ => RawArgs::default(),
    }
}

fn post_struct(title: &str, description: &str, categories: &[&str]) -> Value {
    json!({
        "title": title,
        "description": description,
        "categories": categories,
    })
}

async fn new_post(h: &Harness, post: Value, publish: bool) -> Result<String> {
    let id = h
        .dispatcher
        .call(
            "metaWeblog.newPost",
            args(json!(["1", USER, PASS, post, publish])),
        )
        .await?;
    id.as_str()
        .map(str::to_string)
        .ok_or_else(|| WeblogError::ProtocolError {
            reason: format!("newPost returned {id}"),
        })
}

async fn get_post(h: &Harness, id: &str) -> Result<Value> {
    h.dispatcher
        .call("metaWeblog.getPost", args(json!([id, USER, PASS])))
        .await
}

async fn stored_part(h: &Harness, id: &str, name: &str) -> Result<String> {
    Ok(h.store.inner.part(id.parse()?, name).await?.content)
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_credentials_never_touch_storage() -> TestResult {
    let h = harness().await?;
    let before = h.store.hits();

    let calls: [(ApiMethod, Value); 7] = [
        (ApiMethod::GetCategories, json!(["1", USER, "wrong"])),
        (ApiMethod::GetPost, json!(["4", USER, "wrong"])),
        (ApiMethod::GetRecentPosts, json!(["1", USER, "wrong", 5])),
        (
            ApiMethod::NewPost,
            json!(["1", USER, "wrong", post_struct("T", "d", &[]), true]),
        ),
        (
            ApiMethod::EditPost,
            json!(["4", USER, "wrong", post_struct("T", "d", &[]), true]),
        ),
        (ApiMethod::DeletePost, json!(["key", "4", USER, "wrong", true])),
        (
            ApiMethod::NewMediaObject,
            json!(["1", USER, "wrong", {"name": "a.png", "type": "image/png", "bits": "AAAA"}]),
        ),
    ];

    for (method, raw) in calls {
        let name = method.to_string();
        let result = h.dispatcher.call(&name, args(raw)).await;
        match result {
            Err(WeblogError::AuthenticationFailure { reason }) => {
                assert_eq!(reason, "Invalid login", "{name}")
            }
            other => panic!("{name}: expected authentication failure, got {other:?}"),
        }
    }
    assert_eq!(h.store.hits(), before);
    Ok(())
}

#[tokio::test]
async fn missing_credentials_rejected() -> TestResult {
    let h = harness().await?;
    let result = h
        .dispatcher
        .call("metaWeblog.getCategories", args(json!(["1"])))
        .await;
    assert!(matches!(
        result,
        Err(WeblogError::AuthenticationFailure { .. })
    ));
    assert_eq!(h.store.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn unknown_method_is_protocol_error() -> TestResult {
    let h = harness().await?;
    let result = h
        .dispatcher
        .call("metaWeblog.getUsersBlogs", args(json!(["1", USER, PASS])))
        .await;
    assert!(matches!(result, Err(WeblogError::ProtocolError { .. })));
    assert_eq!(h.store.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn named_arguments_are_accepted() -> TestResult {
    let h = harness().await?;
    let cats = h
        .dispatcher
        .call(
            "getCategories",
            args(json!({"blogid": "1", "username": USER, "password": PASS})),
        )
        .await?;
    assert_eq!(cats.as_array().map(Vec::len), Some(2));
    Ok(())
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn categories_list_archives() -> TestResult {
    let h = harness().await?;
    let cats = h
        .dispatcher
        .call("metaWeblog.getCategories", args(json!(["1", USER, PASS])))
        .await?;
    assert_eq!(cats[0]["title"], "News");
    assert_eq!(cats[0]["categoryName"], "News");
    assert_eq!(cats[0]["htmlUrl"], "http://blog.test/news/");
    assert_eq!(cats[1]["rssUrl"], "http://blog.test/misc/");
    Ok(())
}

#[tokio::test]
async fn new_post_attaches_matching_archive() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Hello", "<p>Hi</p>", &["Misc"]), true).await?;

    let post = get_post(&h, &id).await?;
    assert_eq!(post["postid"], json!(id));
    assert_eq!(post["categories"], json!(["Misc"]));
    assert_eq!(post["permaLink"], "http://blog.test/misc/hello/");
    assert_eq!(h.cache.invalidated(), vec![h.misc.url.clone()]);
    Ok(())
}

#[tokio::test]
async fn hr_description_keeps_full_text_in_extended() -> TestResult {
    let h = harness().await?;
    let description = "<p>Lead</p><hr id=\"more\"/><p>Rest</p>";
    let id = new_post(&h, post_struct("Split", description, &[]), true).await?;

    assert_eq!(stored_part(&h, &id, PART_BODY).await?, "<p>Lead</p>");
    assert_eq!(stored_part(&h, &id, PART_EXTENDED).await?, description);
    Ok(())
}

#[tokio::test]
async fn text_more_is_appended() -> TestResult {
    let h = harness().await?;
    let post = json!({"title": "More", "description": "<p>A</p>", "mt_text_more": "<p>B</p>"});
    let id = new_post(&h, post, true).await?;
    assert_eq!(stored_part(&h, &id, PART_BODY).await?, "<p>A</p>");
    assert_eq!(stored_part(&h, &id, PART_EXTENDED).await?, "<p>A</p><p>B</p>");
    Ok(())
}

#[tokio::test]
async fn long_plain_text_is_cut_to_perex() -> TestResult {
    let h = harness().await?;
    let description = format!("<div>{}</div>", "a".repeat(700));
    let id = new_post(&h, post_struct("Long", &description, &[]), true).await?;

    let body = stored_part(&h, &id, PART_BODY).await?;
    assert_eq!(body, format!("<p>{}</p>", "a".repeat(512)));
    assert_eq!(stored_part(&h, &id, PART_EXTENDED).await?, description);

    let post = get_post(&h, &id).await?;
    assert_eq!(post["description"], json!(body));
    Ok(())
}

#[tokio::test]
async fn slug_derived_from_title() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Hello, World! 2024", "x", &["News"]), true).await?;
    let post = get_post(&h, &id).await?;
    assert_eq!(post["url"], "http://blog.test/news/hello-world-2024/");
    Ok(())
}

#[tokio::test]
async fn date_created_round_trips() -> TestResult {
    let h = harness().await?;
    let post = json!({"title": "Dated", "description": "x", "dateCreated": "20230102T03:04:05Z"});
    let id = new_post(&h, post, true).await?;
    let fetched = get_post(&h, &id).await?;
    assert_eq!(fetched["dateCreated"], "2023-01-02 03:04:05");
    Ok(())
}

#[tokio::test]
async fn non_string_date_falls_back_to_now() -> TestResult {
    let h = harness().await?;
    for date in [json!(1700000000), json!({"y": 2023}), json!(false)] {
        let post = json!({"title": format!("Dated {date}"), "description": "x", "dateCreated": date});
        let id = new_post(&h, post, true).await?;
        let fetched = get_post(&h, &id).await?;
        let shown = fetched["dateCreated"].as_str().unwrap_or_default();
        assert!(!shown.is_empty(), "{date}");
        assert!(!shown.starts_with("2023-11-14"), "{shown}");
    }
    Ok(())
}

#[tokio::test]
async fn validation_failure_reports_all_messages() -> TestResult {
    let h = harness().await?;
    let result = h
        .dispatcher
        .call("metaWeblog.newPost", args(json!(["1", USER, PASS, {}, true])))
        .await;
    match result {
        Err(WeblogError::ValidationFailure { reason }) => assert_eq!(
            reason,
            "Title can't be blank, Slug can't be blank, Breadcrumb can't be blank"
        ),
        other => panic!("expected validation failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_title_in_same_archive_rejected() -> TestResult {
    let h = harness().await?;
    new_post(&h, post_struct("Twin", "x", &["News"]), true).await?;
    let second = new_post(&h, post_struct("Twin", "y", &["News"]), true).await;
    assert!(matches!(
        second,
        Err(WeblogError::ValidationFailure { ref reason }) if reason.contains("Slug already in use")
    ));
    // Another archive is fine.
    new_post(&h, post_struct("Twin", "z", &["Misc"]), true).await?;
    Ok(())
}

#[tokio::test]
async fn recent_posts_newest_first_and_idempotent() -> TestResult {
    let h = harness().await?;
    for title in ["One", "Two", "Three", "Four"] {
        new_post(&h, post_struct(title, "x", &["News"]), true).await?;
    }

    let call = || {
        h.dispatcher
            .call("metaWeblog.getRecentPosts", args(json!(["1", USER, PASS, 3])))
    };
    let first = call().await?;
    let second = call().await?;
    assert_eq!(first, second);

    let posts = first.as_array().cloned().unwrap_or_default();
    assert_eq!(posts.len(), 3);

    let mut created = Vec::new();
    for post in &posts {
        let id: PageId = post["postid"].as_str().unwrap_or_default().parse()?;
        let page = h.store.inner.find(id).await?;
        created.push(page.map(|p| p.created_at));
    }
    assert!(created.windows(2).all(|w| w[0] >= w[1]));

    let none = h
        .dispatcher
        .call("metaWeblog.getRecentPosts", args(json!(["1", USER, PASS, 0])))
        .await?;
    assert_eq!(none, json!([]));
    Ok(())
}

#[tokio::test]
async fn edit_without_categories_keeps_parent() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Stay", "x", &["Misc"]), true).await?;

    let ok = h
        .dispatcher
        .call(
            "metaWeblog.editPost",
            args(json!([id, USER, PASS, {"title": "Stayed", "description": "y"}, false])),
        )
        .await?;
    assert_eq!(ok, json!(true));

    let post = get_post(&h, &id).await?;
    assert_eq!(post["title"], "Stayed");
    assert_eq!(post["categories"], json!(["Misc"]));
    Ok(())
}

#[tokio::test]
async fn edit_with_category_moves_post() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Mover", "x", &["Misc"]), true).await?;
    h.dispatcher
        .call(
            "metaWeblog.editPost",
            args(json!([id, USER, PASS, post_struct("Mover", "x", &["News"]), true])),
        )
        .await?;
    let post = get_post(&h, &id).await?;
    assert_eq!(post["categories"], json!(["News"]));
    assert!(h.cache.invalidated().contains(&h.news.url));
    Ok(())
}

#[tokio::test]
async fn edit_unknown_post_is_not_found() -> TestResult {
    let h = harness().await?;
    for id in ["999", "not-a-number"] {
        let result = h
            .dispatcher
            .call(
                "metaWeblog.editPost",
                args(json!([id, USER, PASS, post_struct("X", "x", &[]), true])),
            )
            .await;
        assert!(matches!(result, Err(WeblogError::NotFound { .. })), "{id}");
    }
    Ok(())
}

#[tokio::test]
async fn lenient_edit_failure_still_answers_true() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Fine", "x", &["News"]), true).await?;
    let result = h
        .dispatcher
        .call("metaWeblog.editPost", args(json!([id, USER, PASS, {}, true])))
        .await?;
    assert_eq!(result, json!(true));

    let post = get_post(&h, &id).await?;
    assert_eq!(post["title"], "Fine");
    Ok(())
}

#[tokio::test]
async fn strict_edit_failure_is_reported() -> TestResult {
    let config = BridgeConfig {
        edit_failure_policy: EditFailurePolicy::Strict,
        ..BridgeConfig::default()
    };
    let h = harness_with(config, None).await?;
    let id = new_post(&h, post_struct("Fine", "x", &["News"]), true).await?;
    let result = h
        .dispatcher
        .call("metaWeblog.editPost", args(json!([id, USER, PASS, {}, true])))
        .await;
    assert!(matches!(result, Err(WeblogError::ValidationFailure { .. })));
    Ok(())
}

#[tokio::test]
async fn strict_edit_failure_leaves_parts_alone() -> TestResult {
    let config = BridgeConfig {
        edit_failure_policy: EditFailurePolicy::Strict,
        ..BridgeConfig::default()
    };
    let h = harness_with(config, None).await?;
    let id = new_post(&h, post_struct("Kept", "original", &["News"]), true).await?;
    let result = h
        .dispatcher
        .call(
            "metaWeblog.editPost",
            args(json!([id, USER, PASS, {"description": "clobbered"}, true])),
        )
        .await;
    assert!(matches!(result, Err(WeblogError::ValidationFailure { .. })));
    assert_eq!(stored_part(&h, &id, "body").await?, "<p>original</p>");
    assert_eq!(stored_part(&h, &id, "extended").await?, "original");
    Ok(())
}

#[tokio::test]
async fn delete_then_get_is_not_found() -> TestResult {
    let h = harness().await?;
    let id = new_post(&h, post_struct("Doomed", "x", &["News"]), true).await?;

    let deleted = h
        .dispatcher
        .call("blogger.deletePost", args(json!(["appkey", id, USER, PASS, true])))
        .await?;
    assert_eq!(deleted, json!(true));

    let result = get_post(&h, &id).await;
    assert!(matches!(result, Err(WeblogError::NotFound { .. })));
    assert!(stored_part(&h, &id, PART_BODY).await?.is_empty());

    let again = h
        .dispatcher
        .call("blogger.deletePost", args(json!(["appkey", id, USER, PASS, true])))
        .await;
    assert!(matches!(again, Err(WeblogError::NotFound { .. })));
    Ok(())
}

#[tokio::test]
async fn cache_failure_does_not_fail_mutations() -> TestResult {
    let h = harness_with(BridgeConfig::default(), Some(Arc::new(OfflineCache))).await?;
    let id = new_post(&h, post_struct("Cached", "x", &["News"]), true).await?;
    let edited = h
        .dispatcher
        .call(
            "metaWeblog.editPost",
            args(json!([id, USER, PASS, post_struct("Cached", "y", &[]), true])),
        )
        .await?;
    assert_eq!(edited, json!(true));
    let deleted = h
        .dispatcher
        .call("blogger.deletePost", args(json!(["k", id, USER, PASS])))
        .await?;
    assert_eq!(deleted, json!(true));
    Ok(())
}

#[tokio::test]
async fn media_upload_returns_absolute_url() -> TestResult {
    let h = harness().await?;
    let bits = STANDARD.encode(b"\x89PNG fake");
    let result = h
        .dispatcher
        .call(
            "metaWeblog.newMediaObject",
            args(json!(["1", USER, PASS, {"name": "shot.png", "type": "image/png", "bits": bits}])),
        )
        .await?;
    assert_eq!(result["url"], "http://blog.test/files/shot.png");
    assert_eq!(h.store.media.contents("shot.png"), Some(b"\x89PNG fake".to_vec()));
    Ok(())
}

#[tokio::test]
async fn media_upload_rejects_traversal() -> TestResult {
    let h = harness().await?;
    let result = h
        .dispatcher
        .call(
            "metaWeblog.newMediaObject",
            args(json!(["1", USER, PASS, {"name": "../etc/passwd", "type": "text/plain", "bits": "AA=="}])),
        )
        .await;
    assert!(matches!(result, Err(WeblogError::MediaError { .. })));
    Ok(())
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

async fn post_json(h: &Harness, body: String) -> std::result::Result<Value, Box<dyn Error>> {
    let app = router(h.dispatcher.clone(), 1024 * 1024);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/rpc")
                .header("content-type", "application/json")
                .body(Body::from(body))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn http_call_returns_result_envelope() -> TestResult {
    let h = harness().await?;
    let body = json!({"methodName": "metaWeblog.getCategories", "params": ["1", USER, PASS]});
    let reply = post_json(&h, body.to_string()).await?;
    assert_eq!(reply["result"][0]["title"], "News");
    Ok(())
}

#[tokio::test]
async fn http_faults_carry_codes() -> TestResult {
    let h = harness().await?;

    let bad_login = json!({"methodName": "metaWeblog.getCategories", "params": ["1", USER, "x"]});
    let reply = post_json(&h, bad_login.to_string()).await?;
    assert_eq!(reply["fault"]["faultCode"], 401);

    let missing = json!({"methodName": "metaWeblog.getPost", "params": ["999", USER, PASS]});
    let reply = post_json(&h, missing.to_string()).await?;
    assert_eq!(reply["fault"]["faultCode"], 404);

    let reply = post_json(&h, "not json".to_string()).await?;
    assert_eq!(reply["fault"]["faultCode"], 400);
    Ok(())
}

#[tokio::test]
async fn health_endpoint() -> TestResult {
    let h = harness().await?;
    let app = router(h.dispatcher.clone(), 1024 * 1024);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(value["status"], "ok");
    Ok(())
}
