//! End-to-end runs against a mock Notion API.
//!
//! Notion is served by wiremock; the model is either a canned in-memory
//! backend or a mocked chat-completions endpoint.

use notion_autotag::{
    ApiKey, AppError, CategoryCatalog, ChatCompletionBackend, ClipProcessor, CompletionBackend,
    DatabaseId, LlmClient, NotionHttpClient, NotionToken, PageId, PageOutcome, PagePipeline,
    PropertyNames, RetryPolicy, Stage, ValidatedUrl,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const DB_ID: &str = "49876327f45048f7ac6c4f78b39a2ffc";
const PAGE_A: &str = "2ca214d6-fefa-4a1c-8fa4-20c81b5c2c83";
const PAGE_B: &str = "550e8400-e29b-41d4-a716-446655440000";
const PAGE_C: &str = "9b2f6c1e-3d4a-4e5f-8a7b-0c1d2e3f4a5b";

/// Answers tagging prompts and classification prompts with fixed text.
struct CannedModel {
    tagging: String,
    category: String,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl CompletionBackend for CannedModel {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if user.contains("可选分类列表") {
            Ok(self.category.clone())
        } else {
            Ok(self.tagging.clone())
        }
    }

    fn name(&self) -> &str {
        "canned"
    }
}

fn canned_llm(tagging: &str, category: &str) -> (LlmClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = CannedModel {
        tagging: tagging.to_string(),
        category: category.to_string(),
        calls: calls.clone(),
    };
    (LlmClient::new(Box::new(backend)), calls)
}

fn notion_client(server: &MockServer) -> NotionHttpClient {
    let token = NotionToken::new("secret_test_token_0123456789").unwrap();
    NotionHttpClient::new(&token, Duration::from_secs(5), RetryPolicy::bounded(1))
        .unwrap()
        .with_api_base(format!("{}/v1", server.uri()))
}

fn processor(server: &MockServer, llm: LlmClient) -> (ClipProcessor, String) {
    let notion = notion_client(server);
    let query_url = notion.database_query_url(&DatabaseId::parse(DB_ID).unwrap());
    let pipeline = PagePipeline::new(
        Arc::new(notion),
        llm,
        CategoryCatalog::default(),
        PropertyNames::default(),
    );
    (ClipProcessor::new(pipeline), query_url)
}

fn query_path() -> String {
    format!("/v1/databases/{}/query", DatabaseId::parse(DB_ID).unwrap().to_dashed())
}

fn clip(id: &str, title: &str, summary: &str, processed: bool) -> Value {
    json!({
        "object": "page",
        "id": id,
        "properties": {
            "Name": {"type": "title", "title": [{"type": "text", "plain_text": title}]},
            "summary": {"type": "rich_text", "rich_text": [{"type": "text", "plain_text": summary}]},
            "Tags": {"type": "rich_text", "rich_text": []},
            "Classfiy": {"type": "select", "select": null},
            "updated": {"type": "checkbox", "checkbox": processed}
        }
    })
}

fn results(pages: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "object": "list",
        "results": pages,
        "next_cursor": next_cursor,
        "has_more": next_cursor.is_some()
    })
}

async fn patches(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .collect()
}

async fn mount_patch_ok(server: &MockServer, expected: u64) {
    Mock::given(method("PATCH"))
        .and(path_regex("^/v1/pages/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "page"})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_database_means_nothing_to_do() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;
    mount_patch_ok(&server, 0).await;

    let (llm, calls) = canned_llm("{}", "Rust");
    let (mut processor, query_url) = processor(&server, llm);
    let summary = processor.process_database(&query_url, None).await.unwrap();

    assert_eq!(summary.batches, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn processed_pages_are_left_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![clip(PAGE_A, "Done", "text", true)], None)),
        )
        .mount(&server)
        .await;
    mount_patch_ok(&server, 0).await;

    let (llm, calls) = canned_llm("{}", "Rust");
    let (mut processor, query_url) = processor(&server, llm);
    let summary = processor.process_database(&query_url, None).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn query_filters_on_the_processed_checkbox_and_forwards_the_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .and(body_partial_json(json!({
            "filter": {"property": "updated", "checkbox": {"equals": false}},
            "page_size": 100,
            "start_cursor": "resume-here"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let (llm, _) = canned_llm("{}", "Rust");
    let (mut processor, query_url) = processor(&server, llm);
    processor
        .process_database(&query_url, Some("resume-here".to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn follows_cursors_across_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .and(body_partial_json(json!({"start_cursor": "c2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![clip(PAGE_B, "Second", "Go 并发模型", false)],
            None,
        )))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![clip(PAGE_A, "First", "Rust 所有权", false)],
            Some("c2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_patch_ok(&server, 2).await;

    let (llm, _) = canned_llm(r#"{"summary": "s", "tags": ["编程"]}"#, "分类：编程语言");
    let (mut processor, query_url) = processor(&server, llm);
    let summary = processor.process_database(&query_url, None).await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.last_cursor.as_deref(), Some("c2"));

    let written: Vec<String> = patches(&server)
        .await
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        written,
        vec![format!("/v1/pages/{}", PAGE_A), format!("/v1/pages/{}", PAGE_B)]
    );
}

#[tokio::test]
async fn write_carries_tags_category_and_processed_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![clip(PAGE_A, "Clip", "disable-devtool 介绍", false)],
            None,
        )))
        .mount(&server)
        .await;
    mount_patch_ok(&server, 1).await;

    let (llm, _) = canned_llm(
        "```json\n{'summary': '禁用开发者工具', 'tags': ['npm', '安全', 'npm']}\n```",
        "分类名称：前端开发",
    );
    let (mut processor, query_url) = processor(&server, llm);
    processor.process_database(&query_url, None).await.unwrap();

    let body: Value = patches(&server).await[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "properties": {
                "Tags": {
                    "type": "rich_text",
                    "rich_text": [{"type": "text", "text": {"content": "npm,安全", "link": null}}]
                },
                "Classfiy": {"select": {"name": "前端开发"}},
                "updated": {"type": "checkbox", "checkbox": true}
            }
        })
    );
}

#[tokio::test]
async fn empty_choices_degrade_tags_but_still_classify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![clip(PAGE_A, "Index", "B+ 树索引", false)],
            None,
        )))
        .mount(&server)
        .await;
    mount_patch_ok(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "数据科学"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = ChatCompletionBackend::new(
        &ApiKey::new("test-key").unwrap(),
        ValidatedUrl::parse(&format!("{}/chat/completions", server.uri())).unwrap(),
        "glm-4.5-air",
        Duration::from_secs(5),
        RetryPolicy::bounded(1),
    )
    .unwrap();
    let (mut processor, query_url) = processor(&server, LlmClient::new(Box::new(backend)));
    let summary = processor.process_database(&query_url, None).await.unwrap();
    assert_eq!(summary.updated, 1);

    let body: Value = patches(&server).await[0].body_json().unwrap();
    assert!(body["properties"].get("Tags").is_none());
    assert_eq!(body["properties"]["Classfiy"]["select"]["name"], "数据科学");
    assert_eq!(body["properties"]["updated"]["checkbox"], true);
}

fn three_pages() -> Value {
    results(
        vec![
            clip(PAGE_A, "A", "first", false),
            clip(PAGE_B, "B", "second", false),
            clip(PAGE_C, "C", "third", false),
        ],
        None,
    )
}

async fn mount_failing_write(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(three_pages()))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/v1/pages/{}", PAGE_B)))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "object": "error",
            "status": 500,
            "code": "internal_server_error",
            "message": "Unexpected error"
        })))
        .with_priority(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn failed_write_stops_the_run_and_keeps_earlier_writes() {
    let server = MockServer::start().await;
    mount_failing_write(&server).await;
    mount_patch_ok(&server, 1).await;

    let (llm, _) = canned_llm(r#"{"summary": "s", "tags": ["t"]}"#, "其他");
    let (mut processor, query_url) = processor(&server, llm);
    let err = processor
        .process_database(&query_url, None)
        .await
        .unwrap_err();

    match err {
        AppError::HttpStatus { status, .. } => assert_eq!(status.as_u16(), 500),
        other => panic!("expected a status error, got {other:?}"),
    }
    let written: Vec<String> = patches(&server)
        .await
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        written,
        vec![format!("/v1/pages/{}", PAGE_A), format!("/v1/pages/{}", PAGE_B)]
    );
}

#[tokio::test]
async fn keep_going_skips_past_a_failed_write() {
    let server = MockServer::start().await;
    mount_failing_write(&server).await;
    mount_patch_ok(&server, 2).await;

    let (llm, _) = canned_llm(r#"{"summary": "s", "tags": ["t"]}"#, "其他");
    let (processor, query_url) = processor(&server, llm);
    let summary = processor
        .keep_going(true)
        .process_database(&query_url, None)
        .await
        .unwrap();

    assert_eq!((summary.updated, summary.failed), (2, 1));
}

#[tokio::test]
async fn single_page_is_fetched_and_updated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/pages/{}", PAGE_A)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(clip(PAGE_A, "One", "Tokio 调度器", false)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_patch_ok(&server, 1).await;

    let (llm, _) = canned_llm(r#"{"summary": "s", "tags": ["tokio"]}"#, "软件开发");
    let (mut processor, _) = processor(&server, llm);
    let outcome = processor
        .process_single_page(&PageId::parse(PAGE_A).unwrap())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PageOutcome::Updated {
            tags: vec!["tokio".to_string()],
            category: "软件开发".to_string(),
        }
    );
}

#[tokio::test]
async fn empty_page_response_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/pages/{}", PAGE_A)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (llm, _) = canned_llm("{}", "Rust");
    let (mut processor, _) = processor(&server, llm);
    let err = processor
        .process_single_page(&PageId::parse(PAGE_A).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PageNotFound(_)));
}

/// Answers a summary prompt with the first two lines of the article it was given.
struct FirstLines;

#[async_trait::async_trait]
impl CompletionBackend for FirstLines {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, AppError> {
        Ok(user.lines().take(2).collect::<Vec<_>>().join(" / "))
    }

    fn name(&self) -> &str {
        "first-lines"
    }
}

fn marked_clip(id: &str, title: &str, marked: bool) -> Value {
    json!({
        "object": "page",
        "id": id,
        "properties": {
            "Name": {"type": "title", "title": [{"type": "text", "plain_text": title}]},
            "summary": {"type": "rich_text", "rich_text": []},
            "Classfiy": {"type": "select", "select": {"name": "编程语言"}},
            "marked": {"type": "checkbox", "checkbox": marked}
        }
    })
}

fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {"rich_text": [{"type": "text", "plain_text": text}]}
    })
}

fn children_path(id: &str) -> String {
    format!("/v1/blocks/{}/children", id)
}

#[tokio::test]
async fn summarize_reads_every_block_batch_and_writes_summary_with_mark() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .and(body_partial_json(json!({
            "filter": {"property": "marked", "checkbox": {"equals": false}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![marked_clip(PAGE_A, "Tokio", false)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children_path(PAGE_A)))
        .and(query_param("page_size", "100"))
        .and(query_param("start_cursor", "b2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(results(vec![paragraph("第二段")], None)),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children_path(PAGE_A)))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![
                json!({"object": "block", "type": "heading_2", "heading_2": {"rich_text": []}}),
                paragraph("第一段"),
            ],
            Some("b2"),
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_patch_ok(&server, 1).await;

    let (processor, query_url) = processor(&server, LlmClient::new(Box::new(FirstLines)));
    let summary = processor
        .stage(Stage::Summarize { category: None })
        .process_database(&query_url, None)
        .await
        .unwrap();
    assert_eq!(summary.updated, 1);

    let body: Value = patches(&server).await[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "properties": {
                "summary": {
                    "type": "rich_text",
                    "rich_text": [{"type": "text", "text": {"content": "第一段 / 第二段", "link": null}}]
                },
                "marked": {"type": "checkbox", "checkbox": true}
            }
        })
    );
}

#[tokio::test]
async fn category_run_resummarizes_marked_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .and(body_partial_json(json!({
            "filter": {"property": "Classfiy", "select": {"equals": "编程语言"}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![marked_clip(PAGE_A, "Tokio", true)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children_path(PAGE_A)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(results(vec![paragraph("正文")], None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_patch_ok(&server, 1).await;

    let (processor, query_url) = processor(&server, LlmClient::new(Box::new(FirstLines)));
    let summary = processor
        .stage(Stage::Summarize {
            category: Some("编程语言".to_string()),
        })
        .process_database(&query_url, None)
        .await
        .unwrap();
    assert_eq!(summary.updated, 1);
}

#[tokio::test]
async fn page_without_paragraphs_is_not_summarized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(query_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(results(vec![marked_clip(PAGE_A, "Image", false)], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(children_path(PAGE_A)))
        .respond_with(ResponseTemplate::new(200).set_body_json(results(
            vec![json!({"object": "block", "type": "image", "image": {"type": "external"}})],
            None,
        )))
        .mount(&server)
        .await;
    mount_patch_ok(&server, 0).await;

    let (llm, calls) = canned_llm("摘要", "其他");
    let (processor, query_url) = processor(&server, llm);
    let summary = processor
        .stage(Stage::Summarize { category: None })
        .process_database(&query_url, None)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
