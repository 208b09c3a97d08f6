// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the tool
//! talks to Notion, how it talks to the model, and how patient it is.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// Base URL of the Notion REST API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// Value sent in the `Notion-Version` header.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// How many pages the Notion API returns per database query.
///
/// The Notion API maximum is 100.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Maximum length of a single rich-text content string accepted by Notion.
pub const NOTION_RICH_TEXT_LIMIT: usize = 2000;

/// Default property names of the web-clip database.
pub const DEFAULT_TITLE_PROPERTY: &str = "Name";
pub const DEFAULT_SUMMARY_PROPERTY: &str = "summary";
pub const DEFAULT_TAGS_PROPERTY: &str = "Tags";
pub const DEFAULT_CATEGORY_PROPERTY: &str = "Classfiy";
pub const DEFAULT_PROCESSED_PROPERTY: &str = "updated";
pub const DEFAULT_MARKED_PROPERTY: &str = "marked";

/// Display name used in diagnostics for pages without a title.
pub const UNTITLED_PAGE: &str = "Untitled";

/// Separator used when tags are written as a single rich-text value.
pub const TAG_SEPARATOR: &str = ",";

// ---------------------------------------------------------------------------
// Model boundaries
// ---------------------------------------------------------------------------

/// Default OpenAI-compatible chat-completions endpoint (GLM).
pub const DEFAULT_CHAT_COMPLETIONS_URL: &str =
    "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Default model for the chat-completions backend.
pub const DEFAULT_CHAT_MODEL: &str = "glm-4.5-air";

/// Default base URL of a local Ollama server.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default model for the Ollama backend.
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5";

/// The fallback category label ("Other").
pub const FALLBACK_CATEGORY: &str = "其他";

/// Category labels a page may be filed under unless a catalog file is given.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "区块链",
    "ChatGPT",
    "SEO",
    "Web3",
    "Web开发",
    "编程语言",
    "餐饮",
    "产品开发",
    "创业",
    "独立开发",
    "个人管理",
    "公开课",
    "管理",
    "家庭",
    "健康",
    "经济学",
    "开源软件",
    "历史",
    "量化投资",
    "临床试验",
    "领导力",
    "软件开发",
    "社会",
    "生命科学",
    "生物统计",
    "书籍",
    "数据科学",
    "数学",
    "思维",
    "算法",
    "统计学",
    "投资理财",
    "团队管理",
    "外语学习",
    "销售",
    "效率效能",
    "协作",
    "心理学",
    "学习",
    "医药研发",
    "移动开发",
    "移民",
    "英语学习",
    "育儿",
    "远程工作",
    "自媒体",
    "软件推荐",
    "前端开发",
    "写作",
    "教育",
    "金融",
    "自我提升",
    "阅读",
    "自然科学",
    "科普",
    "其他",
    "艺术",
    "Python",
    "Golang",
    "PHP",
    "Nodejs",
    "JavaScript",
    "Vue",
    "React",
    "Nextjs",
];

// ---------------------------------------------------------------------------
// Network patience
// ---------------------------------------------------------------------------

/// Per-request timeout for both Notion and model calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Backoff grows by this much per failed attempt.
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Backoff never exceeds this.
pub const RETRY_BACKOFF_CAP: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing response bodies in errors.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 500;
