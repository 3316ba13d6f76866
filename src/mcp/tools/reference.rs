//! Tools answering from static data or the clock.

use super::{Args, ToolDef, finish, now_kst};
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::responses::ToolResponse;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Major outlets indexed by BigKinds, by group
pub const PROVIDER_GROUPS: [(&str, &[&str]); 4] = [
    (
        "전국일간지",
        &[
            "경향신문",
            "국민일보",
            "동아일보",
            "문화일보",
            "서울신문",
            "세계일보",
            "조선일보",
            "중앙일보",
            "한겨레",
            "한국일보",
        ],
    ),
    (
        "경제지",
        &[
            "매일경제",
            "머니투데이",
            "서울경제",
            "아시아경제",
            "이데일리",
            "조선비즈",
            "파이낸셜뉴스",
            "한국경제",
        ],
    ),
    (
        "방송사",
        &["KBS", "MBC", "SBS", "JTBC", "채널A", "TV조선", "MBN", "YTN"],
    ),
    ("통신사", &["연합뉴스", "뉴시스", "뉴스1"]),
];

/// BigKinds top-level category codes
pub const CATEGORIES: [(&str, &str); 8] = [
    ("정치", "001000000"),
    ("경제", "002000000"),
    ("사회", "003000000"),
    ("문화", "004000000"),
    ("국제", "005000000"),
    ("지역", "006000000"),
    ("스포츠", "007000000"),
    ("IT_과학", "008000000"),
];

const PROVIDER_PREVIEW: usize = 5;

/// `get_korean_time`
pub struct KoreanTimeHandler;

impl KoreanTimeHandler {
    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "get_korean_time",
            "Get Korean Time",
            "Get the current Korean time (KST). Use this when the user asks for the current \
             time or today's date, or to resolve relative dates like \"last week\".",
        )
        .build()
    }

    fn run() -> Result<ToolResponse> {
        let now = now_kst()?;

        Ok(ToolResponse::inline(
            json!({
                "datetime": now.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
                "date": now.format("%Y-%m-%d").to_string(),
                "time": now.format("%H:%M:%S").to_string(),
                "timezone": "KST (UTC+9)",
            }),
            format!(
                "현재 한국 시간: {}",
                now.format("%Y년 %m월 %d일 %H시 %M분")
            ),
        ))
    }
}

#[async_trait]
impl ToolHandler for KoreanTimeHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(finish("get_korean_time", "TIME_ERROR", Self::run()))
    }
}

/// `list_news_providers`
pub struct ListProvidersHandler;

impl ListProvidersHandler {
    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "list_news_providers",
            "List News Providers",
            "List the Korean news providers (언론사) available in BigKinds, grouped by type. \
             Use this to see which sources exist before filtering by publisher.",
        )
        .build()
    }

    fn response() -> ToolResponse {
        let total: usize = PROVIDER_GROUPS.iter().map(|(_, names)| names.len()).sum();
        let groups: Map<String, Value> = PROVIDER_GROUPS
            .iter()
            .map(|(group, names)| ((*group).to_string(), json!(names)))
            .collect();
        let preview = PROVIDER_GROUPS[0]
            .1
            .iter()
            .take(PROVIDER_PREVIEW)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");

        ToolResponse::inline(
            json!({
                "provider_count": total,
                "categories": PROVIDER_GROUPS.iter().map(|(group, _)| *group).collect::<Vec<_>>(),
                "providers": groups,
            }),
            format!(
                "총 {}개 언론사가 등록되어 있습니다. 주요 언론사: {}...",
                total, preview
            ),
        )
    }
}

#[async_trait]
impl ToolHandler for ListProvidersHandler {
    #[inline]
    async fn handle(&self, _params: CallToolParams) -> Result<CallToolResult> {
        Ok(Self::response().into_call_result())
    }
}

/// `find_news_category`
pub struct FindCategoryHandler;

impl FindCategoryHandler {
    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "find_news_category",
            "Find News Category",
            "Look up a BigKinds news category code by name (정치, 경제, 사회, 문화, 국제, \
             지역, 스포츠, IT_과학).",
        )
        .schema(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Category name or part of it"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }))
        .build()
    }

    /// Case-insensitive substring match against category names
    #[inline]
    pub fn lookup(query: &str) -> Vec<(&'static str, &'static str)> {
        let query = query.to_lowercase();
        CATEGORIES
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&query))
            .copied()
            .collect()
    }

    fn run(args: &Args) -> Result<ToolResponse> {
        let query = args.str("query")?;
        let matches = Self::lookup(query);

        if matches.is_empty() {
            let available = CATEGORIES
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(ToolResponse::inline(
                json!({ "query": query, "matches": [] }),
                format!(
                    "'{}'에 해당하는 카테고리를 찾을 수 없습니다. 가능한 카테고리: {}",
                    query, available
                ),
            ));
        }

        let names = matches
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let matches: Vec<Value> = matches
            .iter()
            .map(|(name, code)| json!({ "name": name, "code": code, "type": "category" }))
            .collect();

        Ok(ToolResponse::inline(
            json!({ "query": query, "matches": matches }),
            format!("'{}' 검색 결과: {}", query, names),
        ))
    }
}

#[async_trait]
impl ToolHandler for FindCategoryHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish("find_news_category", "CATEGORY_ERROR", Self::run(&args)))
    }
}
