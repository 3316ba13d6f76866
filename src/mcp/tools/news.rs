//! Tools that query BigKinds directly: search, article detail and count.

use super::{Args, ToolDef, finish};
use crate::bigkinds::{BigKindsClient, ImageResolver, NewsArticle, SearchRequest};
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::responses::{ArticleDetail, ToolResponse, article_response, count_response, search_response};
use crate::widgets::WidgetKind;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_PAGE_SIZE: u32 = 20;
/// Articles fetched from one provider-day when looking up a single ID
const DETAIL_LOOKUP_SIZE: u32 = 200;

/// Input schema for tools taking a keyword and a date period, plus `extra`
/// properties
pub(super) fn keyword_period_schema(extra: Value) -> Value {
    let mut properties = json!({
        "keyword": {
            "type": "string",
            "description": "Search keyword (Korean or English)"
        },
        "start_date": {
            "type": "string",
            "description": "Start date in YYYY-MM-DD format"
        },
        "end_date": {
            "type": "string",
            "description": "End date in YYYY-MM-DD format"
        }
    });
    if let (Value::Object(properties), Value::Object(extra)) = (&mut properties, extra) {
        properties.extend(extra);
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": ["keyword", "start_date", "end_date"],
        "additionalProperties": false
    })
}

/// `search_korean_news`
pub struct SearchNewsHandler {
    client: Arc<BigKindsClient>,
}

impl SearchNewsHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>) -> Self {
        Self { client }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "search_korean_news",
            "Search Korean News",
            "Search Korean news articles from the BigKinds database. Use this to find \
             articles about events, people or issues covered by Korean media. Not for \
             international news outside Korean media or breaking news (data lags about a day).",
        )
        .schema(keyword_period_schema(json!({
            "page": {
                "type": "integer",
                "minimum": 1,
                "description": "Page number (default 1)"
            },
            "page_size": {
                "type": "integer",
                "minimum": 1,
                "description": "Results per page (default 20, max 100)"
            }
        })))
        .open_world()
        .widget(WidgetKind::SearchResults)
        .status("뉴스 검색 중...", "검색 완료")
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let keyword = args.str("keyword")?;
        let start_date = args.str("start_date")?;
        let end_date = args.str("end_date")?;
        let page = args.u32_or("page", 1).max(1);
        let page_size = args
            .u32_or("page_size", DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let request = SearchRequest::new(keyword, start_date, end_date).page(page, page_size);
        let response = self.client.search(&request).await?;

        if !response.success {
            return Ok(ToolResponse::error(
                "API_ERROR",
                response
                    .error_message
                    .as_deref()
                    .unwrap_or("검색에 실패했습니다."),
            ));
        }

        let articles: Vec<Value> = response.articles.iter().map(NewsArticle::to_full).collect();
        Ok(search_response(
            keyword,
            response.total_count,
            page,
            page_size,
            articles,
        ))
    }
}

#[async_trait]
impl ToolHandler for SearchNewsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "search_korean_news",
            "SEARCH_ERROR",
            self.run(&args).await,
        ))
    }
}

/// Provider code and publication day encoded in a BigKinds news ID,
/// e.g. `01101202.20241220110009001`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsId<'a> {
    pub provider_code: &'a str,
    pub date: NaiveDate,
}

impl<'a> NewsId<'a> {
    #[inline]
    pub fn parse(news_id: &'a str) -> Option<Self> {
        let (provider_code, rest) = news_id.split_once('.')?;
        if provider_code.is_empty() {
            return None;
        }

        let digits = rest.get(..8)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(digits, "%Y%m%d").ok()?;

        Some(Self {
            provider_code,
            date,
        })
    }

    #[inline]
    pub fn search_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// `get_article_detail`
pub struct ArticleDetailHandler {
    client: Arc<BigKindsClient>,
    images: Arc<ImageResolver>,
}

impl ArticleDetailHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>, images: Arc<ImageResolver>) -> Self {
        Self { client, images }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "get_article_detail",
            "Get Article Detail",
            "Get the full content of a news article from search results, with publisher, \
             date, URL and image.",
        )
        .schema(json!({
            "type": "object",
            "properties": {
                "news_id": {
                    "type": "string",
                    "description": "Article ID from search results (e.g. \"01101202.20241220110009001\")"
                }
            },
            "required": ["news_id"],
            "additionalProperties": false
        }))
        .open_world()
        .widget(WidgetKind::ArticleDetail)
        .status("기사 불러오는 중...", "기사 조회 완료")
        .widget_accessible()
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let news_id = args.str("news_id")?;
        let Some(parsed) = NewsId::parse(news_id) else {
            return Ok(ToolResponse::error(
                "INVALID_ID",
                format!("잘못된 기사 ID 형식입니다: {}", news_id),
            ));
        };

        let date = parsed.search_date();
        debug!(
            "Looking up article {} (provider {}, {})",
            news_id, parsed.provider_code, date
        );

        // BigKinds has no lookup by ID; list the provider's articles for that day
        let request = SearchRequest::new("", date.as_str(), date.as_str())
            .page(1, DETAIL_LOOKUP_SIZE)
            .providers(vec![parsed.provider_code.to_string()]);
        let response = self.client.search(&request).await?;

        if !response.success {
            return Ok(ToolResponse::error(
                "API_ERROR",
                response
                    .error_message
                    .as_deref()
                    .unwrap_or("검색에 실패했습니다."),
            ));
        }

        let Some(article) = response
            .articles
            .iter()
            .find(|a| a.news_id.as_deref() == Some(news_id))
        else {
            return Ok(ToolResponse::error(
                "NOT_FOUND",
                format!("기사를 찾을 수 없습니다: {}", news_id),
            ));
        };

        let mut images = Vec::new();
        if let Some(raw_url) = article.image_field() {
            images.extend(self.images.resolve(&raw_url).await);
        }

        let detail = ArticleDetail {
            news_id: article
                .news_id
                .clone()
                .unwrap_or_else(|| news_id.to_string()),
            title: article.title.clone(),
            content: article.content.clone().unwrap_or_default(),
            publisher: article.publisher_or_unknown().to_string(),
            published_date: article.news_date.clone().unwrap_or_default(),
            url: article.url.clone(),
            author: article.byline.clone(),
            images,
        };

        Ok(article_response(&detail))
    }
}

#[async_trait]
impl ToolHandler for ArticleDetailHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "get_article_detail",
            "DETAIL_ERROR",
            self.run(&args).await,
        ))
    }
}

/// `count_news_articles`
pub struct CountNewsHandler {
    client: Arc<BigKindsClient>,
}

impl CountNewsHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>) -> Self {
        Self { client }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "count_news_articles",
            "Count News Articles",
            "Count news articles for a keyword without fetching them. Use this to gauge \
             coverage volume before a deeper analysis.",
        )
        .schema(keyword_period_schema(json!({})))
        .open_world()
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let keyword = args.str("keyword")?;
        let start_date = args.str("start_date")?;
        let end_date = args.str("end_date")?;

        let count = self
            .client
            .total_count(keyword, start_date, end_date)
            .await?;

        Ok(count_response(keyword, count, start_date, end_date))
    }
}

#[async_trait]
impl ToolHandler for CountNewsHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "count_news_articles",
            "COUNT_ERROR",
            self.run(&args).await,
        ))
    }
}
