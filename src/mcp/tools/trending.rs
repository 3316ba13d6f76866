use super::{Args, ToolDef, finish, now_kst};
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::responses::{ToolResponse, TrendingIssue, trending_response};
use crate::trends::{TrendingItem, TrendsClient, format_timestamp};
use crate::widgets::WidgetKind;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;
const ISSUE_KEYWORDS: usize = 5;

/// `get_trending_now`
pub struct TrendingNowHandler {
    trends: Arc<TrendsClient>,
}

fn to_issue(item: &TrendingItem) -> TrendingIssue {
    TrendingIssue {
        rank: item.rank,
        title: item.keyword.clone(),
        keywords: item
            .related_terms
            .iter()
            .take(ISSUE_KEYWORDS)
            .cloned()
            .collect(),
        search_volume: item.search_volume.clone(),
        growth_rate: item.growth_rate.clone(),
    }
}

impl TrendingNowHandler {
    #[inline]
    pub fn new(trends: Arc<TrendsClient>) -> Self {
        Self { trends }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "get_trending_now",
            "Get Trending Now",
            "Get trending search keywords in Korea (Google Trends) with search volume and \
             related terms. Use this to discover hot topics to research. Not for historical \
             trends or article search; use search_korean_news for those.",
        )
        .schema(json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Number of trending items to return (default 10, max 50)"
                }
            },
            "additionalProperties": false
        }))
        .widget(WidgetKind::TrendingIssues)
        .status("트렌드 확인 중...", "트렌드 조회 완료")
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let limit = args.u32_or("limit", DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let items = self.trends.trending(limit as usize).await;

        if items.is_empty() {
            return Ok(ToolResponse::inline(
                json!({ "trending": [], "count": 0 }),
                "현재 트렌딩 데이터를 가져올 수 없습니다. 캐시를 업데이트해주세요.",
            ));
        }

        let issues: Vec<TrendingIssue> = items.iter().map(to_issue).collect();
        let date = now_kst()?.format("%Y-%m-%d").to_string();
        let scraped_at = items
            .first()
            .and_then(|item| item.scraped_at)
            .map(format_timestamp);
        let cache_valid = self.trends.is_cache_valid().await;

        Ok(trending_response(&issues, &date)
            .with_meta("cache_valid", json!(cache_valid))
            .with_meta("scraped_at", json!(scraped_at)))
    }
}

#[async_trait]
impl ToolHandler for TrendingNowHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "get_trending_now",
            "TRENDING_ERROR",
            self.run(&args).await,
        ))
    }
}
