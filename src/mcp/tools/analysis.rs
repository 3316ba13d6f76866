//! Tools that fetch a batch of articles and aggregate them.

use super::news::keyword_period_schema;
use super::{Args, ToolDef, check_period, finish};
use crate::analysis::{
    Granularity, build_report, build_timeline, collect_image_candidates, compare_publishers,
    select_images,
};
use crate::bigkinds::{BigKindsClient, ImageResolver, SearchRequest, SearchResponse};
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::responses::{ToolResponse, perspectives_response, report_response, timeline_response};
use crate::widgets::WidgetKind;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Articles fetched for one analysis
const ANALYSIS_FETCH_SIZE: u32 = 1000;
const MAX_TIMELINE_DAYS: i64 = 365;
const DEFAULT_PUBLISHER_LIMIT: u32 = 10;

/// Fetch up to [`ANALYSIS_FETCH_SIZE`] articles, newest first. `Err` carries
/// the tool response for an upstream rejection.
async fn fetch_for_analysis(
    client: &BigKindsClient,
    keyword: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Result<SearchResponse, ToolResponse>> {
    let request = SearchRequest::new(keyword, start_date, end_date)
        .page(1, ANALYSIS_FETCH_SIZE)
        .sort_method("date");
    let response = client.search(&request).await?;

    if !response.success {
        return Ok(Err(ToolResponse::error(
            "API_ERROR",
            response
                .error_message
                .as_deref()
                .unwrap_or("검색에 실패했습니다."),
        )));
    }

    debug!(
        "Fetched {} of {} articles for '{}'",
        response.articles.len(),
        response.total_count,
        keyword
    );
    Ok(Ok(response))
}

/// `analyze_timeline`
pub struct AnalyzeTimelineHandler {
    client: Arc<BigKindsClient>,
}

impl AnalyzeTimelineHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>) -> Self {
        Self { client }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "analyze_timeline",
            "Analyze News Timeline",
            "Analyze how news coverage of a keyword (person, issue, topic) evolved over \
             time: article counts per day, week or month with top publishers and \
             representative headlines. Use this to find peak coverage dates or follow a \
             story's lifecycle. At most 365 days.",
        )
        .schema(keyword_period_schema(json!({
            "granularity": {
                "type": "string",
                "description": "Time grouping: \"day\", \"week\" or \"month\" (default \"day\")"
            }
        })))
        .open_world()
        .widget(WidgetKind::Timeline)
        .status("타임라인 분석 중...", "타임라인 분석 완료")
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let keyword = args.str("keyword")?;
        let start_date = args.str("start_date")?;
        let end_date = args.str("end_date")?;
        let granularity = Granularity::parse(args.str_or("granularity", "day"));

        if let Some(rejection) = check_period(start_date, end_date, Some(MAX_TIMELINE_DAYS)) {
            return Ok(rejection);
        }

        let response =
            match fetch_for_analysis(&self.client, keyword, start_date, end_date).await? {
                Ok(response) => response,
                Err(rejection) => return Ok(rejection),
            };

        let timeline = build_timeline(&response.articles, granularity);
        Ok(timeline_response(
            keyword,
            start_date,
            end_date,
            &timeline,
            response.total_count,
        ))
    }
}

#[async_trait]
impl ToolHandler for AnalyzeTimelineHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "analyze_timeline",
            "ANALYSIS_ERROR",
            self.run(&args).await,
        ))
    }
}

/// `compare_perspectives`
pub struct ComparePerspectivesHandler {
    client: Arc<BigKindsClient>,
}

impl ComparePerspectivesHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>) -> Self {
        Self { client }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "compare_perspectives",
            "Compare Publisher Perspectives",
            "Compare how different news publishers cover the same topic: article counts, \
             active date range, representative headlines and category mix per publisher.",
        )
        .schema(keyword_period_schema(json!({
            "limit": {
                "type": "integer",
                "minimum": 1,
                "description": "Maximum number of publishers to compare (default 10)"
            }
        })))
        .open_world()
        .widget(WidgetKind::Perspectives)
        .status("언론사별 보도 비교 중...", "언론사 비교 완료")
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let keyword = args.str("keyword")?;
        let start_date = args.str("start_date")?;
        let end_date = args.str("end_date")?;
        let limit = args.u32_or("limit", DEFAULT_PUBLISHER_LIMIT).max(1);

        if let Some(rejection) = check_period(start_date, end_date, None) {
            return Ok(rejection);
        }

        let response =
            match fetch_for_analysis(&self.client, keyword, start_date, end_date).await? {
                Ok(response) => response,
                Err(rejection) => return Ok(rejection),
            };

        let publishers = compare_publishers(&response.articles, limit as usize);
        Ok(perspectives_response(
            keyword,
            start_date,
            end_date,
            &publishers,
            response.total_count,
        ))
    }
}

#[async_trait]
impl ToolHandler for ComparePerspectivesHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "compare_perspectives",
            "ANALYSIS_ERROR",
            self.run(&args).await,
        ))
    }
}

/// `generate_report`
pub struct GenerateReportHandler {
    client: Arc<BigKindsClient>,
    images: Arc<ImageResolver>,
}

impl GenerateReportHandler {
    #[inline]
    pub fn new(client: Arc<BigKindsClient>, images: Arc<ImageResolver>) -> Self {
        Self { client, images }
    }

    #[inline]
    pub fn tool_definition() -> Tool {
        ToolDef::new(
            "generate_report",
            "Generate Deep Analysis Report",
            "Generate a deep analysis report for a topic, person or issue combining the \
             coverage timeline, publisher comparison, key events (coverage spikes) and an \
             article image gallery.",
        )
        .schema(keyword_period_schema(json!({})))
        .open_world()
        .widget(WidgetKind::Report)
        .status("심층 리포트 생성 중...", "리포트 생성 완료")
        .build()
    }

    async fn run(&self, args: &Args) -> Result<ToolResponse> {
        let keyword = args.str("keyword")?;
        let start_date = args.str("start_date")?;
        let end_date = args.str("end_date")?;

        if let Some(rejection) = check_period(start_date, end_date, None) {
            return Ok(rejection);
        }

        let response =
            match fetch_for_analysis(&self.client, keyword, start_date, end_date).await? {
                Ok(response) => response,
                Err(rejection) => return Ok(rejection),
            };

        if response.articles.is_empty() {
            return Ok(ToolResponse::error(
                "NO_DATA",
                format!("'{}' 관련 기사를 찾을 수 없습니다.", keyword),
            ));
        }

        let report = build_report(&response.articles, response.total_count);

        let candidates = collect_image_candidates(&response.articles);
        let raw_urls: Vec<String> = candidates.iter().map(|c| c.raw_url.clone()).collect();
        let resolved = self.images.resolve_batch(&raw_urls).await;
        let images = select_images(&candidates, &resolved);
        debug!(
            "Report images: {} of {} candidates resolved",
            images.len(),
            candidates.len()
        );

        Ok(report_response(
            keyword,
            start_date,
            end_date,
            &report,
            json!(images),
        ))
    }
}

#[async_trait]
impl ToolHandler for GenerateReportHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = Args::from_params(params);
        Ok(finish(
            "generate_report",
            "REPORT_ERROR",
            self.run(&args).await,
        ))
    }
}
