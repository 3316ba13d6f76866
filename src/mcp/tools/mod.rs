//! MCP Tools Implementation
//!
//! Tool descriptors and handlers. Every handler answers with a three-part
//! [`ToolResponse`]; failures become `isError` results carrying a short
//! error code rather than JSON-RPC errors.

#[cfg(test)]
mod tests;

mod analysis;
mod news;
mod reference;
mod trending;

pub use analysis::{AnalyzeTimelineHandler, ComparePerspectivesHandler, GenerateReportHandler};
pub use news::{ArticleDetailHandler, CountNewsHandler, SearchNewsHandler};
pub use reference::{
    CATEGORIES, FindCategoryHandler, KoreanTimeHandler, ListProvidersHandler, PROVIDER_GROUPS,
};
pub use trending::TrendingNowHandler;

use crate::bigkinds::{BigKindsClient, ImageResolver};
use crate::mcp::protocol::{CallToolParams, CallToolResult, Tool, ToolAnnotations};
use crate::mcp::server::McpServer;
use crate::responses::{OUTPUT_TEMPLATE_KEY, ToolResponse};
use crate::trends::TrendsClient;
use crate::widgets::WidgetKind;
use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

const INVOKING_KEY: &str = "openai/toolInvocation/invoking";
const INVOKED_KEY: &str = "openai/toolInvocation/invoked";
const WIDGET_ACCESSIBLE_KEY: &str = "openai/widgetAccessible";

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Clients shared by the tool handlers
#[derive(Clone)]
pub struct ToolContext {
    pub bigkinds: Arc<BigKindsClient>,
    pub images: Arc<ImageResolver>,
    pub trends: Arc<TrendsClient>,
}

/// Register every tool with the server
#[inline]
pub async fn register_all(server: &McpServer, ctx: &ToolContext) -> Result<()> {
    server
        .register_tool(
            SearchNewsHandler::tool_definition(),
            SearchNewsHandler::new(Arc::clone(&ctx.bigkinds)),
        )
        .await?;
    server
        .register_tool(
            ArticleDetailHandler::tool_definition(),
            ArticleDetailHandler::new(Arc::clone(&ctx.bigkinds), Arc::clone(&ctx.images)),
        )
        .await?;
    server
        .register_tool(
            CountNewsHandler::tool_definition(),
            CountNewsHandler::new(Arc::clone(&ctx.bigkinds)),
        )
        .await?;
    server
        .register_tool(KoreanTimeHandler::tool_definition(), KoreanTimeHandler)
        .await?;
    server
        .register_tool(ListProvidersHandler::tool_definition(), ListProvidersHandler)
        .await?;
    server
        .register_tool(FindCategoryHandler::tool_definition(), FindCategoryHandler)
        .await?;
    server
        .register_tool(
            TrendingNowHandler::tool_definition(),
            TrendingNowHandler::new(Arc::clone(&ctx.trends)),
        )
        .await?;
    server
        .register_tool(
            AnalyzeTimelineHandler::tool_definition(),
            AnalyzeTimelineHandler::new(Arc::clone(&ctx.bigkinds)),
        )
        .await?;
    server
        .register_tool(
            ComparePerspectivesHandler::tool_definition(),
            ComparePerspectivesHandler::new(Arc::clone(&ctx.bigkinds)),
        )
        .await?;
    server
        .register_tool(
            GenerateReportHandler::tool_definition(),
            GenerateReportHandler::new(Arc::clone(&ctx.bigkinds), Arc::clone(&ctx.images)),
        )
        .await?;

    Ok(())
}

/// Builder for tool descriptors with Apps SDK metadata
struct ToolDef {
    name: &'static str,
    title: &'static str,
    description: &'static str,
    input_schema: Value,
    open_world: bool,
    widget: Option<WidgetKind>,
    status: Option<(&'static str, &'static str)>,
    widget_accessible: bool,
}

impl ToolDef {
    fn new(name: &'static str, title: &'static str, description: &'static str) -> Self {
        Self {
            name,
            title,
            description,
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            open_world: false,
            widget: None,
            status: None,
            widget_accessible: false,
        }
    }

    fn schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }

    /// The tool calls an external API
    fn open_world(mut self) -> Self {
        self.open_world = true;
        self
    }

    fn widget(mut self, widget: WidgetKind) -> Self {
        self.widget = Some(widget);
        self
    }

    /// Status lines the host shows while and after the tool runs
    fn status(mut self, invoking: &'static str, invoked: &'static str) -> Self {
        self.status = Some((invoking, invoked));
        self
    }

    /// Widgets may call this tool themselves
    fn widget_accessible(mut self) -> Self {
        self.widget_accessible = true;
        self
    }

    fn build(self) -> Tool {
        let mut meta = Map::new();
        if let Some(widget) = self.widget {
            meta.insert(OUTPUT_TEMPLATE_KEY.to_string(), json!(widget.uri()));
        }
        if let Some((invoking, invoked)) = self.status {
            meta.insert(INVOKING_KEY.to_string(), json!(invoking));
            meta.insert(INVOKED_KEY.to_string(), json!(invoked));
        }
        if self.widget_accessible {
            meta.insert(WIDGET_ACCESSIBLE_KEY.to_string(), json!(true));
        }

        Tool {
            name: self.name.to_string(),
            title: Some(self.title.to_string()),
            description: Some(self.description.to_string()),
            input_schema: self.input_schema,
            annotations: Some(ToolAnnotations::read_only(self.title, self.open_world)),
            meta: (!meta.is_empty()).then_some(meta),
        }
    }
}

/// Tool arguments, already checked against the input schema
struct Args(HashMap<String, Value>);

impl Args {
    fn from_params(params: CallToolParams) -> Self {
        Self(params.arguments.unwrap_or_default())
    }

    fn str(&self, key: &str) -> Result<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("Missing required parameter: {}", key))
    }

    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.0.get(key).and_then(Value::as_str).unwrap_or(default)
    }

    fn u32_or(&self, key: &str, default: u32) -> u32 {
        self.0
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }
}

/// Turn a handler outcome into the MCP result, mapping failures to `code`
fn finish(tool: &str, code: &str, outcome: Result<ToolResponse>) -> CallToolResult {
    match outcome {
        Ok(response) => response.into_call_result(),
        Err(e) => {
            error!("{} failed: {:#}", tool, e);
            ToolResponse::error(code, format!("{:#}", e)).into_call_result()
        }
    }
}

/// Current time in Korea (UTC+9)
fn now_kst() -> Result<DateTime<FixedOffset>> {
    let offset =
        FixedOffset::east_opt(KST_OFFSET_SECS).ok_or_else(|| anyhow!("invalid KST offset"))?;
    Ok(Utc::now().with_timezone(&offset))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Reject malformed or reversed periods, and periods longer than `max_days`
fn check_period(start_date: &str, end_date: &str, max_days: Option<i64>) -> Option<ToolResponse> {
    let (Some(start), Some(end)) = (parse_date(start_date), parse_date(end_date)) else {
        return Some(ToolResponse::error(
            "INVALID_DATE",
            format!(
                "날짜 형식 오류: {} ~ {} (YYYY-MM-DD 형식이어야 합니다)",
                start_date, end_date
            ),
        ));
    };

    let days = end.signed_duration_since(start).num_days();
    if days < 0 {
        return Some(ToolResponse::error(
            "INVALID_RANGE",
            "종료일이 시작일보다 빠릅니다.",
        ));
    }
    if let Some(max_days) = max_days.filter(|max| days > *max) {
        return Some(ToolResponse::error(
            "INVALID_RANGE",
            format!(
                "날짜 범위가 너무 넓습니다. 최대 {}일까지 분석 가능합니다.",
                max_days
            ),
        ));
    }

    None
}
