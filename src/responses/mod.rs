//! Three-part tool responses.
//!
//! Every tool answers with:
//! - `structuredContent`: a small JSON summary the model reads (token cost matters)
//! - `content`: a short Korean text summary
//! - `_meta`: widget-only data the model never sees (`full_data`, template, CSP)


use crate::analysis::{PublisherCoverage, Report, TimelinePoint, first_peak};
use crate::mcp::protocol::{CallToolResult, ToolContent};
use crate::widgets::WidgetKind;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt::Write as _;

/// Image hosts a widget may load from
pub const WIDGET_CSP_DOMAINS: [&str; 12] = [
    "*.bigkinds.or.kr",
    "*.chosun.com",
    "*.donga.com",
    "*.joongang.co.kr",
    "*.hankyung.com",
    "*.mk.co.kr",
    "*.hani.co.kr",
    "*.khan.co.kr",
    "*.kbs.co.kr",
    "*.sbs.co.kr",
    "*.mbc.co.kr",
    "*.yna.co.kr",
];

pub const OUTPUT_TEMPLATE_KEY: &str = "openai/outputTemplate";
pub const WIDGET_CSP_KEY: &str = "openai/widgetCSP";
pub const FULL_DATA_KEY: &str = "full_data";

const MODEL_TOP_ARTICLES: usize = 5;
const MODEL_TOP_ISSUES: usize = 5;
const MODEL_ISSUE_KEYWORDS: usize = 3;
const MODEL_TOP_PUBLISHERS: usize = 5;
const REPORT_TOP_PUBLISHERS: usize = 3;
const SEARCH_TITLE_CHARS: usize = 50;
const TRENDING_TITLE_CHARS: usize = 30;
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub structured: Value,
    pub content: String,
    pub meta: Map<String, Value>,
    pub is_error: bool,
}

impl ToolResponse {
    #[inline]
    pub fn success(structured: Value, content: impl Into<String>) -> Self {
        Self {
            structured,
            content: content.into(),
            meta: Map::new(),
            is_error: false,
        }
    }

    /// Response without any widget data
    #[inline]
    pub fn inline(structured: Value, content: impl Into<String>) -> Self {
        Self::success(structured, content)
    }

    #[inline]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut meta = Map::new();
        meta.insert("error_code".to_string(), json!(code));
        meta.insert("error_message".to_string(), json!(message));

        Self {
            structured: json!({ "error": true, "code": code }),
            content: format!("오류: {}", message),
            meta,
            is_error: true,
        }
    }

    /// Render with `widget` and allow the news image hosts
    #[inline]
    #[must_use]
    pub fn with_widget(mut self, widget: WidgetKind) -> Self {
        self.meta
            .insert(OUTPUT_TEMPLATE_KEY.to_string(), json!(widget.uri()));
        self.meta
            .insert(WIDGET_CSP_KEY.to_string(), json!(WIDGET_CSP_DOMAINS));
        self
    }

    /// Attach widget-only data; empty objects are dropped
    #[inline]
    #[must_use]
    pub fn with_full_data(mut self, data: Value) -> Self {
        let is_empty = match &data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if !is_empty {
            self.meta.insert(FULL_DATA_KEY.to_string(), data);
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }

    /// `{structuredContent, content, _meta}` as a single object
    #[inline]
    pub fn to_json(&self) -> Value {
        json!({
            "structuredContent": self.structured,
            "content": self.content,
            "_meta": self.meta,
        })
    }

    #[inline]
    pub fn into_call_result(self) -> CallToolResult {
        CallToolResult {
            content: vec![ToolContent::Text { text: self.content }],
            structured_content: Some(self.structured),
            meta: Some(self.meta),
            is_error: Some(self.is_error),
        }
    }
}

impl From<ToolResponse> for CallToolResult {
    #[inline]
    fn from(response: ToolResponse) -> Self {
        response.into_call_result()
    }
}

/// `1234567` -> `"1,234,567"`
#[inline]
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// First `max` characters, never splitting a code point
#[inline]
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn period(start_date: &str, end_date: &str) -> String {
    format!("{} ~ {}", start_date, end_date)
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Search results; `articles` are full article objects
#[inline]
pub fn search_response(
    keyword: &str,
    total_count: u64,
    page: u32,
    page_size: u32,
    articles: Vec<Value>,
) -> ToolResponse {
    let has_next = total_count > u64::from(page) * u64::from(page_size);

    let top_articles: Vec<Value> = articles
        .iter()
        .take(MODEL_TOP_ARTICLES)
        .map(|a| {
            json!({
                "title": a.get("title"),
                "publisher": a.get("publisher"),
                "date": a.get("date"),
            })
        })
        .collect();

    let structured = json!({
        "total_count": total_count,
        "page": page,
        "has_next": has_next,
        "top_articles": top_articles,
    });

    let mut content = format!(
        "'{}' 관련 뉴스 {}건을 찾았습니다.",
        keyword,
        format_thousands(total_count)
    );
    if let Some(first) = articles.first() {
        content.push_str(" 상위 결과: ");
        content.push_str(&truncate_chars(
            str_field(first, "title").unwrap_or_default(),
            SEARCH_TITLE_CHARS,
        ));
    }

    ToolResponse::success(structured, content)
        .with_full_data(json!({
            "articles": articles,
            "page": page,
            "total_count": total_count,
        }))
        .with_widget(WidgetKind::SearchResults)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleDetail {
    pub news_id: String,
    pub title: String,
    pub content: String,
    pub publisher: String,
    pub published_date: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub images: Vec<String>,
}

#[inline]
pub fn article_response(article: &ArticleDetail) -> ToolResponse {
    let structured = json!({
        "news_id": article.news_id,
        "title": article.title,
        "publisher": article.publisher,
        "date": (!article.published_date.is_empty())
            .then(|| truncate_chars(&article.published_date, 10)),
        "summary": (!article.content.is_empty())
            .then(|| truncate_chars(&article.content, SUMMARY_CHARS)),
    });

    ToolResponse::success(
        structured,
        format!("[{}] {}", article.publisher, article.title),
    )
    .with_full_data(to_value(article))
    .with_widget(WidgetKind::ArticleDetail)
}

#[inline]
pub fn count_response(keyword: &str, count: u64, start_date: &str, end_date: &str) -> ToolResponse {
    ToolResponse::inline(
        json!({
            "keyword": keyword,
            "count": count,
            "start_date": start_date,
            "end_date": end_date,
        }),
        format!(
            "'{}' 관련 뉴스가 {}건 있습니다. ({})",
            keyword,
            format_thousands(count),
            period(start_date, end_date)
        ),
    )
}

/// One trending issue as shown in the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingIssue {
    pub rank: u32,
    pub title: String,
    pub keywords: Vec<String>,
    pub search_volume: Option<String>,
    pub growth_rate: Option<String>,
}

#[inline]
pub fn trending_response(issues: &[TrendingIssue], date: &str) -> ToolResponse {
    let top_issues: Vec<Value> = issues
        .iter()
        .take(MODEL_TOP_ISSUES)
        .map(|issue| {
            json!({
                "rank": issue.rank,
                "title": issue.title,
                "keywords": issue.keywords.iter().take(MODEL_ISSUE_KEYWORDS).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut content = format!("{} 인기 이슈 {}개", date, issues.len());
    if let Some(first) = issues.first() {
        content.push_str(": ");
        content.push_str(&truncate_chars(&first.title, TRENDING_TITLE_CHARS));
    }

    ToolResponse::success(
        json!({
            "date": date,
            "issue_count": issues.len(),
            "top_issues": top_issues,
        }),
        content,
    )
    .with_full_data(json!({ "issues": issues, "date": date }))
    .with_widget(WidgetKind::TrendingIssues)
}

#[inline]
pub fn timeline_response(
    keyword: &str,
    start_date: &str,
    end_date: &str,
    timeline: &[TimelinePoint],
    total_articles: u64,
) -> ToolResponse {
    let peak = first_peak(timeline, |p| p.count);

    let structured = json!({
        "keyword": keyword,
        "period": period(start_date, end_date),
        "total_articles": total_articles,
        "data_points": timeline.len(),
        "peak_date": peak.map(|p| p.date.as_str()),
        "peak_count": peak.map_or(0, |p| p.count),
    });

    let mut content = format!(
        "'{}' 타임라인 분석: {}, 총 {}건",
        keyword,
        period(start_date, end_date),
        format_thousands(total_articles)
    );
    if let Some(peak) = peak {
        let _ = write!(content, " (피크: {} {}건)", peak.date, peak.count);
    }

    ToolResponse::success(structured, content)
        .with_full_data(json!({
            "keyword": keyword,
            "start_date": start_date,
            "end_date": end_date,
            "timeline": timeline,
            "total_articles": total_articles,
        }))
        .with_widget(WidgetKind::Timeline)
}

#[inline]
pub fn perspectives_response(
    keyword: &str,
    start_date: &str,
    end_date: &str,
    publishers: &[PublisherCoverage],
    total_articles: u64,
) -> ToolResponse {
    let top_publishers: Vec<Value> = publishers
        .iter()
        .take(MODEL_TOP_PUBLISHERS)
        .map(|p| json!({ "name": p.name, "count": p.count }))
        .collect();

    let structured = json!({
        "keyword": keyword,
        "period": period(start_date, end_date),
        "total_articles": total_articles,
        "publisher_count": publishers.len(),
        "top_publishers": top_publishers,
    });

    let mut content = format!(
        "'{}' 언론사별 보도 비교: {}개 언론사, 총 {}건",
        keyword,
        publishers.len(),
        format_thousands(total_articles)
    );
    if let Some(top) = publishers.first() {
        let _ = write!(content, " (최다: {} {}건)", top.name, top.count);
    }

    ToolResponse::success(structured, content)
        .with_full_data(json!({
            "keyword": keyword,
            "start_date": start_date,
            "end_date": end_date,
            "publishers": publishers,
            "total_articles": total_articles,
        }))
        .with_widget(WidgetKind::Perspectives)
}

#[inline]
pub fn report_response(
    keyword: &str,
    start_date: &str,
    end_date: &str,
    report: &Report,
    images: Value,
) -> ToolResponse {
    let summary = &report.summary;
    let top_publishers: Vec<Value> = report
        .publishers
        .iter()
        .take(REPORT_TOP_PUBLISHERS)
        .map(|p| json!({ "name": p.name, "count": p.count }))
        .collect();

    let structured = json!({
        "keyword": keyword,
        "period": period(start_date, end_date),
        "total_articles": summary.total_articles,
        "publisher_count": summary.publisher_count,
        "peak_date": summary.peak_date,
        "peak_count": summary.peak_count,
        "top_publishers": top_publishers,
    });

    let mut content = format!(
        "'{}' 심층 분석 리포트: {}\n총 {}건, {}개 언론사",
        keyword,
        period(start_date, end_date),
        format_thousands(summary.total_articles),
        summary.publisher_count
    );
    if let Some(peak_date) = &summary.peak_date {
        let _ = write!(content, "\n피크: {} ({}건)", peak_date, summary.peak_count);
    }

    ToolResponse::success(structured, content)
        .with_full_data(json!({
            "keyword": keyword,
            "start_date": start_date,
            "end_date": end_date,
            "summary": summary,
            "timeline": report.timeline,
            "publishers": report.publishers,
            "key_events": report.key_events,
            "images": images,
        }))
        .with_widget(WidgetKind::Report)
}
