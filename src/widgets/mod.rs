//! Static HTML widget templates rendered by the host in a sandboxed iframe.
//!
//! Templates are compiled into the binary. A configured override directory
//! can replace any of them with `<name>.html` without rebuilding.


use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const WIDGET_URI_SCHEME: &str = "widget://";

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head><meta charset="UTF-8"></head>
<body style="font-family: system-ui; padding: 16px; color: #666;">
<p>Widget not found</p>
</body>
</html>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    SearchResults,
    ArticleDetail,
    TrendingIssues,
    Timeline,
    Perspectives,
    Report,
}

impl WidgetKind {
    pub const ALL: [Self; 6] = [
        Self::SearchResults,
        Self::ArticleDetail,
        Self::TrendingIssues,
        Self::Timeline,
        Self::Perspectives,
        Self::Report,
    ];

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::SearchResults => "search_results",
            Self::ArticleDetail => "article_detail",
            Self::TrendingIssues => "trending_issues",
            Self::Timeline => "timeline",
            Self::Perspectives => "perspectives",
            Self::Report => "report",
        }
    }

    #[inline]
    pub fn uri(self) -> String {
        format!("{}{}", WIDGET_URI_SCHEME, self.name())
    }

    #[inline]
    pub fn description(self) -> &'static str {
        match self {
            Self::SearchResults => {
                "뉴스 검색 결과를 카드 UI로 표시합니다. 기사 제목, 언론사, 날짜를 보여주며 클릭하면 상세 조회를 요청합니다."
            }
            Self::ArticleDetail => {
                "뉴스 기사 상세 내용을 표시합니다. 제목, 본문, 언론사, 날짜, 원문 링크를 포함합니다."
            }
            Self::TrendingIssues => {
                "오늘의 인기 뉴스 이슈를 순위별로 표시합니다. 키워드와 관련 기사 수를 포함합니다."
            }
            Self::Timeline => {
                "뉴스 타임라인 분석을 차트와 리스트로 표시합니다. 일별/주별/월별 기사량과 주요 헤드라인을 포함합니다."
            }
            Self::Perspectives => {
                "언론사별 보도 비교를 표시합니다. 기사 수, 대표 헤드라인, 카테고리 분포를 포함합니다."
            }
            Self::Report => {
                "심층 분석 리포트를 표시합니다. 타임라인 차트, 언론사 비교, 주요 이벤트, 기사 이미지를 포함하며 인포그래픽 생성을 요청할 수 있습니다."
            }
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::SearchResults => include_str!("templates/search_results.html"),
            Self::ArticleDetail => include_str!("templates/article_detail.html"),
            Self::TrendingIssues => include_str!("templates/trending_issues.html"),
            Self::Timeline => include_str!("templates/timeline.html"),
            Self::Perspectives => include_str!("templates/perspectives.html"),
            Self::Report => include_str!("templates/report.html"),
        }
    }

    #[inline]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Parse `widget://<name>`
    #[inline]
    pub fn from_uri(uri: &str) -> Option<Self> {
        uri.strip_prefix(WIDGET_URI_SCHEME).and_then(Self::from_name)
    }
}

/// Widget HTML lookup with an in-memory cache
#[derive(Debug, Default)]
pub struct WidgetStore {
    override_dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<str>>>,
}

impl WidgetStore {
    #[inline]
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        Self {
            override_dir,
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn override_dir(&self) -> Option<&Path> {
        self.override_dir.as_deref()
    }

    /// HTML for `name`: override file, then built-in template, then a
    /// "Widget not found" page. Repeated calls return the same allocation.
    #[inline]
    pub async fn load(&self, name: &str) -> Arc<str> {
        {
            let cache = self.cache.read().await;
            if let Some(html) = cache.get(name) {
                return Arc::clone(html);
            }
        }

        let html: Arc<str> = Arc::from(self.read_uncached(name).await);

        let mut cache = self.cache.write().await;
        Arc::clone(cache.entry(name.to_string()).or_insert(html))
    }

    async fn read_uncached(&self, name: &str) -> String {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(format!("{}.html", name));
            match tokio::fs::read_to_string(&path).await {
                Ok(html) => {
                    debug!("Loaded widget '{}' from {}", name, path.display());
                    return html;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to read widget override {}: {}", path.display(), e),
            }
        }

        match WidgetKind::from_name(name) {
            Some(kind) => kind.template().to_string(),
            None => {
                warn!("Widget not found: {}", name);
                FALLBACK_HTML.to_string()
            }
        }
    }

    #[inline]
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    #[inline]
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}
