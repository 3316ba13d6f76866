//! BigKinds request/response models

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Search parameters for the BigKinds news search endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub keyword: String,
    pub start_date: String,
    pub end_date: String,
    pub start_no: u32,
    pub result_number: u32,
    pub provider_codes: Vec<String>,
    pub category_codes: Vec<String>,
    pub search_scope_type: String,
    pub search_filter_type: String,
    pub sort_method: String,
    pub is_tm_usable: bool,
    pub is_not_tm_usable: bool,
    pub editorial_is: bool,
}

/// Wire format expected by `/api/news/search.do`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload<'a> {
    index_name: &'static str,
    search_key: &'a str,
    search_keys: Value,
    by_line: &'static str,
    search_filter_type: &'a str,
    search_scope_type: &'a str,
    search_sort_type: &'static str,
    sort_method: &'a str,
    main_today_person_yn: &'static str,
    start_date: &'a str,
    end_date: &'a str,
    news_ids: Vec<String>,
    category_codes: &'a [String],
    provider_codes: &'a [String],
    incident_codes: Vec<String>,
    network_node_type: &'static str,
    topic_origin: &'static str,
    date_codes: Vec<String>,
    editorial_is: bool,
    start_no: u32,
    result_number: u32,
    is_tm_usable: bool,
    is_not_tm_usable: bool,
}

impl SearchRequest {
    #[inline]
    pub fn new(
        keyword: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            start_no: 1,
            result_number: 100,
            provider_codes: Vec::new(),
            category_codes: Vec::new(),
            search_scope_type: "1".to_string(),
            search_filter_type: "1".to_string(),
            sort_method: "date".to_string(),
            is_tm_usable: false,
            is_not_tm_usable: false,
            editorial_is: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn page(mut self, start_no: u32, result_number: u32) -> Self {
        self.start_no = start_no;
        self.result_number = result_number;
        self
    }

    #[inline]
    #[must_use]
    pub fn providers(mut self, provider_codes: Vec<String>) -> Self {
        self.provider_codes = provider_codes;
        self
    }

    #[inline]
    #[must_use]
    pub fn sort_method(mut self, sort_method: impl Into<String>) -> Self {
        self.sort_method = sort_method.into();
        self
    }

    #[inline]
    pub fn date_range(&self) -> String {
        format!("{} to {}", self.start_date, self.end_date)
    }

    #[inline]
    pub fn to_payload(&self) -> SearchPayload<'_> {
        SearchPayload {
            index_name: "news",
            search_key: &self.keyword,
            search_keys: json!([{}]),
            by_line: "",
            search_filter_type: &self.search_filter_type,
            search_scope_type: &self.search_scope_type,
            search_sort_type: "date",
            sort_method: &self.sort_method,
            main_today_person_yn: "",
            start_date: &self.start_date,
            end_date: &self.end_date,
            news_ids: Vec::new(),
            category_codes: &self.category_codes,
            provider_codes: &self.provider_codes,
            incident_codes: Vec::new(),
            network_node_type: "",
            topic_origin: "",
            date_codes: Vec::new(),
            editorial_is: self.editorial_is,
            start_no: self.start_no,
            result_number: self.result_number,
            is_tm_usable: self.is_tm_usable,
            is_not_tm_usable: self.is_not_tm_usable,
        }
    }
}

/// A single article from `resultList`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewsArticle {
    pub news_id: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub publisher: Option<String>,
    pub provider_code: Option<String>,
    pub category: Option<String>,
    pub category_code: Option<String>,
    pub news_date: Option<String>,
    pub url: Option<String>,
    pub byline: Option<String>,
    pub raw: Map<String, Value>,
}

/// First non-empty string among `keys`
fn first_str(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl NewsArticle {
    #[inline]
    pub fn from_api(raw: Map<String, Value>) -> Self {
        Self {
            news_id: first_str(&raw, &["NEWS_ID", "newsId"]),
            title: first_str(&raw, &["TITLE", "title"]).unwrap_or_default(),
            content: first_str(&raw, &["CONTENT", "content", "SUMMARY"]),
            publisher: first_str(&raw, &["PROVIDER", "PUBLISHER", "publisher"]),
            provider_code: first_str(&raw, &["PROVIDER_CODE", "providerCode"]),
            category: first_str(&raw, &["CATEGORY", "category"]),
            category_code: first_str(&raw, &["CATEGORY_CODE", "categoryCode"]),
            news_date: first_str(&raw, &["NEWS_DATE", "DATE", "newsDate"]),
            url: first_str(&raw, &["PROVIDER_LINK_PAGE", "URL", "url"]),
            byline: first_str(&raw, &["BYLINE", "byline", "byLine"]),
            raw,
        }
    }

    /// `YYYY-MM-DD` prefix of the publication timestamp
    #[inline]
    pub fn date(&self) -> Option<&str> {
        self.news_date
            .as_deref()
            .map(|d| d.get(..10).unwrap_or(d))
            .filter(|d| !d.is_empty())
    }

    #[inline]
    pub fn publisher_or_unknown(&self) -> &str {
        self.publisher.as_deref().unwrap_or("Unknown")
    }

    /// Raw image URL, checking the field names BigKinds has used over time
    #[inline]
    pub fn image_field(&self) -> Option<String> {
        first_str(
            &self.raw,
            &[
                "IMAGES",
                "images",
                "IMAGE_URL",
                "imageUrl",
                "THUMBNAIL",
                "thumbnail",
            ],
        )
    }

    /// Full form for widget `_meta`
    #[inline]
    pub fn to_full(&self) -> Value {
        json!({
            "news_id": self.news_id,
            "title": self.title,
            "summary": self.content,
            "publisher": self.publisher,
            "category": self.category,
            "published_date": self.news_date,
            "date": self.date(),
            "url": self.url,
            "author": self.byline,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub success: bool,
    pub total_count: u64,
    pub articles: Vec<NewsArticle>,
    pub page_number: u32,
    pub per_page: u32,
    pub keyword: String,
    pub date_range: String,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
}

impl SearchResponse {
    #[inline]
    pub fn from_api(data: &Value, request: &SearchRequest) -> Self {
        let articles = data
            .get("resultList")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_object)
                    .map(|obj| NewsArticle::from_api(obj.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            success: data.get("success").and_then(Value::as_bool).unwrap_or(false),
            total_count: data.get("totalCount").and_then(Value::as_u64).unwrap_or(0),
            articles,
            page_number: request.start_no,
            per_page: request.result_number,
            keyword: request.keyword.clone(),
            date_range: request.date_range(),
            error_message: text("errorMessage"),
            error_code: text("errorCode"),
        }
    }
}
