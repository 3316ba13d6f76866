//! Google Trends (Korea) trending keywords, read from a scraped CSV cache.
//!
//! The cache file is produced outside this server. Rows look like:
//!
//! ```text
//! rank,search_term,raw_text,additional_info,scraped_at
//! 1,삼성전자,"삼성전자\n2만+\narrow_upward\n반도체\n...",2만+\narrow_upward\n1,000%,2025-01-01T09:00:00
//! ```

#[cfg(test)]
mod tests;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

const MAX_RELATED_TERMS: usize = 10;
const EXPORTED_RELATED_TERMS: usize = 5;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Fragments that mark metadata lines in `raw_text` rather than related terms
const RAW_TEXT_SKIP_MARKERS: [&str; 8] = ["만+", "arrow_", "%", "일 전", "trending_", "활성", "외 ", "개"];

#[derive(Debug, Clone, PartialEq)]
pub struct TrendingItem {
    pub rank: u32,
    pub keyword: String,
    /// e.g. "2만+"
    pub search_volume: Option<String>,
    /// e.g. "+1,000%"
    pub growth_rate: Option<String>,
    pub related_terms: Vec<String>,
    pub scraped_at: Option<NaiveDateTime>,
}

impl TrendingItem {
    #[inline]
    pub fn new(rank: u32, keyword: impl Into<String>) -> Self {
        Self {
            rank,
            keyword: keyword.into(),
            search_volume: None,
            growth_rate: None,
            related_terms: Vec::new(),
            scraped_at: None,
        }
    }

    #[inline]
    pub fn to_json(&self) -> Value {
        json!({
            "rank": self.rank,
            "keyword": self.keyword,
            "search_volume": self.search_volume,
            "growth_rate": self.growth_rate,
            "related_terms": self.related_terms.iter().take(EXPORTED_RELATED_TERMS).collect::<Vec<_>>(),
            "scraped_at": self.scraped_at.map(format_timestamp),
        })
    }
}

#[inline]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    rank: String,
    #[serde(default)]
    search_term: String,
    #[serde(default)]
    raw_text: String,
    #[serde(default)]
    additional_info: String,
    #[serde(default)]
    scraped_at: String,
}

/// Parse one CSV row; `None` for rows without a usable rank or keyword
fn parse_row(row: CsvRow) -> Option<TrendingItem> {
    let keyword = row.search_term.trim().to_string();
    if keyword.is_empty() {
        return None;
    }

    let rank = match row.rank.trim().parse::<u32>() {
        Ok(rank) => rank,
        Err(e) => {
            warn!("Failed to parse rank '{}' for '{}': {}", row.rank, keyword, e);
            return None;
        }
    };

    let related_terms = row
        .raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !RAW_TEXT_SKIP_MARKERS.iter().any(|m| line.contains(m)))
        .filter(|line| *line != row.search_term && *line != keyword)
        .filter(|line| line.chars().count() > 1)
        .take(MAX_RELATED_TERMS)
        .map(str::to_string)
        .collect();

    let mut search_volume = None;
    let mut growth_rate = None;
    for part in row.additional_info.lines().map(str::trim) {
        if part.contains("만+") || part.contains("천+") {
            search_volume = Some(part.to_string());
        } else if part.contains('%') {
            growth_rate = Some(part.to_string());
        }
    }

    Some(TrendingItem {
        rank,
        keyword,
        search_volume,
        growth_rate,
        related_terms,
        scraped_at: parse_scraped_at(&row.scraped_at),
    })
}

/// Accepts RFC 3339, naive ISO 8601 timestamps with or without seconds,
/// and bare dates (read as midnight)
fn parse_scraped_at(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parse the CSV cache contents, skipping malformed rows
#[inline]
pub fn parse_csv(bytes: &[u8]) -> Vec<TrendingItem> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    reader
        .deserialize::<CsvRow>()
        .filter_map(|row| match row {
            Ok(row) => parse_row(row),
            Err(e) => {
                warn!("Failed to parse CSV row: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub cache_path: String,
    pub cache_exists: bool,
    pub cache_valid: bool,
    pub items_count: usize,
    pub loaded_at: Option<String>,
    pub max_age_hours: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    items: Option<Vec<TrendingItem>>,
    loaded_at: Option<DateTime<Local>>,
}

/// Trending keywords backed by the CSV cache, reloaded once stale
#[derive(Debug)]
pub struct TrendsClient {
    cache_path: PathBuf,
    max_age: Duration,
    state: RwLock<CacheState>,
}

impl TrendsClient {
    #[inline]
    pub fn new(cache_path: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            cache_path: cache_path.into(),
            max_age,
            state: RwLock::new(CacheState::default()),
        }
    }

    #[inline]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn is_fresh(&self, state: &CacheState) -> bool {
        match (&state.items, state.loaded_at) {
            (Some(_), Some(loaded_at)) => Local::now()
                .signed_duration_since(loaded_at)
                .to_std()
                .map(|age| age < self.max_age)
                .unwrap_or(true),
            _ => false,
        }
    }

    async fn load(&self) -> Vec<TrendingItem> {
        match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => {
                let items = parse_csv(&bytes);
                info!(
                    "Loaded {} trending items from {}",
                    items.len(),
                    self.cache_path.display()
                );
                items
            }
            Err(e) => {
                warn!(
                    "Trends cache not readable at {}: {}",
                    self.cache_path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Trending items sorted by rank, at most `limit`
    #[inline]
    pub async fn trending(&self, limit: usize) -> Vec<TrendingItem> {
        {
            let state = self.state.read().await;
            if self.is_fresh(&state) {
                return top_by_rank(state.items.as_deref().unwrap_or_default(), limit);
            }
        }

        let mut state = self.state.write().await;
        if !self.is_fresh(&state) {
            let items = self.load().await;
            // A missing file is not cached so a later scrape is picked up
            if items.is_empty() {
                state.items = None;
                state.loaded_at = None;
                return Vec::new();
            }
            state.items = Some(items);
            state.loaded_at = Some(Local::now());
        }

        top_by_rank(state.items.as_deref().unwrap_or_default(), limit)
    }

    #[inline]
    pub async fn is_cache_valid(&self) -> bool {
        let state = self.state.read().await;
        self.is_fresh(&state)
    }

    #[inline]
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        *state = CacheState::default();
    }

    #[inline]
    pub async fn cache_status(&self) -> CacheStatus {
        let cache_exists = tokio::fs::try_exists(&self.cache_path)
            .await
            .unwrap_or(false);
        let state = self.state.read().await;

        CacheStatus {
            cache_path: self.cache_path.display().to_string(),
            cache_exists,
            cache_valid: self.is_fresh(&state),
            items_count: state.items.as_ref().map_or(0, Vec::len),
            loaded_at: state.loaded_at.map(|t| t.to_rfc3339()),
            max_age_hours: self.max_age.as_secs_f64() / 3600.0,
        }
    }
}

fn top_by_rank(items: &[TrendingItem], limit: usize) -> Vec<TrendingItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| item.rank);
    sorted.truncate(limit);
    sorted
}
