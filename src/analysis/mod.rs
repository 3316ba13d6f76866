//! Aggregations over fetched articles: timelines, publisher comparison and
//! the combined report.
//!
//! Everything here is pure and synchronous. The tool handlers fetch the
//! articles and resolve images; this module only groups and counts.


use crate::bigkinds::NewsArticle;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

const TIMELINE_TOP_PUBLISHERS: usize = 3;
const TIMELINE_HEADLINES: usize = 3;
const PUBLISHER_HEADLINES: usize = 5;
const PUBLISHER_TOP_CATEGORIES: usize = 3;
const REPORT_TIMELINE_HEADLINES: usize = 2;
const REPORT_PUBLISHER_HEADLINES: usize = 3;
const REPORT_TOP_PUBLISHERS: usize = 10;
const KEY_EVENT_MIN_POINTS: usize = 3;
const KEY_EVENT_FACTOR: f64 = 2.0;
const MAX_KEY_EVENTS: usize = 5;
const MAX_IMAGE_CANDIDATES: usize = 12;
const MAX_REPORT_IMAGES: usize = 6;
const IMAGE_TITLE_CHARS: usize = 50;

const UNKNOWN_CATEGORY: &str = "기타";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Unknown values fall back to daily grouping
    #[inline]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "week" => Self::Week,
            "month" => Self::Month,
            _ => Self::Day,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Bucket key for a `YYYY-MM-DD` date
    fn group_key(self, date: &str) -> Option<String> {
        match self {
            Self::Day => Some(date.to_string()),
            Self::Month => Some(date.get(..7).unwrap_or(date).to_string()),
            Self::Week => {
                let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
                let monday =
                    day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
                Some(monday.format("%Y-%m-%d").to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub date: String,
    pub count: usize,
    pub publishers: Vec<NameCount>,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatedHeadline {
    pub title: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublisherCoverage {
    pub name: String,
    pub count: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub headlines: Vec<DatedHeadline>,
    pub categories: Vec<NameCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPoint {
    pub date: String,
    pub count: usize,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPublisher {
    pub name: String,
    pub count: usize,
    pub headlines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    pub date: String,
    pub count: usize,
    /// `+N%`, `N%`, or `PEAK` for a peak that is not otherwise a spike
    pub growth: String,
    pub headline: Option<String>,
    pub is_peak: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_articles: u64,
    pub fetched_articles: usize,
    pub publisher_count: usize,
    pub date_range_days: usize,
    pub peak_date: Option<String>,
    pub peak_count: usize,
    pub avg_daily: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub timeline: Vec<ReportPoint>,
    pub publishers: Vec<ReportPublisher>,
    pub key_events: Vec<KeyEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCandidate {
    pub raw_url: String,
    pub title: String,
    pub publisher: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportImage {
    pub url: String,
    pub title: String,
    pub publisher: Option<String>,
    pub date: Option<String>,
}

/// Groups values in first-seen order
struct OrderedGroups<'a, T> {
    index: HashMap<&'a str, usize>,
    groups: Vec<(&'a str, Vec<T>)>,
}

impl<'a, T> OrderedGroups<'a, T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn push(&mut self, key: &'a str, value: T) {
        if let Some(&i) = self.index.get(key) {
            self.groups[i].1.push(value);
        } else {
            self.index.insert(key, self.groups.len());
            self.groups.push((key, vec![value]));
        }
    }

    fn len(&self) -> usize {
        self.groups.len()
    }

    fn into_groups(self) -> Vec<(&'a str, Vec<T>)> {
        self.groups
    }
}

/// Occurrence counts, most frequent first, ties in first-seen order
fn top_counts<'a>(names: impl IntoIterator<Item = &'a str>, limit: usize) -> Vec<NameCount> {
    let mut groups = OrderedGroups::new();
    for name in names {
        groups.push(name, ());
    }

    let mut counts: Vec<NameCount> = groups
        .into_groups()
        .into_iter()
        .map(|(name, hits)| NameCount {
            name: name.to_string(),
            count: hits.len(),
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// First element with the highest count
#[inline]
pub fn first_peak<T>(items: &[T], count: impl Fn(&T) -> usize) -> Option<&T> {
    items.iter().fold(None, |best: Option<&T>, item| match best {
        Some(b) if count(b) >= count(item) => Some(b),
        _ => Some(item),
    })
}

fn titles(articles: &[&NewsArticle], limit: usize) -> Vec<String> {
    articles.iter().take(limit).map(|a| a.title.clone()).collect()
}

/// Articles bucketed by date key, keys ascending
fn group_by_date<'a>(
    articles: &'a [NewsArticle],
    granularity: Granularity,
) -> BTreeMap<String, Vec<&'a NewsArticle>> {
    let mut buckets: BTreeMap<String, Vec<&NewsArticle>> = BTreeMap::new();
    for article in articles {
        if let Some(key) = article.date().and_then(|d| granularity.group_key(d)) {
            buckets.entry(key).or_default().push(article);
        }
    }
    buckets
}

/// Article counts per day, week or month with top publishers and headlines
#[inline]
pub fn build_timeline(articles: &[NewsArticle], granularity: Granularity) -> Vec<TimelinePoint> {
    group_by_date(articles, granularity)
        .into_iter()
        .map(|(date, bucket)| TimelinePoint {
            count: bucket.len(),
            publishers: top_counts(
                bucket.iter().map(|a| a.publisher_or_unknown()),
                TIMELINE_TOP_PUBLISHERS,
            ),
            headlines: titles(&bucket, TIMELINE_HEADLINES),
            date,
        })
        .collect()
}

/// Per-publisher coverage, largest publishers first, at most `limit`
#[inline]
pub fn compare_publishers(articles: &[NewsArticle], limit: usize) -> Vec<PublisherCoverage> {
    let mut groups = OrderedGroups::new();
    for article in articles {
        groups.push(article.publisher_or_unknown(), article);
    }

    let mut publishers: Vec<PublisherCoverage> = groups
        .into_groups()
        .into_iter()
        .map(|(name, group)| {
            let mut by_recency = group.clone();
            by_recency.sort_by(|a, b| {
                b.news_date
                    .as_deref()
                    .unwrap_or_default()
                    .cmp(a.news_date.as_deref().unwrap_or_default())
            });

            let dates: Vec<&str> = by_recency.iter().filter_map(|a| a.date()).collect();

            PublisherCoverage {
                name: name.to_string(),
                count: group.len(),
                first_date: dates.iter().min().map(|d| (*d).to_string()),
                last_date: dates.iter().max().map(|d| (*d).to_string()),
                headlines: by_recency
                    .iter()
                    .take(PUBLISHER_HEADLINES)
                    .map(|a| DatedHeadline {
                        title: a.title.clone(),
                        date: a.date().map(str::to_string),
                    })
                    .collect(),
                categories: top_counts(
                    group
                        .iter()
                        .map(|a| a.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)),
                    PUBLISHER_TOP_CATEGORIES,
                ),
            }
        })
        .collect();

    publishers.sort_by(|a, b| b.count.cmp(&a.count));
    publishers.truncate(limit);
    publishers
}

fn format_growth(count: usize, previous: Option<usize>) -> String {
    let growth = match previous {
        Some(prev) if prev > 0 => (count as f64 - prev as f64) / prev as f64 * 100.0,
        _ => 0.0,
    };

    if growth > 0.0 {
        format!("+{:.0}%", growth)
    } else {
        format!("{:.0}%", growth)
    }
}

/// Spikes of at least twice the mean daily count, plus the absolute peak
fn detect_key_events(timeline: &[ReportPoint]) -> Vec<KeyEvent> {
    let mut events = Vec::new();

    if timeline.len() >= KEY_EVENT_MIN_POINTS {
        let total: usize = timeline.iter().map(|p| p.count).sum();
        let threshold = total as f64 / timeline.len() as f64 * KEY_EVENT_FACTOR;

        for (i, point) in timeline.iter().enumerate() {
            if point.count as f64 >= threshold {
                let previous = i.checked_sub(1).map(|p| timeline[p].count);
                events.push(KeyEvent {
                    date: point.date.clone(),
                    count: point.count,
                    growth: format_growth(point.count, previous),
                    headline: point.headlines.first().cloned(),
                    is_peak: false,
                });
            }
        }
    }

    if let Some(peak) = first_peak(timeline, |p| p.count) {
        if let Some(event) = events.iter_mut().find(|e| e.date == peak.date) {
            event.is_peak = true;
        } else {
            events.insert(
                0,
                KeyEvent {
                    date: peak.date.clone(),
                    count: peak.count,
                    growth: "PEAK".to_string(),
                    headline: peak.headlines.first().cloned(),
                    is_peak: true,
                },
            );
        }
    }

    events.sort_by(|a, b| b.count.cmp(&a.count));
    events.truncate(MAX_KEY_EVENTS);
    events
}

/// Daily timeline, top publishers, key events and summary in one pass
#[inline]
pub fn build_report(articles: &[NewsArticle], total_count: u64) -> Report {
    let timeline: Vec<ReportPoint> = group_by_date(articles, Granularity::Day)
        .into_iter()
        .map(|(date, bucket)| ReportPoint {
            count: bucket.len(),
            headlines: titles(&bucket, REPORT_TIMELINE_HEADLINES),
            date,
        })
        .collect();

    let mut groups = OrderedGroups::new();
    for article in articles {
        groups.push(article.publisher_or_unknown(), article);
    }
    let publisher_count = groups.len();

    let mut publishers: Vec<ReportPublisher> = groups
        .into_groups()
        .into_iter()
        .map(|(name, group)| ReportPublisher {
            name: name.to_string(),
            count: group.len(),
            headlines: titles(&group, REPORT_PUBLISHER_HEADLINES),
        })
        .collect();
    publishers.sort_by(|a, b| b.count.cmp(&a.count));
    publishers.truncate(REPORT_TOP_PUBLISHERS);

    let key_events = detect_key_events(&timeline);

    let peak = first_peak(&timeline, |p| p.count);
    let avg_daily = articles.len() as f64 / timeline.len().max(1) as f64;

    let summary = ReportSummary {
        total_articles: total_count,
        fetched_articles: articles.len(),
        publisher_count,
        date_range_days: timeline.len(),
        peak_date: peak.map(|p| p.date.clone()),
        peak_count: peak.map_or(0, |p| p.count),
        // Halves go to the even tenth: 1.25 -> 1.2, 1.75 -> 1.8
        avg_daily: (avg_daily * 10.0).round_ties_even() / 10.0,
    };

    Report {
        summary,
        timeline,
        publishers,
        key_events,
    }
}

/// Unique raw image URLs worth probing, in article order
#[inline]
pub fn collect_image_candidates(articles: &[NewsArticle]) -> Vec<ImageCandidate> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for article in articles {
        if candidates.len() >= MAX_IMAGE_CANDIDATES {
            break;
        }
        let Some(raw_url) = article.image_field() else {
            continue;
        };
        if !seen.insert(raw_url.clone()) {
            continue;
        }
        candidates.push(ImageCandidate {
            raw_url,
            title: article.title.chars().take(IMAGE_TITLE_CHARS).collect(),
            publisher: article.publisher.clone(),
            date: article.date().map(str::to_string),
        });
    }

    candidates
}

/// Pair candidates with their resolved URLs, dropping failures
#[inline]
pub fn select_images(candidates: &[ImageCandidate], resolved: &[Option<String>]) -> Vec<ReportImage> {
    candidates
        .iter()
        .zip(resolved)
        .filter_map(|(candidate, url)| {
            url.as_ref().map(|url| ReportImage {
                url: url.clone(),
                title: candidate.title.clone(),
                publisher: candidate.publisher.clone(),
                date: candidate.date.clone(),
            })
        })
        .take(MAX_REPORT_IMAGES)
        .collect()
}
