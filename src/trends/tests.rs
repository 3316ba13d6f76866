use super::*;
use std::io::Write;
use tempfile::TempDir;

const SAMPLE_CSV: &str = "rank,search_term,raw_text,additional_info,scraped_at
2,환율,\"환율
arrow_upward
원달러 환율
달러
3개 더보기\",\"5천+
+500%\",2025-01-15T09:30:00
1,삼성전자,\"삼성전자
2만+
arrow_upward
1,000%
반도체
갤럭시 S25
3시간 전 활성
외 5개\",\"2만+
arrow_upward
+1,000%\",2025-01-15T09:30:00+09:00
x,잘못된 순위,,,
3,,,,
4,금리,,,not a date
";

fn write_cache(dir: &TempDir, contents: &[u8]) -> PathBuf {
    let path = dir.path().join("google_trends_cache.csv");
    let mut file = std::fs::File::create(&path).expect("create cache file");
    file.write_all(contents).expect("write cache file");
    path
}

#[test]
fn parses_rows_and_skips_malformed_ones() {
    let items = parse_csv(SAMPLE_CSV.as_bytes());

    let keywords: Vec<_> = items.iter().map(|i| i.keyword.as_str()).collect();
    assert_eq!(keywords, vec!["환율", "삼성전자", "금리"]);
}

#[test]
fn extracts_related_terms_volume_and_growth() {
    let items = parse_csv(SAMPLE_CSV.as_bytes());
    let samsung = items
        .iter()
        .find(|i| i.keyword == "삼성전자")
        .expect("row present");

    assert_eq!(samsung.rank, 1);
    assert_eq!(samsung.related_terms, vec!["반도체", "갤럭시 S25"]);
    assert_eq!(samsung.search_volume.as_deref(), Some("2만+"));
    assert_eq!(samsung.growth_rate.as_deref(), Some("+1,000%"));

    let fx = items.iter().find(|i| i.keyword == "환율").expect("row present");
    assert_eq!(fx.related_terms, vec!["원달러 환율", "달러"]);
    assert_eq!(fx.search_volume.as_deref(), Some("5천+"));
    assert_eq!(fx.growth_rate.as_deref(), Some("+500%"));
}

#[test]
fn parses_naive_and_offset_timestamps() {
    let items = parse_csv(SAMPLE_CSV.as_bytes());

    let fx = &items[0];
    assert_eq!(
        fx.scraped_at.map(format_timestamp).as_deref(),
        Some("2025-01-15T09:30:00")
    );

    let samsung = &items[1];
    assert_eq!(
        samsung.scraped_at.map(format_timestamp).as_deref(),
        Some("2025-01-15T09:30:00")
    );

    let rates = &items[2];
    assert!(rates.scraped_at.is_none());
    assert!(rates.related_terms.is_empty());
}

#[test]
fn strips_utf8_bom() {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(
        "rank,search_term,raw_text,additional_info,scraped_at\n1,날씨,,,\n".as_bytes(),
    );

    let items = parse_csv(&bytes);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].keyword, "날씨");
}

#[test]
fn related_terms_are_capped() {
    let raw_text: Vec<String> = (0..15).map(|i| format!("연관어{}", i)).collect();
    let csv = format!(
        "rank,search_term,raw_text,additional_info,scraped_at\n1,키워드,\"{}\",,\n",
        raw_text.join("\n")
    );

    let items = parse_csv(csv.as_bytes());
    assert_eq!(items[0].related_terms.len(), MAX_RELATED_TERMS);

    let json = items[0].to_json();
    assert_eq!(
        json["related_terms"].as_array().map(Vec::len),
        Some(EXPORTED_RELATED_TERMS)
    );
}

#[test]
fn to_json_shape() {
    let mut item = TrendingItem::new(3, "날씨");
    item.search_volume = Some("1만+".to_string());

    let json = item.to_json();
    assert_eq!(json["rank"], 3);
    assert_eq!(json["keyword"], "날씨");
    assert_eq!(json["search_volume"], "1만+");
    assert!(json["growth_rate"].is_null());
    assert!(json["scraped_at"].is_null());
    assert_eq!(json["related_terms"], serde_json::json!([]));
}

#[tokio::test]
async fn trending_sorts_by_rank_and_limits() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_cache(&dir, SAMPLE_CSV.as_bytes());
    let client = TrendsClient::new(&path, Duration::from_secs(3600));

    let items = client.trending(2).await;
    let ranks: Vec<_> = items.iter().map(|i| i.rank).collect();
    assert_eq!(ranks, vec![1, 2]);

    let all = client.trending(50).await;
    assert_eq!(all.len(), 3);
    assert!(client.is_cache_valid().await);
}

#[tokio::test]
async fn cached_items_survive_file_changes_until_invalidated() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_cache(&dir, SAMPLE_CSV.as_bytes());
    let client = TrendsClient::new(&path, Duration::from_secs(3600));

    assert_eq!(client.trending(10).await.len(), 3);

    write_cache(
        &dir,
        b"rank,search_term,raw_text,additional_info,scraped_at\n1,new,,,\n",
    );
    assert_eq!(client.trending(10).await.len(), 3);

    client.invalidate().await;
    let reloaded = client.trending(10).await;
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].keyword, "new");
}

#[tokio::test]
async fn stale_cache_is_reloaded() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_cache(&dir, SAMPLE_CSV.as_bytes());
    let client = TrendsClient::new(&path, Duration::ZERO);

    assert_eq!(client.trending(10).await.len(), 3);
    assert!(!client.is_cache_valid().await);

    write_cache(
        &dir,
        b"rank,search_term,raw_text,additional_info,scraped_at\n1,new,,,\n",
    );
    assert_eq!(client.trending(10).await.len(), 1);
}

#[tokio::test]
async fn missing_cache_yields_empty_list() {
    let dir = TempDir::new().expect("temp dir");
    let client = TrendsClient::new(dir.path().join("missing.csv"), Duration::from_secs(60));

    assert!(client.trending(10).await.is_empty());

    let status = client.cache_status().await;
    assert!(!status.cache_exists);
    assert!(!status.cache_valid);
    assert_eq!(status.items_count, 0);
    assert!(status.loaded_at.is_none());
}

#[tokio::test]
async fn cache_status_after_load() {
    let dir = TempDir::new().expect("temp dir");
    let path = write_cache(&dir, SAMPLE_CSV.as_bytes());
    let client = TrendsClient::new(&path, Duration::from_secs(6 * 3600));

    client.trending(1).await;
    let status = client.cache_status().await;

    assert!(status.cache_exists);
    assert!(status.cache_valid);
    assert_eq!(status.items_count, 3);
    assert!(status.loaded_at.is_some());
    assert!((status.max_age_hours - 6.0).abs() < f64::EPSILON);
    assert_eq!(status.cache_path, path.display().to_string());
}

#[test]
fn scraped_at_accepts_short_iso_forms() {
    let parsed = |value: &str| parse_scraped_at(value).map(format_timestamp);

    assert_eq!(
        parsed("2025-01-01T09:00").as_deref(),
        Some("2025-01-01T09:00:00")
    );
    assert_eq!(
        parsed("2025-01-01 09:00").as_deref(),
        Some("2025-01-01T09:00:00")
    );
    assert_eq!(parsed("2025-01-01").as_deref(), Some("2025-01-01T00:00:00"));
    assert_eq!(
        parsed("2025-01-01T09:00:30.5").as_deref(),
        Some("2025-01-01T09:00:30")
    );
    assert_eq!(parsed("  ").as_deref(), None);
    assert_eq!(parsed("01/01/2025").as_deref(), None);
}
