use super::*;
use super::news::NewsId;
use crate::config::BigKindsConfig;
use crate::mcp::protocol::ToolContent;
use crate::mcp::server::ToolHandler;
use crate::responses::{FULL_DATA_KEY, WIDGET_CSP_KEY};
use std::io::Write as _;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/api/news/search.do";

fn mock_client(server: &MockServer) -> Arc<BigKindsClient> {
    let config = BigKindsConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        rate_limit_delay_ms: 0,
        backoff_initial_ms: 1,
        backoff_max_ms: 5,
        ..BigKindsConfig::default()
    };
    Arc::new(BigKindsClient::new(&config).expect("client builds"))
}

fn resolver() -> Arc<ImageResolver> {
    Arc::new(
        ImageResolver::new("bigkinds.or.kr", Duration::from_millis(200)).expect("resolver builds"),
    )
}

/// Resolver that probes the mock server's own host
fn local_resolver() -> Arc<ImageResolver> {
    Arc::new(ImageResolver::new("127.0.0.1", Duration::from_secs(2)).expect("resolver builds"))
}

async fn mount_jpeg(server: &MockServer, image_path: &str) {
    Mock::given(method("HEAD"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(server)
        .await;
}

fn with_image(mut article: Value, url: String) -> Value {
    article["IMAGES"] = json!(url);
    article
}

fn params(tool: &str, arguments: Value) -> CallToolParams {
    let arguments = arguments
        .as_object()
        .map(|map| map.clone().into_iter().collect());
    CallToolParams {
        name: tool.to_string(),
        arguments,
    }
}

fn structured(result: &CallToolResult) -> &Value {
    result
        .structured_content
        .as_ref()
        .expect("structured content")
}

fn meta(result: &CallToolResult) -> &Map<String, Value> {
    result.meta.as_ref().expect("meta")
}

fn error_code(result: &CallToolResult) -> Option<&str> {
    meta(result).get("error_code").and_then(Value::as_str)
}

fn text(result: &CallToolResult) -> &str {
    match result.content.first() {
        Some(ToolContent::Text { text }) => text,
        _ => panic!("expected text content"),
    }
}

fn article(news_id: &str, title: &str, publisher: &str, date: &str) -> Value {
    json!({
        "NEWS_ID": news_id,
        "TITLE": title,
        "CONTENT": format!("{} 본문", title),
        "PROVIDER": publisher,
        "PROVIDER_CODE": news_id.split('.').next().unwrap_or_default(),
        "CATEGORY": "경제>반도체",
        "NEWS_DATE": date,
    })
}

fn search_body(total: u64, articles: Vec<Value>) -> Value {
    json!({
        "success": true,
        "totalCount": total,
        "resultList": articles,
    })
}

mod definitions {
    use super::*;

    fn all_definitions() -> Vec<Tool> {
        vec![
            SearchNewsHandler::tool_definition(),
            ArticleDetailHandler::tool_definition(),
            CountNewsHandler::tool_definition(),
            KoreanTimeHandler::tool_definition(),
            ListProvidersHandler::tool_definition(),
            FindCategoryHandler::tool_definition(),
            TrendingNowHandler::tool_definition(),
            AnalyzeTimelineHandler::tool_definition(),
            ComparePerspectivesHandler::tool_definition(),
            GenerateReportHandler::tool_definition(),
        ]
    }

    #[test]
    fn every_tool_is_read_only() {
        for tool in all_definitions() {
            let annotations = tool.annotations.expect("annotations");
            assert!(annotations.read_only_hint, "{}", tool.name);
            assert!(!annotations.destructive_hint, "{}", tool.name);
            assert!(annotations.idempotent_hint, "{}", tool.name);
        }
    }

    #[test]
    fn open_world_only_for_upstream_tools() {
        let open_world: Vec<String> = all_definitions()
            .into_iter()
            .filter(|tool| tool.annotations.as_ref().is_some_and(|a| a.open_world_hint))
            .map(|tool| tool.name)
            .collect();

        assert_eq!(
            open_world,
            vec![
                "search_korean_news",
                "get_article_detail",
                "count_news_articles",
                "analyze_timeline",
                "compare_perspectives",
                "generate_report",
            ]
        );
    }

    #[test]
    fn widget_tools_carry_templates_and_status() {
        let expected = [
            ("search_korean_news", WidgetKind::SearchResults),
            ("get_article_detail", WidgetKind::ArticleDetail),
            ("get_trending_now", WidgetKind::TrendingIssues),
            ("analyze_timeline", WidgetKind::Timeline),
            ("compare_perspectives", WidgetKind::Perspectives),
            ("generate_report", WidgetKind::Report),
        ];

        let tools = all_definitions();
        for (name, widget) in expected {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .expect("tool is defined");
            let meta = tool.meta.as_ref().expect("widget tools have meta");
            assert_eq!(meta[OUTPUT_TEMPLATE_KEY], json!(widget.uri()), "{}", name);
            assert!(meta.contains_key(INVOKING_KEY), "{}", name);
            assert!(meta.contains_key(INVOKED_KEY), "{}", name);
        }
    }

    #[test]
    fn plain_tools_have_no_meta() {
        for tool in [
            CountNewsHandler::tool_definition(),
            KoreanTimeHandler::tool_definition(),
            ListProvidersHandler::tool_definition(),
            FindCategoryHandler::tool_definition(),
        ] {
            assert!(tool.meta.is_none(), "{}", tool.name);
        }
    }

    #[test]
    fn article_detail_is_widget_accessible() {
        let tool = ArticleDetailHandler::tool_definition();
        let meta = tool.meta.expect("meta");
        assert_eq!(meta[WIDGET_ACCESSIBLE_KEY], json!(true));

        let search = SearchNewsHandler::tool_definition();
        assert!(
            !search
                .meta
                .expect("meta")
                .contains_key(WIDGET_ACCESSIBLE_KEY)
        );
    }

    #[test]
    fn keyword_period_schema_requires_dates() {
        let tool = AnalyzeTimelineHandler::tool_definition();
        let schema = tool.input_schema;

        assert_eq!(
            schema["required"],
            json!(["keyword", "start_date", "end_date"])
        );
        assert_eq!(schema["additionalProperties"], json!(false));
        assert_eq!(schema["properties"]["granularity"]["type"], "string");
        assert_eq!(schema["properties"]["keyword"]["type"], "string");
    }

    #[test]
    fn search_schema_has_paging() {
        let schema = SearchNewsHandler::tool_definition().input_schema;
        assert_eq!(schema["properties"]["page"]["minimum"], 1);
        assert_eq!(schema["properties"]["page_size"]["type"], "integer");
    }

    #[test]
    fn no_argument_tools_accept_empty_objects() {
        let schema = KoreanTimeHandler::tool_definition().input_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"], json!({}));
    }
}

mod helpers {
    use super::*;

    #[test]
    fn news_id_parsing() {
        let parsed = NewsId::parse("01101202.20241220110009001").expect("valid id");
        assert_eq!(parsed.provider_code, "01101202");
        assert_eq!(parsed.search_date(), "2024-12-20");

        assert!(NewsId::parse("0110120220241220").is_none());
        assert!(NewsId::parse(".20241220110009001").is_none());
        assert!(NewsId::parse("01101202.2024").is_none());
        assert!(NewsId::parse("01101202.2024-12-20").is_none());
        assert!(NewsId::parse("01101202.20241340110009001").is_none());
    }

    #[test]
    fn period_checks() {
        assert!(check_period("2024-01-01", "2024-12-31", Some(365)).is_none());
        assert!(check_period("2024-05-01", "2024-05-01", None).is_none());

        let malformed = check_period("2024/01/01", "2024-01-31", None).expect("rejected");
        assert_eq!(malformed.meta["error_code"], "INVALID_DATE");
        assert!(malformed.content.contains("YYYY-MM-DD"));

        let reversed = check_period("2024-02-01", "2024-01-01", None).expect("rejected");
        assert_eq!(reversed.meta["error_code"], "INVALID_RANGE");

        let too_long = check_period("2023-01-01", "2024-12-31", Some(365)).expect("rejected");
        assert_eq!(too_long.meta["error_code"], "INVALID_RANGE");
        assert!(too_long.content.contains("365"));

        assert!(check_period("2023-01-01", "2024-12-31", None).is_none());
    }

    #[test]
    fn category_lookup() {
        assert_eq!(
            FindCategoryHandler::lookup("경"),
            vec![("경제", "002000000")]
        );
        assert_eq!(
            FindCategoryHandler::lookup("it"),
            vec![("IT_과학", "008000000")]
        );
        assert!(FindCategoryHandler::lookup("날씨").is_empty());
    }

    #[test]
    fn args_defaults() {
        let args = Args::from_params(params(
            "x",
            json!({ "keyword": "반도체", "page": 3, "huge": 10_000_000_000_u64 }),
        ));
        assert_eq!(args.str("keyword").expect("present"), "반도체");
        assert!(args.str("missing").is_err());
        assert_eq!(args.str_or("granularity", "day"), "day");
        assert_eq!(args.u32_or("page", 1), 3);
        assert_eq!(args.u32_or("huge", 7), 7);
    }

    #[test]
    fn failures_become_error_results() {
        let result = finish(
            "count_news_articles",
            "COUNT_ERROR",
            Err(anyhow!("connection refused")),
        );
        assert_eq!(result.is_error, Some(true));
        assert_eq!(error_code(&result), Some("COUNT_ERROR"));
        assert!(text(&result).contains("connection refused"));
    }
}

mod reference_tools {
    use super::*;

    #[tokio::test]
    async fn korean_time_fields() {
        let result = KoreanTimeHandler
            .handle(params("get_korean_time", json!({})))
            .await
            .expect("handler runs");
        let data = structured(&result);

        assert_eq!(data["timezone"], "KST (UTC+9)");
        assert!(
            data["datetime"]
                .as_str()
                .expect("datetime")
                .ends_with("+09:00")
        );
        assert_eq!(data["date"].as_str().expect("date").len(), 10);
        assert!(text(&result).starts_with("현재 한국 시간: "));
        assert_eq!(result.is_error, Some(false));
    }

    #[tokio::test]
    async fn providers_are_grouped() {
        let result = ListProvidersHandler
            .handle(params("list_news_providers", json!({})))
            .await
            .expect("handler runs");
        let data = structured(&result);

        assert_eq!(data["provider_count"], 29);
        assert_eq!(
            data["categories"],
            json!(["전국일간지", "경제지", "방송사", "통신사"])
        );
        assert_eq!(data["providers"]["통신사"], json!(["연합뉴스", "뉴시스", "뉴스1"]));
        assert_eq!(
            text(&result),
            "총 29개 언론사가 등록되어 있습니다. 주요 언론사: 경향신문, 국민일보, 동아일보, 문화일보, 서울신문..."
        );
    }

    #[tokio::test]
    async fn category_match_and_miss() {
        let hit = FindCategoryHandler
            .handle(params("find_news_category", json!({ "query": "스포" })))
            .await
            .expect("handler runs");
        assert_eq!(
            structured(&hit)["matches"],
            json!([{ "name": "스포츠", "code": "007000000", "type": "category" }])
        );
        assert_eq!(text(&hit), "'스포' 검색 결과: 스포츠");

        let miss = FindCategoryHandler
            .handle(params("find_news_category", json!({ "query": "날씨" })))
            .await
            .expect("handler runs");
        assert_eq!(structured(&miss)["matches"], json!([]));
        assert!(text(&miss).contains("가능한 카테고리: 정치, 경제"));
        assert_eq!(miss.is_error, Some(false));
    }
}

mod news_tools {
    use super::*;

    #[tokio::test]
    async fn search_clamps_page_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({
                "searchKey": "반도체",
                "startNo": 2,
                "resultNumber": 100,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                250,
                vec![article(
                    "01101202.20241220110009001",
                    "반도체 수출 회복세",
                    "경향신문",
                    "2024-12-20T11:00:09",
                )],
            )))
            .expect(1)
            .mount(&server)
            .await;

        let handler = SearchNewsHandler::new(mock_client(&server));
        let result = handler
            .handle(params(
                "search_korean_news",
                json!({
                    "keyword": "반도체",
                    "start_date": "2024-12-01",
                    "end_date": "2024-12-31",
                    "page": 2,
                    "page_size": 150,
                }),
            ))
            .await
            .expect("handler runs");

        let data = structured(&result);
        assert_eq!(data["total_count"], 250);
        assert_eq!(data["page"], 2);
        assert_eq!(data["has_next"], true);
        assert!(text(&result).contains("250건"));

        let meta = meta(&result);
        assert_eq!(
            meta[OUTPUT_TEMPLATE_KEY],
            json!(WidgetKind::SearchResults.uri())
        );
        assert!(meta.contains_key(WIDGET_CSP_KEY));
        assert_eq!(
            meta[FULL_DATA_KEY]["articles"][0]["news_id"],
            "01101202.20241220110009001"
        );
    }

    #[tokio::test]
    async fn search_surfaces_upstream_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errorMessage": "잘못된 요청입니다",
            })))
            .mount(&server)
            .await;

        let handler = SearchNewsHandler::new(mock_client(&server));
        let result = handler
            .handle(params(
                "search_korean_news",
                json!({ "keyword": "반도체", "start_date": "2024-12-01", "end_date": "2024-12-31" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(true));
        assert_eq!(error_code(&result), Some("API_ERROR"));
    }

    #[tokio::test]
    async fn detail_rejects_malformed_ids() {
        let server = MockServer::start().await;
        let handler = ArticleDetailHandler::new(mock_client(&server), resolver());

        let result = handler
            .handle(params("get_article_detail", json!({ "news_id": "not-an-id" })))
            .await
            .expect("handler runs");

        assert_eq!(error_code(&result), Some("INVALID_ID"));
        assert!(text(&result).contains("not-an-id"));
    }

    #[tokio::test]
    async fn detail_searches_provider_day() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({
                "searchKey": "",
                "startDate": "2024-12-20",
                "endDate": "2024-12-20",
                "providerCodes": ["01101202"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                2,
                vec![
                    article(
                        "01101202.20241220090000001",
                        "다른 기사",
                        "경향신문",
                        "2024-12-20T09:00:00",
                    ),
                    article(
                        "01101202.20241220110009001",
                        "반도체 수출 회복세",
                        "경향신문",
                        "2024-12-20T11:00:09",
                    ),
                ],
            )))
            .expect(1)
            .mount(&server)
            .await;

        let handler = ArticleDetailHandler::new(mock_client(&server), resolver());
        let result = handler
            .handle(params(
                "get_article_detail",
                json!({ "news_id": "01101202.20241220110009001" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(false));
        let data = structured(&result);
        assert_eq!(data["title"], "반도체 수출 회복세");
        assert_eq!(data["date"], "2024-12-20");
        assert_eq!(text(&result), "[경향신문] 반도체 수출 회복세");
        assert_eq!(meta(&result)[FULL_DATA_KEY]["images"], json!([]));
    }

    #[tokio::test]
    async fn detail_resolves_extensionless_image() {
        let server = MockServer::start().await;
        let raw_image = format!("{}/news/photo/20241220/01101202", server.uri());
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                1,
                vec![with_image(
                    article(
                        "01101202.20241220110009001",
                        "반도체 수출 회복세",
                        "경향신문",
                        "2024-12-20T11:00:09",
                    ),
                    raw_image.clone(),
                )],
            )))
            .mount(&server)
            .await;
        mount_jpeg(&server, "/news/photo/20241220/01101202.jpg").await;

        let handler = ArticleDetailHandler::new(mock_client(&server), local_resolver());
        let result = handler
            .handle(params(
                "get_article_detail",
                json!({ "news_id": "01101202.20241220110009001" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            meta(&result)[FULL_DATA_KEY]["images"],
            json!([format!("{}.jpg", raw_image)])
        );
    }

    #[tokio::test]
    async fn detail_reports_missing_article() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                1,
                vec![article(
                    "01101202.20241220090000001",
                    "다른 기사",
                    "경향신문",
                    "2024-12-20T09:00:00",
                )],
            )))
            .mount(&server)
            .await;

        let handler = ArticleDetailHandler::new(mock_client(&server), resolver());
        let result = handler
            .handle(params(
                "get_article_detail",
                json!({ "news_id": "01101202.20241220110009001" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(error_code(&result), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn count_uses_total() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({ "resultNumber": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(12_345, vec![])))
            .mount(&server)
            .await;

        let handler = CountNewsHandler::new(mock_client(&server));
        let result = handler
            .handle(params(
                "count_news_articles",
                json!({ "keyword": "금리", "start_date": "2024-01-01", "end_date": "2024-01-31" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(structured(&result)["count"], 12_345);
        assert!(text(&result).contains("12,345건"));
    }

    #[tokio::test]
    async fn count_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let handler = CountNewsHandler::new(mock_client(&server));
        let result = handler
            .handle(params(
                "count_news_articles",
                json!({ "keyword": "금리", "start_date": "2024-01-01", "end_date": "2024-01-31" }),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(true));
        assert_eq!(error_code(&result), Some("COUNT_ERROR"));
    }
}

mod analysis_tools {
    use super::*;

    fn period_args(start: &str, end: &str) -> Value {
        json!({ "keyword": "반도체", "start_date": start, "end_date": end })
    }

    #[tokio::test]
    async fn timeline_rejects_bad_periods_without_calling_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(0, vec![])))
            .expect(0)
            .mount(&server)
            .await;

        let handler = AnalyzeTimelineHandler::new(mock_client(&server));

        let too_long = handler
            .handle(params(
                "analyze_timeline",
                period_args("2023-01-01", "2024-06-30"),
            ))
            .await
            .expect("handler runs");
        assert_eq!(error_code(&too_long), Some("INVALID_RANGE"));

        let malformed = handler
            .handle(params(
                "analyze_timeline",
                period_args("2024-13-01", "2024-12-31"),
            ))
            .await
            .expect("handler runs");
        assert_eq!(error_code(&malformed), Some("INVALID_DATE"));
    }

    #[tokio::test]
    async fn timeline_groups_fetched_articles() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({
                "resultNumber": 1000,
                "sortMethod": "date",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                3,
                vec![
                    article("01101202.20241202000000001", "둘째 날", "경향신문", "2024-12-02"),
                    article("01101202.20241201000000002", "첫날 A", "경향신문", "2024-12-01"),
                    article("02100601.20241201000000003", "첫날 B", "한겨레", "2024-12-01"),
                ],
            )))
            .mount(&server)
            .await;

        let handler = AnalyzeTimelineHandler::new(mock_client(&server));
        let result = handler
            .handle(params(
                "analyze_timeline",
                period_args("2024-12-01", "2024-12-31"),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(false));
        let data = structured(&result);
        assert_eq!(data["total_articles"], 3);
        assert_eq!(data["peak_date"], "2024-12-01");
        assert_eq!(
            meta(&result)[OUTPUT_TEMPLATE_KEY],
            json!(WidgetKind::Timeline.uri())
        );
    }

    #[tokio::test]
    async fn perspectives_reject_reversed_period() {
        let server = MockServer::start().await;
        let handler = ComparePerspectivesHandler::new(mock_client(&server));

        let result = handler
            .handle(params(
                "compare_perspectives",
                period_args("2024-12-31", "2024-12-01"),
            ))
            .await
            .expect("handler runs");

        assert_eq!(error_code(&result), Some("INVALID_RANGE"));
    }

    #[tokio::test]
    async fn report_gallery_keeps_resolved_candidates() {
        let server = MockServer::start().await;
        let photo = |n: u32| format!("{}/photo/{}", server.uri(), n);
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .and(body_partial_json(json!({ "resultNumber": 1000 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(
                3,
                vec![
                    with_image(
                        article("01101202.20241202000000001", "반도체 지원법 통과", "경향신문", "2024-12-02T08:00:00"),
                        photo(1),
                    ),
                    // Never resolves: every probe is a 404
                    with_image(
                        article("02100601.20241201000000002", "업황 전망", "한겨레", "2024-12-01T09:00:00"),
                        photo(2),
                    ),
                    // Same raw URL as the first article, probed once
                    with_image(
                        article("01101202.20241201000000003", "수출 증가", "경향신문", "2024-12-01T10:00:00"),
                        photo(1),
                    ),
                ],
            )))
            .mount(&server)
            .await;
        mount_jpeg(&server, "/photo/1.jpg").await;

        let handler = GenerateReportHandler::new(mock_client(&server), local_resolver());
        let result = handler
            .handle(params(
                "generate_report",
                period_args("2024-12-01", "2024-12-31"),
            ))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            meta(&result)[FULL_DATA_KEY]["images"],
            json!([{
                "url": format!("{}.jpg", photo(1)),
                "title": "반도체 지원법 통과",
                "publisher": "경향신문",
                "date": "2024-12-02",
            }])
        );
    }

    #[tokio::test]
    async fn report_without_articles_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(0, vec![])))
            .mount(&server)
            .await;

        let handler = GenerateReportHandler::new(mock_client(&server), resolver());
        let result = handler
            .handle(params(
                "generate_report",
                period_args("2024-12-01", "2024-12-31"),
            ))
            .await
            .expect("handler runs");

        assert_eq!(error_code(&result), Some("NO_DATA"));
        assert_eq!(text(&result), "오류: '반도체' 관련 기사를 찾을 수 없습니다.");
    }
}

mod trending_tool {
    use super::*;

    const CACHE_CSV: &str = "rank,search_term,raw_text,additional_info,scraped_at
2,환율,\"환율
원달러 환율
달러\",\"5천+
+500%\",2025-01-15T09:30:00
1,삼성전자,\"삼성전자
반도체
갤럭시 S25\",\"2만+
+1,000%\",2025-01-15T09:30:00
";

    #[tokio::test]
    async fn missing_cache_gives_empty_answer() {
        let dir = TempDir::new().expect("temp dir");
        let trends = Arc::new(TrendsClient::new(
            dir.path().join("missing.csv"),
            Duration::from_secs(3600),
        ));

        let result = TrendingNowHandler::new(trends)
            .handle(params("get_trending_now", json!({})))
            .await
            .expect("handler runs");

        assert_eq!(result.is_error, Some(false));
        assert_eq!(structured(&result), &json!({ "trending": [], "count": 0 }));
        assert_eq!(
            text(&result),
            "현재 트렌딩 데이터를 가져올 수 없습니다. 캐시를 업데이트해주세요."
        );
    }

    #[tokio::test]
    async fn cached_items_become_issues() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("google_trends_cache.csv");
        let mut file = std::fs::File::create(&path).expect("create cache");
        file.write_all(CACHE_CSV.as_bytes()).expect("write cache");

        let trends = Arc::new(TrendsClient::new(path, Duration::from_secs(3600)));
        let result = TrendingNowHandler::new(trends)
            .handle(params("get_trending_now", json!({ "limit": 1 })))
            .await
            .expect("handler runs");

        let data = structured(&result);
        assert_eq!(data["issue_count"], 1);
        assert_eq!(data["top_issues"][0]["title"], "삼성전자");
        assert_eq!(
            data["top_issues"][0]["keywords"],
            json!(["반도체", "갤럭시 S25"])
        );

        let meta = meta(&result);
        assert_eq!(meta["cache_valid"], true);
        assert_eq!(meta["scraped_at"], "2025-01-15T09:30:00");
        assert_eq!(meta[FULL_DATA_KEY]["issues"][0]["search_volume"], "2만+");
        assert_eq!(meta[FULL_DATA_KEY]["issues"][0]["growth_rate"], "+1,000%");
    }
}

#[tokio::test]
async fn register_all_adds_every_tool_in_order() {
    let dir = TempDir::new().expect("temp dir");
    let ctx = ToolContext {
        bigkinds: Arc::new(
            BigKindsClient::new(&BigKindsConfig::default()).expect("client builds"),
        ),
        images: resolver(),
        trends: Arc::new(TrendsClient::new(
            dir.path().join("trends.csv"),
            Duration::from_secs(60),
        )),
    };
    let server = McpServer::new("deep-news-mcp", "0.0.0").expect("server builds");

    register_all(&server, &ctx).await.expect("tools register");

    assert_eq!(
        server.tool_names().await,
        vec![
            "search_korean_news",
            "get_article_detail",
            "count_news_articles",
            "get_korean_time",
            "list_news_providers",
            "find_news_category",
            "get_trending_now",
            "analyze_timeline",
            "compare_perspectives",
            "generate_report",
        ]
    );
}
