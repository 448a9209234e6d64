//! Yahoo Finance adapter tests against a mock HTTP server.

use dcf_common::config::MarketDataConfig;
use dcf_valuation::data::{
    MarketDataSource, ProviderError, RawCell, YahooFinanceAdapter, CAPITAL_EXPENDITURE,
    FREE_CASH_FLOW,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMESERIES_PATH: &str = "/ws/fundamentals-timeseries/v1/finance/timeseries/AAPL";
const CHART_PATH: &str = "/v8/finance/chart/AAPL";

fn adapter(server: &MockServer) -> YahooFinanceAdapter {
    let config = MarketDataConfig {
        base_url: server.uri(),
        chart_base_url: server.uri(),
        timeout_secs: 5,
        ..MarketDataConfig::default()
    };
    YahooFinanceAdapter::from_config(&config)
}

fn point(date: &str, raw: serde_json::Value) -> serde_json::Value {
    json!({"asOfDate": date, "periodType": "12M", "reportedValue": {"raw": raw}})
}

fn cash_flow_body() -> serde_json::Value {
    json!({
        "timeseries": {
            "result": [
                {
                    "meta": {"symbol": ["AAPL"], "type": ["annualFreeCashFlow"]},
                    "timestamp": [1632960000, 1664496000, 1695945600],
                    "annualFreeCashFlow": [
                        point("2021-09-30", json!(92953000000.0)),
                        null,
                        point("2023-09-30", json!(99584000000.0))
                    ]
                },
                {
                    "meta": {"symbol": ["AAPL"], "type": ["annualCapitalExpenditure"]},
                    "annualCapitalExpenditure": [
                        point("2023-09-30", json!("-10959000000"))
                    ]
                },
                {
                    "meta": {"symbol": ["AAPL"], "type": ["annualOperatingCashFlow"]}
                }
            ],
            "error": null
        }
    })
}

#[tokio::test]
async fn test_cash_flow_statement() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMESERIES_PATH))
        .and(query_param("symbol", "AAPL"))
        .and(query_param(
            "type",
            "annualFreeCashFlow,annualOperatingCashFlow,annualCapitalExpenditure",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(cash_flow_body()))
        .expect(1)
        .mount(&server)
        .await;

    let statement = adapter(&server).cash_flow_statement("AAPL").await.unwrap();

    let fcf = statement.row(FREE_CASH_FLOW).unwrap();
    assert_eq!(fcf.len(), 2);
    assert!(fcf.values().all(|c| matches!(c, RawCell::Number(_))));

    let capex = statement.row(CAPITAL_EXPENDITURE).unwrap();
    assert_eq!(
        capex.values().next().unwrap(),
        &RawCell::Text("-10959000000".into())
    );
}

#[tokio::test]
async fn test_shares_outstanding_latest_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMESERIES_PATH))
        .and(query_param(
            "type",
            "quarterlyOrdinarySharesNumber,annualOrdinarySharesNumber",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"type": ["quarterlyOrdinarySharesNumber"]},
                        "quarterlyOrdinarySharesNumber": [
                            point("2024-03-30", json!(15337686000.0_f64)),
                            point("2024-06-29", json!(15204137000.0_f64))
                        ]
                    },
                    {
                        "meta": {"type": ["annualOrdinarySharesNumber"]},
                        "annualOrdinarySharesNumber": [
                            point("2023-09-30", json!(15550061000.0_f64))
                        ]
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let shares = adapter(&server).shares_outstanding("AAPL").await.unwrap();
    assert_eq!(shares, 15204137000.0);
}

#[tokio::test]
async fn test_latest_price_skips_null_closes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHART_PATH))
        .and(query_param("range", "1d"))
        .and(query_param("interval", "1m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL", "regularMarketPrice": 190.0},
                    "timestamp": [1, 2, 3],
                    "indicators": {"quote": [{"close": [189.1, 189.5, null]}]}
                }],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let price = adapter(&server).latest_price("AAPL").await.unwrap();
    assert_eq!(price, 189.5);
}

#[tokio::test]
async fn test_latest_price_falls_back_to_market_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHART_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{"meta": {"regularMarketPrice": 190.25}}],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let price = adapter(&server).latest_price("AAPL").await.unwrap();
    assert_eq!(price, 190.25);
}

#[tokio::test]
async fn test_unknown_ticker_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ZZZZ"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).latest_price("ZZZZ").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_error_payload_with_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHART_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "gone"}}
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).latest_price("AAPL").await.unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
}

#[tokio::test]
async fn test_status_mapping() {
    let cases: [(u16, fn(&ProviderError) -> bool); 4] = [
        (429, |e| matches!(e, ProviderError::RateLimited { .. })),
        (503, |e| matches!(e, ProviderError::Unavailable(_))),
        (401, |e| matches!(e, ProviderError::Auth(_))),
        (400, |e| matches!(e, ProviderError::Internal(_))),
    ];

    for (status, check) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CHART_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = adapter(&server).latest_price("AAPL").await.unwrap_err();
        assert!(check(&err), "status {} mapped to {:?}", status, err);
    }
}

#[tokio::test]
async fn test_malformed_payload_is_internal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CHART_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = adapter(&server).latest_price("AAPL").await.unwrap_err();
    assert!(matches!(err, ProviderError::Internal(_)));
}

#[tokio::test]
async fn test_full_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TIMESERIES_PATH))
        .and(query_param(
            "type",
            "annualFreeCashFlow,annualOperatingCashFlow,annualCapitalExpenditure",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(cash_flow_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TIMESERIES_PATH))
        .and(query_param(
            "type",
            "quarterlyOrdinarySharesNumber,annualOrdinarySharesNumber",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeseries": {"result": [{
                "meta": {"type": ["annualOrdinarySharesNumber"]},
                "annualOrdinarySharesNumber": [point("2023-09-30", json!(15550061000.0_f64))]
            }]}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CHART_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{"meta": {"regularMarketPrice": 190.0}}]}
        })))
        .mount(&server)
        .await;

    let snapshot = adapter(&server).snapshot("AAPL").await.unwrap();
    assert_eq!(snapshot.ticker, "AAPL");
    assert_eq!(snapshot.shares_outstanding, 15550061000.0);
    assert_eq!(snapshot.current_price, 190.0);
    assert!(snapshot.statement.row(FREE_CASH_FLOW).is_some());
}
