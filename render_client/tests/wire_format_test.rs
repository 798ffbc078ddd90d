//! Wire-shape tests for the render service request/response contract.

use render_client::{ExtractQuery, PageAction, RenderRequest, RenderedPage};
use scrape_core::{Convention, FieldSpec};

const SPECS: &[FieldSpec] = &[
    FieldSpec {
        name: "bought_usd",
        selector: ".//span[@class='trader-bought']/text()",
        convention: Convention::Currency,
    },
    FieldSpec {
        name: "pnl_usd",
        selector: ".//div[@class='trader-pnl']/text()",
        convention: Convention::Currency,
    },
];

#[test]
fn request_serializes_with_camel_case_actions() {
    let request = RenderRequest::new(
        "https://dexscreener.com/solana/pair".to_string(),
        ExtractQuery::from_specs(Some("//div[@class='trader-row']"), SPECS),
    )
    .with_actions(vec![
        PageAction::wait_for("//button[text() = 'Top Traders']", 10),
        PageAction::click("//button[text() = 'Top Traders']"),
    ])
    .with_readiness_probe("//div[@class='trader-row']")
    .bypassing_dedup();

    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(json["browserHtml"], true);
    assert_eq!(json["bypassDedup"], true);
    assert_eq!(json["readinessProbe"], "//div[@class='trader-row']");
    assert_eq!(json["actions"][0]["action"], "waitForSelector");
    assert_eq!(json["actions"][0]["timeout"], 10);
    assert_eq!(json["actions"][0]["onError"], "return");
    assert_eq!(json["actions"][1]["action"], "click");
    assert_eq!(json["extract"]["root"], "//div[@class='trader-row']");
    assert_eq!(json["extract"]["fields"][0]["name"], "bought_usd");
    assert_eq!(json["extract"]["fields"][0]["selector"], ".//span[@class='trader-bought']/text()");
}

#[test]
fn request_without_root_or_probe_omits_them() {
    let request = RenderRequest::new(
        "https://gmgn.ai/sol/address/abc".to_string(),
        ExtractQuery::from_specs(None, SPECS),
    );

    let json = serde_json::to_value(&request).unwrap();
    assert!(json["extract"].get("root").is_none());
    assert!(json.get("readinessProbe").is_none());
    assert!(json.get("actions").is_none());
    assert_eq!(json["bypassDedup"], false);
}

#[test]
fn response_parses_rows_with_absent_fields() {
    let body = r#"
    {
        "url": "https://dexscreener.com/solana/pair",
        "status": 200,
        "probeMatched": true,
        "rows": [
            { "bought_usd": "$1.2K", "pnl_usd": "<$0.01" },
            { "bought_usd": "$500", "pnl_usd": null }
        ],
        "actionLog": [ { "action": "waitForSelector", "elapsedTime": 0.4 } ]
    }"#;

    let page: RenderedPage = serde_json::from_str(body).unwrap();
    assert_eq!(page.status, 200);
    assert!(page.probe_matched);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0]["bought_usd"].as_deref(), Some("$1.2K"));
    assert_eq!(page.rows[1]["pnl_usd"].as_deref(), None);
    assert_eq!(page.action_log.len(), 1);
}

#[test]
fn response_defaults_probe_and_log_when_absent() {
    let body = r#"
    {
        "url": "https://gmgn.ai/sol/address/abc",
        "status": 200,
        "rows": [ {} ]
    }"#;

    let page: RenderedPage = serde_json::from_str(body).unwrap();
    assert!(!page.probe_matched);
    assert!(page.action_log.is_empty());
}
