//! Retry-driver behavior against a scripted fetcher: how many fetches go
//! out, and which of them bypass the fetch layer's request dedup.

use async_trait::async_trait;
use job_orchestrator::fetch_with_readiness;
use render_client::{ExtractQuery, PageFetcher, RenderError, RenderRequest, RenderedPage};
use scrape_core::ReadinessGate;
use std::sync::Mutex;

struct ScriptedFetcher {
    /// Probe outcome per fetch, in order; anything past the script is
    /// not-ready
    probe_outcomes: Vec<bool>,
    requests: Mutex<Vec<RenderRequest>>,
}

impl ScriptedFetcher {
    fn new(probe_outcomes: Vec<bool>) -> Self {
        Self {
            probe_outcomes,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn recorded(&self) -> Vec<RenderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &RenderRequest) -> Result<RenderedPage, RenderError> {
        let mut requests = self.requests.lock().unwrap();
        let call = requests.len();
        requests.push(request.clone());

        Ok(RenderedPage {
            url: request.url.clone(),
            status: 200,
            rows: vec![],
            probe_matched: self.probe_outcomes.get(call).copied().unwrap_or(false),
            action_log: vec![],
        })
    }
}

fn request() -> RenderRequest {
    RenderRequest::new(
        "https://gmgn.ai/sol/address/wallet-1".to_string(),
        ExtractQuery::from_specs(None, &[]),
    )
    .with_readiness_probe("//div[text() = 'Last 7D PnL']")
}

#[tokio::test]
async fn not_ready_page_is_refetched_exactly_once_with_dedup_bypassed() {
    let fetcher = ScriptedFetcher::new(vec![false, true]);
    let gate = ReadinessGate::new(1);

    let fetched = fetch_with_readiness(&fetcher, &request(), &gate, "wallet-1")
        .await
        .unwrap();

    let requests = fetcher.recorded();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].bypass_dedup);
    assert!(requests[1].bypass_dedup, "the re-fetch must bypass dedup");
    assert_eq!(requests[0].url, requests[1].url, "re-fetch is identical");
    assert_eq!(fetched.attempts, 2);
    assert!(fetched.ready);
}

#[tokio::test]
async fn retries_exhausted_accepts_the_page_as_degraded_terminal() {
    let fetcher = ScriptedFetcher::new(vec![false, false]);
    let gate = ReadinessGate::new(1);

    let fetched = fetch_with_readiness(&fetcher, &request(), &gate, "wallet-1")
        .await
        .unwrap();

    assert_eq!(fetcher.recorded().len(), 2, "bounded at one re-fetch");
    assert_eq!(fetched.attempts, 2);
    assert!(!fetched.ready, "terminal but not ready");
}

#[tokio::test]
async fn ready_on_first_attempt_never_triggers_a_second_fetch() {
    let fetcher = ScriptedFetcher::new(vec![true]);
    let gate = ReadinessGate::new(1);

    let fetched = fetch_with_readiness(&fetcher, &request(), &gate, "wallet-1")
        .await
        .unwrap();

    assert_eq!(fetcher.recorded().len(), 1);
    assert_eq!(fetched.attempts, 1);
    assert!(fetched.ready);
}
