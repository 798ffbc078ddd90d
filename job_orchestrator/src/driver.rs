//! Gated fetch loop: issue a render request, evaluate the readiness
//! probe, re-issue the identical request (bypassing the fetch layer's
//! request dedup) while the gate allows it, then hand over whatever the
//! final attempt produced.

use render_client::{PageFetcher, RenderRequest, RenderedPage};
use scrape_core::{FetchState, ReadinessGate};
use tracing::{debug, error};

use crate::Result;

/// Terminal result of a fetch-retry cycle
#[derive(Debug)]
pub struct GatedFetch {
    pub page: RenderedPage,
    /// Fetches it took to reach a terminal state
    pub attempts: u32,
    /// Whether the readiness probe matched on the final attempt. A
    /// not-ready page is still extracted; partial data beats no data.
    pub ready: bool,
}

/// Fetch `request` until the readiness gate accepts it. `label`
/// identifies the work item in logs.
pub async fn fetch_with_readiness(
    fetcher: &dyn PageFetcher,
    request: &RenderRequest,
    gate: &ReadinessGate,
    label: &str,
) -> Result<GatedFetch> {
    let mut state = FetchState::Pending { attempt: 1 };

    loop {
        let attempt = state.attempt();
        let attempt_request = if attempt == 1 {
            request.clone()
        } else {
            // identical re-fetch; the service must not dedup it away
            request.clone().bypassing_dedup()
        };

        let page = fetcher.fetch(&attempt_request).await?;
        debug!(
            "Fetched {} for {} (attempt {}, probe matched: {})",
            page.url, label, attempt, page.probe_matched
        );

        state = gate.advance(gate.on_fetched(attempt, page.probe_matched));

        match state {
            FetchState::Pending { attempt: next } => {
                error!(
                    "The page has not been fully loaded for {} (attempt {}). Retrying ({} next). URL: {}",
                    label, attempt, next, request.url
                );
            }
            FetchState::Terminal { attempt, ready } => {
                return Ok(GatedFetch {
                    page,
                    attempts: attempt,
                    ready,
                });
            }
            // on_fetched + advance only yield Pending or Terminal
            FetchState::Ready { .. } | FetchState::NotReady { .. } => unreachable!(),
        }
    }
}
