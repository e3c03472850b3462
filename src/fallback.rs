//! One-shot range fallback for historical charts
//!
//! ```text
//! Requesting(1d) ──ok──────────▶ Done
//!      │
//!      └──fail/empty──▶ Requesting(7d, fallback) ──ok──▶ Done
//!                              │
//!                              └──fail/empty──▶ Failed(FallbackExhausted)
//!
//! Requesting(7d|30d|90d) ──ok──▶ Done
//!      └──fail/empty──▶ Failed
//! ```
//!
//! A fallback request never falls back again, so a single chart call issues
//! at most two logical requests.

use crate::{
    error::ApiError,
    types::{ChartRange, PriceSeries},
};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Range substituted when `range` fails, if any
pub fn fallback_for(range: ChartRange) -> Option<ChartRange> {
    match range {
        ChartRange::OneDay => Some(ChartRange::SevenDays),
        _ => None,
    }
}

/// State of a single chart fetch
#[derive(Debug)]
pub enum ChartFetch {
    /// Waiting on a request for `range`; `primary_failure` is set once on the fallback leg
    Requesting {
        range: ChartRange,
        primary_failure: Option<ApiError>,
    },
    Done(PriceSeries),
    Failed(ApiError),
}

impl ChartFetch {
    pub fn start(range: ChartRange) -> Self {
        Self::Requesting {
            range,
            primary_failure: None,
        }
    }

    /// Range to request next, `None` once terminal
    pub fn pending_range(&self) -> Option<ChartRange> {
        match self {
            Self::Requesting { range, .. } => Some(*range),
            _ => None,
        }
    }

    /// True while requesting the substituted range
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::Requesting {
                primary_failure: Some(_),
                ..
            }
        )
    }

    /// Applies the outcome of the pending request
    pub fn advance(self, outcome: Result<PriceSeries, ApiError>) -> Self {
        match self {
            Self::Requesting {
                range,
                primary_failure: None,
            } => match (outcome, fallback_for(range)) {
                (Ok(series), _) => Self::Done(series),
                (Err(e), Some(next)) => {
                    tracing::warn!(
                        range = %range,
                        fallback = %next,
                        error = %e,
                        "Chart request failed, falling back"
                    );
                    Self::Requesting {
                        range: next,
                        primary_failure: Some(e),
                    }
                }
                (Err(e), None) => Self::Failed(e),
            },
            Self::Requesting {
                primary_failure: Some(primary),
                ..
            } => match outcome {
                Ok(series) => Self::Done(series),
                Err(e) => Self::Failed(ApiError::FallbackExhausted {
                    primary: Box::new(primary),
                    fallback: Box::new(e),
                }),
            },
            terminal => terminal,
        }
    }
}

/// Drives a chart fetch to completion
///
/// `fetch` is called with the range to request; calls are strictly
/// sequential. `fallback_delay` is paid before the fallback request only.
pub async fn run<F, Fut>(
    range: ChartRange,
    fallback_delay: Duration,
    mut fetch: F,
) -> Result<PriceSeries, ApiError>
where
    F: FnMut(ChartRange) -> Fut,
    Fut: Future<Output = Result<PriceSeries, ApiError>>,
{
    let mut state = ChartFetch::start(range);

    loop {
        let next = match state.pending_range() {
            Some(next) => next,
            None => break,
        };
        if state.is_fallback() {
            sleep(fallback_delay).await;
        }
        let outcome = fetch(next).await;
        state = state.advance(outcome);
    }

    match state {
        ChartFetch::Done(series) => Ok(series),
        ChartFetch::Failed(e) => Err(e),
        ChartFetch::Requesting { .. } => Err(ApiError::invalid_response("chart fetch did not settle")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PricePoint;
    use std::cell::RefCell;

    fn series(range: ChartRange) -> PriceSeries {
        PriceSeries {
            id: "bitcoin".to_string(),
            requested: range,
            served: range,
            prices: vec![PricePoint::new(1, 1.0)],
            market_caps: vec![],
            total_volumes: vec![],
        }
    }

    fn empty(range: ChartRange) -> ApiError {
        ApiError::EmptyChart {
            id: "bitcoin".to_string(),
            days: range.days(),
        }
    }

    #[test]
    fn test_success_is_terminal() {
        let state = ChartFetch::start(ChartRange::OneDay).advance(Ok(series(ChartRange::OneDay)));
        assert!(matches!(state, ChartFetch::Done(_)));
        assert_eq!(state.pending_range(), None);
    }

    #[test]
    fn test_one_day_failure_moves_to_seven_days() {
        let state = ChartFetch::start(ChartRange::OneDay).advance(Err(empty(ChartRange::OneDay)));
        assert_eq!(state.pending_range(), Some(ChartRange::SevenDays));
        assert!(state.is_fallback());
    }

    #[test]
    fn test_fallback_failure_is_final() {
        let state = ChartFetch::start(ChartRange::OneDay)
            .advance(Err(ApiError::http(500, "Internal Server Error")))
            .advance(Err(empty(ChartRange::SevenDays)));

        match state {
            ChartFetch::Failed(ApiError::FallbackExhausted { primary, fallback }) => {
                assert!(matches!(*primary, ApiError::Http { status: 500, .. }));
                assert!(matches!(*fallback, ApiError::EmptyChart { days: "7", .. }));
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_other_ranges_fail_without_fallback() {
        for range in [ChartRange::SevenDays, ChartRange::ThirtyDays, ChartRange::NinetyDays] {
            let state = ChartFetch::start(range).advance(Err(empty(range)));
            assert!(matches!(state, ChartFetch::Failed(ApiError::EmptyChart { .. })));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_requests_sequentially() {
        let requested = RefCell::new(Vec::new());

        let result = run(ChartRange::OneDay, Duration::from_millis(2000), |range| {
            requested.borrow_mut().push(range);
            async move {
                match range {
                    ChartRange::OneDay => Err(empty(range)),
                    _ => Ok(series(range)),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.served, ChartRange::SevenDays);
        assert_eq!(
            requested.into_inner(),
            vec![ChartRange::OneDay, ChartRange::SevenDays]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_never_chains_a_second_fallback() {
        let calls = RefCell::new(0);

        let err = run(ChartRange::OneDay, Duration::ZERO, |range| {
            *calls.borrow_mut() += 1;
            async move { Err(empty(range)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::FallbackExhausted { .. }));
        assert_eq!(calls.into_inner(), 2);
    }
}
