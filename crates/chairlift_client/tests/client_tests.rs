//! End-to-end client behavior against a scripted in-memory transport.

use chairlift_client::testing::{MockReply, MockTransport};
use chairlift_client::{Fetcher, FetcherConfig, QueryParams, RetryPolicy, UpstreamClient, UpstreamError};
use chairlift_protocol::types::{EventSlug, Proposal};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const BASE: &str = "https://cfp.test";

fn fetcher_with(transport: Arc<MockTransport>) -> Fetcher {
    let config = FetcherConfig::new(Url::parse(BASE).unwrap(), "t0k3n").with_api_version("v2");
    let retry = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(100),
        factor: 2.0,
        jitter: 0.0,
    };
    // Generous limits so tests never wait on the bucket.
    Fetcher::new(transport, config)
        .with_retry_policy(retry)
        .with_rate_limits(10_000.0, 1_000)
}

fn submissions_url() -> String {
    format!("{BASE}/api/events/ev/submissions/")
}

fn proposal_json(code: &str, duration: u32) -> serde_json::Value {
    json!({
        "code": code,
        "title": format!("Talk {code}"),
        "submission_type": {"id": 3, "name": {"en": "Talk"}},
        "state": "accepted",
        "duration": duration
    })
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn single_page_list_yields_exact_records_with_one_request() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [proposal_json("A", 30), proposal_json("B", 45)]
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let (count, sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    let proposals = sequence.collect().await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].code.as_str(), "A");
    assert_eq!(proposals[0].duration, 30);
    assert_eq!(proposals[1].code.as_str(), "B");
    assert_eq!(proposals[1].duration, 45);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn multi_page_list_issues_one_request_per_page_in_order() {
    let transport = Arc::new(MockTransport::new());
    let page2 = format!("{BASE}/api/events/ev/submissions/?page=2");
    let page3 = format!("{BASE}/api/events/ev/submissions/?page=3");
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 5, "next": page2, "previous": null,
            "results": [proposal_json("A", 30), proposal_json("B", 30)]
        })),
    );
    transport.enqueue(
        page2.clone(),
        MockReply::json(json!({
            "count": 5, "next": page3, "previous": submissions_url(),
            "results": [proposal_json("C", 30), proposal_json("D", 30)]
        })),
    );
    transport.enqueue(
        page3.clone(),
        MockReply::json(json!({
            "count": 5, "next": null, "previous": page2,
            "results": [proposal_json("E", 30)]
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let (count, sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    let proposals = sequence.collect().await.unwrap();

    assert_eq!(count, 5);
    let codes: Vec<&str> = proposals.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["A", "B", "C", "D", "E"]);
    // ceil(5 / 2) pages.
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn lazy_sequence_fetches_pages_on_demand() {
    let transport = Arc::new(MockTransport::new());
    let page2 = format!("{BASE}/api/events/ev/submissions/?page=2");
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 2, "next": page2, "previous": null,
            "results": [proposal_json("A", 30)]
        })),
    );
    transport.enqueue(
        page2,
        MockReply::json(json!({
            "count": 2, "next": null, "previous": submissions_url(),
            "results": [proposal_json("B", 30)]
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let (_, mut sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();

    let first = sequence.next().await.unwrap().unwrap();
    assert_eq!(first.code.as_str(), "A");
    // Second page not requested until the buffer drains.
    assert_eq!(transport.request_count(), 1);

    let second = sequence.next().await.unwrap().unwrap();
    assert_eq!(second.code.as_str(), "B");
    assert_eq!(transport.request_count(), 2);
    assert!(sequence.next().await.is_none());
}

#[tokio::test]
async fn truncated_list_surfaces_count_discrepancy() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 3, "next": null, "previous": null,
            "results": [proposal_json("A", 30), proposal_json("B", 30)]
        })),
    );

    let fetcher = fetcher_with(transport);
    let (_, sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    let error = sequence.collect().await.unwrap_err();
    match error {
        UpstreamError::Wire { cause, .. } => assert!(cause.contains("truncated")),
        other => panic!("expected wire error, got {other}"),
    }
}

#[tokio::test]
async fn lenient_mode_drops_malformed_records() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 2, "next": null, "previous": null,
            "results": [
                {"code": "BAD"},
                proposal_json("GOOD", 30)
            ]
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let (_, sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    let proposals = sequence.lenient().collect().await.unwrap();
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].code.as_str(), "GOOD");

    // Strict mode terminates on the malformed element instead.
    let (_, strict) = fetcher_with(transport)
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    assert!(strict.collect().await.is_err());
}

// ============================================================================
// Retries & failure policy
// ============================================================================

#[tokio::test(start_paused = true)]
async fn rate_limited_request_is_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(submissions_url(), MockReply::status(429, "slow down"));
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 0, "next": null, "previous": null, "results": []
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let (count, _) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn persistent_server_errors_become_unavailable() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(submissions_url(), MockReply::status(503, "down"));

    let fetcher = fetcher_with(transport.clone());
    let error = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap_err();
    match error {
        UpstreamError::Unavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected unavailable, got {other}"),
    }
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn client_errors_fail_fast() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(submissions_url(), MockReply::status(400, "bad request"));

    let fetcher = fetcher_with(transport.clone());
    let error = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap_err();
    match error {
        UpstreamError::Client { status, body, .. } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad request");
        }
        other => panic!("expected client error, got {other}"),
    }
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn missing_detail_is_not_found() {
    let transport = Arc::new(MockTransport::new());
    let fetcher = fetcher_with(transport);
    let error = fetcher
        .fetch_detail::<Proposal>("/api/events/ev/submissions/NOPE/", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn every_request_carries_auth_version_and_accept() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 0, "next": null, "previous": null, "results": []
        })),
    );

    let fetcher = fetcher_with(transport.clone());
    let _ = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    assert!(headers.contains(&("Authorization", "Token t0k3n".to_string())));
    assert!(headers.contains(&("Pretalx-Version", "v2".to_string())));
    assert!(headers.contains(&("Accept", "application/json".to_string())));
}

#[tokio::test]
async fn independent_endpoints_share_one_throttle() {
    let transport = Arc::new(MockTransport::new());
    let speakers_url = format!("{BASE}/api/events/ev/speakers/");
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 0, "next": null, "previous": null, "results": []
        })),
    );
    transport.enqueue(
        speakers_url,
        MockReply::json(json!({
            "count": 0, "next": null, "previous": null, "results": []
        })),
    );

    // Clones share the token bucket; overlapping calls both complete.
    let fetcher = fetcher_with(transport.clone());
    let worker = fetcher.clone();
    let params = QueryParams::new();
    let submissions = fetcher.fetch_all::<Proposal>("/api/events/ev/submissions/", &params);
    let speakers = worker.fetch_all::<serde_json::Value>("/api/events/ev/speakers/", &params);
    let (submissions, speakers) = tokio::join!(submissions, speakers);
    assert!(submissions.is_ok());
    assert!(speakers.is_ok());
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn cancellation_aborts_the_sequence() {
    let transport = Arc::new(MockTransport::new());
    let page2 = format!("{BASE}/api/events/ev/submissions/?page=2");
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 2, "next": page2, "previous": null,
            "results": [proposal_json("A", 30)]
        })),
    );

    let fetcher = fetcher_with(transport);
    let cancel = fetcher.cancel_token();
    let (_, mut sequence) = fetcher
        .fetch_list::<Proposal>("/api/events/ev/submissions/", &QueryParams::new())
        .await
        .unwrap();

    let first = sequence.next().await.unwrap();
    assert!(first.is_ok());
    cancel.cancel();
    match sequence.next().await.unwrap() {
        Err(UpstreamError::Cancelled) => {}
        other => panic!("expected cancelled, got {other:?}"),
    }
}

// ============================================================================
// Expansion & aliasing
// ============================================================================

#[tokio::test]
async fn cold_cache_expands_track_with_one_detail_fetch() {
    let transport = Arc::new(MockTransport::new());
    let track_url = format!("{BASE}/api/events/ev/tracks/7/");
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 2, "next": null, "previous": null,
            "results": [
                {
                    "code": "A", "title": "First",
                    "submission_type": {"id": 3, "name": {"en": "Talk"}},
                    "track": 7, "state": "accepted", "duration": 30
                },
                {
                    "code": "B", "title": "Second",
                    "submission_type": {"id": 3, "name": {"en": "Talk"}},
                    "track": 7, "state": "accepted", "duration": 45
                }
            ]
        })),
    );
    transport.enqueue(
        track_url.clone(),
        MockReply::json(json!({"id": 7, "name": {"en": "PyData: ML"}})),
    );

    let client = UpstreamClient::new(fetcher_with(transport.clone()));
    client.cache().set_prepopulation(false);

    let event = EventSlug::from("ev");
    let (_, stream) = client.submissions(&event, &QueryParams::new()).await.unwrap();
    let proposals = stream.collect().await.unwrap();

    assert_eq!(proposals.len(), 2);
    for proposal in &proposals {
        let track = proposal.track.as_ref().unwrap().as_full().unwrap();
        assert_eq!(track.name.localized("en"), "PyData: ML");
    }
    // One detail fetch for the cold miss; the second proposal hits the cache.
    assert_eq!(transport.hits_for(&track_url), 1);
}

#[tokio::test]
async fn prepopulation_replaces_per_item_fetches() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        format!("{BASE}/api/events/ev/tracks/"),
        MockReply::json(json!({
            "count": 1, "next": null, "previous": null,
            "results": [{"id": 7, "name": {"en": "Systems"}}]
        })),
    );
    transport.enqueue(
        format!("{BASE}/api/events/ev/submission-types/"),
        MockReply::json(json!({
            "count": 1, "next": null, "previous": null,
            "results": [{"id": 3, "name": {"en": "Talk"}}]
        })),
    );
    transport.enqueue(
        submissions_url(),
        MockReply::json(json!({
            "count": 1, "next": null, "previous": null,
            "results": [{
                "code": "A", "title": "First",
                "submission_type": 3, "track": 7,
                "state": "accepted", "duration": 30
            }]
        })),
    );

    let client = UpstreamClient::new(fetcher_with(transport.clone()));
    let event = EventSlug::from("ev");
    let (_, stream) = client.submissions(&event, &QueryParams::new()).await.unwrap();
    let proposals = stream.collect().await.unwrap();

    assert_eq!(proposals.len(), 1);
    assert!(proposals[0].track.as_ref().unwrap().is_full());
    assert!(proposals[0].submission_type.is_full());
    // Exactly three requests: tracks, submission-types, submissions.
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn bounded_query_skips_prepopulation() {
    let transport = Arc::new(MockTransport::new());
    let bounded_url = format!("{BASE}/api/events/ev/submissions/?limit=2");
    transport.enqueue(
        bounded_url,
        MockReply::json(json!({
            "count": 0, "next": null, "previous": null, "results": []
        })),
    );

    let client = UpstreamClient::new(fetcher_with(transport.clone()));
    let event = EventSlug::from("ev");
    let params = QueryParams::new().limit(2);
    let (_, stream) = client.submissions(&event, &params).await.unwrap();
    let proposals = stream.collect().await.unwrap();

    assert!(proposals.is_empty());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn detail_endpoints_return_single_records() {
    let transport = Arc::new(MockTransport::new());
    transport.enqueue(
        format!("{BASE}/api/events/rustconf-2026/"),
        MockReply::json(json!({
            "slug": "rustconf-2026",
            "name": {"en": "RustConf"},
            "date_from": "2026-04-23",
            "date_to": "2026-04-25",
            "timezone": "Europe/Berlin"
        })),
    );
    transport.enqueue(
        format!("{BASE}/api/me/"),
        MockReply::json(json!({"name": "Program Chair", "email": "chair@example.org"})),
    );

    let client = UpstreamClient::new(fetcher_with(transport.clone()));
    let event = client
        .event(&EventSlug::from("rustconf-2026"))
        .await
        .unwrap();
    assert_eq!(event.day_count(), 3);
    assert_eq!(event.timezone.as_deref(), Some("Europe/Berlin"));

    let me = client.me().await.unwrap();
    assert_eq!(me.name, "Program Chair");
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn talks_alias_falls_back_to_filtered_submissions() {
    let transport = Arc::new(MockTransport::new());
    let fallback_url = format!("{BASE}/api/events/ev/submissions/?state=accepted&state=confirmed");
    transport.enqueue(
        fallback_url,
        MockReply::json(json!({
            "count": 1, "next": null, "previous": null,
            "results": [proposal_json("A", 30)]
        })),
    );

    let client = UpstreamClient::new(fetcher_with(transport.clone()));
    client.cache().set_prepopulation(false);
    assert!(!client.talks_alias_recorded());

    let event = EventSlug::from("ev");
    let (count, stream) = client.talks(&event, &QueryParams::new()).await.unwrap();
    let talks = stream.collect().await.unwrap();

    assert_eq!(count, 1);
    assert_eq!(talks[0].code.as_str(), "A");
    assert!(client.talks_alias_recorded());
}
