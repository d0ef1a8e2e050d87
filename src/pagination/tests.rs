//! Tests for `has_more` pagination

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;

fn page(records: serde_json::Value, has_more: bool) -> String {
    json!({"deals": records, "has_more": has_more}).to_string()
}

#[test]
fn test_page_params_start_at_one() {
    let paginator = HasMorePaginator::new("deals");
    let mut state = PaginationState::new();
    assert_eq!(
        paginator.page_params(&state),
        vec![
            ("page".to_string(), "1".to_string()),
            ("limit".to_string(), "200".to_string())
        ]
    );

    state.next_page();
    let stages = HasMorePaginator::new("deal_stages").with_limit(12);
    assert_eq!(stages.page_params(&state)[0].1, "2");
    assert_eq!(stages.page_params(&state)[1].1, "12");
}

#[test]
fn test_classify_well_formed_page() {
    let paginator = HasMorePaginator::new("deals");
    let outcome = paginator.classify(200, &page(json!([{"id": "a"}]), true));
    assert_eq!(
        outcome,
        PageOutcome::Fetched {
            records: vec![json!({"id": "a"})],
            has_more: true
        }
    );
}

#[test]
fn test_classify_missing_keys_is_malformed() {
    let paginator = HasMorePaginator::new("deals");
    assert!(matches!(
        paginator.classify(200, r#"{"has_more": false}"#),
        PageOutcome::Malformed { .. }
    ));
    assert!(matches!(
        paginator.classify(200, r#"{"deals": []}"#),
        PageOutcome::Malformed { .. }
    ));
    assert!(matches!(
        paginator.classify(200, "<html>"),
        PageOutcome::Malformed { .. }
    ));
}

#[test]
fn test_classify_error_status() {
    let paginator = HasMorePaginator::new("deals");
    let outcome = paginator.classify(500, "boom");
    assert_eq!(
        outcome,
        PageOutcome::Failed {
            status: 500,
            body: "boom".to_string()
        }
    );
    assert!(!outcome.is_fetched());
}

#[test]
fn test_advance_accumulates_in_order() {
    let paginator = HasMorePaginator::new("deals");
    let mut state = PaginationState::new();
    let mut sink = Vec::new();

    let step = paginator
        .advance(
            paginator.classify(200, &page(json!([{"id": 1}, {"id": 2}]), true)),
            &mut state,
            &mut sink,
        )
        .unwrap();
    assert_eq!(step, PageStep::Continue { page: 2 });
    assert!(step.is_continue());

    let step = paginator
        .advance(
            paginator.classify(200, &page(json!([{"id": 3}]), false)),
            &mut state,
            &mut sink,
        )
        .unwrap();
    assert_eq!(step, PageStep::EndOfPages);
    assert!(state.done);
    assert_eq!(state.pages_fetched, 2);
    assert_eq!(state.total_fetched, 3);
    assert_eq!(sink, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
}

#[test]
fn test_strict_malformed_page_is_error() {
    let paginator = HasMorePaginator::new("deals");
    let mut state = PaginationState::new();
    let mut sink = Vec::new();

    paginator
        .advance(
            paginator.classify(200, &page(json!([{"id": 1}]), true)),
            &mut state,
            &mut sink,
        )
        .unwrap();

    let err = paginator
        .advance(
            paginator.classify(200, r#"{"errors": "x"}"#),
            &mut state,
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(err, Error::MalformedEnvelope { .. }));
}

#[test]
fn test_lenient_stops_on_later_malformed_page() {
    let paginator = HasMorePaginator::new("deals").with_policy(MalformedPolicy::Lenient);
    let mut state = PaginationState::new();
    let mut sink = Vec::new();

    paginator
        .advance(
            paginator.classify(200, &page(json!([{"id": 1}]), true)),
            &mut state,
            &mut sink,
        )
        .unwrap();

    let step = paginator
        .advance(
            paginator.classify(200, r#"{"errors": "x"}"#),
            &mut state,
            &mut sink,
        )
        .unwrap();
    assert!(matches!(step, PageStep::MalformedStop { page: 2, .. }));
    assert!(state.stopped_early);
    assert_eq!(sink, vec![json!({"id": 1})]);
}

#[test]
fn test_lenient_stops_on_later_failed_status() {
    let paginator = HasMorePaginator::new("deals").with_policy(MalformedPolicy::Lenient);
    let mut state = PaginationState::new();
    let mut sink = Vec::new();

    paginator
        .advance(
            paginator.classify(200, &page(json!([{"id": 1}]), true)),
            &mut state,
            &mut sink,
        )
        .unwrap();

    let step = paginator
        .advance(paginator.classify(502, ""), &mut state, &mut sink)
        .unwrap();
    assert_eq!(
        step,
        PageStep::MalformedStop {
            page: 2,
            reason: "HTTP 502".to_string()
        }
    );
}

#[test]
fn test_lenient_first_page_still_fails() {
    let paginator = HasMorePaginator::new("deals").with_policy(MalformedPolicy::Lenient);
    let mut state = PaginationState::new();
    let mut sink = Vec::new();

    let err = paginator
        .advance(
            paginator.classify(200, r#"{"has_more": true}"#),
            &mut state,
            &mut sink,
        )
        .unwrap_err();
    assert!(matches!(err, Error::MalformedEnvelope { .. }));

    let mut state = PaginationState::new();
    let err = paginator
        .advance(paginator.classify(401, "nope"), &mut state, &mut sink)
        .unwrap_err();
    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "nope");
        }
        other => panic!("Expected HTTP status error, got {other:?}"),
    }
}
