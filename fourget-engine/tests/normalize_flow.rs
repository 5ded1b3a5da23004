//! End-to-end normalization of a realistic mixed response body.

use fourget_common::{CanonicalResult, MediaDuration, UpstreamError};
use fourget_engine::normalize_at;
use serde_json::json;

const NOW: i64 = 1_700_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("normalize=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn mixed_body_normalizes_in_fixed_order_with_per_item_drops() {
    init_tracing();

    let body = json!({
        "status": "ok",
        "spelling": {"type": "including", "correction": "northern lights"},
        "related": ["aurora forecast"],
        "answer": [{
            "title": "Aurora",
            "url": "https://en.wikipedia.org/wiki/Aurora",
            "description": [
                {"type": "text", "value": "An aurora is a natural light display."},
                {"type": "image", "value": "ignored"}
            ],
            "table": {"Also known as": "polar lights"},
            "sublink": {"Forecast": "https://aurora.example/forecast"}
        }],
        "web": [
            {
                "title": "Aurora watching guide",
                "url": "//guides.example/aurora",
                "description": "  Where   and when to look.  "
            },
            {"title": "dropped: no url"},
            {
                "title": "dropped: far future",
                "url": "https://a.example/x",
                "date": NOW + 3 * 86_400
            }
        ],
        "image": [{
            "title": "Green aurora",
            "url": "https://pics.example/p/1",
            "source": [
                {"url": "/img?url=https%3A%2F%2Fcdn.example%2Ffull.jpg"},
                {"url": "https://cdn.example/thumb.jpg"}
            ]
        }],
        "video": [{
            "title": "Aurora timelapse",
            "url": "https://videos.example/w/9",
            "description": "Four hours in forty seconds.",
            "thumb": {"url": "https://videos.example/t/9.jpg"},
            "date": NOW - 86_400,
            "author": "skycam",
            "duration": 40,
            "views": 120_000
        }],
        "news": [{
            "title": "Solar storm tonight",
            "url": "https://news.example/a/5",
            "description": "Forecasters expect strong activity.",
            "date": NOW - 7_200,
            "author": "wire desk"
        }],
        "song": [{
            "title": "Aurora (live)",
            "url": "https://music.example/s/3",
            "stream": {"endpoint": "bandcamp"}
        }]
    });

    let results = normalize_at(&body, NOW).unwrap();

    // Suggestions, then the answer-derived infobox, then categories in
    // dispatch order with the two bad web items dropped.
    assert_eq!(results.len(), 8);

    assert_eq!(
        results[0],
        CanonicalResult::Suggestion { text: "northern lights".into() }
    );
    assert_eq!(
        results[1],
        CanonicalResult::Suggestion { text: "aurora forecast".into() }
    );

    let CanonicalResult::Infobox { title, content, urls, attributes, .. } = &results[2] else {
        panic!("expected infobox, got {:?}", results[2]);
    };
    assert_eq!(title, "Aurora");
    assert_eq!(content, "An aurora is a natural light display.");
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].title, "Source");
    assert_eq!(urls[1].title, "Forecast");
    assert_eq!(attributes[0].label, "Also known as");
    assert_eq!(attributes[0].value, "polar lights");

    let CanonicalResult::Web { title, url, content, .. } = &results[3] else {
        panic!("expected web, got {:?}", results[3]);
    };
    assert_eq!(title, "Aurora watching guide");
    assert_eq!(url, "https://guides.example/aurora");
    assert_eq!(content, "Where and when to look.");

    assert_eq!(
        results[4],
        CanonicalResult::Image {
            title: "Green aurora".into(),
            url: "https://pics.example/p/1".into(),
            image_url: "https://cdn.example/full.jpg".into(),
            thumbnail_url: Some("https://cdn.example/thumb.jpg".into()),
        }
    );

    let CanonicalResult::Video { author, duration, views, published_at, .. } = &results[5] else {
        panic!("expected video, got {:?}", results[5]);
    };
    assert_eq!(author.as_deref(), Some("skycam"));
    assert_eq!(*duration, Some(MediaDuration::Seconds(40)));
    assert_eq!(views.as_deref(), Some("120000"));
    assert_eq!(published_at.unwrap().timestamp(), NOW - 86_400);

    assert!(matches!(
        &results[6],
        CanonicalResult::News { author: Some(a), .. } if a == "wire desk"
    ));

    assert!(matches!(
        &results[7],
        CanonicalResult::Video { content, .. } if content == "Source: BANDCAMP"
    ));
}

#[test]
fn error_status_classifies_and_aborts_the_batch() {
    init_tracing();

    let body = json!({
        "status": "error",
        "message": "Captcha detected, please wait"
    });
    let err = normalize_at(&body, NOW).unwrap_err();
    assert!(matches!(err, UpstreamError::Captcha { .. }));
    assert_eq!(err.suspend().unwrap().as_secs(), 300);

    let body = json!({"status": "error", "message": "too many requests"});
    let err = normalize_at(&body, NOW).unwrap_err();
    assert_eq!(err.suspend().unwrap().as_secs(), 60);

    let body = json!({"status": "error", "message": "Class brave not found"});
    let err = normalize_at(&body, NOW).unwrap_err();
    assert_eq!(err.message(), "Class brave not found");
    assert_eq!(err.suspend(), None);
}

#[test]
fn canonical_results_serialize_with_a_type_tag() {
    let body = json!({
        "web": [{"title": "t", "url": "https://a.example/p", "description": "d"}]
    });
    let results = normalize_at(&body, NOW).unwrap();
    let wire = serde_json::to_value(&results[0]).unwrap();
    assert_eq!(wire["type"], "web");
    assert_eq!(wire["url"], "https://a.example/p");
    // Absent optionals stay off the wire entirely.
    assert!(wire.get("thumbnail").is_none());
}
