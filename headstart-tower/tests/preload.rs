use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use futures::stream;
use http::header::{self, HeaderValue};
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use tower::{Layer, ServiceExt, service_fn};

use headstart_tower::{Preload, PreloadConfig};

const PAGE: &str = r#"<html><body><img src="/a.jpg"><script src="/b.js"></script><link rel="stylesheet" href="/c.css"></body></html>"#;

fn request() -> Request<Empty<Bytes>> {
    Request::get("/").body(Empty::new()).unwrap()
}

fn html_response(body: &str, etag: Option<&str>) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    if let Some(etag) = etag {
        builder = builder.header(header::ETAG, etag);
    }
    builder
        .body(Full::new(Bytes::from(body.to_owned())))
        .unwrap()
}

fn link_values<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::LINK)
        .iter()
        .map(|value| value.to_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn injects_one_value_per_reference() {
    let layer = Preload::default();
    let service = layer.layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(html_response(PAGE, Some("\"abc\"")))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        [
            "</a.jpg>; rel=preload; as=image",
            "</b.js>; rel=preload; as=script",
            "</c.css>; rel=preload; as=style",
        ]
    );
    assert!(layer.cache().contains("\"abc\""));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(PAGE));
}

#[tokio::test]
async fn page_without_references_gets_no_header() {
    let page = "<html><body><p>plain text</p></body></html>";
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(page));
}

#[tokio::test]
async fn non_html_responses_stream_through() {
    let payload = r#"{"img": "/a.jpg"}"#;
    let layer = Preload::default();
    let service = layer.layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ETAG, "\"json\"")
                .body(Full::new(Bytes::from(payload)))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    assert!(layer.cache().is_empty());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(payload));
}

#[tokio::test]
async fn missing_content_type_streams_through() {
    let service = Preload::default().layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(
            Response::builder()
                .body(Full::new(Bytes::from(PAGE)))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(PAGE));
}

#[tokio::test]
async fn html_media_type_is_matched_exactly() {
    // A longer token that merely starts with text/html does not qualify.
    let service = Preload::default().layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "text/html5")
                .body(Full::new(Bytes::from(PAGE)))
                .unwrap(),
        )
    }));
    let response = service.oneshot(request()).await.unwrap();
    assert!(response.headers().get(header::LINK).is_none());

    // Case differences do not matter.
    let service = Preload::default().layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "TEXT/HTML")
                .body(Full::new(Bytes::from(PAGE)))
                .unwrap(),
        )
    }));
    let response = service.oneshot(request()).await.unwrap();
    assert_eq!(link_values(&response).len(), 3);
}

#[tokio::test]
async fn media_type_parameters_are_accepted() {
    let service = Preload::default().layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "text/html;charset=iso-8859-1")
                .body(Full::new(Bytes::from(PAGE)))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();
    assert_eq!(link_values(&response).len(), 3);
}

#[tokio::test]
async fn inline_data_images_are_skipped() {
    let page = r#"<html><body><img src="data:image/png;base64,iVBORw0KGgo="><img src="/real.png"></body></html>"#;
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        ["</real.png>; rel=preload; as=image"]
    );
}

#[tokio::test]
async fn base_href_prefixes_relative_targets() {
    let page = r#"<html><head><base href="https://cdn.example/static/"></head><body><img src="logo.png"><img src="/root.png"><img src="https://other.example/far.png"></body></html>"#;
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        [
            "<https://cdn.example/static/logo.png>; rel=preload; as=image",
            "</root.png>; rel=preload; as=image",
            "<https://other.example/far.png>; rel=preload; as=image",
        ]
    );
}

#[tokio::test]
async fn extra_attributes_append_in_order() {
    let page = r#"<html><body><img src="/a.jpg"></body></html>"#;
    let config = PreloadConfig::builder().extra_link_attribute("nopush").build();
    let service = Preload::new(config).layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        ["</a.jpg>; rel=preload; as=image; nopush"]
    );
}

#[tokio::test]
async fn non_ascii_targets_are_percent_encoded() {
    let page = r#"<html><body><img src="/ø.jpg"></body></html>"#;
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        ["</%C3%B8.jpg>; rel=preload; as=image"]
    );
}

#[tokio::test]
async fn replay_uses_cached_references() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let upstream = service_fn(move |_: Request<Empty<Bytes>>| {
        let calls = seen.clone();
        async move {
            let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
            let body = if first {
                r#"<html><body><img src="/first.jpg"></body></html>"#
            } else {
                r#"<html><body><img src="/second.jpg"></body></html>"#
            };
            Ok::<_, Infallible>(html_response(body, Some("\"W123\"")))
        }
    });
    let layer = Preload::default();

    let first = layer.layer(upstream.clone()).oneshot(request()).await.unwrap();
    assert_eq!(
        link_values(&first),
        ["</first.jpg>; rel=preload; as=image"]
    );

    // Same validator: headers replay from the cache even though the body
    // changed, and that body still streams through untouched.
    let second = layer.layer(upstream).oneshot(request()).await.unwrap();
    assert_eq!(
        link_values(&second),
        ["</first.jpg>; rel=preload; as=image"]
    );
    let body = second.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(
        body,
        Bytes::from(r#"<html><body><img src="/second.jpg"></body></html>"#)
    );
    assert_eq!(layer.cache().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn distinct_fingerprints_are_scanned_separately() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let upstream = service_fn(move |_: Request<Empty<Bytes>>| {
        let calls = seen.clone();
        async move {
            let first = calls.fetch_add(1, Ordering::SeqCst) == 0;
            let (body, etag) = if first {
                (r#"<html><body><img src="/first.jpg"></body></html>"#, "\"v1\"")
            } else {
                (r#"<html><body><img src="/second.jpg"></body></html>"#, "\"v2\"")
            };
            Ok::<_, Infallible>(html_response(body, Some(etag)))
        }
    });
    let layer = Preload::default();

    let first = layer.layer(upstream.clone()).oneshot(request()).await.unwrap();
    assert_eq!(link_values(&first), ["</first.jpg>; rel=preload; as=image"]);

    let second = layer.layer(upstream).oneshot(request()).await.unwrap();
    assert_eq!(link_values(&second), ["</second.jpg>; rel=preload; as=image"]);
    assert_eq!(layer.cache().len(), 2);
}

#[tokio::test]
async fn responses_without_validator_are_not_cached() {
    let layer = Preload::default();
    let service = layer.layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(html_response(PAGE, None))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(link_values(&response).len(), 3);
    assert!(layer.cache().is_empty());
}

#[tokio::test]
async fn error_status_html_is_still_scanned() {
    let page = r#"<html><body><img src="/not-found.png"></body></html>"#;
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header(header::CONTENT_TYPE, "text/html")
                .body(Full::new(Bytes::from(page)))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        link_values(&response),
        ["</not-found.png>; rel=preload; as=image"]
    );
}

#[tokio::test]
async fn existing_link_values_are_preserved() {
    let page = r#"<html><body><img src="/a.jpg"></body></html>"#;
    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        let mut response = html_response(page, None);
        response.headers_mut().append(
            header::LINK,
            HeaderValue::from_static("</base.css>; rel=stylesheet"),
        );
        Ok::<_, Infallible>(response)
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert_eq!(
        link_values(&response),
        [
            "</base.css>; rel=stylesheet",
            "</a.jpg>; rel=preload; as=image",
        ]
    );
}

#[tokio::test]
async fn body_read_failure_abandons_interception() {
    let layer = Preload::default();
    let service = layer.layer(service_fn(|_: Request<Empty<Bytes>>| async {
        let stream = stream::iter(vec![
            Ok(http_body::Frame::data(Bytes::from("<html><body>"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer gone")),
        ]);
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "text/html")
                .header(header::ETAG, "\"gone\"")
                .body(StreamBody::new(stream))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    assert!(layer.cache().is_empty());

    // The error surfaces on the first frame; the buffered prefix is not
    // replayed as if it were a complete document.
    let mut body = response.into_body();
    let first = body.frame().await.unwrap();
    assert!(first.is_err());
    assert!(body.frame().await.is_none());
}

#[tokio::test]
async fn capture_limit_releases_stream_unscanned() {
    let chunks = [
        r#"<html><body><img src="/big.jpg">"#,
        r#"<p>filler filler filler</p>"#,
        r#"</body></html>"#,
    ];
    let full_page: String = chunks.concat();
    let config = PreloadConfig::builder().max_capture_bytes(10).build();
    let layer = Preload::new(config);
    let service = layer.layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        let stream = stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, Infallible>(http_body::Frame::data(Bytes::from(chunk))))
                .collect::<Vec<_>>(),
        );
        Ok::<_, Infallible>(
            Response::builder()
                .header(header::CONTENT_TYPE, "text/html")
                .header(header::ETAG, "\"big\"")
                .body(StreamBody::new(stream))
                .unwrap(),
        )
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    assert!(layer.cache().is_empty());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(full_page));
}

#[tokio::test]
async fn disabled_scanners_leave_responses_untouched() {
    let config = PreloadConfig::builder()
        .images(false)
        .scripts(false)
        .styles(false)
        .build();
    let layer = Preload::new(config);
    let service = layer.layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Ok::<_, Infallible>(html_response(PAGE, Some("\"abc\"")))
    }));

    let response = service.oneshot(request()).await.unwrap();

    assert!(response.headers().get(header::LINK).is_none());
    assert!(layer.cache().is_empty());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body, Bytes::from(PAGE));
}

#[tokio::test]
async fn html_imports_require_the_switch() {
    let page = r#"<html><head><link rel="import" href="/widget.html"></head></html>"#;

    let service = Preload::default().layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));
    let response = service.oneshot(request()).await.unwrap();
    assert!(response.headers().get(header::LINK).is_none());

    let config = PreloadConfig::builder().html_imports(true).build();
    let service = Preload::new(config).layer(service_fn(move |_: Request<Empty<Bytes>>| async move {
        Ok::<_, Infallible>(html_response(page, None))
    }));
    let response = service.oneshot(request()).await.unwrap();
    assert_eq!(
        link_values(&response),
        ["</widget.html>; rel=preload; as=document"]
    );
}

#[tokio::test]
async fn upstream_errors_propagate() {
    let service = Preload::default().layer(service_fn(|_: Request<Empty<Bytes>>| async {
        Err::<Response<Full<Bytes>>, io::Error>(io::Error::other("upstream exploded"))
    }));

    let result = service.oneshot(request()).await;
    assert!(result.is_err());
}
