//! Property tests for request context accessors.

use bytes::Bytes;
use falcon_core::Context;
use proptest::prelude::*;

fn with_host(host: &str) -> Context {
    let request = http::Request::builder()
        .uri("/")
        .header("Host", host)
        .body(Bytes::new())
        .unwrap();
    Context::new(request)
}

proptest! {
    #[test]
    fn host_never_contains_port(name in "[a-z]{1,10}(\\.[a-z]{1,10}){0,3}", port in 1u16..) {
        let ctx = with_host(&format!("{name}:{port}"));
        prop_assert_eq!(ctx.host(), name.as_str());
        prop_assert_eq!(ctx.port(), port);
    }

    #[test]
    fn subdomain_drops_two_labels(labels in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
        let host = labels.join(".");
        let ctx = with_host(&host);
        let expected = if labels.len() >= 3 {
            labels[..labels.len() - 2].join(".")
        } else {
            String::new()
        };
        prop_assert_eq!(ctx.subdomain(), expected);
    }

    #[test]
    fn request_path_is_canonical(segments in proptest::collection::vec("[a-z0-9.]{0,6}", 0..8)) {
        let raw = format!("/{}", segments.join("/"));
        let request = http::Request::builder().uri(raw.as_str()).body(Bytes::new()).unwrap();
        let ctx = Context::new(request);
        prop_assert!(falcon_router::is_canonical(ctx.path()));
    }
}
