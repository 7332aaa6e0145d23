//! Per-request context.
//!
//! A [`Context`] is created for every request and owned by it. Middleware and
//! handlers read the request through it and build the response in it. Nothing
//! in a context is shared with other requests.
//!
//! On creation the data bag is seeded with the request headers, then with the
//! query string and any `application/x-www-form-urlencoded` body. Path
//! parameters captured by the router are injected last, so a capture wins
//! over a form field of the same name.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use falcon_router::Params;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, HOST, REFERER, USER_AGENT};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use http_body_util::Full;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;

use crate::error::FalconResult;
use crate::{Request, Response};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Percent-decodes each segment of a request path.
///
/// A segment that does not decode to UTF-8 is kept as sent.
fn decode_path(raw: &str) -> String {
    raw.split('/')
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn accepts_html_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(text/html|application/xhtml\+xml)(?:,|$)").expect("valid regex"))
}

fn accepts_xml_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(application/xml|text/xml)(?:,|$)").expect("valid regex"))
}

fn accepts_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(application/json)(?:,|$)").expect("valid regex"))
}

/// Request and response state for one request.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    path: String,
    params: Params,
    data: HashMap<String, String>,
    remote_addr: Option<SocketAddr>,
    tls: bool,

    status: StatusCode,
    response_headers: HeaderMap,
    response_body: BytesMut,
}

impl Context {
    /// Creates a context for a request with a collected body.
    pub fn new(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        let path = falcon_router::canonicalize(&decode_path(parts.uri.path()));

        let mut ctx = Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            path,
            params: Params::new(),
            data: HashMap::new(),
            remote_addr: None,
            tls: false,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: BytesMut::new(),
        };
        ctx.seed_data();
        ctx
    }

    /// Records the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Marks the request as received over TLS.
    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    fn seed_data(&mut self) {
        for name in self.headers.keys() {
            let joined = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(",");
            self.data.insert(name.as_str().to_string(), joined);
        }

        for (key, value) in self.query() {
            self.data.insert(key, value);
        }

        if self.is_form_body() {
            let form: Vec<(String, String)> = url::form_urlencoded::parse(&self.body)
                .into_owned()
                .collect();
            self.data.extend(form);
        }
    }

    fn is_form_body(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
    }

    /// Stores the parameters captured by the matched route.
    pub(crate) fn set_params(&mut self, params: Params) {
        for (name, value) in &params {
            self.data.insert(name.to_string(), value.to_string());
        }
        self.params = params;
    }

    // Request side

    /// Returns the HTTP version, e.g. `HTTP/1.1`.
    pub fn protocol(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/1.1",
        }
    }

    /// Returns the full request URI including the query string.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the percent-decoded, canonical request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a request header as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the raw request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `http` or `https`.
    ///
    /// `X-Forwarded-Proto` wins, then the URI scheme, then whether the
    /// connection was TLS.
    pub fn scheme(&self) -> &str {
        if let Some(proto) = self.header(X_FORWARDED_PROTO).filter(|p| !p.is_empty()) {
            return proto;
        }
        if let Some(scheme) = self.uri.scheme_str() {
            return scheme;
        }
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    fn authority(&self) -> Option<&str> {
        self.header(HOST.as_str())
            .filter(|h| !h.is_empty())
            .or_else(|| self.uri.authority().map(http::uri::Authority::as_str))
    }

    /// Returns the host name without the port, or `localhost`.
    pub fn host(&self) -> &str {
        let Some(authority) = self.authority() else {
            return "localhost";
        };
        if let Some(rest) = authority.strip_prefix('[') {
            return rest.split(']').next().unwrap_or(rest);
        }
        authority.split(':').next().unwrap_or(authority)
    }

    /// Returns the port from the host, or 80.
    pub fn port(&self) -> u16 {
        self.authority()
            .and_then(|a| a.rsplit_once(':'))
            .filter(|(_, port)| !port.contains(']'))
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or(80)
    }

    /// Returns `scheme://host`.
    pub fn site(&self) -> String {
        format!("{}://{}", self.scheme(), self.host())
    }

    /// Alias of [`Context::host`].
    pub fn domain(&self) -> &str {
        self.host()
    }

    /// Returns everything left of the registrable domain.
    ///
    /// `api.eu.example.com` yields `api.eu`; two-label hosts yield `""`.
    pub fn subdomain(&self) -> String {
        let parts: Vec<&str> = self.host().split('.').collect();
        if parts.len() >= 3 {
            parts[..parts.len() - 2].join(".")
        } else {
            String::new()
        }
    }

    /// Returns the peer address.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the `Referer` header.
    pub fn referer(&self) -> Option<&str> {
        self.header(REFERER.as_str())
    }

    /// Returns the `User-Agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.header(USER_AGENT.as_str())
    }

    /// Returns the `X-Forwarded-For` chain.
    pub fn proxy(&self) -> Vec<&str> {
        self.header(X_FORWARDED_FOR)
            .map(|ips| ips.split(',').map(str::trim).collect())
            .unwrap_or_default()
    }

    /// Returns the client IP.
    ///
    /// The first forwarded address if any, else the peer address, else
    /// `127.0.0.1`.
    pub fn ip(&self) -> String {
        if let Some(first) = self.proxy().first().filter(|ip| !ip.is_empty()) {
            return strip_port(first).to_string();
        }
        self.remote_addr
            .map_or_else(|| "127.0.0.1".to_string(), |addr| addr.ip().to_string())
    }

    fn accept(&self) -> &str {
        self.header(ACCEPT.as_str()).unwrap_or("")
    }

    /// Whether the client accepts HTML.
    pub fn accepts_html(&self) -> bool {
        accepts_html_regex().is_match(self.accept())
    }

    /// Whether the client accepts XML.
    pub fn accepts_xml(&self) -> bool {
        accepts_xml_regex().is_match(self.accept())
    }

    /// Whether the client accepts JSON.
    pub fn accepts_json(&self) -> bool {
        accepts_json_regex().is_match(self.accept())
    }

    /// Decodes the query string.
    pub fn query(&self) -> Vec<(String, String)> {
        self.uri
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// Returns a path parameter by capture name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns all path parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a value from the data bag.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Stores a value in the data bag.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    // Response side

    /// Returns the response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets a response header, replacing any previous value.
    ///
    /// Invalid names or values are dropped with a warning.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.response_headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Returns the response headers set so far.
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Appends a string to the response body.
    pub fn write_str(&mut self, data: &str) -> &mut Self {
        self.response_body.extend_from_slice(data.as_bytes());
        self
    }

    /// Appends bytes to the response body.
    pub fn write(&mut self, data: &[u8]) -> &mut Self {
        self.response_body.extend_from_slice(data);
        self
    }

    /// Returns the response body written so far.
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Replaces the body with `value` serialized as JSON.
    pub fn json<T: Serialize>(&mut self, value: &T) -> FalconResult<&mut Self> {
        let body = serde_json::to_vec(value)?;
        self.response_body.clear();
        self.response_body.extend_from_slice(&body);
        self.response_headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Consumes the context and builds the response.
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.response_body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match addr.split_once(':') {
        // A bare IPv6 address has more than one colon.
        Some((host, port)) if !port.contains(':') => host,
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> http::request::Builder {
        http::Request::builder().uri(uri)
    }

    fn ctx(builder: http::request::Builder) -> Context {
        Context::new(builder.body(Bytes::new()).unwrap())
    }

    #[test]
    fn test_path_is_canonical() {
        let ctx = ctx(request("/a//b/./c/?x=1"));
        assert_eq!(ctx.path(), "/a/b/c");
        assert_eq!(ctx.uri().query(), Some("x=1"));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        assert_eq!(ctx(request("/user/john%20doe")).path(), "/user/john doe");
        assert_eq!(ctx(request("/caf%C3%A9/")).path(), "/café");
    }

    #[test]
    fn test_undecodable_segment_is_kept() {
        assert_eq!(decode_path("/a/%FF/b%21"), "/a/%FF/b!");
    }

    #[test]
    fn test_scheme_resolution() {
        let plain = ctx(request("/"));
        assert_eq!(plain.scheme(), "http");

        let tls = ctx(request("/")).with_tls(true);
        assert_eq!(tls.scheme(), "https");

        let forwarded = ctx(request("/").header("X-Forwarded-Proto", "https"));
        assert_eq!(forwarded.scheme(), "https");

        let absolute = ctx(request("https://example.com/"));
        assert_eq!(absolute.scheme(), "https");
    }

    #[test]
    fn test_host_and_port() {
        let ctx1 = ctx(request("/").header("Host", "api.example.com:8443"));
        assert_eq!(ctx1.host(), "api.example.com");
        assert_eq!(ctx1.port(), 8443);
        assert_eq!(ctx1.site(), "http://api.example.com");
        assert_eq!(ctx1.subdomain(), "api");

        let ctx2 = ctx(request("/"));
        assert_eq!(ctx2.host(), "localhost");
        assert_eq!(ctx2.port(), 80);
        assert_eq!(ctx2.subdomain(), "");

        let ctx3 = ctx(request("/").header("Host", "[::1]:3000"));
        assert_eq!(ctx3.host(), "::1");
        assert_eq!(ctx3.port(), 3000);
    }

    #[test]
    fn test_client_ip() {
        let direct = ctx(request("/")).with_remote_addr("10.0.0.9:5000".parse().unwrap());
        assert_eq!(direct.ip(), "10.0.0.9");

        let proxied = ctx(request("/").header("X-Forwarded-For", "203.0.113.7:41000, 10.0.0.1"));
        assert_eq!(proxied.proxy(), ["203.0.113.7:41000", "10.0.0.1"]);
        assert_eq!(proxied.ip(), "203.0.113.7");

        assert_eq!(ctx(request("/")).ip(), "127.0.0.1");
    }

    #[test]
    fn test_accepts() {
        let ctx = ctx(request("/").header("Accept", "text/html,application/json"));
        assert!(ctx.accepts_html());
        assert!(ctx.accepts_json());
        assert!(!ctx.accepts_xml());
    }

    #[test]
    fn test_data_seeded_from_headers_query_and_form() {
        let req = request("/submit?page=2")
            .header("User-Agent", "falcon-test")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"name=ada&lang=en"))
            .unwrap();
        let ctx = Context::new(req);

        assert_eq!(ctx.get("user-agent"), Some("falcon-test"));
        assert_eq!(ctx.user_agent(), Some("falcon-test"));
        assert_eq!(ctx.get("page"), Some("2"));
        assert_eq!(ctx.get("name"), Some("ada"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_params_override_form_fields() {
        let mut ctx = ctx(request("/users/7?id=query"));
        assert_eq!(ctx.get("id"), Some("query"));

        let params: Params = [("id", "7")].into_iter().collect();
        ctx.set_params(params);
        assert_eq!(ctx.param("id"), Some("7"));
        assert_eq!(ctx.get("id"), Some("7"));
    }

    #[test]
    fn test_response_building() {
        let mut ctx = ctx(request("/"));
        ctx.set_status(StatusCode::CREATED)
            .set_header("X-Trace", "abc")
            .write_str("hello ")
            .write(b"world");

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-trace"], "abc");
    }

    #[test]
    fn test_invalid_header_is_dropped() {
        let mut ctx = ctx(request("/"));
        ctx.set_header("bad header", "x");
        assert!(ctx.response_headers().is_empty());
    }

    #[test]
    fn test_json_body() {
        let mut ctx = ctx(request("/"));
        ctx.write_str("discarded");
        ctx.json(&serde_json::json!({ "ok": true })).unwrap();
        assert_eq!(ctx.response_body(), br#"{"ok":true}"#);
        assert_eq!(ctx.response_headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_protocol() {
        let ctx = ctx(request("/").version(Version::HTTP_10));
        assert_eq!(ctx.protocol(), "HTTP/1.0");
    }
}
