//! Turns a [`DispatchDecision`] into something the HTTP layer can act on.

use crate::decision::DispatchDecision;
use crate::{APP_NAME, APP_VERSION};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use tracing::warn;
use vgate_errors::Denial;

/// Where to send a forwarded request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyTarget {
    pub path: String,
    pub target_host: Option<String>,
    pub specification_id: String,
}

#[derive(Debug)]
pub enum Dispatch {
    /// Answer now.
    Respond(Response<Full<Bytes>>),
    /// Hand off to the upstream proxy.
    Proxy(ProxyTarget),
}

#[derive(Debug, Clone, Default)]
pub struct Responder;

impl Responder {
    pub fn new() -> Self {
        Self
    }

    pub fn dispatch(&self, decision: DispatchDecision, request_id: &str, start: Instant) -> Dispatch {
        match decision {
            DispatchDecision::Forward {
                path,
                target_host,
                specification_id,
                ..
            } => Dispatch::Proxy(ProxyTarget {
                path,
                target_host,
                specification_id,
            }),
            DispatchDecision::Reply {
                status_code,
                body,
                headers,
            } => {
                let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::OK);
                let mut resp = simple(status, Bytes::from(body));
                for (k, v) in headers {
                    match (HeaderName::from_bytes(k.as_bytes()), HeaderValue::from_str(&v)) {
                        (Ok(name), Ok(value)) => {
                            resp.headers_mut().insert(name, value);
                        }
                        _ => warn!(header = %k, "dropping invalid reply header"),
                    }
                }
                if !resp.headers().contains_key(CONTENT_TYPE) {
                    resp.headers_mut()
                        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
                }
                Dispatch::Respond(self.default_headers(resp, request_id, start))
            }
            DispatchDecision::Denied { reason } => {
                Dispatch::Respond(self.default_headers(self.denied(&reason), request_id, start))
            }
        }
    }

    /// JSON error body with the denial's status.
    pub fn denied(&self, reason: &Denial) -> Response<Full<Bytes>> {
        let body = json!({ "error": reason.message(), "code": reason.code() }).to_string();
        let mut resp = simple(reason.status(), Bytes::from(body));
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }

    fn default_headers(&self, mut resp: Response<Full<Bytes>>, request_id: &str, start: Instant) -> Response<Full<Bytes>> {
        let latency_us = start.elapsed().as_micros().to_string();
        let h = resp.headers_mut();

        let pairs = [
            ("via", APP_NAME.to_string()),
            ("server", format!("{}/{}", APP_NAME, APP_VERSION)),
            ("x-gateway", format!("{} Gateway/{}", APP_NAME, APP_VERSION)),
            ("x-latency-us", latency_us),
            ("x-request-id", request_id.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(v) = HeaderValue::from_str(&value) {
                h.insert(name, v);
            }
        }
        resp
    }
}

fn simple(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;

    async fn body_of(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn reply_keeps_configured_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("testheader".to_string(), "testvalue".to_string());
        let d = DispatchDecision::Reply {
            status_code: 200,
            body: "testbody".into(),
            headers,
        };
        let Dispatch::Respond(resp) = Responder::new().dispatch(d, "req-1", Instant::now()) else {
            panic!("expected a response");
        };
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["testheader"], "testvalue");
        assert_eq!(resp.headers()["x-request-id"], "req-1");
        assert!(resp.headers().contains_key("server"));
        assert_eq!(body_of(resp).await, Bytes::from_static(b"testbody"));
    }

    #[tokio::test]
    async fn denial_renders_status_and_json() {
        let d = DispatchDecision::denied(Denial::AccessDisallowed {
            spec_id: "test".into(),
            name: "v2".into(),
        });
        let Dispatch::Respond(resp) = Responder::new().dispatch(d, "req-2", Instant::now()) else {
            panic!("expected a response");
        };
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        let v: serde_json::Value = serde_json::from_slice(&body_of(resp).await).unwrap();
        assert_eq!(v["error"], "Access to this API has been disallowed");
        assert_eq!(v["code"], "ACCESS_DISALLOWED");
    }

    #[test]
    fn forward_becomes_proxy_target() {
        let d = DispatchDecision::Forward {
            path: "/b".into(),
            target_host: Some("www.example.com".into()),
            specification_id: "test".into(),
            version: Some("Default".into()),
            bypassed: false,
        };
        match Responder::new().dispatch(d, "req-3", Instant::now()) {
            Dispatch::Proxy(t) => {
                assert_eq!(t.path, "/b");
                assert_eq!(t.target_host.as_deref(), Some("www.example.com"));
            }
            Dispatch::Respond(_) => panic!("expected a proxy target"),
        }
    }
}
