use http::header::{HeaderName, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method};
use std::collections::HashMap;
use uuid::Uuid;

/// The parts of an inbound request the engine looks at.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub id: Uuid,
    pub method: Method,
    /// Full request path, without the query string.
    pub path: String,
    pub headers: HeaderMap,
    /// Decoded query parameters. The first occurrence of a key wins.
    pub query: HashMap<String, String>,
}

impl InboundRequest {
    /// `target` is a path with an optional `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target, None),
        };

        Self {
            id: Uuid::new_v4(),
            method,
            path: if path.is_empty() { "/".into() } else { path.to_string() },
            headers: HeaderMap::new(),
            query: query.map(parse_query).unwrap_or_default(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut req = Self::new(parts.method.clone(), target);
        req.headers = parts.headers.clone();
        req
    }

    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(key).map_err(Into::into)?;
        let value = HeaderValue::try_from(value).map_err(Into::into)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Header value by case-insensitive name. Empty or non-text values count
    /// as absent.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Query parameter by exact name. Empty values count as absent.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

fn parse_query(q: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (k, v) in form_urlencoded::parse(q.as_bytes()) {
        map.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    map
}
