//! HTTP request builder for the storefront REST backend

use crate::error::Error;
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    multipart, Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

enum Body {
    Json(Vec<u8>),
    Multipart(multipart::Form),
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    segments: Vec<String>,
    query_params: Vec<(String, String)>,
    body: Option<Body>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        Self {
            client,
            url: url.to_string(),
            method,
            headers: HeaderMap::new(),
            segments: Vec::new(),
            query_params: Vec::new(),
            body: None,
        }
    }

    /// Append path segments, percent-encoding each one
    pub fn segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.extend(segments.into_iter().map(Into::into));
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(mut self, token: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
            self.headers.insert(AUTHORIZATION, value);
        }
        self
    }

    /// Add query parameters to the request
    pub fn query<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, Error> {
        self.body = Some(Body::Json(serde_json::to_vec(body)?));
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Send a multipart form instead of JSON
    pub fn multipart(mut self, form: multipart::Form) -> Self {
        self.body = Some(Body::Multipart(form));
        self
    }

    fn build(self) -> Result<RequestBuilder, Error> {
        let mut url = Url::parse(&self.url)?;
        if !self.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| Error::general(format!("{} cannot take path segments", self.url)))?
                .pop_if_empty()
                .extend(&self.segments);
        }
        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }

        debug!("{} {}", self.method, url);
        let req = self.client.request(self.method, url).headers(self.headers);
        Ok(match self.body {
            Some(Body::Json(bytes)) => req.body(bytes),
            Some(Body::Multipart(form)) => req.multipart(form),
            None => req,
        })
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(self) -> Result<T, Error> {
        let response = self.execute_raw().await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute the request, discarding any response body
    pub async fn execute_empty(self) -> Result<(), Error> {
        self.execute_raw().await?;
        Ok(())
    }

    /// Execute the request; non-success statuses become errors
    pub async fn execute_raw(self) -> Result<Response, Error> {
        let response = self.build()?.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let url = response.url().clone();
    let text = response.text().await.unwrap_or_default();
    let message = error_message(status, &text);
    warn!("{} {} failed: {}", status.as_u16(), url.path(), message);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// The backend's `message` or `error` field, else the raw body, else the
/// status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("Request failed")
        .to_string()
}
