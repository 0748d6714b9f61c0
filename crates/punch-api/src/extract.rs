//! Request extractors

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Header naming the device a single request should target
pub const DEVICE_HEADER: &str = "x-device-id";

/// Cookie holding the device selected in this browser session
pub const ACTIVE_DEVICE_COOKIE: &str = "active_device";

/// JSON body whose rejections render as [`ApiError::Validation`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Device choice carried by the request itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelection {
    /// `X-Device-ID` header
    pub header: Option<String>,
    /// `active_device` cookie
    pub session: Option<String>,
}

impl DeviceSelection {
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }
}

impl<S> FromRequestParts<S> for DeviceSelection
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(DEVICE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let session = CookieJar::from_headers(&parts.headers)
            .get(ACTIVE_DEVICE_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self { header, session })
    }
}

/// Accept a JSON string or number as a string
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

/// Optional variant of [`string_or_number`]; `null` and `""` are `None`
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Optional integer given as a JSON number or numeric string
pub fn opt_lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
{
    let text = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(de::Error::custom(format!("expected integer, got {other}"))),
    };
    text.parse::<T>()
        .map(Some)
        .map_err(|_| de::Error::custom(format!("invalid integer: {text}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "opt_lenient_int")]
        port: Option<u16>,
        #[serde(default, deserialize_with = "opt_string_or_number")]
        group: Option<String>,
    }

    #[test]
    fn test_lenient_fields() {
        let body: Body =
            serde_json::from_str(r#"{"id": 42, "port": "4371", "group": ""}"#).unwrap();
        assert_eq!(body.id, "42");
        assert_eq!(body.port, Some(4371));
        assert_eq!(body.group, None);

        let body: Body = serde_json::from_str(r#"{"id": "A7"}"#).unwrap();
        assert_eq!(body.port, None);

        assert!(serde_json::from_str::<Body>(r#"{"id": "1", "port": 70000}"#).is_err());
        assert!(serde_json::from_str::<Body>(r#"{"id": true}"#).is_err());
    }

    #[tokio::test]
    async fn test_selection_from_header_and_cookie() {
        let request = Request::builder()
            .header("X-Device-ID", "gate")
            .header("Cookie", "theme=dark; active_device=lobby")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let selection = DeviceSelection::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(selection.header(), Some("gate"));
        assert_eq!(selection.session(), Some("lobby"));
    }

    #[tokio::test]
    async fn test_selection_empty() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let selection = DeviceSelection::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(selection, DeviceSelection::default());
    }
}
