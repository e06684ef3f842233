//! Response envelope decoding.
//!
//! The backend wraps every payload as `{ "data": ... }`, optionally alongside `success`,
//! `message` and `pagination`. This module is the only place that envelope is unwrapped;
//! a bare payload is rejected instead of guessed at.
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::core::error::{ApiError, ApiResult, GENERIC_MESSAGE, codes};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            success: Some(true),
            message: None,
            pagination: None,
        }
    }
}

/// Decode a success body into the enveloped payload.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_slice(body).map_err(ApiError::invalid_response)?;

    if envelope.success == Some(false) {
        return Err(ApiError::new(
            envelope.message.unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            200,
            codes::INVALID_RESPONSE,
        ));
    }

    serde_json::from_value(envelope.data).map_err(ApiError::invalid_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_decode_object() {
        let item: Item = decode(br#"{"data":{"id":"b-1"},"success":true}"#).unwrap();
        assert_eq!(item, Item { id: "b-1".into() });
    }

    #[test]
    fn test_decode_paginated_list() {
        let body = br#"{"data":[{"id":"1"},{"id":"2"}],"pagination":{"page":1,"limit":10,"total":2,"totalPages":1}}"#;
        let items: Vec<Item> = decode(body).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_bare_payload_is_rejected() {
        let err = decode::<Vec<Item>>(br#"[{"id":"1"}]"#).unwrap_err();
        assert_eq!(err.code, codes::INVALID_RESPONSE);
    }

    #[test]
    fn test_explicit_failure_flag() {
        let err = decode::<Item>(br#"{"data":null,"success":false,"message":"nope"}"#).unwrap_err();
        assert_eq!(err.message, "nope");
    }
}
