//! Usage: Streamlabs TikTok REST client used once a token has been acquired.

use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE_URL: &str = "https://streamlabs.com/api/v5/slobs/tiktok";

/// Category search truncates long queries; the endpoint rejects longer ones.
const MAX_QUERY_LEN: usize = 25;
const DEFAULT_CATEGORY_QUERY: &str = "gaming";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StreamCategory {
    pub(crate) full_name: String,
    pub(crate) game_mask_id: String,
    pub(crate) id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StreamInfo {
    pub(crate) rtmp_url: String,
    pub(crate) stream_key: String,
    pub(crate) id: String,
}

pub(crate) struct StreamApi {
    client: reqwest::Client,
    base_url: String,
}

impl StreamApi {
    pub(crate) fn new(oauth_token: &str) -> AppResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {oauth_token}"))
            .map_err(|e| format!("SYSTEM_ERROR: oauth token is not a valid header value: {e}"))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| format!("SYSTEM_ERROR: http client build failed: {e}"))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    pub(crate) async fn search_categories(&self, query: &str) -> AppResult<Vec<StreamCategory>> {
        let query = normalize_query(query);
        let response = self
            .client
            .get(format!("{}/info", self.base_url))
            .query(&[("category", query.as_str())])
            .send()
            .await
            .map_err(|e| format!("API_REQUEST: category search request failed: {e}"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("API_PARSE: category search returned a non-JSON body: {e}"))?;
        if !status.is_success() {
            return Err(format!("API_REQUEST: category search returned {status}: {body}").into());
        }

        parse_categories(&body)
    }

    pub(crate) async fn start_stream(
        &self,
        title: &str,
        category: &str,
        audience_type: &str,
    ) -> AppResult<StreamInfo> {
        let form = reqwest::multipart::Form::new()
            .text("title", title.to_string())
            .text("device_platform", "win32")
            .text("category", category.to_string())
            .text("audience_type", audience_type.to_string());

        let response = self
            .client
            .post(format!("{}/stream/start", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| format!("API_REQUEST: stream start request failed: {e}"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("API_PARSE: stream start returned a non-JSON body: {e}"))?;
        if !status.is_success() {
            return Err(format!("API_REQUEST: stream start returned {status}: {body}").into());
        }

        parse_stream_info(&body)
    }

    pub(crate) async fn end_stream(&self, stream_id: &str) -> AppResult<bool> {
        let response = self
            .client
            .post(format!("{}/stream/{stream_id}/end", self.base_url))
            .send()
            .await
            .map_err(|e| format!("API_REQUEST: stream end request failed: {e}"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| format!("API_PARSE: stream end returned a non-JSON body: {e}"))?;
        if !status.is_success() {
            return Err(format!("API_REQUEST: stream end returned {status}: {body}").into());
        }

        Ok(body.get("success").and_then(Value::as_bool).unwrap_or(false))
    }
}

fn normalize_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return DEFAULT_CATEGORY_QUERY.to_string();
    }
    trimmed.chars().take(MAX_QUERY_LEN).collect()
}

fn parse_categories(body: &Value) -> AppResult<Vec<StreamCategory>> {
    let categories = body
        .get("categories")
        .and_then(Value::as_array)
        .ok_or_else(|| format!("API_PARSE: category list missing from response: {body}"))?;

    Ok(categories
        .iter()
        .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
        .collect())
}

fn parse_stream_info(body: &Value) -> AppResult<StreamInfo> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("API_PARSE: stream start response missing `{name}`: {body}"))
    };
    Ok(StreamInfo {
        id: field("id")?,
        rtmp_url: field("rtmp")?,
        stream_key: field("key")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_is_defaulted_and_truncated() {
        assert_eq!(normalize_query("   "), "gaming");
        assert_eq!(normalize_query("fortnite"), "fortnite");
        assert_eq!(
            normalize_query("a very long category query indeed"),
            "a very long category quer"
        );
    }

    #[test]
    fn categories_parse_and_skip_malformed_entries() {
        let body = json!({
            "categories": [
                { "full_name": "Fortnite", "game_mask_id": "m1", "id": "1" },
                { "unexpected": true },
                { "full_name": "Minecraft", "game_mask_id": "m2", "id": "2" }
            ]
        });
        let categories = parse_categories(&body).expect("parse");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].full_name, "Fortnite");
        assert_eq!(categories[1].id, "2");
    }

    #[test]
    fn missing_category_list_is_a_parse_error() {
        let err = parse_categories(&json!({ "ok": true })).unwrap_err();
        assert_eq!(err.code(), "API_PARSE");
    }

    #[test]
    fn stream_info_parses_the_rtmp_triple() {
        let body = json!({ "id": "s-1", "rtmp": "rtmp://ingest", "key": "k" });
        let info = parse_stream_info(&body).expect("parse");
        assert_eq!(info.id, "s-1");
        assert_eq!(info.rtmp_url, "rtmp://ingest");
        assert_eq!(info.stream_key, "k");
    }

    #[test]
    fn stream_info_missing_key_names_the_field() {
        let err = parse_stream_info(&json!({ "id": "s-1", "rtmp": "r" })).unwrap_err();
        assert!(err.to_string().contains("`key`"));
    }
}
