use crate::config::{EndpointType, HarnessConfig};
use crate::errors::HarnessError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Sends one query to the target agent and returns the complete response
/// text. No state is retained between calls.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn query(&self, query: &str) -> Result<String, HarnessError>;
}

/// HTTP client for the agent service. Supports the single-shot `/v1/query`
/// exchange and the chunked `/v1/streaming_query` exchange; in streaming mode
/// the body is fully drained before any text is returned, because evaluation
/// strategies operate on complete responses, never partial chunks.
pub struct HttpAgentClient {
    endpoint: String,
    endpoint_type: EndpointType,
    provider: String,
    model: String,
    auth_token: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

impl HttpAgentClient {
    /// Client for the agent under evaluation.
    pub fn new(cfg: &HarnessConfig) -> Self {
        Self {
            endpoint: cfg.agent_endpoint.trim_end_matches('/').to_string(),
            endpoint_type: cfg.endpoint_type,
            provider: cfg.agent_provider.clone(),
            model: cfg.agent_model.clone(),
            auth_token: cfg.auth_token.clone(),
            request_timeout: cfg.request_timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Client for the judge model, served by the same service with the judge
    /// provider/model pair. Judge verdicts always use the single-shot route.
    pub fn judge_route(cfg: &HarnessConfig) -> Self {
        Self {
            endpoint: cfg.agent_endpoint.trim_end_matches('/').to_string(),
            endpoint_type: EndpointType::Query,
            provider: cfg.judge_provider.clone(),
            model: cfg.judge_model.clone(),
            auth_token: cfg.auth_token.clone(),
            request_timeout: cfg.request_timeout,
            client: reqwest::Client::new(),
        }
    }

    async fn single_query(&self, query: &str) -> Result<String, HarnessError> {
        let url = format!("{}/v1/query", self.endpoint);
        let resp = self.post_query(&url, query).await?;
        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| HarnessError::transport(format!("undecodable agent payload: {}", e)))?;
        payload
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| HarnessError::transport("agent payload missing 'response' field"))
    }

    async fn streaming_query(&self, query: &str) -> Result<String, HarnessError> {
        let url = format!("{}/v1/streaming_query", self.endpoint);
        let mut resp = self.post_query(&url, query).await?;

        // Drain to EOF before decoding anything.
        let mut raw: Vec<u8> = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| HarnessError::transport(format!("streaming read failed: {}", e)))?
        {
            raw.extend_from_slice(&chunk);
        }
        let body = String::from_utf8(raw).map_err(|e| {
            HarnessError::transport(format!("streaming payload is not valid UTF-8: {}", e))
        })?;
        parse_streaming_body(&body)
    }

    async fn post_query(&self, url: &str, query: &str) -> Result<reqwest::Response, HarnessError> {
        let body = json!({
            "query": query,
            "provider": self.provider,
            "model": self.model,
        });
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::transport(format!("request to {} failed: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_else(|_| String::new());
            return Err(HarnessError::transport(format!(
                "{} returned status {}: {}",
                url,
                status.as_u16(),
                truncate(&text, 200)
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn query(&self, query: &str) -> Result<String, HarnessError> {
        let fut = async {
            match self.endpoint_type {
                EndpointType::Query => self.single_query(query).await,
                EndpointType::Streaming => self.streaming_query(query).await,
            }
        };
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(HarnessError::timeout(format!(
                "agent request exceeded {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }
}

/// Decode a fully drained SSE-style body into the final response text.
///
/// Token events are concatenated; a final `end` event carrying a `response`
/// field is authoritative and wins over concatenation. A decode failure is
/// retried once ignoring a truncated trailing event (the body was read to
/// EOF, so only the last line can be partial).
pub(crate) fn parse_streaming_body(body: &str) -> Result<String, HarnessError> {
    match parse_sse_events(body, false) {
        Ok(text) => Ok(text),
        Err(first_err) => {
            tracing::debug!("retrying streaming decode without trailing partial event");
            parse_sse_events(body, true).map_err(|_| first_err)
        }
    }
}

fn parse_sse_events(body: &str, skip_trailing_partial: bool) -> Result<String, HarnessError> {
    let data_lines: Vec<&str> = body
        .lines()
        .filter_map(|l| l.strip_prefix("data: ").or_else(|| l.strip_prefix("data:")))
        .collect();

    let mut tokens = String::new();
    let mut final_response: Option<String> = None;
    for (idx, line) in data_lines.iter().enumerate() {
        let event: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                if skip_trailing_partial && idx == data_lines.len() - 1 {
                    continue;
                }
                return Err(HarnessError::transport(format!(
                    "undecodable streaming event: {}",
                    e
                )));
            }
        };
        match event.get("event").and_then(|v| v.as_str()) {
            Some("token") => {
                if let Some(t) = event.pointer("/data/token").and_then(|v| v.as_str()) {
                    tokens.push_str(t);
                }
            }
            Some("end") => {
                if let Some(r) = event.pointer("/data/response").and_then(|v| v.as_str()) {
                    final_response = Some(r.to_string());
                }
            }
            // start/heartbeat and unknown events carry no response text
            _ => {}
        }
    }

    if let Some(r) = final_response {
        return Ok(r);
    }
    if tokens.is_empty() {
        return Err(HarnessError::transport(
            "streaming payload contained no response text",
        ));
    }
    Ok(tokens)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    } else {
        s.to_string()
    }
}
