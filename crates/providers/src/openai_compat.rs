//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Ollama, vLLM, LM Studio, Together, and any other
//! endpoint that follows the OpenAI chat completions contract.

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use lc_domain::config::ProviderConfig;
use lc_domain::error::{Error, Result};
use lc_domain::prompt::{PromptContent, PromptMessage, PromptPart, PromptRole};
use lc_domain::stream::{BoxStream, StreamEvent, Usage};
use lc_domain::tool::{ToolCall, ToolDefinition};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: Option<String>,
    auth_header: String,
    auth_prefix: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the deserialized provider config.
    pub fn from_config(cfg: &ProviderConfig, timeout: Duration) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let auth_header = cfg
            .auth
            .header
            .clone()
            .unwrap_or_else(|| "Authorization".into());
        let auth_prefix = cfg.auth.prefix.clone().unwrap_or_else(|| "Bearer ".into());
        let default_model = cfg.default_model.clone().unwrap_or_else(|| "gpt-4o".into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_header,
            auth_prefix,
            default_model,
            client,
        })
    }

    // ── Internal: build authenticated request builder ──────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => builder.header(&self.auth_header, format!("{}{}", self.auth_prefix, key)),
            None => builder,
        }
    }

    fn effective_model(&self, req: &ChatRequest) -> String {
        req.model
            .clone()
            .unwrap_or_else(|| self.default_model.clone())
    }

    fn build_chat_body(&self, req: &ChatRequest, stream: bool) -> Value {
        let messages: Vec<Value> = req.messages.iter().flat_map(msg_to_openai).collect();

        let mut body = serde_json::json!({
            "model": self.effective_model(req),
            "messages": messages,
            "stream": stream,
        });

        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_openai).collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        if stream {
            body["stream_options"] = serde_json::json!({"include_usage": true});
        }
        body
    }

    async fn post_checked(&self, body: &Value) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(provider = %self.id, url = %url, "openai_compat request");

        let resp = self
            .authed_post(&url)
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), err_text),
            });
        }
        Ok(resp)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn role_to_str(role: PromptRole) -> &'static str {
    match role {
        PromptRole::System => "system",
        PromptRole::User => "user",
        PromptRole::Assistant => "assistant",
        PromptRole::Tool => "tool",
    }
}

/// One prompt message may expand to several OpenAI messages (one per
/// tool result).
fn msg_to_openai(msg: &PromptMessage) -> Vec<Value> {
    match (msg.role, &msg.content) {
        (PromptRole::Tool, PromptContent::Parts(parts)) => parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::ToolResult { tool_use_id, content, .. } => Some(serde_json::json!({
                    "role": "tool",
                    "tool_call_id": tool_use_id,
                    "content": content,
                })),
                _ => None,
            })
            .collect(),
        (PromptRole::Assistant, PromptContent::Parts(parts)) => vec![assistant_to_openai(parts)],
        (role, content) => vec![serde_json::json!({
            "role": role_to_str(role),
            "content": all_text(content),
        })],
    }
}

fn all_text(content: &PromptContent) -> String {
    match content {
        PromptContent::Text(t) => t.clone(),
        PromptContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                PromptPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn assistant_to_openai(parts: &[PromptPart]) -> Value {
    let mut obj = serde_json::json!({"role": "assistant"});
    let mut text_parts: Vec<&str> = Vec::new();
    let mut tool_calls: Vec<Value> = Vec::new();

    for part in parts {
        match part {
            PromptPart::Text { text } => text_parts.push(text),
            PromptPart::ToolUse { id, name, input } => {
                tool_calls.push(serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {
                        "name": name,
                        "arguments": input.to_string(),
                    }
                }));
            }
            PromptPart::ToolResult { .. } => {}
        }
    }

    obj["content"] = if text_parts.is_empty() {
        Value::Null
    } else {
        Value::String(text_parts.join("\n"))
    };
    if !tool_calls.is_empty() {
        obj["tool_calls"] = Value::Array(tool_calls);
    }
    obj
}

fn tool_to_openai(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_chat_response(provider: &str, body: &Value) -> Result<ChatResponse> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: provider.into(),
        message: "no message in choice".into(),
    })?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(ChatResponse {
        content,
        tool_calls: parse_openai_tool_calls(message),
        usage: body.get("usage").and_then(parse_openai_usage),
        model,
        finish_reason,
    })
}

fn parse_openai_tool_calls(message: &Value) -> Vec<ToolCall> {
    let arr = match message.get("tool_calls").and_then(|v| v.as_array()) {
        Some(a) => a,
        None => return Vec::new(),
    };
    arr.iter()
        .filter_map(|tc| {
            let tool_call_id = tc.get("id")?.as_str()?.to_string();
            let func = tc.get("function")?;
            let tool_name = func.get("name")?.as_str()?.to_string();
            let args_str = func.get("arguments")?.as_str().unwrap_or("{}");
            Some(ToolCall {
                tool_call_id,
                tool_name,
                args: parse_arguments(args_str),
            })
        })
        .collect()
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "tool call arguments are not valid JSON, using {{}}");
        Value::Object(Default::default())
    })
}

fn parse_openai_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-response parser state.
///
/// OpenAI only sends the call id with the first chunk of a tool call;
/// later argument chunks are keyed by `index`. The parser maps indexes
/// back to ids and emits `ToolCallFinished` for every call once the
/// choice finishes.
#[derive(Default)]
struct StreamParser {
    calls: Vec<(u64, String, String, String)>, // index, id, name, args
    finished: bool,
}

impl StreamParser {
    fn parse(&mut self, data: &str) -> Vec<Result<StreamEvent>> {
        if data.trim() == "[DONE]" {
            let mut out = self.flush_calls();
            if !self.finished {
                self.finished = true;
                out.push(Ok(StreamEvent::Done { usage: None, finish_reason: Some("stop".into()) }));
            }
            return out;
        }

        let v: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => return vec![Err(Error::Json(e))],
        };

        if let Some(err) = v.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(String::from)
                .unwrap_or_else(|| err.to_string());
            return vec![Ok(StreamEvent::Error { message })];
        }

        let mut out = Vec::new();
        let choice = v
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first());

        let Some(choice) = choice else {
            // Usage-only chunk (stream_options.include_usage).
            if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
                self.finished = true;
                out.push(Ok(StreamEvent::Done { usage: Some(usage), finish_reason: None }));
            }
            return out;
        };
        let delta = choice.get("delta").unwrap_or(&Value::Null);

        if let Some(text) = delta.get("reasoning_content").and_then(|v| v.as_str()) {
            if !text.is_empty() {
                out.push(Ok(StreamEvent::Thinking { text: text.to_string() }));
            }
        }

        if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
            if !text.is_empty() {
                out.push(Ok(StreamEvent::Token { text: text.to_string() }));
            }
        }

        if let Some(annotations) = delta.get("annotations").and_then(|v| v.as_array()) {
            for a in annotations {
                if let Some(url) = a
                    .get("url_citation")
                    .and_then(|c| c.get("url"))
                    .and_then(|u| u.as_str())
                {
                    out.push(Ok(StreamEvent::Source { url: url.to_string() }));
                }
            }
        }

        if let Some(tc_arr) = delta.get("tool_calls").and_then(|v| v.as_array()) {
            for tc in tc_arr {
                self.tool_call_chunk(tc, &mut out);
            }
        }

        if let Some(fr) = choice.get("finish_reason").and_then(|f| f.as_str()) {
            out.extend(self.flush_calls());
            // Usage may follow in a separate chunk; only finish here when
            // it is already attached.
            if let Some(usage) = v.get("usage").and_then(parse_openai_usage) {
                self.finished = true;
                out.push(Ok(StreamEvent::Done {
                    usage: Some(usage),
                    finish_reason: Some(fr.to_string()),
                }));
            }
        }

        out
    }

    fn tool_call_chunk(&mut self, tc: &Value, out: &mut Vec<Result<StreamEvent>>) {
        let index = tc.get("index").and_then(|v| v.as_u64()).unwrap_or(0);
        let func = tc.get("function");

        if let Some(id) = tc.get("id").and_then(|v| v.as_str()) {
            let name = func
                .and_then(|f| f.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            self.calls.push((index, id.to_string(), name.clone(), String::new()));
            out.push(Ok(StreamEvent::ToolCallStarted { call_id: id.to_string(), tool_name: name }));
        }

        if let Some(args) = func
            .and_then(|f| f.get("arguments"))
            .and_then(|v| v.as_str())
        {
            if args.is_empty() {
                return;
            }
            if let Some(entry) = self.calls.iter_mut().rev().find(|c| c.0 == index) {
                entry.3.push_str(args);
                out.push(Ok(StreamEvent::ToolCallDelta {
                    call_id: entry.1.clone(),
                    delta: args.to_string(),
                }));
            }
        }
    }

    fn flush_calls(&mut self) -> Vec<Result<StreamEvent>> {
        self.calls
            .drain(..)
            .map(|(_, call_id, tool_name, args)| {
                Ok(StreamEvent::ToolCallFinished {
                    call_id,
                    tool_name,
                    arguments: parse_arguments(&args),
                })
            })
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_chat_body(req, false);
        let resp = self.post_checked(&body).await?;
        let resp_text = resp.text().await.map_err(from_reqwest)?;
        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&self.id, &resp_json)
    }

    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let body = self.build_chat_body(req, true);
        let resp = self.post_checked(&body).await?;
        let mut parser = StreamParser::default();
        Ok(crate::sse::sse_response_stream(resp, move |data| parser.parse(data)))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn events(parser: &mut StreamParser, data: &str) -> Vec<StreamEvent> {
        parser.parse(data).into_iter().map(|e| e.unwrap()).collect()
    }

    #[test]
    fn content_and_reasoning_deltas() {
        let mut p = StreamParser::default();
        let ev = events(
            &mut p,
            r#"{"choices":[{"delta":{"reasoning_content":"hmm","content":"Hi"}}]}"#,
        );
        assert!(matches!(&ev[0], StreamEvent::Thinking { text } if text == "hmm"));
        assert!(matches!(&ev[1], StreamEvent::Token { text } if text == "Hi"));
    }

    #[test]
    fn tool_call_chunks_are_keyed_by_id() {
        let mut p = StreamParser::default();
        let started = events(
            &mut p,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"current_time","arguments":""}}]}}]}"#,
        );
        assert!(matches!(&started[0], StreamEvent::ToolCallStarted { call_id, tool_name }
            if call_id == "call_1" && tool_name == "current_time"));

        let delta = events(
            &mut p,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"tz\":"}}]}}]}"#,
        );
        assert!(matches!(&delta[0], StreamEvent::ToolCallDelta { call_id, .. } if call_id == "call_1"));
        events(
            &mut p,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"UTC\"}"}}]}}]}"#,
        );

        let finish = events(&mut p, r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#);
        match &finish[0] {
            StreamEvent::ToolCallFinished { call_id, arguments, .. } => {
                assert_eq!(call_id, "call_1");
                assert_eq!(arguments["tz"], "UTC");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn usage_chunk_finishes_stream() {
        let mut p = StreamParser::default();
        let ev = events(
            &mut p,
            r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#,
        );
        assert!(matches!(&ev[0], StreamEvent::Done { usage: Some(u), .. } if u.total_tokens == 7));
        // [DONE] after usage does not produce a second Done.
        assert!(events(&mut p, "[DONE]").is_empty());
    }

    #[test]
    fn done_sentinel_without_usage() {
        let mut p = StreamParser::default();
        let ev = events(&mut p, "[DONE]");
        assert!(matches!(&ev[0], StreamEvent::Done { finish_reason: Some(r), .. } if r == "stop"));
    }

    #[test]
    fn error_payload_becomes_error_event() {
        let mut p = StreamParser::default();
        let ev = events(&mut p, r#"{"error":{"message":"rate limited"}}"#);
        assert!(matches!(&ev[0], StreamEvent::Error { message } if message == "rate limited"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut p = StreamParser::default();
        assert!(p.parse("{not json").remove(0).is_err());
    }

    #[test]
    fn url_citation_annotation_becomes_source() {
        let mut p = StreamParser::default();
        let ev = events(
            &mut p,
            r#"{"choices":[{"delta":{"annotations":[{"type":"url_citation","url_citation":{"url":"https://a.example"}}]}}]}"#,
        );
        assert!(matches!(&ev[0], StreamEvent::Source { url } if url == "https://a.example"));
    }

    #[test]
    fn tool_results_expand_to_one_message_each() {
        let msg = PromptMessage {
            role: PromptRole::Tool,
            content: PromptContent::Parts(vec![
                PromptPart::ToolResult { tool_use_id: "a".into(), content: "1".into(), is_error: false },
                PromptPart::ToolResult { tool_use_id: "b".into(), content: "2".into(), is_error: false },
            ]),
        };
        let out = msg_to_openai(&msg);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["tool_call_id"], "b");
    }

    #[test]
    fn assistant_tool_use_serializes_function_call() {
        let out = assistant_to_openai(&[PromptPart::ToolUse {
            id: "c1".into(),
            name: "current_time".into(),
            input: serde_json::json!({}),
        }]);
        assert!(out["content"].is_null());
        assert_eq!(out["tool_calls"][0]["function"]["name"], "current_time");
        assert_eq!(out["tool_calls"][0]["function"]["arguments"], "{}");
    }

    #[test]
    fn chat_response_parses_tool_calls() {
        let body = serde_json::json!({
            "model": "m",
            "choices": [{
                "message": {
                    "content": "ok",
                    "tool_calls": [{"id": "x", "function": {"name": "f", "arguments": "{\"a\":1}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let resp = parse_chat_response("p", &body).unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(resp.tool_calls[0].tool_call_id, "x");
        assert_eq!(resp.tool_calls[0].args["a"], 1);
    }
}
