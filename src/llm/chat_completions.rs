//! OpenAI Chat Completions API driver.
//!
//! Implements [`LlmDriver`] for `/v1/chat/completions` with `stream: true`,
//! decoding `data:` frames into [`CompletionChunk`]s.

use futures::StreamExt;

use crate::error::CompletionError;

use super::{ChunkStream, CompletionChunk, LlmDriver, LlmRequest, LlmSettings};

/// Driver for the OpenAI Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl ChatCompletionsDriver {
    /// Create a driver whose HTTP client enforces `settings.timeout`.
    pub fn new(settings: LlmSettings) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn classify(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.settings.timeout)
        } else {
            CompletionError::Http(err)
        }
    }
}

#[async_trait::async_trait]
impl LlmDriver for ChatCompletionsDriver {
    async fn stream(&self, req: LlmRequest) -> Result<ChunkStream, CompletionError> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "stream": true,
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_tokens,
            "messages": req.messages,
        });

        let mut rb = self.http.post(self.endpoint()).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = rb.bearer_auth(k);
        }

        let resp = rb.send().await.map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let timeout = self.settings.timeout;
        let byte_stream = resp.bytes_stream();

        let out = async_stream::try_stream! {
            let mut buf = Vec::<u8>::new();

            futures::pin_mut!(byte_stream);
            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk.map_err(|e| {
                    if e.is_timeout() {
                        CompletionError::Timeout(timeout)
                    } else {
                        CompletionError::Http(e)
                    }
                })?;
                buf.extend_from_slice(&chunk);

                while let Some((pos, delim)) = find_frame_end(&buf) {
                    let frame = buf.drain(..pos + delim).collect::<Vec<_>>();
                    let text = String::from_utf8_lossy(&frame);

                    for line in text.lines() {
                        if let Some(chunk) = decode_data_line(line)? {
                            yield chunk;
                        }
                    }
                }
            }

            // Last frame without a trailing blank line.
            let rest = String::from_utf8_lossy(&buf);
            for line in rest.lines() {
                if let Some(chunk) = decode_data_line(line)? {
                    yield chunk;
                }
            }
        };

        Ok(Box::pin(out))
    }
}

/// Decode one SSE line. Non-`data:` lines and empty deltas yield `None`.
fn decode_data_line(line: &str) -> Result<Option<CompletionChunk>, CompletionError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(Some(CompletionChunk::Done));
    }

    let v: serde_json::Value =
        serde_json::from_str(data).map_err(|e| CompletionError::Stream(e.to_string()))?;

    if let Some(message) = v.get("error").and_then(|e| e.get("message")).and_then(|m| m.as_str()) {
        return Err(CompletionError::Stream(message.to_string()));
    }

    Ok(v["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| CompletionChunk::Delta(s.to_string())))
}

/// Position and length of the first frame delimiter (`\n\n` or `\r\n\r\n`).
fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(
            decode_data_line(line).unwrap(),
            Some(CompletionChunk::Delta("Hel".to_string()))
        );
    }

    #[test]
    fn test_decode_done_sentinel() {
        assert_eq!(
            decode_data_line("data: [DONE]").unwrap(),
            Some(CompletionChunk::Done)
        );
    }

    #[test]
    fn test_decode_skips_role_only_delta_and_comments() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_data_line(line).unwrap(), None);
        assert_eq!(decode_data_line(": keep-alive").unwrap(), None);
    }

    #[test]
    fn test_decode_error_frame() {
        let line = r#"data: {"error":{"message":"quota exceeded"}}"#;
        let err = decode_data_line(line).unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_find_frame_end() {
        assert_eq!(find_frame_end(b"data: x\n\ndata: y"), Some((7, 2)));
        assert_eq!(find_frame_end(b"data: x\r\n\r\ndata: y"), Some((7, 4)));
        assert_eq!(find_frame_end(b"data: x\r\n\r\ndata: y\n\n"), Some((7, 4)));
        assert_eq!(find_frame_end(b"data: x\n"), None);
        assert_eq!(find_frame_end(b"data: x\r\n"), None);
    }

    /// Serve `body` verbatim from a loopback completions endpoint.
    async fn driver_for(body: &'static str) -> ChatCompletionsDriver {
        let app = axum::Router::new().route(
            "/v1/chat/completions",
            axum::routing::post(move || async move { body }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ChatCompletionsDriver::new(LlmSettings {
            base_url: format!("http://{addr}"),
            api_key: None,
            model: "test-model".to_string(),
            temperature: 1.0,
            max_tokens: 16,
            timeout: std::time::Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn chunks(body: &'static str) -> Vec<Result<CompletionChunk, CompletionError>> {
        let driver = driver_for(body).await;
        let stream = driver.stream(LlmRequest { messages: vec![] }).await.unwrap();
        stream.collect().await
    }

    fn delta(text: &str) -> CompletionChunk {
        CompletionChunk::Delta(text.to_string())
    }

    #[tokio::test]
    async fn test_stream_lf_frames() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n\
                    data: [DONE]\n\n";

        let got: Vec<_> = chunks(body).await.into_iter().map(Result::unwrap).collect();

        assert_eq!(got, vec![delta("a"), delta("b"), CompletionChunk::Done]);
    }

    #[tokio::test]
    async fn test_stream_crlf_frames() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"<html>ok</html>\"}}]}\r\n\r\n\
                    data: [DONE]\r\n\r\n";

        let got: Vec<_> = chunks(body).await.into_iter().map(Result::unwrap).collect();

        assert_eq!(got, vec![delta("<html>ok</html>"), CompletionChunk::Done]);
    }

    #[tokio::test]
    async fn test_stream_decodes_unterminated_tail() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}";

        let got: Vec<_> = chunks(body).await.into_iter().map(Result::unwrap).collect();

        assert_eq!(got, vec![delta("a"), delta("b")]);
    }

    #[tokio::test]
    async fn test_stream_truncated_tail_is_an_error() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                    data: {\"choices\":[{\"del";

        let got = chunks(body).await;

        assert_eq!(got.len(), 2);
        assert_eq!(got[0].as_ref().unwrap(), &delta("a"));
        assert!(matches!(got[1], Err(CompletionError::Stream(_))));
    }

    #[tokio::test]
    async fn test_cut_off_generation_fails_the_completion() {
        use crate::llm::{CompletionService, LlmCompletionService, NoopTokens};

        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"<html><body>half\"}}]}\n\n";
        let driver = driver_for(body).await;
        let service = LlmCompletionService::new(std::sync::Arc::new(driver), "test-model");

        let err = service.complete("prompt", &NoopTokens).await.unwrap_err();

        assert!(matches!(err, CompletionError::Stream(_)));
    }
}
