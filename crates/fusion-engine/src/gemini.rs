use std::thread::{self, ScopedJoinHandle};

use anyhow::Context;
use fusion_contracts::workflow::FUSION_PROMPT;
use fusion_contracts::{FusionError, FusionResult, ImageFile};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use crate::config::FusionConfig;
use crate::encoder::encode_payload;
use crate::response_json_or_error;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Turns two portraits into one composite image.
///
/// Implementations make at most one attempt per call and return the image as
/// a base64 payload.
pub trait GenerationClient: Send + Sync {
    fn combine(&self, first: &ImageFile, second: &ImageFile) -> FusionResult<String>;
}

pub struct GeminiClient {
    config: FusionConfig,
    http: HttpClient,
}

impl GeminiClient {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            http: HttpClient::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(FusionConfig::from_env())
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let trimmed = self.config.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.config.api_base, model_path)
    }

    fn build_payload(first: (&str, &str), second: (&str, &str)) -> Value {
        let (first_data, first_mime) = first;
        let (second_data, second_mime) = second;
        json!({
            "contents": {
                "parts": [
                    {
                        "inlineData": {
                            "data": first_data,
                            "mimeType": first_mime,
                        }
                    },
                    {
                        "inlineData": {
                            "data": second_data,
                            "mimeType": second_mime,
                        }
                    },
                    { "text": FUSION_PROMPT },
                ]
            },
            "generationConfig": {
                "responseModalities": ["IMAGE"],
            },
        })
    }

    /// First non-empty inline payload of the first candidate.
    fn extract_first_image(response_payload: &Value) -> Option<String> {
        let parts = response_payload
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)?;

        parts.iter().find_map(|part| {
            part.get("inlineData")
                .or_else(|| part.get("inline_data"))
                .and_then(|inline| inline.get("data"))
                .and_then(Value::as_str)
                .filter(|data| !data.is_empty())
                .map(str::to_string)
        })
    }
}

impl GenerationClient for GeminiClient {
    fn combine(&self, first: &ImageFile, second: &ImageFile) -> FusionResult<String> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(FusionError::MissingCredential);
        };

        let (first_data, second_data) = encode_pair(first, second).map_err(|err| {
            tracing::error!(error = %err, "failed to encode input images");
            FusionError::generation(err)
        })?;
        let payload = Self::build_payload(
            (&first_data, first.mime_type()),
            (&second_data, second.mime_type()),
        );

        let endpoint = self.endpoint();
        tracing::info!(
            model = %self.config.model,
            first = first.name(),
            second = second.name(),
            "requesting composite image"
        );
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .timeout(self.config.request_timeout())
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))
            .and_then(|response| response_json_or_error("Gemini", response))
            .map_err(|err| {
                tracing::error!(error = %format!("{err:#}"), "error calling Gemini API");
                FusionError::generation(err)
            })?;

        let Some(image) = Self::extract_first_image(&response) else {
            let candidates = response
                .get("candidates")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            tracing::warn!(candidates, "Gemini response carried no image");
            return Err(FusionError::NoImageReturned);
        };
        tracing::debug!(payload_len = image.len(), "composite image received");
        Ok(image)
    }
}

/// Encodes both files at once; both must succeed.
fn encode_pair(first: &ImageFile, second: &ImageFile) -> FusionResult<(String, String)> {
    thread::scope(|scope| {
        let first_job = scope.spawn(|| encode_payload(first));
        let second_job = scope.spawn(|| encode_payload(second));
        let first_data = join_encoding(first_job)?;
        let second_data = join_encoding(second_job)?;
        Ok((first_data, second_data))
    })
}

fn join_encoding(job: ScopedJoinHandle<'_, FusionResult<String>>) -> FusionResult<String> {
    job.join()
        .map_err(|_| FusionError::encoding("encoder thread panicked"))?
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use fusion_contracts::workflow::FUSION_PROMPT;
    use fusion_contracts::{FusionError, ImageFile};
    use serde_json::{json, Value};

    use super::{GeminiClient, GenerationClient};
    use crate::config::FusionConfig;

    struct CapturedRequest {
        head: String,
        body: Value,
    }

    fn serve_once(
        status: u16,
        body: String,
    ) -> anyhow::Result<(String, thread::JoinHandle<Option<CapturedRequest>>)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().ok()?;
            let captured = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).ok()?;
            captured
        });
        Ok((format!("http://{addr}/v1beta"), handle))
    }

    fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let read = stream.read(&mut chunk).ok()?;
            if read == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..read]);
            let Some(head_end) = buf.windows(4).position(|window| window == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body_start = head_end + 4;
            if buf.len() >= body_start + content_length {
                let body = serde_json::from_slice(&buf[body_start..body_start + content_length])
                    .unwrap_or(Value::Null);
                return Some(CapturedRequest { head, body });
            }
        }
    }

    fn expect_generation_failure(err: Option<FusionError>) -> anyhow::Result<String> {
        match err {
            Some(FusionError::GenerationFailed(message)) => Ok(message),
            other => anyhow::bail!("expected generation failure, got {other:?}"),
        }
    }

    fn portraits() -> (ImageFile, ImageFile) {
        (
            ImageFile::from_bytes("alice.png", "image/png", b"alice".to_vec()),
            ImageFile::from_bytes("bob.jpg", "image/jpeg", b"bob".to_vec()),
        )
    }

    fn client_for(api_base: &str) -> GeminiClient {
        GeminiClient::new(
            FusionConfig::default()
                .with_api_key("test-key")
                .with_api_base(api_base),
        )
    }

    #[test]
    fn missing_credential_fails_before_any_request() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let api_base = format!("http://{}/v1beta", listener.local_addr()?);
        let client = GeminiClient::new(FusionConfig::default().with_api_base(api_base));

        let (first, second) = portraits();
        let err = client.combine(&first, &second).err();
        assert!(matches!(err, Some(FusionError::MissingCredential)));
        assert_eq!(
            listener.accept().err().map(|err| err.kind()),
            Some(ErrorKind::WouldBlock)
        );
        Ok(())
    }

    #[test]
    fn sends_two_images_then_prompt_and_returns_first_inline_image() -> anyhow::Result<()> {
        let response = json!({
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "UE5HREFUQQ==" } },
                            { "inlineData": { "mimeType": "image/png", "data": "c2Vjb25k" } }
                        ]
                    }
                },
                {
                    "content": { "parts": [ { "inlineData": { "data": "b3RoZXI=" } } ] }
                }
            ]
        });
        let (api_base, server) = serve_once(200, response.to_string())?;
        let (first, second) = portraits();

        let image = client_for(&api_base).combine(&first, &second)?;
        assert_eq!(image, "UE5HREFUQQ==");

        let captured = server
            .join()
            .ok()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("stub server saw no request"))?;
        assert!(captured
            .head
            .starts_with("POST /v1beta/models/gemini-2.5-flash-image:generateContent "));
        assert!(captured
            .head
            .to_ascii_lowercase()
            .contains("x-goog-api-key: test-key"));

        let parts = &captured.body["contents"]["parts"];
        assert_eq!(parts[0]["inlineData"]["data"], json!("YWxpY2U="));
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert_eq!(parts[1]["inlineData"]["data"], json!("Ym9i"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], json!("image/jpeg"));
        assert_eq!(parts[2]["text"], json!(FUSION_PROMPT));
        assert_eq!(
            captured.body["generationConfig"]["responseModalities"],
            json!(["IMAGE"])
        );
        Ok(())
    }

    #[test]
    fn zero_candidates_is_no_image_returned() -> anyhow::Result<()> {
        let (api_base, server) = serve_once(200, json!({ "candidates": [] }).to_string())?;
        let (first, second) = portraits();
        let err = client_for(&api_base).combine(&first, &second).err();
        assert!(matches!(err, Some(FusionError::NoImageReturned)));
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn text_only_candidate_is_no_image_returned() -> anyhow::Result<()> {
        let body = json!({
            "candidates": [ { "content": { "parts": [ { "text": "blocked" } ] }, "finishReason": "SAFETY" } ]
        });
        let (api_base, server) = serve_once(200, body.to_string())?;
        let (first, second) = portraits();
        let err = client_for(&api_base).combine(&first, &second).err();
        assert!(matches!(err, Some(FusionError::NoImageReturned)));
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn http_error_status_is_generation_failure() -> anyhow::Result<()> {
        let (api_base, server) = serve_once(
            500,
            json!({ "error": { "message": "backend exploded" } }).to_string(),
        )?;
        let (first, second) = portraits();
        let err = client_for(&api_base).combine(&first, &second).err();
        let message = expect_generation_failure(err)?;
        assert!(message.contains("500"));
        assert!(message.contains("backend exploded"));
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn unreachable_service_is_generation_failure() -> anyhow::Result<()> {
        let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
        let (first, second) = portraits();
        let err = client_for(&format!("http://127.0.0.1:{port}/v1beta"))
            .combine(&first, &second)
            .err();
        let message = expect_generation_failure(err)?;
        assert!(message.contains("Gemini request failed"));
        assert!(!message.contains("test-key"));
        Ok(())
    }

    #[test]
    fn unreadable_input_is_reported_as_generation_failure() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let first = ImageFile::from_path(temp.path().join("missing.png"));
        let (_, second) = portraits();
        let err = client_for("http://127.0.0.1:9/v1beta")
            .combine(&first, &second)
            .err();
        let message = expect_generation_failure(err)?;
        assert!(message.contains("File could not be read"));
        Ok(())
    }

    #[test]
    fn extract_accepts_snake_case_and_skips_empty_data() {
        let payload = json!({
            "candidates": [ { "content": { "parts": [
                { "inline_data": { "data": "" } },
                { "inline_data": { "data": "c25ha2U=" } }
            ] } } ]
        });
        assert_eq!(
            GeminiClient::extract_first_image(&payload).as_deref(),
            Some("c25ha2U=")
        );
        assert_eq!(GeminiClient::extract_first_image(&json!({})), None);
    }

    #[test]
    fn endpoint_accepts_prefixed_model_names() {
        let mut config = FusionConfig::default().with_api_base("http://x/v1");
        config.model = "models/custom".to_string();
        assert_eq!(
            GeminiClient::new(config).endpoint(),
            "http://x/v1/models/custom:generateContent"
        );
    }
}
