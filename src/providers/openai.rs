use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::RemoteCallError;
use crate::model::Message;
use crate::providers::http_errors::{api_request_error, api_status_error};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn build_request<'a>(
    model: &'a str,
    system: &'a Message,
    history: &'a [Message],
) -> ChatCompletionRequest<'a> {
    let messages = std::iter::once(system)
        .chain(history)
        .map(|msg| ChatMessage {
            role: msg.role().as_str(),
            content: msg.content(),
        })
        .collect();

    ChatCompletionRequest { model, messages }
}

fn extract_reply(body: &str) -> Result<String, RemoteCallError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|err| {
        RemoteCallError::MalformedResponse(format!("failed to parse response body: {err}"))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RemoteCallError::MalformedResponse("response has no choices".to_string()))?;

    choice.message.content.ok_or_else(|| {
        RemoteCallError::MalformedResponse("first choice has no message content".to_string())
    })
}

pub async fn chat(
    client: &Client,
    cfg: &Config,
    system: &Message,
    history: &[Message],
) -> Result<String, RemoteCallError> {
    let api_url = chat_url(&cfg.api_base_url);
    let body = build_request(&cfg.model, system, history);
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        message_count = body.messages.len(),
        "sending chat completion request"
    );

    let mut request = client.post(&api_url).json(&body);
    if let Some(api_key) = cfg.api_key.as_deref() {
        request = request.bearer_auth(api_key);
    }

    let response = request.send().await.map_err(|err| {
        debug!(
            api_url = %api_url,
            model = %cfg.model,
            error = %err,
            "chat completion request failed"
        );
        api_request_error(err, &api_url)
    })?;

    let status = response.status();
    let response_body = response
        .text()
        .await
        .map_err(|err| api_request_error(err, &api_url))?;

    if !status.is_success() {
        debug!(
            api_url = %api_url,
            model = %cfg.model,
            status = %status,
            response_body_len = response_body.len(),
            "chat API returned non-success status"
        );
        return Err(api_status_error(status, &response_body));
    }

    let reply = extract_reply(&response_body)?;
    debug!(
        model = %cfg.model,
        response_len = reply.len(),
        "received chat completion response"
    );
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::{build_request, chat, chat_url, extract_reply};
    use crate::config::Config;
    use crate::error::RemoteCallError;
    use crate::model::Message;
    use reqwest::Client;
    use serde_json::{Value, json};
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    fn read_http_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stream.read(&mut chunk).expect("read should succeed");
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);

            let Some(header_end) = buf.windows(4).position(|window| window == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept should succeed");
            let request = read_http_request(&mut stream);
            let response = format!(
                "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("write should succeed");
            request
        });
        (format!("http://{addr}/v1"), server)
    }

    fn test_config(base_url: String, api_key: Option<&str>) -> Config {
        Config {
            api_key: api_key.map(str::to_string),
            model: "gpt-3.5-turbo".to_string(),
            api_base_url: base_url,
        }
    }

    fn request_json(raw_request: &str) -> Value {
        let (_, body) = raw_request
            .split_once("\r\n\r\n")
            .expect("request should have a body");
        serde_json::from_str(body).expect("request body should be JSON")
    }

    #[test]
    fn chat_url_trims_trailing_slash() {
        assert_eq!(
            chat_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn request_puts_system_message_before_history() {
        let system = Message::system("be brief");
        let history = vec![
            Message::user("q1"),
            Message::assistant("a1"),
            Message::user("q2"),
        ];

        let body = serde_json::to_value(build_request("gpt-3.5-turbo", &system, &history))
            .expect("request should serialize");

        assert_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "q1"},
                    {"role": "assistant", "content": "a1"},
                    {"role": "user", "content": "q2"},
                ]
            })
        );
    }

    #[test]
    fn extract_reply_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"first"}},{"message":{"role":"assistant","content":"second"}}]}"#;
        assert_eq!(extract_reply(body).expect("reply should parse"), "first");
    }

    #[test]
    fn extract_reply_rejects_missing_choices_and_content() {
        for body in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
            "not json",
        ] {
            let err = extract_reply(body).expect_err("body should be rejected");
            assert!(
                matches!(err, RemoteCallError::MalformedResponse(_)),
                "unexpected error for {body}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn chat_posts_messages_with_bearer_token() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"It greets."}}]}"#,
        );
        let cfg = test_config(base_url, Some("sk-test"));

        let reply = chat(
            &Client::new(),
            &cfg,
            &Message::system("sys"),
            &[Message::user("what does this do?")],
        )
        .await
        .expect("chat should succeed");

        assert_eq!(reply, "It greets.");
        let raw_request = server.join().expect("server thread should join");
        assert!(raw_request.starts_with("POST /v1/chat/completions "));
        assert!(
            raw_request
                .to_ascii_lowercase()
                .contains("authorization: bearer sk-test"),
            "missing bearer token:\n{raw_request}"
        );
        let body = request_json(&raw_request);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "what does this do?");
    }

    #[tokio::test]
    async fn chat_without_api_key_sends_no_authorization_header() {
        let (base_url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized",
            r#"{"error":{"message":"You didn't provide an API key."}}"#,
        );
        let cfg = test_config(base_url, None);

        let err = chat(
            &Client::new(),
            &cfg,
            &Message::system("sys"),
            &[Message::user("hi")],
        )
        .await
        .expect_err("chat should fail");

        assert!(
            matches!(err, RemoteCallError::Unauthorized { .. }),
            "unexpected error: {err:?}"
        );
        let raw_request = server.join().expect("server thread should join");
        assert!(
            !raw_request.to_ascii_lowercase().contains("authorization:"),
            "unexpected authorization header:\n{raw_request}"
        );
    }

    #[tokio::test]
    async fn chat_reports_malformed_success_body() {
        let (base_url, server) = serve_once("HTTP/1.1 200 OK", r#"{"id":"x"}"#);
        let cfg = test_config(base_url, Some("sk-test"));

        let err = chat(
            &Client::new(),
            &cfg,
            &Message::system("sys"),
            &[Message::user("hi")],
        )
        .await
        .expect_err("chat should fail");

        assert!(matches!(err, RemoteCallError::MalformedResponse(_)));
        server.join().expect("server thread should join");
    }
}
