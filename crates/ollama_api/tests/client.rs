use std::sync::{Arc, Mutex};

use ollama_api::{ChatRequest, OllamaApiError, OllamaClient, OllamaConfig, WireMessage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    reason: &'static str,
    body: String,
}

impl ScriptedResponse {
    fn json(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            body: body.to_string(),
        }
    }
}

struct ScriptedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<ScriptedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            async move {
                for script in scripts {
                    let (socket, _) = match listener.accept().await {
                        Ok(accepted) => accepted,
                        Err(_) => return,
                    };
                    let raw = read_request(socket, &script).await;
                    requests.lock().expect("request log").push(raw);
                }
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            handle,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log").clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_request(mut socket: TcpStream, script: &ScriptedResponse) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = socket.read(&mut chunk).await.unwrap_or(0);
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        script.status,
        script.reason,
        script.body.len(),
        script.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;

    String::from_utf8_lossy(&buffer).into_owned()
}

fn user_request(model: &str, text: &str) -> ChatRequest {
    ChatRequest::new(
        model,
        vec![
            WireMessage {
                role: "system".to_string(),
                content: "You are SCP-079.".to_string(),
            },
            WireMessage {
                role: "user".to_string(),
                content: text.to_string(),
            },
        ],
    )
}

#[tokio::test]
async fn chat_posts_to_api_chat_and_decodes_reply() {
    let server = ScriptedServer::new(vec![ScriptedResponse::json(
        200,
        "OK",
        r#"{"model":"llama2","message":{"role":"assistant","content":"hi there"},"done":true}"#,
    )])
    .await;
    let client = OllamaClient::new(OllamaConfig::new(server.base_url.clone())).expect("client");

    let response = client
        .chat(&user_request("llama2", "hello"))
        .await
        .expect("chat reply");

    assert_eq!(response.message.content, "hi there");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("POST /api/chat "));
    assert!(requests[0].contains(r#""stream":false"#));
    assert!(requests[0].contains(r#""content":"hello""#));
}

#[tokio::test]
async fn chat_maps_missing_model_to_model_not_found() {
    let server = ScriptedServer::new(vec![ScriptedResponse::json(
        404,
        "Not Found",
        r#"{"error":"model 'ghost' not found, try pulling it first"}"#,
    )])
    .await;
    let client = OllamaClient::new(OllamaConfig::new(server.base_url.clone())).expect("client");

    let error = client
        .chat(&user_request("ghost", "hello"))
        .await
        .expect_err("missing model fails");

    assert!(matches!(error, OllamaApiError::ModelNotFound(ref model) if model == "ghost"));
}

#[tokio::test]
async fn chat_reports_malformed_body_as_decode_error() {
    let server =
        ScriptedServer::new(vec![ScriptedResponse::json(200, "OK", r#"{"nope":1}"#)]).await;
    let client = OllamaClient::new(OllamaConfig::new(server.base_url.clone())).expect("client");

    let error = client
        .chat(&user_request("llama2", "hello"))
        .await
        .expect_err("malformed body fails");

    assert!(matches!(error, OllamaApiError::Decode(_)));
}

#[tokio::test]
async fn list_models_reads_tags_endpoint() {
    let server = ScriptedServer::new(vec![ScriptedResponse::json(
        200,
        "OK",
        r#"{"models":[{"name":"llama2:latest","size":1},{"name":"mistral:7b"}]}"#,
    )])
    .await;
    let client = OllamaClient::new(OllamaConfig::new(format!("{}/api/", server.base_url)))
        .expect("client");

    let models = client.list_models().await.expect("model listing");

    let names: Vec<&str> = models.iter().map(|model| model.base_name()).collect();
    assert_eq!(names, vec!["llama2", "mistral"]);
    assert!(server.requests()[0].starts_with("GET /api/tags "));
}

#[tokio::test]
async fn unreachable_daemon_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = OllamaClient::new(OllamaConfig::new(format!("http://{addr}"))).expect("client");
    let error = client
        .chat(&user_request("llama2", "hello"))
        .await
        .expect_err("closed port fails");

    assert!(error.is_connect(), "unexpected error: {error}");
}

#[test]
fn non_http_base_url_is_rejected() {
    let error = OllamaClient::new(OllamaConfig::new("ftp://example.com"))
        .expect_err("ftp base rejected");
    assert!(matches!(error, OllamaApiError::InvalidBaseUrl(_)));
}
