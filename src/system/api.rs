// src/system/api.rs

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::constants::{API_KEY_HEADER, JOB_LOG_PATH};
use crate::models::{Payload, Session};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum RemoteCallError {
    #[error("No se pudo crear el cliente HTTP: {0}")]
    Client(#[source] reqwest::Error),
    #[error("URL inválida para '{path}': {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Error de transporte en '{path}': {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("El servidor respondió {status} en '{path}': {body}")]
    Status { path: String, status: u16, body: String },
    #[error("Respuesta ilegible de '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("No se pudo leer el fichero '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("El trabajo '{key}' terminó con error: {message}")]
    Job { key: String, message: String },
    #[error("El trabajo '{key}' no terminó tras {attempts} consultas")]
    PollTimeout { key: String, attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Frontera con el servicio remoto. Toda la lógica del núcleo habla con él a través de este trait.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Llamada genérica con payload. Devuelve el cuerpo JSON (o `null` si viene vacío).
    async fn call(&self, method: HttpMethod, path: &str, payload: &Payload) -> Result<Value, RemoteCallError>;

    /// Subida multipart de un fichero junto con campos de texto.
    async fn upload_file(
        &self,
        path: &str,
        file: &Path,
        fields: &[(&str, String)],
        content_type: &str,
    ) -> Result<Value, RemoteCallError>;

    /// Espera a que el trabajo identificado por `key` termine y devuelve sus entradas finales.
    async fn wait_for(&self, key: &str) -> Result<Vec<Value>, RemoteCallError>;
}

/// Estado de un trabajo según una lectura de su log.
#[derive(Debug, PartialEq)]
enum PollState {
    Complete(Vec<Value>),
    Failed(String),
    Pending { log_lines: usize },
}

/// Implementación real sobre reqwest.
pub struct HttpApi {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl HttpApi {
    pub fn new(session: &Session) -> Result<Self, RemoteCallError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RemoteCallError::Client)?;

        let mut base_url = Url::parse(&session.feedhenry).map_err(|source| RemoteCallError::Url {
            path: session.feedhenry.clone(),
            source,
        })?;
        // Sin barra final, `join` descartaría el último segmento de la base.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: session.api_key.clone(),
            poll_interval: session.poll_interval(),
            max_poll_attempts: session.max_poll_attempts,
        })
    }

    fn url(&self, path: &str) -> Result<Url, RemoteCallError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| RemoteCallError::Url {
                path: path.to_string(),
                source,
            })
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn decode(path: &str, response: Response) -> Result<Value, RemoteCallError> {
        let status = response.status();
        let body = response.text().await.map_err(|source| RemoteCallError::Transport {
            path: path.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(RemoteCallError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|source| RemoteCallError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ApiClient for HttpApi {
    async fn call(&self, method: HttpMethod, path: &str, payload: &Payload) -> Result<Value, RemoteCallError> {
        let url = self.url(path)?;
        log::debug!("{:?} {}", method, url);

        let builder = self.client.request(method.into(), url);
        let builder = match method {
            HttpMethod::Get | HttpMethod::Delete => builder.query(payload),
            HttpMethod::Post | HttpMethod::Put => builder.form(payload),
        };

        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|source| RemoteCallError::Transport {
                path: path.to_string(),
                source,
            })?;
        Self::decode(path, response).await
    }

    async fn upload_file(
        &self,
        path: &str,
        file: &Path,
        fields: &[(&str, String)],
        content_type: &str,
    ) -> Result<Value, RemoteCallError> {
        let url = self.url(path)?;
        let bytes = tokio::fs::read(file).await.map_err(|source| RemoteCallError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        log::debug!("Subiendo '{}' ({} bytes) a {}", file_name, bytes.len(), url);

        let transport = |source| RemoteCallError::Transport {
            path: path.to_string(),
            source,
        };
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(transport)?;

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }
        let form = form.part("file", part);

        let response = self
            .authorize(self.client.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(path, response).await
    }

    async fn wait_for(&self, key: &str) -> Result<Vec<Value>, RemoteCallError> {
        let mut start = 0usize;

        for attempt in 1..=self.max_poll_attempts {
            let cache_keys = json!([{ "cacheKey": key, "start": start }]).to_string();
            let payload = vec![("cacheKeys".to_string(), cache_keys)];
            let response = self.call(HttpMethod::Post, JOB_LOG_PATH, &payload).await?;

            match poll_state(&response) {
                PollState::Complete(entries) => {
                    log::info!("Trabajo '{}' completado", key);
                    return Ok(entries);
                }
                PollState::Failed(message) => {
                    return Err(RemoteCallError::Job {
                        key: key.to_string(),
                        message,
                    });
                }
                PollState::Pending { log_lines } => {
                    start += log_lines;
                    log::debug!("Trabajo '{}' pendiente (consulta {})", key, attempt);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        Err(RemoteCallError::PollTimeout {
            key: key.to_string(),
            attempts: self.max_poll_attempts,
        })
    }
}

/// Interpreta la respuesta de lectura de log. La primera entrada manda.
fn poll_state(response: &Value) -> PollState {
    let entries = match response {
        Value::Array(entries) => entries.clone(),
        other => vec![other.clone()],
    };
    let Some(first) = entries.first() else {
        return PollState::Pending { log_lines: 0 };
    };

    let log_lines = match first.get("log").and_then(Value::as_array) {
        Some(lines) => {
            for line in lines.iter().filter_map(Value::as_str) {
                log::info!("{}", line);
            }
            lines.len()
        }
        None => 0,
    };

    match first.get("status").and_then(Value::as_str) {
        Some("complete") => PollState::Complete(entries),
        Some("error") => {
            let message = first
                .get("error")
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .unwrap_or_else(|| first.to_string());
            PollState::Failed(message)
        }
        _ => PollState::Pending { log_lines },
    }
}
