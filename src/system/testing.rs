// src/system/testing.rs

//! Dobles de prueba en memoria para `ApiClient` y `ArtifactDownloader`.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::command::Context;
use crate::core::downloader::{ArtifactDownloader, DownloadError};
use crate::models::{DownloadResult, Payload, Session};
use crate::system::api::{ApiClient, HttpMethod, RemoteCallError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub path: String,
    pub file: PathBuf,
    pub fields: Vec<(String, String)>,
    pub content_type: String,
}

/// Guion de la espera de una clave.
#[derive(Debug, Clone)]
pub enum PollScript {
    Resolve(Vec<Value>),
    ResolveAfter(Duration, Vec<Value>),
    Fail(String),
    /// Nunca termina.
    Hang,
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Value>>,
    uploads: Mutex<Vec<RecordedUpload>>,
    upload_response: Mutex<Option<Value>>,
    polls: Mutex<HashMap<String, PollScript>>,
    polled: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encola la respuesta de la siguiente llamada. Sin respuestas encoladas se devuelve `null`.
    pub fn respond(self, value: Value) -> Self {
        self.responses.lock().unwrap().push_back(value);
        self
    }

    pub fn upload_responds(self, value: Value) -> Self {
        *self.upload_response.lock().unwrap() = Some(value);
        self
    }

    pub fn poll(self, key: &str, script: PollScript) -> Self {
        self.polls.lock().unwrap().insert(key.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn polled(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn call(&self, method: HttpMethod, path: &str, payload: &Payload) -> Result<Value, RemoteCallError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            payload: payload.clone(),
        });
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or(Value::Null))
    }

    async fn upload_file(
        &self,
        path: &str,
        file: &Path,
        fields: &[(&str, String)],
        content_type: &str,
    ) -> Result<Value, RemoteCallError> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            path: path.to_string(),
            file: file.to_path_buf(),
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            content_type: content_type.to_string(),
        });
        Ok(self.upload_response.lock().unwrap().clone().unwrap_or(Value::Null))
    }

    async fn wait_for(&self, key: &str) -> Result<Vec<Value>, RemoteCallError> {
        self.polled.lock().unwrap().push(key.to_string());
        let script = self.polls.lock().unwrap().get(key).cloned();
        match script {
            Some(PollScript::Resolve(entries)) => Ok(entries),
            Some(PollScript::ResolveAfter(delay, entries)) => {
                tokio::time::sleep(delay).await;
                Ok(entries)
            }
            Some(PollScript::Fail(message)) => Err(RemoteCallError::Job {
                key: key.to_string(),
                message,
            }),
            Some(PollScript::Hang) => std::future::pending().await,
            None => Err(RemoteCallError::Job {
                key: key.to_string(),
                message: "clave sin guion".to_string(),
            }),
        }
    }
}

/// Descargador que no toca la red: registra la URL y devuelve `./<nombre>`.
#[derive(Default)]
pub struct FakeDownloader {
    requests: Mutex<Vec<(bool, String)>>,
}

impl FakeDownloader {
    pub fn requests(&self) -> Vec<(bool, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactDownloader for FakeDownloader {
    async fn download(
        &self,
        requested: bool,
        url: &str,
        destination_dir: &Path,
    ) -> Result<Option<DownloadResult>, DownloadError> {
        self.requests.lock().unwrap().push((requested, url.to_string()));
        if !requested {
            return Ok(None);
        }
        let name = url.rsplit('/').next().unwrap_or_default();
        Ok(Some(DownloadResult {
            url: url.to_string(),
            file: destination_dir.join(name),
        }))
    }
}

pub fn context<'a>(session: &'a Session, api: &'a FakeApi, downloader: &'a FakeDownloader) -> Context<'a> {
    Context {
        session,
        api,
        downloader,
        download_dir: PathBuf::from("./"),
    }
}
