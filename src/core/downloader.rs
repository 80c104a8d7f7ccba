// src/core/downloader.rs

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::models::DownloadResult;
use crate::system::latch::{CompletionLatch, completion_latch};

/// Trozos en vuelo entre la red y el fichero.
const CHUNK_BUFFER: usize = 16;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Código de respuesta inesperado al descargar el artefacto: {0}")]
    UnexpectedStatus(u16),
    #[error("Error descargando la compilación: {0}")]
    Transport(String),
    #[error("URL de artefacto inválida '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Error escribiendo el artefacto: {0}")]
    Io(#[from] std::io::Error),
    #[error("La descarga se interrumpió sin señal de finalización")]
    Interrupted,
}

type DownloadOutcome = Result<DownloadResult, DownloadError>;

/// Descarga un artefacto resuelto a disco local.
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    /// Si `requested` es falso no hace nada y devuelve `Ok(None)`.
    async fn download(
        &self,
        requested: bool,
        url: &str,
        destination_dir: &Path,
    ) -> Result<Option<DownloadResult>, DownloadError>;
}

pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, DownloadError> {
        let client = Client::builder()
            .build()
            .map_err(|e| DownloadError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

/// Nombre local del artefacto: el último segmento de la ruta de la URL, ya decodificado.
/// Se rechaza si al decodificarlo deja de ser un nombre de fichero simple.
pub fn file_name_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let name = percent_decode_str(segment).decode_utf8().ok()?;
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }
    Some(name.into_owned())
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(
        &self,
        requested: bool,
        url: &str,
        destination_dir: &Path,
    ) -> Result<Option<DownloadResult>, DownloadError> {
        if !requested {
            log::debug!("Descarga no solicitada para {}", url);
            return Ok(None);
        }

        let parsed = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let file_name = file_name_from_url(&parsed).ok_or_else(|| DownloadError::InvalidUrl {
            url: url.to_string(),
            reason: "la ruta no termina en un nombre de fichero".to_string(),
        })?;
        let file_path = destination_dir.join(&file_name);
        log::debug!("Descargando {} en {}", parsed, file_path.display());

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::Transport(e.to_string()))?;

        // El estado se comprueba antes de crear el fichero: un fallo no deja nada en disco.
        if response.status() != StatusCode::OK {
            return Err(DownloadError::UnexpectedStatus(response.status().as_u16()));
        }

        let file = File::create(&file_path).await?;
        let (latch, done) = completion_latch::<DownloadOutcome>();
        let latch = Arc::new(latch);
        let (chunks_tx, chunks_rx) = mpsc::channel::<Bytes>(CHUNK_BUFFER);
        let result = DownloadResult {
            url: url.to_string(),
            file: file_path.clone(),
        };
        let writer = tokio::spawn(write_artifact(file, chunks_rx, Arc::clone(&latch), result));

        match transfer(response, chunks_tx, done).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                // El escritor debe soltar el fichero antes de borrarlo.
                writer.abort();
                let _ = writer.await;
                discard_partial(&file_path).await;
                Err(e)
            }
        }
    }
}

/// Pasa los trozos de la respuesta al escritor y espera la señal de finalización.
async fn transfer(
    mut response: Response,
    chunks: mpsc::Sender<Bytes>,
    done: oneshot::Receiver<DownloadOutcome>,
) -> DownloadOutcome {
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if chunks.send(chunk).await.is_err() {
                    // El escritor ya terminó con error y disparó el cerrojo.
                    break;
                }
            }
            Ok(None) => {
                log::debug!("Fin del flujo de red recibido");
                break;
            }
            Err(e) => return Err(DownloadError::Transport(e.to_string())),
        }
    }
    drop(chunks);

    match done.await {
        Ok(outcome) => outcome,
        Err(_) => Err(DownloadError::Interrupted),
    }
}

/// Un artefacto a medias no debe quedar en disco con aspecto de descarga completa.
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Artefacto parcial eliminado: {}", path.display()),
        Err(e) => log::warn!("No se pudo eliminar el artefacto parcial {}: {}", path.display(), e),
    }
}

/// Vuelca los trozos en el fichero. Tanto el fin de escritura ("finish") como el cierre
/// del fichero ("close") intentan completar el cerrojo. Solo cuenta el primero.
async fn write_artifact(
    mut file: File,
    mut chunks: mpsc::Receiver<Bytes>,
    latch: Arc<CompletionLatch<DownloadOutcome>>,
    result: DownloadResult,
) {
    while let Some(chunk) = chunks.recv().await {
        if let Err(e) = file.write_all(&chunk).await {
            latch.fire(Err(e.into()));
            return;
        }
    }
    if let Err(e) = file.flush().await {
        latch.fire(Err(e.into()));
        return;
    }

    log::debug!("Evento 'finish' del fichero recibido");
    latch.fire(Ok(result.clone()));

    drop(file);
    log::debug!("Evento 'close' del fichero recibido");
    latch.fire(Ok(result));
}
