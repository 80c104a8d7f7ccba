// src/core/build/pipeline.rs

use futures::future::try_join_all;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

use crate::constants::{DELIVER_NAMESPACE, PROVISIONING_UPLOAD_PATH};
use crate::core::build::BuildError;
use crate::core::command::Context;
use crate::core::downloader::ArtifactDownloader;
use crate::models::{BuildRequest, CommandOutput, Session};
use crate::system::api::{ApiClient, HttpMethod, RemoteCallError};

/// Campo de la respuesta con la clave del trabajo de caché (la única que se espera).
const CACHE_KEY_FIELD: &str = "cacheKey";
/// Clave de staging. El servicio aún la envía, pero ya no se espera.
const STAGE_KEY_FIELD: &str = "stageKey";

/// Resultado de una compilación enviada.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    /// La respuesta no traía claves de trabajo: se devuelve tal cual.
    Submitted(Value),
    /// Resultados de cada clave, en orden, más la entrada `{download: ...}` si hubo descarga.
    Completed {
        results: Vec<Value>,
        message: Option<String>,
    },
}

impl From<BuildOutcome> for CommandOutput {
    fn from(outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::Submitted(data) => CommandOutput::data(data),
            BuildOutcome::Completed { results, message } => CommandOutput {
                data: Value::Array(results),
                message,
            },
        }
    }
}

pub struct BuildPipeline<'a> {
    session: &'a Session,
    api: &'a dyn ApiClient,
    downloader: &'a dyn ArtifactDownloader,
    download_dir: PathBuf,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(ctx: &Context<'a>) -> Self {
        Self {
            session: ctx.session,
            api: ctx.api,
            downloader: ctx.downloader,
            download_dir: ctx.download_dir.clone(),
        }
    }

    /// Sube el perfil (si aplica), envía la compilación, espera sus trabajos y descarga el artefacto.
    pub async fn submit(&self, request: BuildRequest) -> Result<BuildOutcome, BuildError> {
        if request.is_apple()
            && let Some(profile) = &request.provisioning
        {
            self.upload_provisioning(&request, profile).await?;
        }

        let path = deliver_path(self.session, &request);
        let payload = request.to_payload();
        log::info!("Enviando compilación de '{}' para '{}'", request.app, request.destination);
        let response = self.api.call(HttpMethod::Post, &path, &payload).await?;

        let keys = job_keys(&response);
        if keys.is_empty() {
            log::debug!("La respuesta no contiene claves de trabajo");
            return Ok(BuildOutcome::Submitted(response));
        }

        let mut results = poll_job_keys(self.api, &keys).await?;

        let Some(url) = artifact_url(&results) else {
            return Ok(BuildOutcome::Completed { results, message: None });
        };

        let mut message = format!("\nDownload URL: {url}");
        if let Some(download) = self
            .downloader
            .download(request.download, &url, &self.download_dir)
            .await?
        {
            message.push_str(&format!("\nDownloaded file: {}", download.file.display()));
            results.push(json!({ "download": download.to_value() }));
        }

        Ok(BuildOutcome::Completed {
            results,
            message: Some(message),
        })
    }

    async fn upload_provisioning(&self, request: &BuildRequest, profile: &Path) -> Result<(), BuildError> {
        let fields = [
            ("dest", request.destination.clone()),
            ("resourceType", "provisioning".to_string()),
            ("buildType", request.config.as_str().to_string()),
            ("templateInstance", request.app.clone()),
        ];
        let response = self
            .api
            .upload_file(PROVISIONING_UPLOAD_PATH, profile, &fields, "application/octet-stream")
            .await?;

        if response.get("result").and_then(Value::as_str) == Some("ok") {
            log::info!("Perfil de aprovisionamiento subido");
            Ok(())
        } else {
            Err(BuildError::ProvisioningUploadFailed(response.to_string()))
        }
    }
}

/// `box/srv/1.1/wid/{dominio}/{destino}/{app}/deliver`
pub fn deliver_path(session: &Session, request: &BuildRequest) -> String {
    format!(
        "{}/{}/{}/{}/deliver",
        DELIVER_NAMESPACE, session.domain, request.destination, request.app
    )
}

/// Claves de trabajo a esperar, extraídas de la respuesta de envío.
pub fn job_keys(response: &Value) -> Vec<String> {
    if let Some(stage) = response.get(STAGE_KEY_FIELD).and_then(Value::as_str) {
        log::debug!("Ignorando clave de staging '{}'", stage);
    }
    response
        .get(CACHE_KEY_FIELD)
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .map(|key| vec![key.to_string()])
        .unwrap_or_default()
}

/// Espera todas las claves a la vez. El primer error se devuelve en el acto y el resto
/// de esperas se descarta. Los resultados conservan el orden de las claves.
pub async fn poll_job_keys(api: &dyn ApiClient, keys: &[String]) -> Result<Vec<Value>, RemoteCallError> {
    let polls = keys.iter().map(|key| async move {
        log::debug!("Esperando el trabajo '{}'", key);
        api.wait_for(key).await.map(Value::Array)
    });
    try_join_all(polls).await
}

/// `action.url` del primer elemento del primer resultado, si existe.
fn artifact_url(results: &[Value]) -> Option<String> {
    results
        .first()?
        .get(0)?
        .get("action")?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build::validator::validate;
    use crate::models::{CommandArgs, DownloadResult};
    use crate::system::testing::{FakeApi, FakeDownloader, PollScript, context};
    use std::time::Duration;

    fn request(pairs: &[(&str, &str)]) -> BuildRequest {
        let args: CommandArgs = pairs.iter().copied().collect();
        validate(args, &Session::default()).unwrap()
    }

    fn artifact(url: &str) -> Vec<Value> {
        vec![json!({ "status": "complete", "action": { "url": url } })]
    }

    #[tokio::test]
    async fn response_without_keys_is_returned_raw() {
        let session = Session::default();
        let api = FakeApi::new().respond(json!({ "status": "ok", "result": "queued" }));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        let outcome = BuildPipeline::new(&ctx)
            .submit(request(&[("app", "a1"), ("destination", "android")]))
            .await
            .unwrap();

        assert_eq!(outcome, BuildOutcome::Submitted(json!({ "status": "ok", "result": "queued" })));
        assert!(api.polled().is_empty());
        assert!(downloader.requests().is_empty());
    }

    #[tokio::test]
    async fn submits_to_deliver_path_for_current_domain() {
        let session = Session {
            domain: "acme".into(),
            ..Default::default()
        };
        let api = FakeApi::new();
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        BuildPipeline::new(&ctx)
            .submit(request(&[("app", "a1"), ("destination", "android")]))
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls[0].method, HttpMethod::Post);
        assert_eq!(calls[0].path, "box/srv/1.1/wid/acme/android/a1/deliver");
        assert_eq!(calls[0].payload[0], ("generateSrc".to_string(), "false".to_string()));
    }

    #[tokio::test]
    async fn single_key_with_artifact_is_downloaded() {
        let session = Session::default();
        let api = FakeApi::new()
            .respond(json!({ "cacheKey": "k1", "stageKey": "s1" }))
            .poll("k1", PollScript::Resolve(artifact("https://x/y/app.apk")));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        let outcome = BuildPipeline::new(&ctx)
            .submit(request(&[("app", "a1"), ("destination", "android"), ("download", "true")]))
            .await
            .unwrap();

        assert_eq!(api.polled(), vec!["k1".to_string()]);
        assert_eq!(downloader.requests(), vec![(true, "https://x/y/app.apk".to_string())]);

        let BuildOutcome::Completed { results, message } = outcome else {
            panic!("se esperaba una compilación completada");
        };
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.last().unwrap(),
            &json!({ "download": { "url": "https://x/y/app.apk", "file": "./app.apk" } })
        );
        let message = message.unwrap();
        assert!(message.contains("Download URL: https://x/y/app.apk"));
        assert!(message.contains("Downloaded file: ./app.apk"));

        let expected = DownloadResult {
            url: "https://x/y/app.apk".into(),
            file: "./app.apk".into(),
        };
        assert_eq!(results[1]["download"], expected.to_value());
    }

    #[tokio::test]
    async fn artifact_without_download_flag_only_reports_url() {
        let session = Session::default();
        let api = FakeApi::new()
            .respond(json!({ "cacheKey": "k1" }))
            .poll("k1", PollScript::Resolve(artifact("https://x/y/app.ipa")));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        let outcome = BuildPipeline::new(&ctx)
            .submit(request(&[("app", "a1"), ("destination", "android"), ("download", "false")]))
            .await
            .unwrap();

        let BuildOutcome::Completed { results, message } = outcome else {
            panic!("se esperaba una compilación completada");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(message.as_deref(), Some("\nDownload URL: https://x/y/app.ipa"));
        assert_eq!(downloader.requests(), vec![(false, "https://x/y/app.ipa".to_string())]);
    }

    #[tokio::test]
    async fn poll_failure_aborts_the_build() {
        let session = Session::default();
        let api = FakeApi::new()
            .respond(json!({ "cacheKey": "k1" }))
            .poll("k1", PollScript::Fail("compilación rota".into()));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        let err = BuildPipeline::new(&ctx)
            .submit(request(&[("app", "a1"), ("destination", "android"), ("download", "true")]))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Remote(RemoteCallError::Job { .. })));
        assert!(downloader.requests().is_empty());
    }

    #[tokio::test]
    async fn first_poll_failure_wins_over_pending_keys() {
        let api = FakeApi::new()
            .poll("lenta", PollScript::ResolveAfter(Duration::from_millis(20), artifact("https://x/a.apk")))
            .poll("colgada", PollScript::Hang)
            .poll("rota", PollScript::Fail("fallo".into()));
        let keys = ["lenta", "colgada", "rota"].map(String::from);

        let result = tokio::time::timeout(Duration::from_secs(5), poll_job_keys(&api, &keys))
            .await
            .expect("la espera debe cortarse con el primer error");

        assert!(matches!(result, Err(RemoteCallError::Job { ref key, .. }) if key == "rota"));
    }

    #[tokio::test]
    async fn concurrent_polls_keep_key_order() {
        let api = FakeApi::new()
            .poll("a", PollScript::ResolveAfter(Duration::from_millis(20), artifact("https://x/a.apk")))
            .poll("b", PollScript::Resolve(artifact("https://x/b.apk")));
        let keys = ["a", "b"].map(String::from);

        let results = poll_job_keys(&api, &keys).await.unwrap();

        assert_eq!(results[0][0]["action"]["url"], "https://x/a.apk");
        assert_eq!(results[1][0]["action"]["url"], "https://x/b.apk");
    }

    #[tokio::test]
    async fn provisioning_is_uploaded_before_apple_builds() {
        let session = Session::default();
        let api = FakeApi::new().upload_responds(json!({ "result": "ok" }));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        BuildPipeline::new(&ctx)
            .submit(request(&[
                ("app", "a1"),
                ("destination", "iphone"),
                ("provisioning", "perfil.mobileprovision"),
            ]))
            .await
            .unwrap();

        let uploads = api.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].path, PROVISIONING_UPLOAD_PATH);
        assert_eq!(uploads[0].content_type, "application/octet-stream");
        assert_eq!(
            uploads[0].fields,
            vec![
                ("dest".to_string(), "iphone".to_string()),
                ("resourceType".to_string(), "provisioning".to_string()),
                ("buildType".to_string(), "debug".to_string()),
                ("templateInstance".to_string(), "a1".to_string()),
            ]
        );
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_provisioning_upload_stops_submission() {
        let session = Session::default();
        let api = FakeApi::new().upload_responds(json!({ "result": "error", "msg": "perfil caducado" }));
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        let err = BuildPipeline::new(&ctx)
            .submit(request(&[
                ("app", "a1"),
                ("destination", "ios"),
                ("provisioning", "perfil.mobileprovision"),
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::ProvisioningUploadFailed(ref body) if body.contains("perfil caducado")));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn provisioning_is_ignored_for_android() {
        let session = Session::default();
        let api = FakeApi::new();
        let downloader = FakeDownloader::default();
        let ctx = context(&session, &api, &downloader);

        BuildPipeline::new(&ctx)
            .submit(request(&[
                ("app", "a1"),
                ("destination", "android"),
                ("provisioning", "perfil.mobileprovision"),
            ]))
            .await
            .unwrap();

        assert!(api.uploads().is_empty());
    }
}
