// src/core/build/mod.rs

pub mod pipeline;
pub mod validator;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::args::ValidationError;
use crate::core::command::{CommandError, CommandHandler, Context};
use crate::core::downloader::DownloadError;
use crate::models::{CommandArgs, CommandOutput};
use crate::system::api::RemoteCallError;
use pipeline::BuildPipeline;

pub const BUILD_DESC: &str = "Compila una aplicación cliente";

// Detalle común a ambos textos de uso.
macro_rules! usage_details {
    () => {
        "
donde <destination> es: android, iphone, ipad, ios (binario universal), blackberry, windowsphone7, windowsphone (windows phone 8)
donde <version> depende del destino (p. ej. Android 4.0)
donde <config> es 'debug' (por defecto), 'distribution' o 'release'
donde <provisioning> es la ruta al perfil de aprovisionamiento
donde <cordova_version> es la versión de Cordova a usar (2.2 o 3.3, solo Android por ahora)
donde <branch name> es la rama git a compilar ('master' por defecto)
donde <commit hash> es el hash completo del commit a compilar si no es la cabeza de la rama. Requiere <branch name>
'keypass' y 'certpass' solo se necesitan para compilaciones 'release' y 'distribution'
'provisioning' solo es opcional para compilaciones iphone o ipad"
    };
}

pub const BUILD_USAGE: &str = concat!(
    "\nfhc build app=<app-id> destination=<destination> version=<version> config=<config> keypass=<private-key-password> certpass=<certificate-password> download=<true|false> provisioning=<path-to-provisioning-profile> cordova_version=<cordova version> branch=<branch name> commit=<commit hash>",
    usage_details!()
);

pub const BUILD_USAGE_EXTENDED: &str = concat!(
    "\nfhc build project=<project-id> app=<app-id> cloud_app=<cloud-app-id> tag=<tag> destination=<destination> version=<version> config=<config> keypass=<private-key-password> certpass=<certificate-password> download=<true|false> provisioning=<path-to-provisioning-profile> cordova_version=<cordova version> branch=<branch name> commit=<commit hash>",
    usage_details!()
);

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Error processing args: {source}\nUsage: {usage}")]
    Usage {
        #[source]
        source: ValidationError,
        usage: &'static str,
    },
    #[error("No se pudo subir el perfil de aprovisionamiento. Respuesta: {0}")]
    ProvisioningUploadFailed(String),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Texto de uso según el modo de la plataforma.
pub fn usage_for(extended: bool) -> &'static str {
    if extended { BUILD_USAGE_EXTENDED } else { BUILD_USAGE }
}

/// El comando `build`: validación, envío, espera y descarga.
pub struct BuildCommand;

#[async_trait]
impl CommandHandler for BuildCommand {
    fn describe(&self) -> &'static str {
        BUILD_DESC
    }

    async fn invoke(&self, ctx: &Context<'_>, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        let extended = ctx.session.is_extended();
        let request = validator::validate(args, ctx.session).map_err(|source| {
            log::debug!("Argumentos de build inválidos: {}", source);
            BuildError::Usage {
                source,
                usage: usage_for(extended),
            }
        })?;

        let outcome = BuildPipeline::new(ctx).submit(request).await?;
        Ok(outcome.into())
    }
}
