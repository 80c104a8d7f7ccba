// src/core/command.rs

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::args::ValidationError;
use crate::core::build::BuildError;
use crate::core::downloader::ArtifactDownloader;
use crate::core::generic_command::GenericCommandDescriptor;
use crate::models::{CommandArgs, CommandOutput, Session};
use crate::system::api::{ApiClient, RemoteCallError};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Todo lo que un comando necesita del exterior. Se pasa explícitamente en cada invocación.
pub struct Context<'a> {
    pub session: &'a Session,
    pub api: &'a dyn ApiClient,
    pub downloader: &'a dyn ArtifactDownloader,
    /// Directorio donde se escriben los artefactos descargados.
    pub download_dir: PathBuf,
}

/// Contrato uniforme de una hoja del árbol de comandos.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn describe(&self) -> &'static str;

    async fn invoke(&self, ctx: &Context<'_>, args: CommandArgs) -> Result<CommandOutput, CommandError>;
}

/// Forma de una definición del catálogo: declarativa (se adapta genéricamente) o a medida.
pub enum CommandDef {
    Declarative(GenericCommandDescriptor),
    Custom(&'static dyn CommandHandler),
}

/// Una entrada del catálogo: ruta separada por `/` y su definición.
pub struct CommandDefinition {
    pub path: &'static str,
    pub def: CommandDef,
}

/// Adaptador para los manejadores estáticos del catálogo.
pub(crate) struct CustomCommand(pub &'static dyn CommandHandler);

#[async_trait]
impl CommandHandler for CustomCommand {
    fn describe(&self) -> &'static str {
        self.0.describe()
    }

    async fn invoke(&self, ctx: &Context<'_>, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        self.0.invoke(ctx, args).await
    }
}
