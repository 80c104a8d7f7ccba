// src/core/catalogue.rs

use async_trait::async_trait;

use crate::constants::VERSION_PATH;
use crate::core::build::BuildCommand;
use crate::core::command::{CommandDef, CommandDefinition, CommandError, CommandHandler, Context};
use crate::core::generic_command::GenericCommandDescriptor;
use crate::core::registry::{CommandRegistry, RegistryError};
use crate::models::{CommandArgs, CommandOutput, Payload};
use crate::system::api::HttpMethod;

static BUILD: BuildCommand = BuildCommand;
static PING: PingCommand = PingCommand;

macro_rules! app_path {
    ($op:literal) => {
        concat!("box/srv/1.1/ide/{domain}/app/", $op)
    };
}

/// Todos los comandos que conoce fhc. Se recorre una sola vez al arrancar.
pub static COMMANDS: &[CommandDefinition] = &[
    CommandDefinition {
        path: "build",
        def: CommandDef::Custom(&BUILD),
    },
    CommandDefinition {
        path: "ping",
        def: CommandDef::Custom(&PING),
    },
    // --- Aplicaciones ---
    CommandDefinition {
        path: "app/read",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "read",
            desc: "Muestra los detalles de una aplicación",
            required: &["guid"],
            optional: &[],
            url: app_path!("read"),
            method: HttpMethod::Post,
        }),
    },
    CommandDefinition {
        path: "app/list",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "list",
            desc: "Lista las aplicaciones del dominio",
            required: &[],
            optional: &[],
            url: app_path!("list"),
            method: HttpMethod::Post,
        }),
    },
    CommandDefinition {
        path: "app/delete",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "delete",
            desc: "Elimina una aplicación",
            required: &["guid"],
            optional: &[],
            url: app_path!("delete"),
            method: HttpMethod::Post,
        }),
    },
    // --- Alias de entornos ---
    CommandDefinition {
        path: "admin/environments/alias/list",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "list",
            desc: "Lista los alias de entorno",
            required: &[],
            optional: &[],
            url: "api/v2/environments/aliases",
            method: HttpMethod::Get,
        }),
    },
    CommandDefinition {
        path: "admin/environments/alias/read",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "read",
            desc: "Muestra un alias de entorno",
            required: &["id"],
            optional: &[],
            url: "api/v2/environments/aliases/{id}",
            method: HttpMethod::Get,
        }),
    },
    CommandDefinition {
        path: "admin/environments/alias/create",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "create",
            desc: "Crea un alias de entorno",
            required: &["environment", "environmentAlias", "environmentLabelAlias"],
            optional: &[],
            url: "api/v2/environments/aliases",
            method: HttpMethod::Post,
        }),
    },
    CommandDefinition {
        path: "admin/environments/alias/update",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "update",
            desc: "Actualiza un alias de entorno",
            required: &["id"],
            optional: &[],
            url: "api/v2/environments/aliases/{id}",
            method: HttpMethod::Put,
        }),
    },
    CommandDefinition {
        path: "admin/environments/alias/delete",
        def: CommandDef::Declarative(GenericCommandDescriptor {
            name: "delete",
            desc: "Elimina un alias de entorno",
            required: &["id"],
            optional: &[],
            url: "api/v2/environments/aliases/{id}",
            method: HttpMethod::Delete,
        }),
    },
];

/// Construye el árbol de comandos a partir del catálogo.
pub fn registry() -> Result<CommandRegistry, RegistryError> {
    CommandRegistry::build(COMMANDS)
}

/// `fhc ping`: consulta la versión del servicio.
pub struct PingCommand;

#[async_trait]
impl CommandHandler for PingCommand {
    fn describe(&self) -> &'static str {
        "Comprueba la conexión con el servicio y muestra su versión"
    }

    async fn invoke(&self, ctx: &Context<'_>, _args: CommandArgs) -> Result<CommandOutput, CommandError> {
        log::info!("Consultando versión en {}", ctx.session.feedhenry);
        let data = ctx.api.call(HttpMethod::Get, VERSION_PATH, &Payload::new()).await?;
        Ok(CommandOutput::data(data))
    }
}
