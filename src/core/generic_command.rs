// src/core/generic_command.rs

use async_trait::async_trait;

use crate::core::args::ValidationError;
use crate::core::command::{CommandError, CommandHandler, Context};
use crate::core::interpolator::Interpolator;
use crate::models::{ArgValue, CommandArgs, CommandOutput};
use crate::system::api::HttpMethod;

/// Parámetro opcional, con valor por defecto si lo tiene.
#[derive(Debug, Clone, Copy)]
pub struct OptionalParam {
    pub name: &'static str,
    pub default: Option<&'static str>,
}

/// Descripción declarativa de un comando que se reduce a una única llamada remota.
#[derive(Debug, Clone, Copy)]
pub struct GenericCommandDescriptor {
    pub name: &'static str,
    pub desc: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [OptionalParam],
    /// Plantilla de la ruta remota, con variables `{nombre}`.
    pub url: &'static str,
    pub method: HttpMethod,
}

/// Un descriptor ya anotado con su ruta en el árbol y su nombre de hoja.
#[derive(Debug)]
pub struct GenericCommand {
    pub path: String,
    pub name: String,
    descriptor: &'static GenericCommandDescriptor,
}

pub fn adapt(path: &str, name: &str, descriptor: &'static GenericCommandDescriptor) -> GenericCommand {
    if descriptor.name != name {
        log::warn!(
            "El descriptor '{}' está registrado en '{}': se usa el nombre de la ruta, '{}'",
            descriptor.name, path, name
        );
    }
    GenericCommand {
        path: path.to_string(),
        name: name.to_string(),
        descriptor,
    }
}

impl GenericCommand {
    /// Completa opcionales, comprueba obligatorios y construye ruta y payload.
    /// No hace ninguna llamada: si falla, no hay efectos.
    fn prepare(&self, ctx: &Context<'_>, mut args: CommandArgs) -> Result<(String, CommandArgs), ValidationError> {
        for param in self.descriptor.optional {
            if let Some(default) = param.default
                && !args.contains(param.name)
            {
                args.insert(param.name, ArgValue::from(default));
            }
        }

        if let Some(missing) = self.descriptor.required.iter().find(|name| !args.contains(name)) {
            return Err(ValidationError::missing(missing));
        }

        let path = Interpolator::new(ctx.session).interpolate(self.descriptor.url, &mut args)?;
        Ok((path, args))
    }
}

#[async_trait]
impl CommandHandler for GenericCommand {
    fn describe(&self) -> &'static str {
        self.descriptor.desc
    }

    async fn invoke(&self, ctx: &Context<'_>, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        let (path, args) = self.prepare(ctx, args)?;
        let payload = args.into_payload();

        log::info!("Ejecutando '{}' en '{}' ({:?} {})", self.name, self.path, self.descriptor.method, path);
        let data = ctx.api.call(self.descriptor.method, &path, &payload).await?;
        Ok(CommandOutput::data(data))
    }
}
