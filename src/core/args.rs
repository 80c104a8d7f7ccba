// src/core/args.rs

use crate::models::{ArgValue, CommandArgs};
use thiserror::Error;

/// Errores detectados localmente, antes de cualquier llamada de red.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Falta el parámetro '{0}'")]
    MissingParameter(String),
    #[error("Combinación de parámetros inválida: {0}")]
    InvalidCombination(String),
    #[error("Valor '{value}' inválido para '{name}' (valores posibles: {expected})")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
    #[error("Argumento mal formado '{0}': se esperaba clave=valor")]
    MalformedArgument(String),
}

impl ValidationError {
    pub fn missing(name: &str) -> Self {
        ValidationError::MissingParameter(name.to_string())
    }
}

/// Convierte tokens `clave=valor` en una bolsa de argumentos.
/// Se separa por el primer `=`. Si una clave se repite, gana la última.
pub fn parse_args<S: AsRef<str>>(tokens: &[S]) -> Result<CommandArgs, ValidationError> {
    let mut args = CommandArgs::new();
    for token in tokens {
        let token = token.as_ref();
        let (key, raw) = token
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| ValidationError::MalformedArgument(token.to_string()))?;
        log::debug!("Argumento '{}' = '{}'", key, raw);
        args.insert(key, ArgValue::parse(raw));
    }
    Ok(args)
}
