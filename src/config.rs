// src/config.rs

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME, ENV_DOMAIN, ENV_FEEDHENRY};
use crate::models::Session;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No se pudo encontrar el directorio de configuración del sistema.")]
    NoConfigDir,
    #[error("Error de Ficheros en '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error al parsear TOML en '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

type ConfigResult<T> = Result<T, ConfigError>;

/// Devuelve la ruta al directorio de configuración de fhc.
/// Lo crea si no existe.
pub fn get_config_dir() -> ConfigResult<PathBuf> {
    let config_path = dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(CONFIG_DIR_NAME);
    log::debug!("Directorio de config: {:?}", config_path);
    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.display().to_string(),
            source,
        })?;
    }

    Ok(config_path)
}

/// Devuelve la ruta al archivo config.toml.
pub fn get_config_path() -> ConfigResult<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Carga la sesión desde `path` (o la ruta por defecto) y aplica las variables de entorno.
pub fn load_session(path: Option<&Path>) -> ConfigResult<Session> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };
    let mut session = read_session(&path)?;
    apply_overrides(&mut session, |key| std::env::var(key).ok());
    Ok(session)
}

/// Lee el archivo de sesión. Si no existe, se usan los valores por defecto.
pub fn read_session(path: &Path) -> ConfigResult<Session> {
    if !path.exists() {
        log::info!("No existe {:?}; usando configuración por defecto.", path);
        return Ok(Session::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.display().to_string(),
        source,
    })
}

/// Las variables de entorno, si están definidas y no vacías, ganan al archivo.
pub fn apply_overrides(session: &mut Session, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(feedhenry) = lookup(ENV_FEEDHENRY) {
        log::debug!("{} sobrescribe feedhenry", ENV_FEEDHENRY);
        session.feedhenry = feedhenry;
    }
    if let Some(domain) = lookup(ENV_DOMAIN) {
        log::debug!("{} sobrescribe domain", ENV_DOMAIN);
        session.domain = domain;
    }
}
