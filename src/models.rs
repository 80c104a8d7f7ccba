// src/models.rs

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    APPLE_DESTINATIONS, DEFAULT_DOMAIN, DEFAULT_FEEDHENRY, DEFAULT_FHVERSION,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS, EXTENDED_FHVERSION,
};

// --- ARGUMENTOS DE LÍNEA DE COMANDOS ---

/// Valor de un argumento `clave=valor`. Los valores que son JSON (objeto o lista) se conservan
/// estructurados y se serializan de nuevo a texto al enviarse.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Object(Value),
}

impl ArgValue {
    /// Interpreta el texto crudo de un argumento.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if (trimmed.starts_with('{') || trimmed.starts_with('['))
            && let Ok(value) = serde_json::from_str::<Value>(raw)
            && (value.is_object() || value.is_array())
        {
            return ArgValue::Object(value);
        }
        ArgValue::Text(raw.to_string())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Text(s) => Some(s),
            ArgValue::Object(_) => None,
        }
    }

    /// Forma en la que el valor viaja en el payload. Los objetos van como JSON compacto.
    pub fn to_payload_string(&self) -> String {
        match self {
            ArgValue::Text(s) => s.clone(),
            ArgValue::Object(v) => v.to_string(),
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

/// Pares clave/valor tal y como se envían al servicio remoto.
pub type Payload = Vec<(String, String)>;

/// La bolsa de argumentos de una invocación. Un texto vacío cuenta como ausente.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs {
    values: BTreeMap<String, ArgValue>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key).filter(|v| !matches!(v, ArgValue::Text(s) if s.is_empty()))
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgValue> {
        self.values.remove(key)
    }

    /// Extrae un argumento de texto. Un objeto JSON se devuelve en su forma serializada.
    pub fn take_text(&mut self, key: &str) -> Option<String> {
        match self.values.remove(key)? {
            ArgValue::Text(s) if s.is_empty() => None,
            other => Some(other.to_payload_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_payload(self) -> Payload {
        self.values
            .into_iter()
            .map(|(k, v)| {
                let value = v.to_payload_string();
                (k, value)
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for CommandArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = CommandArgs::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

// --- SESIÓN (contexto explícito de autenticación y objetivo) ---

/// Representa `config.toml`. Todo campo ausente toma su valor por defecto.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Session {
    /// URL base del servicio.
    pub feedhenry: String,
    /// Dominio sobre el que se opera (el "objetivo actual").
    pub domain: String,
    pub fhversion: u32,
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Alias locales de identificadores de aplicación.
    pub aliases: HashMap<String, String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            feedhenry: DEFAULT_FEEDHENRY.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            fhversion: DEFAULT_FHVERSION,
            api_key: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            aliases: HashMap::new(),
        }
    }
}

impl Session {
    /// Resuelve un alias de aplicación. Si no hay alias, el identificador se usa tal cual.
    pub fn app_id(&self, app: &str) -> String {
        match self.aliases.get(app) {
            Some(id) => {
                log::debug!("Alias '{}' resuelto a '{}'", app, id);
                id.clone()
            }
            None => app.to_string(),
        }
    }

    pub fn is_extended(&self) -> bool {
        self.fhversion >= EXTENDED_FHVERSION
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// --- COMPILACIÓN ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigTier {
    #[default]
    Debug,
    Release,
    Distribution,
}

impl ConfigTier {
    pub const NAMES: &'static [&'static str] = &["debug", "release", "distribution"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigTier::Debug => "debug",
            ConfigTier::Release => "release",
            ConfigTier::Distribution => "distribution",
        }
    }

    /// `release` y `distribution` se firman, y por tanto necesitan credenciales.
    pub fn requires_signing(&self) -> bool {
        !matches!(self, ConfigTier::Debug)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(ConfigTier::Debug),
            "release" => Some(ConfigTier::Release),
            "distribution" => Some(ConfigTier::Distribution),
            _ => None,
        }
    }
}

/// Referencia git a compilar: una rama y, opcionalmente, un commit concreto de esa rama.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    pub branch: String,
    pub hash: Option<String>,
}

impl GitRef {
    pub fn to_value(&self) -> Value {
        let mut value = json!({ "type": "branch", "value": self.branch });
        if let (Some(hash), Some(map)) = (&self.hash, value.as_object_mut()) {
            map.insert("hash".to_string(), Value::String(hash.clone()));
        }
        value
    }
}

/// Petición de compilación ya validada.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    pub app: String,
    pub destination: String,
    pub version: Option<String>,
    pub config: ConfigTier,
    pub keypass: Option<String>,
    pub certpass: Option<String>,
    pub private_key_pass: Option<String>,
    pub device_type: Option<String>,
    /// Solo local: nunca se transmite.
    pub provisioning: Option<PathBuf>,
    /// Solo local: nunca se transmite.
    pub download: bool,
    pub git_ref: Option<GitRef>,
    /// Argumentos no reconocidos (p. ej. `cordova_version`, `project`), enviados tal cual.
    pub extra: CommandArgs,
}

impl BuildRequest {
    pub fn is_apple(&self) -> bool {
        is_apple_destination(&self.destination)
    }

    /// Serializa la petición. El payload siempre empieza por `generateSrc=false`.
    pub fn to_payload(&self) -> Payload {
        let mut payload: Payload = vec![
            ("generateSrc".into(), "false".into()),
            ("app".into(), self.app.clone()),
            ("destination".into(), self.destination.clone()),
            ("config".into(), self.config.as_str().into()),
        ];
        let optional = [
            ("version", &self.version),
            ("keypass", &self.keypass),
            ("certpass", &self.certpass),
            ("privateKeyPass", &self.private_key_pass),
            ("deviceType", &self.device_type),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                payload.push((key.to_string(), v.clone()));
            }
        }
        if let Some(git_ref) = &self.git_ref {
            payload.push(("gitRef".into(), git_ref.to_value().to_string()));
        }
        payload.extend(self.extra.clone().into_payload());
        payload
    }
}

pub fn is_apple_destination(destination: &str) -> bool {
    APPLE_DESTINATIONS.contains(&destination)
}

/// Artefacto descargado: de dónde vino y dónde quedó escrito.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub url: String,
    pub file: PathBuf,
}

impl DownloadResult {
    pub fn to_value(&self) -> Value {
        json!({ "url": self.url, "file": self.file.display().to_string() })
    }
}

// --- SALIDA DE COMANDOS ---

/// Lo que devuelve cualquier comando al terminar con éxito.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub data: Value,
    /// Mensaje legible adicional (p. ej. la URL de descarga).
    pub message: Option<String>,
}

impl CommandOutput {
    pub fn data(data: Value) -> Self {
        Self { data, message: None }
    }
}
