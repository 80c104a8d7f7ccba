// src/constants.rs

/// Nombre del directorio de configuración de fhc (dentro de `dirs::config_dir()`).
pub const CONFIG_DIR_NAME: &str = "fhc";

/// Nombre del archivo de configuración/sesión.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Host por defecto del servicio de compilación.
pub const DEFAULT_FEEDHENRY: &str = "https://apps.feedhenry.com";

/// Dominio (objetivo actual) por defecto.
pub const DEFAULT_DOMAIN: &str = "apps";

/// Versión de plataforma asumida si la configuración no dice otra cosa.
pub const DEFAULT_FHVERSION: u32 = 2;

/// A partir de esta versión de plataforma se usa el modo extendido (proyectos, cloud apps, tags).
pub const EXTENDED_FHVERSION: u32 = 3;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 600;

/// Variables de entorno que sobrescriben la configuración en disco.
pub const ENV_FEEDHENRY: &str = "FHC_FEEDHENRY";
pub const ENV_DOMAIN: &str = "FHC_DOMAIN";

// --- Rutas de la API remota ---

/// Espacio de nombres fijo para la entrega de compilaciones: `{ns}/{dominio}/{destino}/{app}/deliver`.
pub const DELIVER_NAMESPACE: &str = "box/srv/1.1/wid";

pub const PROVISIONING_UPLOAD_PATH: &str = "/box/srv/1.1/dev/account/res/upload";

/// Lectura del log de un trabajo asíncrono (usado para esperar una clave de caché).
pub const JOB_LOG_PATH: &str = "box/srv/1.1/dat/log/read";

pub const VERSION_PATH: &str = "box/srv/1.1/tst/version";

/// Cabecera con la que se envía la clave de API, si está configurada.
pub const API_KEY_HEADER: &str = "X-FH-AUTH-USER";

// --- Reglas de compilación ---

pub const APPLE_DESTINATIONS: &[&str] = &["iphone", "ipad", "ios"];
pub const ANDROID_DEFAULT_VERSION: &str = "4.0";
pub const APPLE_DEFAULT_VERSION: &str = "6.0";

/// Parámetros obligatorios adicionales en modo extendido, en orden de comprobación.
pub const EXTENDED_REQUIRED_PARAMS: &[&str] = &["project", "cloud_app", "tag"];

/// Prefijos que marcan una entrada del catálogo como oculta.
pub const HIDDEN_MARKERS: &[char] = &['.', '_'];
