// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "fhc: cliente de línea de comandos para el servicio de compilación de apps.", long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Archivo de configuración alternativo (por defecto, `<config_dir>/fhc/config.toml`).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Límite de tiempo total para el comando, en segundos.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directorio donde se guardan los artefactos descargados.
    #[arg(long, value_name = "DIR", default_value = "./")]
    pub download_dir: PathBuf,

    /// Ruta del comando seguida de sus argumentos `clave=valor`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
