// src/bin/fhc.rs

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use std::time::Duration;

use fhc::cli::Cli;
use fhc::config;
use fhc::core::args::parse_args;
use fhc::core::catalogue;
use fhc::core::command::Context;
use fhc::core::downloader::HttpDownloader;
use fhc::core::graph_display;
use fhc::core::registry::RegistryError;
use fhc::models::CommandOutput;
use fhc::system::api::HttpApi;

/// El punto de entrada principal de la aplicación.
#[tokio::main]
async fn main() {
    // Para ver los logs, ejecuta con `RUST_LOG=debug fhc ...`
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run_cli(cli).await {
        eprintln!("\nError: {:?}", e);
        std::process::exit(1);
    }
}

/// El despachador principal de la aplicación.
async fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let registry = catalogue::registry().context("El catálogo de comandos es inválido.")?;

    let (leaf, rest) = match registry.resolve(&cli.args) {
        Ok(found) => found,
        // Sin comando: se muestra el árbol completo.
        Err(RegistryError::GroupNotInvocable { path, .. }) if path.is_empty() => {
            graph_display::display_command_tree(&registry);
            return Ok(());
        }
        Err(RegistryError::GroupNotInvocable { path, children }) => {
            println!("\n'{}' agrupa los siguientes comandos:", path);
            for child in children {
                println!("  - {} {}", path, child);
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let session = config::load_session(cli.config.as_deref()).context("No se pudo cargar la configuración.")?;
    let args = parse_args(rest)?;

    let api = HttpApi::new(&session).context("No se pudo crear el cliente HTTP.")?;
    let downloader = HttpDownloader::new().context("No se pudo crear el cliente de descargas.")?;
    let ctx = Context {
        session: &session,
        api: &api,
        downloader: &downloader,
        download_dir: cli.download_dir,
    };

    log::info!("Ejecutando '{}'", leaf.path);
    let invocation = leaf.invoke(&ctx, args);
    let output = match cli.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), invocation)
            .await
            .map_err(|_| anyhow!("El comando '{}' superó el límite de {} s.", leaf.path, secs))??,
        None => invocation.await?,
    };

    print_output(&output)
}

fn print_output(output: &CommandOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&output.data)?);
    if let Some(message) = &output.message {
        println!("{}", message);
    }
    Ok(())
}
