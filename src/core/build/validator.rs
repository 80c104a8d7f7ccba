// src/core/build/validator.rs

use std::path::PathBuf;

use crate::constants::{ANDROID_DEFAULT_VERSION, APPLE_DEFAULT_VERSION, EXTENDED_REQUIRED_PARAMS};
use crate::core::args::ValidationError;
use crate::models::{BuildRequest, CommandArgs, ConfigTier, GitRef, Session, is_apple_destination};

/// Aplica las reglas de compilación sobre los argumentos y produce la petición validada.
/// Es pura respecto al exterior: solo lee la sesión (alias y modo).
pub fn validate(mut args: CommandArgs, session: &Session) -> Result<BuildRequest, ValidationError> {
    // 1. app, resolviendo alias
    let app = args
        .take_text("app")
        .map(|app| session.app_id(&app))
        .filter(|app| !app.is_empty())
        .ok_or_else(|| ValidationError::missing("app"))?;

    // 2. destino
    let destination = args
        .take_text("destination")
        .ok_or_else(|| ValidationError::missing("destination"))?;

    // 3. configuración, `debug` por defecto
    let config = match args.take_text("config") {
        Some(name) => ConfigTier::from_name(&name).ok_or_else(|| ValidationError::InvalidValue {
            name: "config".to_string(),
            value: name.clone(),
            expected: ConfigTier::NAMES.join(", "),
        })?,
        None => ConfigTier::Debug,
    };

    // 4. credenciales de firma
    let keypass = args.take_text("keypass");
    let certpass = args.take_text("certpass");
    let private_key_pass = if config.requires_signing() {
        let keypass = keypass.clone().ok_or_else(|| ValidationError::missing("keypass"))?;
        if certpass.is_none() {
            return Err(ValidationError::missing("certpass"));
        }
        Some(keypass)
    } else {
        None
    };

    // 5. tipo de dispositivo para destinos Apple
    let device_type = is_apple_destination(&destination).then(|| destination.clone());

    // 6. versión por defecto según destino
    let version = args
        .take_text("version")
        .or_else(|| default_version(&destination).map(str::to_string));

    // 7. modo extendido
    if session.is_extended()
        && let Some(missing) = EXTENDED_REQUIRED_PARAMS.iter().find(|name| !args.contains(name))
    {
        return Err(ValidationError::missing(missing));
    }

    // 8. rama/commit -> gitRef
    let git_ref = fold_git_ref(&mut args)?;

    let provisioning = args.take_text("provisioning").map(PathBuf::from);
    let download = args.take_text("download").as_deref() == Some("true");

    Ok(BuildRequest {
        app,
        destination,
        version,
        config,
        keypass,
        certpass,
        private_key_pass,
        device_type,
        provisioning,
        download,
        git_ref,
        extra: args,
    })
}

/// Versión de plataforma asumida cuando no se indica ninguna.
pub fn default_version(destination: &str) -> Option<&'static str> {
    match destination {
        "android" => Some(ANDROID_DEFAULT_VERSION),
        d if is_apple_destination(d) => Some(APPLE_DEFAULT_VERSION),
        _ => None,
    }
}

/// Convierte `branch`/`commit` en una única referencia git y elimina los campos crudos.
fn fold_git_ref(args: &mut CommandArgs) -> Result<Option<GitRef>, ValidationError> {
    let branch = args.take_text("branch");
    let commit = args.take_text("commit");
    args.remove("hash");

    match (branch, commit) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ValidationError::InvalidCombination(
            "commit requiere la rama correspondiente (branch)".to_string(),
        )),
        (Some(branch), hash) => Ok(Some(GitRef { branch, hash })),
    }
}
