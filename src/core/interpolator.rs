// src/core/interpolator.rs

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::core::args::ValidationError;
use crate::models::{CommandArgs, Session};

/// Caracteres que no pueden ir literales dentro de un único segmento de ruta.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Token reservado que se resuelve desde la sesión si no llega como argumento.
const DOMAIN_TOKEN: &str = "domain";

/// Sustituye las variables `{nombre}` de una plantilla de ruta remota.
pub struct Interpolator<'a> {
    session: &'a Session,
}

impl<'a> Interpolator<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Interpola la plantilla consumiendo de `args` cada argumento usado en la ruta,
    /// de modo que no viaje también en el payload.
    pub fn interpolate(&self, template: &str, args: &mut CommandArgs) -> Result<String, ValidationError> {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let token = &rest[start + 1..start + len];
            result.push_str(&rest[..start]);
            result.push_str(&self.resolve_token(token, args)?);
            rest = &rest[start + len + 1..];
        }
        result.push_str(rest);

        log::debug!("Ruta '{}' interpolada como '{}'", template, result);
        Ok(result)
    }

    fn resolve_token(&self, token: &str, args: &mut CommandArgs) -> Result<String, ValidationError> {
        let value = match args.take_text(token) {
            Some(value) => value,
            None if token == DOMAIN_TOKEN => self.session.domain.clone(),
            None => return Err(ValidationError::missing(token)),
        };
        encode_segment(token, &value)
    }
}

/// Codifica un valor para que ocupe exactamente un segmento de la ruta.
fn encode_segment(token: &str, value: &str) -> Result<String, ValidationError> {
    if value == "." || value == ".." {
        return Err(ValidationError::InvalidValue {
            name: token.to_string(),
            value: value.to_string(),
            expected: "un identificador, no un segmento relativo".to_string(),
        });
    }
    Ok(utf8_percent_encode(value, SEGMENT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_consumed_and_domain_comes_from_session() {
        let session = Session {
            domain: "acme".into(),
            ..Default::default()
        };
        let mut args: CommandArgs = [("id", "1a"), ("label", "Dev")].into_iter().collect();

        let path = Interpolator::new(&session)
            .interpolate("box/{domain}/aliases/{id}", &mut args)
            .unwrap();

        assert_eq!(path, "box/acme/aliases/1a");
        assert!(!args.contains("id"));
        assert!(args.contains("label"));
    }

    #[test]
    fn unresolved_token_is_a_missing_parameter() {
        let session = Session::default();
        let err = Interpolator::new(&session)
            .interpolate("api/{id}", &mut CommandArgs::new())
            .unwrap_err();
        assert_eq!(err, ValidationError::missing("id"));
    }

    #[test]
    fn values_cannot_escape_their_segment() {
        let session = Session::default();
        let mut args: CommandArgs = [("id", "../../box/srv/1.1/x y")].into_iter().collect();

        let path = Interpolator::new(&session)
            .interpolate("api/v2/environments/aliases/{id}", &mut args)
            .unwrap();

        assert_eq!(path, "api/v2/environments/aliases/..%2F..%2Fbox%2Fsrv%2F1.1%2Fx%20y");
        let joined = url::Url::parse("https://host/").unwrap().join(&path).unwrap();
        assert!(joined.path().starts_with("/api/v2/environments/aliases/"));
    }

    #[test]
    fn relative_segments_are_rejected() {
        let session = Session::default();
        for value in [".", ".."] {
            let mut args: CommandArgs = [("id", value)].into_iter().collect();
            let err = Interpolator::new(&session)
                .interpolate("api/{id}", &mut args)
                .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidValue { ref name, .. } if name == "id"));
        }
    }

    #[test]
    fn template_without_tokens_is_unchanged() {
        let session = Session::default();
        let path = Interpolator::new(&session)
            .interpolate("api/v2/environments/aliases", &mut CommandArgs::new())
            .unwrap();
        assert_eq!(path, "api/v2/environments/aliases");
    }
}
