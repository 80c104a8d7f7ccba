// src/core/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::constants::HIDDEN_MARKERS;
use crate::core::command::{
    CommandDef, CommandDefinition, CommandError, CommandHandler, Context, CustomCommand,
};
use crate::core::generic_command;
use crate::models::{CommandArgs, CommandOutput};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No se pudo construir el árbol de comandos en '{path}': {reason}")]
    Traversal { path: String, reason: String },
    #[error("Comando desconocido '{0}'")]
    CommandNotFound(String),
    #[error("'{path}' es un grupo de comandos. Subcomandos disponibles: {}", .children.join(", "))]
    GroupNotInvocable { path: String, children: Vec<String> },
}

type RegistryResult<T> = Result<T, RegistryError>;

/// Hoja invocable del árbol.
pub struct Leaf {
    pub name: String,
    pub path: String,
    handler: Box<dyn CommandHandler>,
}

impl Leaf {
    pub fn describe(&self) -> &'static str {
        self.handler.describe()
    }

    pub async fn invoke(&self, ctx: &Context<'_>, args: CommandArgs) -> Result<CommandOutput, CommandError> {
        log::debug!("Invocando '{}'", self.path);
        self.handler.invoke(ctx, args).await
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum CommandNode {
    Group {
        name: String,
        children: BTreeMap<String, CommandNode>,
    },
    Leaf(Leaf),
}

/// Árbol de comandos construido una sola vez al arrancar. Inmutable después.
#[derive(Debug)]
pub struct CommandRegistry {
    root: BTreeMap<String, CommandNode>,
}

impl CommandRegistry {
    /// Recorre las definiciones y coloca cada una en su ruta.
    /// Las entradas ocultas se omiten. Si dos definiciones caen en la misma ruta, gana la última.
    pub fn build(definitions: &'static [CommandDefinition]) -> RegistryResult<Self> {
        let mut root = BTreeMap::new();

        for definition in definitions {
            let segments: Vec<&str> = definition.path.split('/').collect();
            if segments.iter().any(|s| is_hidden(s)) {
                log::debug!("Omitiendo entrada oculta '{}'", definition.path);
                continue;
            }
            if let Some(bad) = segments.iter().find(|s| !is_valid_segment(s)) {
                return Err(RegistryError::Traversal {
                    path: definition.path.to_string(),
                    reason: format!("segmento inválido '{}'", bad),
                });
            }

            let leaf = make_leaf(definition, &segments);
            insert(&mut root, definition.path, &segments, leaf)?;
        }

        Ok(Self { root })
    }

    pub fn children(&self) -> &BTreeMap<String, CommandNode> {
        &self.root
    }

    /// Recorre el árbol con los tokens iniciales que no son `clave=valor`.
    /// Devuelve la hoja y los tokens restantes (sus argumentos).
    pub fn resolve<'t>(&self, tokens: &'t [String]) -> RegistryResult<(&Leaf, &'t [String])> {
        let mut children = &self.root;
        let mut walked: Vec<&str> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if token.contains('=') {
                break;
            }
            walked.push(token);
            match children.get(token.as_str()) {
                Some(CommandNode::Leaf(leaf)) => return Ok((leaf, &tokens[i + 1..])),
                Some(CommandNode::Group { children: next, .. }) => children = next,
                None => return Err(RegistryError::CommandNotFound(walked.join(" "))),
            }
        }

        Err(RegistryError::GroupNotInvocable {
            path: walked.join(" "),
            children: children.keys().cloned().collect(),
        })
    }
}

fn is_hidden(segment: &str) -> bool {
    segment.starts_with(HIDDEN_MARKERS)
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('.') && !segment.chars().any(char::is_whitespace)
}

/// Resuelve la definición a la interfaz uniforme. Las declarativas pasan por el adaptador genérico.
fn make_leaf(definition: &'static CommandDefinition, segments: &[&str]) -> Leaf {
    let name = segments.last().copied().unwrap_or_default().to_string();
    let handler: Box<dyn CommandHandler> = match &definition.def {
        CommandDef::Declarative(descriptor) => {
            Box::new(generic_command::adapt(definition.path, &name, descriptor))
        }
        CommandDef::Custom(handler) => Box::new(CustomCommand(*handler)),
    };
    Leaf {
        name,
        path: definition.path.to_string(),
        handler,
    }
}

fn insert(
    root: &mut BTreeMap<String, CommandNode>,
    path: &str,
    segments: &[&str],
    leaf: Leaf,
) -> RegistryResult<()> {
    let traversal = |reason: &str| RegistryError::Traversal {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| traversal("ruta vacía"))?;

    let mut children = root;
    for segment in parents {
        let node = children
            .entry(segment.to_string())
            .or_insert_with(|| CommandNode::Group {
                name: segment.to_string(),
                children: BTreeMap::new(),
            });
        children = match node {
            CommandNode::Group { children, .. } => children,
            CommandNode::Leaf(_) => return Err(traversal("la ruta atraviesa un comando")),
        };
    }

    match children.get(*last) {
        Some(CommandNode::Group { .. }) => return Err(traversal("ya existe un grupo con ese nombre")),
        Some(CommandNode::Leaf(_)) => {
            log::warn!("Definición duplicada para '{}': se usa la última", path)
        }
        None => {}
    }
    children.insert(last.to_string(), CommandNode::Leaf(leaf));
    Ok(())
}
