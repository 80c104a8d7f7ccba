// src/core/graph_display.rs

use crate::core::registry::{CommandNode, CommandRegistry};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Muestra un árbol ASCII con todos los comandos disponibles.
pub fn display_command_tree(registry: &CommandRegistry) {
    println!("\nComandos disponibles:");
    print!("{}", render_tree(registry.children()));
}

/// Renderiza un (sub)árbol de comandos. Las hojas llevan su descripción.
pub fn render_tree(nodes: &BTreeMap<String, CommandNode>) -> String {
    let mut out = String::new();
    let count = nodes.len();
    for (i, node) in nodes.values().enumerate() {
        render_node(&mut out, node, "", i == count - 1);
    }
    out
}

/// Función recursiva para un nodo y sus descendientes.
fn render_node(out: &mut String, node: &CommandNode, prefix: &str, is_last: bool) {
    let connector = if is_last { "└─" } else { "├─" };

    match node {
        CommandNode::Leaf(leaf) => {
            let _ = writeln!(out, "{}{}{}  {}", prefix, connector, leaf.name, leaf.describe());
        }
        CommandNode::Group { name, children } => {
            let _ = writeln!(out, "{}{}{}", prefix, connector, name);

            let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
            let count = children.len();
            for (i, child) in children.values().enumerate() {
                render_node(out, child, &child_prefix, i == count - 1);
            }
        }
    }
}
