//! Simple decoder to inspect serialized value-graph files.

use std::fs;

use xjson::{parse, DecodeOptions, Node, NodeId, ValueGraph};

fn format_node(graph: &ValueGraph, id: NodeId) -> String {
    let Some(node) = graph.node(id) else {
        return format!("<dangling #{}>", id);
    };
    match node {
        Node::String(s) => {
            let preview: String = s.chars().take(60).collect();
            if s.len() > 60 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Node::Number(n) => format!("{}", n),
        Node::Bool(b) => format!("{}", b),
        Node::BigInt(big) => format!("{}n", big),
        Node::Date { epoch_ms } => format!("Date({})", xjson::util::format_instant(*epoch_ms)),
        Node::RegExp { source, flags } => format!("/{}/{}", source, flags),
        Node::Buffer(bytes) => format!("Buffer({} bytes)", bytes.len()),
        Node::ArrayBuffer(bytes) => format!("ArrayBuffer({} bytes)", bytes.len()),
        Node::TypedArray { kind, bytes } => format!(
            "{}({} elements)",
            kind.name(),
            bytes.len() / kind.bytes_per_element()
        ),
        Node::DataView { bytes } => format!("DataView({} bytes)", bytes.len()),
        Node::Array(slots) => format!("array[{}]", slots.len()),
        Node::Object(members) => format!("object{{{}}}", members.len()),
        Node::Set(members) => format!("Set({})", members.len()),
        Node::Map(entries) => format!("Map({})", entries.len()),
        Node::Error(error) => format!(
            "Error({}: {})",
            error.name.as_deref().unwrap_or("Error"),
            error.message.as_deref().unwrap_or("")
        ),
        other => other.kind_name().to_string(),
    }
}

fn print_tree(graph: &ValueGraph, id: NodeId, indent: usize, seen: &mut Vec<NodeId>) {
    let pad = "  ".repeat(indent);
    if seen.contains(&id) {
        println!("{}<cycle back to #{}>", pad, id);
        return;
    }
    seen.push(id);
    println!("{}{}", pad, format_node(graph, id));
    match graph.node(id) {
        Some(Node::Array(slots)) => {
            for slot in slots {
                print_tree(graph, *slot, indent + 1, seen);
            }
        }
        Some(Node::Object(members)) => {
            for (_, value) in members {
                print_tree(graph, *value, indent + 1, seen);
            }
        }
        Some(Node::Set(members)) => {
            for member in members {
                print_tree(graph, *member, indent + 1, seen);
            }
        }
        Some(Node::Map(entries)) => {
            for (key, value) in entries {
                print_tree(graph, *key, indent + 1, seen);
                print_tree(graph, *value, indent + 1, seen);
            }
        }
        _ => {}
    }
    seen.pop();
}

fn main() {
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: inspect <file>");
            std::process::exit(2);
        }
    };

    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read {}: {}", path, err);
            std::process::exit(1);
        }
    };

    match parse(&text, DecodeOptions::new()) {
        Ok(graph) => {
            println!("{} nodes", graph.len());
            let mut seen = Vec::new();
            print_tree(&graph, graph.root(), 0, &mut seen);
        }
        Err(err) => {
            eprintln!("decode failed: {}", err);
            std::process::exit(1);
        }
    }
}
