//! Rendering nodes as markdown bullets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::logseq::format_clock_time;
use crate::graph::Graph;
use crate::models::{Checkbox, Doc, DocId, NodeId, TextNode};
use crate::{Error, Result};

/// Which markdown dialect to write task markers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    #[default]
    Logseq,
    Obsidian,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flavor::Logseq => f.write_str("logseq"),
            Flavor::Obsidian => f.write_str("obsidian"),
        }
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "logseq" => Ok(Flavor::Logseq),
            "obsidian" => Ok(Flavor::Obsidian),
            other => Err(Error::InvalidInput(format!("unknown markdown flavor: {other}"))),
        }
    }
}

fn task_marker(checkbox: Checkbox, flavor: Flavor) -> &'static str {
    match (flavor, checkbox) {
        (Flavor::Logseq, Checkbox::Unchecked) => "TODO ",
        (Flavor::Logseq, Checkbox::Indeterminate) => "DOING ",
        (Flavor::Logseq, Checkbox::Checked) => "DONE ",
        (Flavor::Obsidian, Checkbox::Unchecked) => "[ ] ",
        (Flavor::Obsidian, Checkbox::Indeterminate) => "[/] ",
        (Flavor::Obsidian, Checkbox::Checked) => "[x] ",
    }
}

/// `HH:MM:SS` with hours allowed past 24.
fn format_duration(millis: i64) -> String {
    let seconds = millis.max(0) / 1000;
    format!("{:02}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)
}

/// `CLOCK:` lines rebuilt from the checkbox log.
///
/// Walks the log oldest first; an indeterminate entry followed by any other
/// state closes one clock. A trailing indeterminate entry is an open clock.
fn clock_lines(node: &TextNode) -> Vec<String> {
    let mut lines = Vec::new();
    let mut open: Option<i64> = None;
    for entry in node.history.checkbox.iter().rev() {
        match (entry.state(), open) {
            (Some(Checkbox::Indeterminate), None) => open = Some(entry.at()),
            (Some(Checkbox::Indeterminate), Some(_)) => {}
            (_, Some(start)) => {
                lines.push(format!(
                    "CLOCK: [{}]--[{}] =>  {}",
                    format_clock_time(start),
                    format_clock_time(entry.at()),
                    format_duration(entry.at() - start)
                ));
                open = None;
            }
            (_, None) => {}
        }
    }
    if let Some(start) = open {
        lines.push(format!("CLOCK: [{}]", format_clock_time(start)));
    }
    lines
}

/// Render one node without its children: the title line, then any
/// continuation lines (the Logseq logbook).
pub fn to_markdown(node: &TextNode, flavor: Flavor) -> String {
    let mut out = String::new();
    if let Some(checkbox) = node.checkbox {
        out.push_str(task_marker(checkbox, flavor));
    }
    out.push_str(&node.title);
    if flavor == Flavor::Logseq {
        let clocks = clock_lines(node);
        if !clocks.is_empty() {
            out.push_str("\n:LOGBOOK:");
            for line in clocks {
                out.push('\n');
                out.push_str(&line);
            }
            out.push_str("\n:END:");
        }
    }
    out
}

/// Render a node and everything below it as an indented bullet list.
///
/// Content the node doesn't own is written as a `((id))` block reference
/// instead of being expanded. Property values become `field:: value` lines.
pub fn to_outline_markdown(graph: &Graph, node_id: &NodeId, flavor: Flavor) -> Result<String> {
    let mut out = String::new();
    write_node(graph, node_id, None, 0, flavor, &mut out)?;
    Ok(out)
}

fn push_block(out: &mut String, depth: usize, text: &str) {
    let indent = "  ".repeat(depth);
    for (index, line) in text.lines().enumerate() {
        out.push_str(&indent);
        out.push_str(if index == 0 { "- " } else { "  " });
        out.push_str(line);
        out.push('\n');
    }
}

fn push_continuation(out: &mut String, depth: usize, line: &str) {
    out.push_str(&"  ".repeat(depth));
    out.push_str("  ");
    out.push_str(line);
    out.push('\n');
}

fn write_node(
    graph: &Graph,
    node_id: &NodeId,
    expanded: Option<bool>,
    depth: usize,
    flavor: Flavor,
    out: &mut String,
) -> Result<()> {
    let node = graph.node(node_id)?;
    let doc_id = node_id.to_doc();
    push_block(out, depth, &to_markdown(node, flavor));

    if flavor == Flavor::Logseq {
        if !graph.links_to(&doc_id).is_empty() {
            push_continuation(out, depth, &format!("id:: {node_id}"));
        }
        if expanded == Some(false) && !node.content.is_empty() {
            push_continuation(out, depth, "collapsed:: true");
        }
    }

    for child in &node.content {
        let owned = graph.is_owning_ref(&doc_id, &child.node_id);
        match graph.doc(&child.node_id) {
            Ok(Doc::Node(_)) if owned => {
                write_node(graph, &child.node_id.retag(), child.expanded, depth + 1, flavor, out)?;
            }
            Ok(Doc::Property(property)) => {
                let field = graph.field(&property.field_id).map(|field| field.title.as_str());
                let values: Vec<&str> = property
                    .values()
                    .iter()
                    .map(|value| graph.lookup(&value.node_id).title())
                    .collect();
                push_continuation(
                    out,
                    depth,
                    &format!("{}:: {}", field.unwrap_or("property"), values.join(", ")),
                );
            }
            Ok(Doc::Field(_)) => {}
            _ => push_block(out, depth + 1, &block_ref(&child.node_id)),
        }
    }
    Ok(())
}

fn block_ref(id: &DocId) -> String {
    format!("(({id}))")
}
