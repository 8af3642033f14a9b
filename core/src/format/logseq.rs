//! Logseq-flavoured markdown outlines.
//!
//! Parsing never fails loudly: malformed text yields `None` and callers fall
//! back to treating the input as plain text.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Local, NaiveDateTime, TimeZone};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::graph::Graph;
use crate::models::{
    datetime_to_timestamp, timestamp_to_local, Checkbox, CheckboxEntry, DocId, History, NodeId,
    Timestamp,
};
use crate::tree::{flatten_into, TreeNode};
use crate::{Error, Result};

/// Date format inside `CLOCK:` brackets, e.g. `2025-05-26 Mon 21:31:52`.
pub const CLOCK_FORMAT: &str = "%Y-%m-%d %a %H:%M:%S";

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ \t]*)-(?:[ \t]+(.*))?$").expect("static pattern"))
}

fn property_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_-]+)::[ \t]*(.*)$").expect("static pattern"))
}

fn clock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^CLOCK:\s*\[([^\]]+)\](?:\s*--\s*\[([^\]]+)\])?(?:\s*=>\s*[0-9:]+)?$")
            .expect("static pattern")
    })
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}[ \t]+(.*)$").expect("static pattern"))
}

fn block_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(\(([^()\s]+)\)\)$").expect("static pattern"))
}

/// Parse a `CLOCK:` timestamp in local time.
pub fn parse_clock_time(text: &str) -> Option<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), CLOCK_FORMAT).ok()?;
    let local = Local.from_local_datetime(&naive).earliest()?;
    Some(datetime_to_timestamp(&local))
}

pub fn format_clock_time(timestamp: Timestamp) -> String {
    timestamp_to_local(timestamp).format(CLOCK_FORMAT).to_string()
}

/// Split a task keyword off a title.
fn split_task(title: &str) -> (Option<Checkbox>, &str) {
    for (keyword, state) in [
        ("TODO ", Checkbox::Unchecked),
        ("DOING ", Checkbox::Indeterminate),
        ("DONE ", Checkbox::Checked),
    ] {
        if let Some(rest) = title.strip_prefix(keyword) {
            return (Some(state), rest);
        }
    }
    (None, title)
}

/// One bullet being assembled.
struct Block {
    level: usize,
    id: Option<String>,
    title: String,
    checkbox: Option<Checkbox>,
    expanded: Option<bool>,
    link: bool,
    clocks: Vec<(Timestamp, Option<Timestamp>)>,
    children: Vec<TreeNode>,
}

impl Block {
    fn new(level: usize, raw_title: &str) -> Self {
        let raw_title = raw_title.trim_end();
        if let Some(caps) = block_ref_re().captures(raw_title) {
            return Self {
                level,
                id: Some(caps[1].to_string()),
                title: String::new(),
                checkbox: None,
                expanded: None,
                link: true,
                clocks: Vec::new(),
                children: Vec::new(),
            };
        }
        let (title, heading) = match heading_re().captures(raw_title) {
            Some(caps) => (caps[1].to_string(), true),
            None => (raw_title.to_string(), false),
        };
        let (checkbox, title) = split_task(&title);
        let title = if heading && !title.is_empty() {
            format!("**{title}**")
        } else {
            title.to_string()
        };
        Self {
            level,
            id: None,
            title,
            checkbox,
            expanded: Some(true),
            link: false,
            clocks: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Rebuild a checkbox log from clock entries, most recent first.
    ///
    /// Each clock opens with an indeterminate transition. It closes into
    /// unchecked, except the last one, which closes into the current state.
    fn history(&mut self) -> Option<History> {
        if self.clocks.is_empty() {
            return None;
        }
        self.clocks.sort_by_key(|(start, _)| *start);
        let last = self.clocks.len() - 1;
        let mut log = Vec::with_capacity(self.clocks.len() * 2);
        for (index, (start, end)) in self.clocks.iter().enumerate() {
            log.push(CheckboxEntry(*start, Some(Checkbox::Indeterminate)));
            if let Some(end) = end {
                let next = if index == last {
                    self.checkbox
                } else {
                    Some(Checkbox::Unchecked)
                };
                log.push(CheckboxEntry(*end, next));
            }
        }
        let created = log.iter().map(CheckboxEntry::at).min()?;
        let modified = log.iter().map(CheckboxEntry::at).max()?;
        log.reverse();
        Some(History {
            created_time: created,
            last_modified_time: modified,
            checkbox: log,
        })
    }

    fn into_tree(mut self) -> TreeNode {
        if self.link {
            return TreeNode::NodeLink {
                id: DocId::new(self.id.unwrap_or_default()),
                expanded: self.expanded,
            };
        }
        let history = self.history();
        TreeNode::Node {
            id: self.id.map(NodeId::new),
            title: self.title,
            checkbox: self.checkbox,
            expanded: self.expanded,
            history,
            tags: Vec::new(),
            children: self.children,
        }
    }
}

/// Attach the top of the stack to its parent, or to the result list.
fn pop_into(stack: &mut Vec<Block>, roots: &mut Vec<TreeNode>) {
    if let Some(block) = stack.pop() {
        let tree = block.into_tree();
        match stack.last_mut() {
            Some(parent) => parent.children.push(tree),
            None => roots.push(tree),
        }
    }
}

/// Parse a Logseq outline into trees. `None` means "not an outline".
pub fn parse(text: &str) -> Option<Vec<TreeNode>> {
    let mut roots = Vec::new();
    let mut stack: Vec<Block> = Vec::new();
    let mut in_logbook = false;

    for line in text.lines() {
        if let Some(caps) = bullet_re().captures(line) {
            if in_logbook {
                return None;
            }
            let level = caps.get(1).map_or(0, |m| m.as_str().len());
            let title = caps.get(2).map_or("", |m| m.as_str());
            while stack.last().is_some_and(|top| top.level >= level) {
                pop_into(&mut stack, &mut roots);
            }
            stack.push(Block::new(level, title));
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(block) = stack.last_mut() else {
            // Page properties may precede the first bullet.
            if property_re().is_match(trimmed) {
                continue;
            }
            return None;
        };

        if in_logbook {
            if trimmed.eq_ignore_ascii_case(":END:") {
                in_logbook = false;
                continue;
            }
            let caps = clock_re().captures(trimmed)?;
            let start = parse_clock_time(&caps[1])?;
            let end = match caps.get(2) {
                Some(end) => Some(parse_clock_time(end.as_str())?),
                None => None,
            };
            block.clocks.push((start, end));
            continue;
        }
        if trimmed.eq_ignore_ascii_case(":LOGBOOK:") {
            in_logbook = true;
            continue;
        }
        let caps = property_re().captures(trimmed)?;
        match (caps[1].to_ascii_lowercase().as_str(), caps[2].trim()) {
            ("id", value) if !value.is_empty() => block.id = Some(value.to_string()),
            ("collapsed", value) => {
                if value.eq_ignore_ascii_case("true") {
                    block.expanded = Some(false);
                }
            }
            _ => {}
        }
    }

    if in_logbook || stack.is_empty() {
        return None;
    }
    while !stack.is_empty() {
        pop_into(&mut stack, &mut roots);
    }
    Some(roots)
}

/// One text node per non-empty line.
pub fn plain_lines(text: &str) -> Vec<TreeNode> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(TreeNode::text)
        .collect()
}

/// Trees for arbitrary text: a Logseq outline when it parses, otherwise one
/// node per non-empty line.
pub fn parse_or_lines(text: &str) -> Vec<TreeNode> {
    parse(text).unwrap_or_else(|| plain_lines(text))
}

/// Import every `*.md` file under `dir` as a page node below `parent_id`.
///
/// Hidden directories and Logseq's own `logseq/` folder are skipped. Returns
/// the created page ids in file-name order.
pub fn import_dir(graph: &mut Graph, dir: &Path, parent_id: &DocId, now: Timestamp) -> Result<Vec<NodeId>> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!("{} is not a directory", dir.display())));
    }
    let mut files: Vec<_> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name.starts_with('.') || (entry.file_type().is_dir() && name == "logseq"))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(b.file_name()));

    let mut pages = Vec::with_capacity(files.len());
    for entry in files {
        let text = std::fs::read_to_string(entry.path())?;
        let title = entry
            .path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().replace("___", "/"))
            .unwrap_or_default();
        let trees = parse_or_lines(&text);
        let page = graph.create_node(&title, parent_id, usize::MAX, None, now)?;
        flatten_into(graph, &trees, &page.to_doc(), 0, now)?;
        debug!(page = %title, blocks = trees.len(), "imported logseq page");
        pages.push(page);
    }
    Ok(pages)
}
