use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use canopy_core::format::{tana, to_outline_markdown, Flavor};
use canopy_core::graph::integrity;
use canopy_core::models::{Checkbox, Clock, CurrentView, NodeId, NodeView, SystemClock};
use canopy_core::storage::{Database, SaveFile, SaveFileStore, SettingsRepository};
use canopy_core::tree::{build_tree, TreeNode};
use canopy_core::{EngineConfig, Outline};

pub struct Paths {
    pub file: PathBuf,
    pub config: PathBuf,
    pub settings: PathBuf,
}

fn open(paths: &Paths) -> Result<(SaveFileStore, Outline)> {
    let config = EngineConfig::load_or_create(&paths.config)
        .with_context(|| format!("could not read config {}", paths.config.display()))?;
    let store = SaveFileStore::new(&paths.file);
    let file = store
        .load()
        .with_context(|| format!("file could not be loaded: {}", paths.file.display()))?;
    let outline = Outline::from_save(&file, config, SystemClock)?;
    Ok((store, outline))
}

fn node_view(outline: &Outline, node: Option<&str>) -> Result<NodeView> {
    match node {
        Some(raw) => {
            let id = NodeId::new(raw);
            outline.graph().node(&id).with_context(|| format!("no node {raw}"))?;
            Ok(NodeView::root(id))
        }
        None => Ok(NodeView::root(outline.graph().root()?)),
    }
}

pub fn init(paths: &Paths) -> Result<()> {
    EngineConfig::load_or_create(&paths.config)?;
    Database::new(&paths.settings).get_or_create()?;
    let store = SaveFileStore::new(&paths.file);
    let existed = store.exists();
    store.read_or_create(SystemClock.now())?;
    if existed {
        println!("{} already exists", paths.file.display());
    } else {
        println!("Created {}", paths.file.display());
    }
    Ok(())
}

pub fn check(paths: &Paths) -> Result<()> {
    let store = SaveFileStore::new(&paths.file);
    let file = store
        .load()
        .with_context(|| format!("file could not be loaded: {}", paths.file.display()))?;
    let graph = canopy_core::Graph::from_parts(file.nodes.iter().cloned(), file.tags.iter().cloned());

    let violations = integrity::check(&graph);
    let hard = violations.iter().filter(|v| !v.is_soft()).count();
    for violation in &violations {
        let level = if violation.is_soft() { "warning" } else { "error" };
        println!("{level}: {violation}");
    }
    if hard > 0 {
        bail!("{hard} integrity violation(s) in {}", paths.file.display());
    }
    println!("{} docs, {} tags, ok", graph.len(), graph.tags().count());
    Ok(())
}

pub fn migrate(paths: &Paths, backup: bool) -> Result<()> {
    let store = SaveFileStore::new(&paths.file);
    if backup {
        let target = paths.file.with_extension("json.bak");
        store.backup(&target)?;
        println!("Backed up to {}", target.display());
    }
    let from = store
        .migrate()
        .with_context(|| format!("file could not be loaded: {}", paths.file.display()))?;
    if from == canopy_core::storage::CURRENT_VERSION {
        println!("Already at version {from}");
    } else {
        println!("Migrated from version {from} to {}", canopy_core::storage::CURRENT_VERSION);
    }
    Ok(())
}

fn print_tree(tree: &TreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match tree {
        TreeNode::Node {
            id,
            title,
            checkbox,
            children,
            ..
        } => {
            let marker = match checkbox {
                Some(Checkbox::Unchecked) => "[ ] ",
                Some(Checkbox::Indeterminate) => "[/] ",
                Some(Checkbox::Checked) => "[x] ",
                None => "",
            };
            let id = id.as_ref().map(|id| id.to_string()).unwrap_or_default();
            println!("{indent}{marker}{title}  ({id})");
            for child in children {
                print_tree(child, depth + 1);
            }
        }
        TreeNode::Property { field_id, children, .. } => {
            println!("{indent}property of field {field_id}");
            for child in children {
                print_tree(child, depth + 1);
            }
        }
        TreeNode::Field { id, title } => {
            let id = id.as_ref().map(|id| id.to_string()).unwrap_or_default();
            println!("{indent}field {title}  ({id})");
        }
        TreeNode::NodeLink { id, .. } => println!("{indent}-> {id}"),
    }
}

pub fn dump(paths: &Paths, json: bool) -> Result<()> {
    let (_, outline) = open(paths)?;
    let tree = build_tree(outline.graph())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print_tree(&tree, 0);
    }
    Ok(())
}

pub fn export(paths: &Paths, node: Option<&str>, flavor: Option<Flavor>) -> Result<()> {
    let (_, outline) = open(paths)?;
    let view = node_view(&outline, node)?;
    let node_id = outline.graph().node_id(view.node_id())?;
    let flavor = flavor.unwrap_or(outline.config().markdown_flavor);
    print!("{}", to_outline_markdown(outline.graph(), &node_id, flavor)?);
    Ok(())
}

pub fn import_logseq(paths: &Paths, path: &Path, under: Option<&str>) -> Result<()> {
    let (store, mut outline) = open(paths)?;
    if path.is_dir() {
        let holder = outline.import_logseq_dir(path)?;
        println!("Imported {} into node {holder}", path.display());
    } else {
        let text = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
        let parent = node_view(&outline, under)?;
        let inserted = outline.import_logseq(&parent, &text)?;
        println!("Imported {} top-level blocks", inserted.len());
    }
    store.save(&outline.to_save())?;
    Ok(())
}

pub fn import_tana(paths: &Paths, path: &Path, force: bool) -> Result<()> {
    let store = SaveFileStore::new(&paths.file);
    if store.exists() && !force {
        bail!("{} already exists; pass --force to replace it", paths.file.display());
    }
    let config = EngineConfig::load_or_create(&paths.config)?;
    let json = fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
    let graph = tana::import(&json, &config.import_root_title, SystemClock.now())
        .with_context(|| format!("could not import {}", path.display()))?;
    let root = graph.root()?;
    store.save(&SaveFile::from_graph(&graph, Some(CurrentView::Node { node_id: root }), false))?;
    println!("Imported {} docs into {}", graph.len(), paths.file.display());
    Ok(())
}

pub fn setting_get(paths: &Paths, key: &str) -> Result<()> {
    let conn = Database::new(&paths.settings).get_or_create()?;
    match SettingsRepository::get(&conn, key)? {
        Some(value) => println!("{value}"),
        None => bail!("setting {key} is not set"),
    }
    Ok(())
}

pub fn setting_set(paths: &Paths, key: &str, raw: &str) -> Result<()> {
    let conn = Database::new(&paths.settings).get_or_create()?;
    let value: Value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    SettingsRepository::set(&conn, key, &value, SystemClock.now())?;
    Ok(())
}

pub fn setting_delete(paths: &Paths, key: &str) -> Result<()> {
    let conn = Database::new(&paths.settings).get_or_create()?;
    if !SettingsRepository::delete(&conn, key)? {
        bail!("setting {key} is not set");
    }
    Ok(())
}

pub fn setting_list(paths: &Paths) -> Result<()> {
    let conn = Database::new(&paths.settings).get_or_create()?;
    for setting in SettingsRepository::all(&conn)? {
        println!("{} = {}", setting.key, setting.value);
    }
    Ok(())
}
