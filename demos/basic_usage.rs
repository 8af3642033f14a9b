// Example: Basic usage of the canopy-core library
use std::fs;

use canopy_core::format::{to_outline_markdown, ClipboardContents, Flavor};
use canopy_core::graph::{integrity, Selection};
use canopy_core::models::SystemClock;
use canopy_core::storage::{Database, SaveFileStore, SettingsRepository};
use canopy_core::{EngineConfig, Outline};

fn main() -> anyhow::Result<()> {
    let save_path = "basic_usage_canopy.json";
    let db_path = "basic_usage_canopy.db";
    fs::remove_file(save_path).ok(); // Clean up previous run
    fs::remove_file(db_path).ok();

    println!("--- Basic Usage of canopy-core ---");

    // ========== Open a save file ==========
    println!("\n1. Creating a save file with demo content...");
    let store = SaveFileStore::new(save_path);
    let file = store.read_or_create(chrono::Utc::now().timestamp_millis())?;
    let mut outline = Outline::from_save(&file, EngineConfig::default(), SystemClock)?;
    println!("   ✓ {} docs loaded", outline.graph().len());

    // ========== Edit ==========
    println!("\n2. Editing...");
    let root = outline.zoom_root()?;
    let note = outline.add_child(&root, "Groceries: milk")?;
    let focus = outline.split(&note, Selection::collapsed(10))?;
    outline.set_title(&focus.view, "bread")?;
    outline.indent(&focus.view)?;
    outline.cycle_checkbox(&note)?;
    println!("   ✓ Split, indented and checked a node");

    let copied = outline.copy(&note)?;
    println!("   ✓ Clipboard text:\n{}", copied.text);

    outline.paste(&root, &ClipboardContents::plain("- pasted\n  - from text\n"))?;
    println!("   ✓ Pasted a Logseq outline");

    outline.undo();
    println!("   ✓ Undid the paste (can redo: {})", outline.can_redo());

    // ========== Save ==========
    println!("\n3. Saving...");
    integrity::validate(outline.graph())?;
    store.save(&outline.to_save())?;
    println!("   ✓ Saved to {save_path}");

    let root_id = outline.graph().root()?;
    println!(
        "\n{}",
        to_outline_markdown(outline.graph(), &root_id, Flavor::Obsidian)?
    );

    // ========== Settings ==========
    println!("4. Settings...");
    let db = Database::new(db_path);
    let conn = db.create()?;
    SettingsRepository::set_now(&conn, "last_opened", &save_path)?;
    println!(
        "   ✓ last_opened = {:?}",
        SettingsRepository::get(&conn, "last_opened")?
    );

    Ok(())
}
