//! `kitsmith index show`: list the location index.

use kitsmith_core::{ItemId, World};
use kitsmith_index::{FileStore, IndexStore};

use super::Context;

pub async fn show(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let config = ctx.load_config()?;
    let store = FileStore::new(config.index_path());
    let index = store.load().await?;

    // Names are resolved only when a world is available
    let world = ctx.load_world().ok();

    println!("Location index: {}", store.path().display());
    if index.is_empty() {
        println!("  (empty, run `kitsmith scan` first)");
        return Ok(());
    }
    for (position, ids) in index.iter() {
        let names: Vec<String> = ids.iter().map(|id| label(world.as_deref(), *id)).collect();
        println!("  {position}: {}", names.join(", "));
    }
    println!(
        "{} containers, {} item types",
        index.len(),
        index.item_ids().len()
    );
    Ok(())
}

fn label(world: Option<&dyn World>, id: ItemId) -> String {
    match world.and_then(|w| w.item_by_id(id)) {
        Some(info) => format!("{} ({})", info.name, id.0),
        None => format!("#{}", id.0),
    }
}
