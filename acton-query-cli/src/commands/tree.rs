use std::path::Path;

use acton_query::catalog::Category;
use acton_query::hierarchy::{HierarchyAssembler, TreeNode};
use acton_query::memory::MemoryStore;
use acton_query::repository::GenericRepository;
use acton_query::specification::QuerySettings;
use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use super::Outcome;
use crate::utils::{self, format};

pub async fn execute(
    input: &Path,
    root: u64,
    json: bool,
    settings: &QuerySettings,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let categories: Vec<Category> = utils::read_json(input)?;
    tracing::debug!(count = categories.len(), input = %input.display(), "categories loaded");

    match build(categories, root, settings, cancel).await? {
        Some(tree) if json => {
            let rendered =
                serde_json::to_string_pretty(&tree).context("Failed to serialize tree")?;
            println!("{}", rendered);
            Ok(Outcome::Done)
        }
        Some(tree) => {
            print!("{}", format::render_tree(&tree));
            Ok(Outcome::Done)
        }
        None => Ok(Outcome::NotFound(format!("Category {} not found", root))),
    }
}

async fn build(
    categories: Vec<Category>,
    root: u64,
    settings: &QuerySettings,
    cancel: &CancellationToken,
) -> Result<Option<TreeNode<u64>>> {
    let store = MemoryStore::from(categories);
    let repository = GenericRepository::new(store.clone(), store.session());
    let tree = HierarchyAssembler::new(repository)
        .with_settings(settings)
        .build_tree(&root, cancel)
        .await?;
    Ok(tree)
}
