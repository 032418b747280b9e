use std::path::PathBuf;

use acton_query::catalog::{product_store, Category, Product, ProductFilter, ProductStatus};
use acton_query::memory::MemoryStore;
use acton_query::repository::{GenericRepository, Page, Repository};
use acton_query::specification::{OrderDirection, PageRequest, QuerySettings};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Outcome;
use crate::utils::{self, format};

#[derive(Debug, Args)]
pub struct ProductsArgs {
    /// Products JSON file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Categories JSON file, needed for --include-category
    #[arg(long, value_name = "FILE")]
    pub categories: Option<PathBuf>,

    /// Name contains (case-insensitive)
    #[arg(long)]
    pub name: Option<String>,

    /// Description contains (case-insensitive)
    #[arg(long)]
    pub description: Option<String>,

    /// Owner ID
    #[arg(long, value_name = "UUID")]
    pub owner: Option<Uuid>,

    /// Status (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<ProductStatus>,

    /// Product ID (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub id: Vec<u64>,

    /// Category ID
    #[arg(long)]
    pub category: Option<u64>,

    /// Supplier city contains (case-insensitive)
    #[arg(long)]
    pub city: Option<String>,

    /// Sort field (id, name, price, created_at, status)
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Page number, starting at 1
    #[arg(long, allow_negative_numbers = true)]
    pub page: Option<i64>,

    /// Items per page
    #[arg(long, allow_negative_numbers = true)]
    pub page_size: Option<i64>,

    /// Attach each product's category
    #[arg(long)]
    pub include_category: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ProductsArgs {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            name: self.name.clone(),
            description: self.description.clone(),
            owner_id: self.owner,
            statuses: self.status.clone(),
            ids: self.id.clone(),
            category_id: self.category,
            supplier_city: self.city.clone(),
            sort: self.sort.clone(),
            order: if self.desc {
                OrderDirection::Descending
            } else {
                OrderDirection::Ascending
            },
            page: PageRequest::new(self.page, self.page_size),
            include_category: self.include_category,
        }
    }
}

pub async fn execute(
    args: ProductsArgs,
    settings: &QuerySettings,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    // Reject bad parameters before reading any file
    let spec = args.filter().into_specification(settings)?;
    tracing::debug!(spec = %spec.describe(), "product query built");

    let products: Vec<Product> = utils::read_json(&args.input)?;
    let categories: MemoryStore<Category> = match args.categories {
        Some(ref path) => utils::read_json::<Vec<Category>>(path)?.into(),
        None => MemoryStore::new(),
    };

    let store = if args.categories.is_some() {
        product_store(products, categories)
    } else {
        MemoryStore::from(products)
    };
    let repository = GenericRepository::new(store.clone(), store.session());
    let page = repository.find_page(&spec, cancel).await?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&page).context("Failed to serialize page")?;
        println!("{}", rendered);
    } else {
        print_page(&page);
    }
    Ok(Outcome::Done)
}

fn print_page(page: &Page<Product>) {
    if page.is_empty() {
        utils::info("No products match");
    } else {
        println!(
            "{:>6}  {:<24} {:<13} {:>10}  {:<14} {}",
            "ID".bold(),
            "NAME".bold(),
            "STATUS".bold(),
            "PRICE".bold(),
            "CITY".bold(),
            "CATEGORY".bold()
        );
        for product in &page.items {
            println!(
                "{:>6}  {:<24} {:<13} {:>10}  {:<14} {}",
                product.id,
                format::truncate(&product.name, 24),
                status_label(product.status),
                format::format_price(product.price_cents),
                format::truncate(&product.supplier.city, 14),
                product
                    .category
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("-")
            );
        }
    }
    utils::section(&format!(
        "Page {} of {} ({} total)",
        page.page, page.total_pages, page.total
    ));
}

fn status_label(status: ProductStatus) -> String {
    let label = format!("{:<13}", status);
    match status {
        ProductStatus::Active => label.green().to_string(),
        ProductStatus::Draft => label.yellow().to_string(),
        ProductStatus::Discontinued => label.dimmed().to_string(),
    }
}
