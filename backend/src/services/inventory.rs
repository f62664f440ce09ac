//! Retail product inventory: stock levels, adjustments and statistics.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::models::{Product, ProductCategory, StockTransaction, StockTransactionKind};
use crate::database::queries::{self, NewProduct};
use crate::errors::{AppError, AppResult};

pub const DEFAULT_REORDER_LEVEL: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    Medium,
    InStock,
}

impl StockStatus {
    pub fn of(quantity: i64, reorder_level: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_level {
            StockStatus::Low
        } else if quantity <= reorder_level.saturating_mul(2) {
            StockStatus::Medium
        } else {
            StockStatus::InStock
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::Low => "Low Stock",
            StockStatus::Medium => "Medium Stock",
            StockStatus::InStock => "In Stock",
        }
    }
}

/// Product row as shown in the inventory table.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryItem {
    #[serde(flatten)]
    pub product: Product,
    pub stock_status: StockStatus,
    pub stock_label: &'static str,
    pub stock_value_cents: i64,
}

impl From<Product> for InventoryItem {
    fn from(product: Product) -> Self {
        let status = StockStatus::of(product.quantity, product.reorder_level);
        Self {
            stock_value_cents: product.price_cents.saturating_mul(product.quantity),
            stock_status: status,
            stock_label: status.label(),
            product,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryFilter {
    pub search: Option<String>,
    pub category: Option<ProductCategory>,
    pub stock: Option<StockStatus>,
}

pub fn list_inventory(conn: &Connection, filter: &InventoryFilter) -> AppResult<Vec<InventoryItem>> {
    let items = queries::list_products(conn, filter.search.as_deref(), filter.category, false)?
        .into_iter()
        .map(InventoryItem::from)
        .filter(|item| filter.stock.map_or(true, |s| item.stock_status == s))
        .collect();
    Ok(items)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub total_items: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
    pub total_value_cents: i64,
}

/// "Low stock" counts every product at or under its reorder level that is
/// not already out of stock.
pub fn inventory_stats(products: &[Product]) -> InventoryStats {
    products.iter().fold(InventoryStats::default(), |mut stats, p| {
        stats.total_items += 1;
        match StockStatus::of(p.quantity, p.reorder_level) {
            StockStatus::OutOfStock => stats.out_of_stock += 1,
            StockStatus::Low => stats.low_stock += 1,
            _ => {}
        }
        stats.total_value_cents = stats
            .total_value_cents
            .saturating_add(p.price_cents.saturating_mul(p.quantity));
        stats
    })
}

pub fn low_stock(conn: &Connection) -> AppResult<Vec<InventoryItem>> {
    let items = queries::list_products(conn, None, None, false)?
        .into_iter()
        .map(InventoryItem::from)
        .filter(|item| matches!(item.stock_status, StockStatus::Low | StockStatus::OutOfStock))
        .collect();
    Ok(items)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub quantity: i64,
    pub reorder_level: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub price_cents: Option<i64>,
    pub reorder_level: Option<i64>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

fn check_product(sku: &str, name: &str, price_cents: i64, reorder_level: i64) -> AppResult<()> {
    if sku.trim().is_empty() || name.trim().is_empty() {
        return Err(AppError::validation("SKU and name are required."));
    }
    if price_cents < 0 {
        return Err(AppError::validation("Price cannot be negative."));
    }
    if reorder_level < 0 {
        return Err(AppError::validation("Reorder level cannot be negative."));
    }
    Ok(())
}

fn sku_conflict(err: rusqlite::Error) -> AppError {
    if queries::is_constraint_violation(&err) {
        AppError::conflict("A product with this SKU already exists.")
    } else {
        err.into()
    }
}

fn blank_to_none(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn create_product(conn: &Connection, input: &ProductInput) -> AppResult<Product> {
    let reorder_level = input.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL);
    check_product(&input.sku, &input.name, input.price_cents, reorder_level)?;
    if input.quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative."));
    }
    let product = queries::insert_product(
        conn,
        &NewProduct {
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: blank_to_none(input.description.as_ref()),
            category: input.category,
            brand: blank_to_none(input.brand.as_ref()),
            supplier: blank_to_none(input.supplier.as_ref()),
            price_cents: input.price_cents,
            quantity: input.quantity,
            reorder_level,
            image_url: blank_to_none(input.image_url.as_ref()),
        },
    )
    .map_err(sku_conflict)?;
    info!("Added product {} ({})", product.name, product.sku);
    Ok(product)
}

pub fn update_product(conn: &Connection, id: i64, update: &ProductUpdate) -> AppResult<Product> {
    let mut product = queries::get_product(conn, id)?
        .ok_or_else(|| AppError::not_found("Product not found."))?;

    if let Some(sku) = &update.sku {
        product.sku = sku.trim().to_string();
    }
    if let Some(name) = &update.name {
        product.name = name.trim().to_string();
    }
    if update.description.is_some() {
        product.description = blank_to_none(update.description.as_ref());
    }
    if let Some(category) = update.category {
        product.category = category;
    }
    if update.brand.is_some() {
        product.brand = blank_to_none(update.brand.as_ref());
    }
    if update.supplier.is_some() {
        product.supplier = blank_to_none(update.supplier.as_ref());
    }
    if let Some(price) = update.price_cents {
        product.price_cents = price;
    }
    if let Some(level) = update.reorder_level {
        product.reorder_level = level;
    }
    if update.image_url.is_some() {
        product.image_url = blank_to_none(update.image_url.as_ref());
    }
    if let Some(active) = update.is_active {
        product.is_active = active;
    }
    check_product(&product.sku, &product.name, product.price_cents, product.reorder_level)?;

    queries::update_product(conn, &product).map_err(sku_conflict)?;
    queries::get_product(conn, id)?.ok_or_else(|| AppError::not_found("Product not found."))
}

pub fn delete_product(conn: &Connection, id: i64) -> AppResult<()> {
    if !queries::delete_product(conn, id)? {
        return Err(AppError::not_found("Product not found."));
    }
    info!("Deleted product {}", id);
    Ok(())
}

/// Sets the on-hand quantity and records the change.
pub fn adjust_stock(
    conn: &Connection,
    product_id: i64,
    new_quantity: i64,
    kind: StockTransactionKind,
) -> AppResult<StockTransaction> {
    if new_quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative."));
    }
    let product = queries::get_product(conn, product_id)?
        .ok_or_else(|| AppError::not_found("Product not found."))?;

    let tx = queries::insert_stock_transaction(conn, &product, kind, new_quantity)?;
    queries::set_product_quantity(conn, product.id, new_quantity)?;
    info!(
        "Stock for {} changed {} -> {} ({})",
        product.sku, tx.old_quantity, tx.new_quantity, kind
    );
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn product(quantity: i64, reorder_level: i64, price_cents: i64) -> Product {
        Product {
            id: 1,
            sku: "SKU".into(),
            name: "Item".into(),
            description: None,
            category: ProductCategory::Hair,
            brand: None,
            supplier: None,
            price_cents,
            quantity,
            reorder_level,
            image_url: None,
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn input(sku: &str, quantity: i64) -> ProductInput {
        ProductInput {
            sku: sku.into(),
            name: "Hair Serum".into(),
            description: Some("Anti-frizz".into()),
            category: ProductCategory::Hair,
            brand: Some(" ".into()),
            supplier: None,
            price_cents: 2500,
            quantity,
            reorder_level: None,
            image_url: None,
        }
    }

    #[test]
    fn test_stock_status_thresholds() {
        assert_eq!(StockStatus::of(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::of(1, 10), StockStatus::Low);
        assert_eq!(StockStatus::of(10, 10), StockStatus::Low);
        assert_eq!(StockStatus::of(11, 10), StockStatus::Medium);
        assert_eq!(StockStatus::of(20, 10), StockStatus::Medium);
        assert_eq!(StockStatus::of(21, 10), StockStatus::InStock);
    }

    #[test]
    fn test_inventory_stats() {
        let stats = inventory_stats(&[
            product(0, 10, 500),
            product(5, 10, 1000),
            product(30, 10, 200),
        ]);
        assert_eq!(
            stats,
            InventoryStats {
                total_items: 3,
                low_stock: 1,
                out_of_stock: 1,
                total_value_cents: 5000 + 6000,
            }
        );
        assert_eq!(inventory_stats(&[]), InventoryStats::default());
    }

    #[test]
    fn test_create_adjust_and_filter() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.with_conn(|conn| {
            let p = create_product(conn, &input("HC010", 25))?;
            assert_eq!(p.reorder_level, DEFAULT_REORDER_LEVEL);
            assert_eq!(p.brand, None);

            let tx = adjust_stock(conn, p.id, 4, StockTransactionKind::Adjustment)?;
            assert_eq!((tx.old_quantity, tx.new_quantity, tx.difference), (25, 4, -21));
            assert_eq!(queries::get_product(conn, p.id)?.unwrap().quantity, 4);

            assert!(matches!(
                adjust_stock(conn, p.id, -1, StockTransactionKind::Adjustment),
                Err(AppError::Validation(_))
            ));

            let low = list_inventory(
                conn,
                &InventoryFilter {
                    stock: Some(StockStatus::Low),
                    ..Default::default()
                },
            )?;
            assert_eq!(low.len(), 1);
            assert_eq!(low_stock(conn)?.len(), 1);

            let found = list_inventory(
                conn,
                &InventoryFilter {
                    search: Some("frizz".into()),
                    ..Default::default()
                },
            )?;
            assert_eq!(found.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_duplicate_sku_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.with_conn(|conn| {
            create_product(conn, &input("HC010", 1))?;
            assert!(matches!(
                create_product(conn, &input("HC010", 1)),
                Err(AppError::Conflict(_))
            ));
            Ok(())
        })
        .unwrap();
    }
}
