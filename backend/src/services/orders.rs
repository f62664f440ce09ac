//! Shop orders placed by customers.

use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use super::inventory::adjust_stock;
use crate::database::models::{Order, OrderStatus, OrderWithItems, StockTransactionKind, User};
use crate::database::queries;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address: Option<String>,
}

fn with_items(conn: &Connection, order: Order) -> AppResult<OrderWithItems> {
    let items = queries::order_items(conn, order.id)?;
    Ok(OrderWithItems { order, items })
}

/// Places an order and takes the stock. Run inside a transaction.
pub fn place_order(conn: &Connection, customer: &User, req: &PlaceOrderRequest) -> AppResult<OrderWithItems> {
    if req.items.is_empty() {
        return Err(AppError::validation("Your order has no items."));
    }

    // Repeated lines for one product are merged.
    let mut lines: BTreeMap<i64, i64> = BTreeMap::new();
    for line in &req.items {
        if line.quantity <= 0 {
            return Err(AppError::validation("Quantities must be at least 1."));
        }
        let merged = lines.entry(line.product_id).or_default();
        *merged = merged
            .checked_add(line.quantity)
            .ok_or_else(|| AppError::validation("Quantity is too large."))?;
    }

    let shipping = req
        .shipping_address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let order_id = queries::insert_order(conn, &customer.id, shipping)?;

    let mut total: i64 = 0;
    for (product_id, quantity) in lines {
        let product = queries::get_product(conn, product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| AppError::validation(format!("Product {} is not available.", product_id)))?;
        if product.quantity < quantity {
            return Err(AppError::validation(format!(
                "Only {} of {} left in stock.",
                product.quantity, product.name
            )));
        }
        queries::insert_order_item(conn, order_id, product.id, quantity, product.price_cents)?;
        adjust_stock(
            conn,
            product.id,
            product.quantity - quantity,
            StockTransactionKind::Sale,
        )?;
        total = product
            .price_cents
            .checked_mul(quantity)
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| AppError::validation("Order total is too large."))?;
    }
    queries::set_order_total(conn, order_id, total)?;
    info!("Order {} placed by {} ({} cents)", order_id, customer.email, total);

    let order = queries::get_order(conn, order_id)?
        .ok_or_else(|| AppError::not_found("Order not found."))?;
    with_items(conn, order)
}

pub fn list_orders(
    conn: &Connection,
    customer_id: Option<&str>,
    status: Option<OrderStatus>,
) -> AppResult<Vec<OrderWithItems>> {
    queries::list_orders(conn, customer_id, status)?
        .into_iter()
        .map(|order| with_items(conn, order))
        .collect()
}

/// Admin status change. Cancelling an undelivered order puts its stock back.
pub fn update_order_status(conn: &Connection, order_id: i64, status: OrderStatus) -> AppResult<OrderWithItems> {
    let order = queries::get_order(conn, order_id)?
        .ok_or_else(|| AppError::not_found("Order not found."))?;

    if order.status != status {
        if order.status == OrderStatus::Cancelled {
            return Err(AppError::validation("A cancelled order cannot be changed."));
        }
        if status == OrderStatus::Cancelled {
            if order.status == OrderStatus::Delivered {
                return Err(AppError::validation("A delivered order cannot be cancelled."));
            }
            for item in queries::order_items(conn, order.id)? {
                let Some(product) = item
                    .product_id
                    .map(|id| queries::get_product(conn, id))
                    .transpose()?
                    .flatten()
                else {
                    continue;
                };
                let restocked = product
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::validation("Stock level is too large."))?;
                adjust_stock(conn, product.id, restocked, StockTransactionKind::Restock)?;
            }
        }
        queries::set_order_status(conn, order.id, status)?;
        info!("Order {} status {} -> {}", order.id, order.status, status);
    }

    let order = queries::get_order(conn, order_id)?
        .ok_or_else(|| AppError::not_found("Order not found."))?;
    with_items(conn, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ProductCategory, Role};
    use crate::database::queries::{NewProduct, NewUser};
    use crate::database::Database;

    fn setup() -> (Database, User, i64) {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let (user, product_id) = db
            .with_conn(|conn| {
                let user = queries::insert_user(
                    conn,
                    &NewUser {
                        username: "jane".into(),
                        email: "jane@example.com".into(),
                        first_name: "Jane".into(),
                        last_name: String::new(),
                        phone: None,
                        role: Role::Customer,
                        is_superuser: false,
                        password_hash: "x".into(),
                    },
                )?;
                let product = queries::insert_product(
                    conn,
                    &NewProduct {
                        sku: "NP001".into(),
                        name: "Nail Polish Set".into(),
                        description: None,
                        category: ProductCategory::Nails,
                        brand: None,
                        supplier: None,
                        price_cents: 1200,
                        quantity: 5,
                        reorder_level: 2,
                        image_url: None,
                    },
                )?;
                Ok((user, product.id))
            })
            .unwrap();
        (db, user, product_id)
    }

    fn line(product_id: i64, quantity: i64) -> OrderLine {
        OrderLine {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_place_order_takes_stock() {
        let (db, user, product_id) = setup();
        let order = db
            .with_tx(|tx| {
                place_order(
                    tx,
                    &user,
                    &PlaceOrderRequest {
                        items: vec![line(product_id, 1), line(product_id, 2)],
                        shipping_address: Some("Kathmandu".into()),
                    },
                )
            })
            .unwrap();
        assert_eq!(order.order.total_cents, 3600);
        assert_eq!(order.order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 3);

        db.with_conn(|conn| {
            assert_eq!(queries::get_product(conn, product_id)?.unwrap().quantity, 2);
            let history = queries::list_stock_transactions(conn, Some(product_id), 10)?;
            assert_eq!(history[0].kind, StockTransactionKind::Sale);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_insufficient_stock_rolls_back() {
        let (db, user, product_id) = setup();
        let result = db.with_tx(|tx| {
            place_order(
                tx,
                &user,
                &PlaceOrderRequest {
                    items: vec![line(product_id, 6)],
                    shipping_address: None,
                },
            )
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
        db.with_conn(|conn| {
            assert!(queries::list_orders(conn, None, None)?.is_empty());
            assert_eq!(queries::get_product(conn, product_id)?.unwrap().quantity, 5);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_overflowing_quantities_are_rejected() {
        let (db, user, product_id) = setup();
        let result = db.with_tx(|tx| {
            place_order(
                tx,
                &user,
                &PlaceOrderRequest {
                    items: vec![line(product_id, i64::MAX), line(product_id, i64::MAX)],
                    shipping_address: None,
                },
            )
        });
        assert!(matches!(result, Err(AppError::Validation(_))));

        db.with_conn(|conn| {
            assert!(queries::list_orders(conn, None, None)?.is_empty());
            assert_eq!(queries::get_product(conn, product_id)?.unwrap().quantity, 5);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_cancel_restocks() {
        let (db, user, product_id) = setup();
        let order = db
            .with_tx(|tx| {
                place_order(
                    tx,
                    &user,
                    &PlaceOrderRequest {
                        items: vec![line(product_id, 4)],
                        shipping_address: None,
                    },
                )
            })
            .unwrap();
        let cancelled = db
            .with_tx(|tx| update_order_status(tx, order.order.id, OrderStatus::Cancelled))
            .unwrap();
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        db.with_conn(|conn| {
            assert_eq!(queries::get_product(conn, product_id)?.unwrap().quantity, 5);
            Ok(())
        })
        .unwrap();
        assert!(db
            .with_tx(|tx| update_order_status(tx, order.order.id, OrderStatus::Shipped))
            .is_err());
    }

    #[test]
    fn test_rejects_empty_and_zero_quantity() {
        let (db, user, product_id) = setup();
        for items in [vec![], vec![line(product_id, 0)]] {
            let result = db.with_tx(|tx| {
                place_order(
                    tx,
                    &user,
                    &PlaceOrderRequest {
                        items: items.clone(),
                        shipping_address: None,
                    },
                )
            });
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
