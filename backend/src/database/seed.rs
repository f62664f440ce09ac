//! Starter data for a fresh install: the service menu, payment methods and a
//! few shop products. Re-running only adds what is missing.

use rusqlite::Connection;
use tracing::{debug, info};

use super::models::ProductCategory;
use super::queries::{self, NewProduct, NewServiceType};
use crate::errors::AppResult;

struct SeedType {
    name: &'static str,
    price_cents: i64,
    duration_minutes: i64,
}

const SERVICES: &[(&str, &str, &[SeedType])] = &[
    (
        "Hair",
        "Cuts, colour and styling",
        &[
            SeedType { name: "Haircut", price_cents: 50_000, duration_minutes: 30 },
            SeedType { name: "Hair Colour", price_cents: 250_000, duration_minutes: 120 },
            SeedType { name: "Blow Dry", price_cents: 80_000, duration_minutes: 45 },
        ],
    ),
    (
        "Skin",
        "Facials and skin treatments",
        &[
            SeedType { name: "Classic Facial", price_cents: 150_000, duration_minutes: 60 },
            SeedType { name: "Gold Facial", price_cents: 300_000, duration_minutes: 90 },
        ],
    ),
    (
        "Nails",
        "Manicure and pedicure",
        &[
            SeedType { name: "Manicure", price_cents: 70_000, duration_minutes: 45 },
            SeedType { name: "Pedicure", price_cents: 90_000, duration_minutes: 60 },
        ],
    ),
    (
        "Makeup",
        "Party and bridal makeup",
        &[
            SeedType { name: "Party Makeup", price_cents: 350_000, duration_minutes: 90 },
            SeedType { name: "Bridal Makeup", price_cents: 1_500_000, duration_minutes: 180 },
        ],
    ),
];

const PAYMENT_METHODS: &[(&str, &str, &str)] = &[
    ("Cash", "cash", "Pay at the parlour"),
    ("eSewa", "esewa", "eSewa mobile wallet"),
    ("Khalti", "khalti", "Khalti digital wallet"),
    ("Stripe", "stripe", "Card payment"),
];

const PRODUCTS: &[(&str, &str, ProductCategory, i64, i64)] = &[
    ("HAIR-SH-001", "Argan Oil Shampoo", ProductCategory::Hair, 120_000, 25),
    ("HAIR-SR-002", "Keratin Hair Serum", ProductCategory::Hair, 180_000, 8),
    ("SKIN-CR-001", "Vitamin C Day Cream", ProductCategory::Skin, 220_000, 15),
    ("NAIL-PL-001", "Gel Nail Polish", ProductCategory::Nails, 45_000, 40),
    ("MKUP-FD-001", "Matte Foundation", ProductCategory::Makeup, 260_000, 0),
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub services: usize,
    pub service_types: usize,
    pub payment_methods: usize,
    pub products: usize,
}

pub fn seed_defaults(conn: &Connection) -> AppResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    let existing = queries::list_services(conn, false)?;
    for (name, description, types) in SERVICES {
        if existing.iter().any(|s| s.name == *name) {
            debug!("Service {} already present", name);
            continue;
        }
        let service_id = queries::insert_service(conn, name, Some(*description), true)?;
        summary.services += 1;
        for t in types.iter() {
            queries::insert_service_type(
                conn,
                &NewServiceType {
                    service_id,
                    name: t.name.to_string(),
                    description: None,
                    price_cents: t.price_cents,
                    duration_minutes: Some(t.duration_minutes),
                    is_active: true,
                },
            )?;
            summary.service_types += 1;
        }
    }

    for (name, code, description) in PAYMENT_METHODS {
        if queries::get_payment_method_by_code(conn, code)?.is_none() {
            queries::insert_payment_method(conn, name, code, description, 0)?;
            summary.payment_methods += 1;
        }
    }

    let skus: Vec<String> = queries::list_products(conn, None, None, false)?
        .into_iter()
        .map(|p| p.sku)
        .collect();
    for (sku, name, category, price_cents, quantity) in PRODUCTS {
        if skus.iter().any(|s| s == sku) {
            continue;
        }
        queries::insert_product(
            conn,
            &NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                category: *category,
                brand: None,
                supplier: None,
                price_cents: *price_cents,
                quantity: *quantity,
                reorder_level: 10,
                image_url: None,
            },
        )?;
        summary.products += 1;
    }

    info!(
        "Seeded {} services, {} service types, {} payment methods, {} products",
        summary.services, summary.service_types, summary.payment_methods, summary.products
    );
    Ok(summary)
}
