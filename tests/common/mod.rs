//! Shared test harness: in-memory sqlite with the embedded migrator, the
//! full service stack and an in-process cache/event pipeline.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use sakinah_api::cache::{CacheBackend, InMemoryCache};
use sakinah_api::entities::receivable::{self, ReceivableStatus};
use sakinah_api::entities::{product, store, warehouse_product};
use sakinah_api::events::{process_events, EventSender};
use sakinah_api::migrator::Migrator;
use sakinah_api::services::distributions::{CreateDistributionInput, DistributionItemInput};
use sakinah_api::services::stores::CreateStoreInput;
use sakinah_api::services::AppServices;
use sakinah_api::tenant::TenantScope;

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub cache: Arc<dyn CacheBackend>,
    pub actor: Uuid,
}

pub async fn setup() -> TestApp {
    // A single pooled connection keeps every session on the same in-memory
    // database and makes transactions deterministic.
    let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
    opts.max_connections(1).min_connections(1);
    let db = Database::connect(opts).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let db = Arc::new(db);
    let cache: Arc<dyn CacheBackend> = Arc::new(InMemoryCache::new());
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(process_events(rx, cache.clone(), Duration::from_secs(60)));

    let services = AppServices::new(db.clone(), EventSender::new(tx));

    TestApp {
        db,
        services,
        cache,
        actor: Uuid::new_v4(),
    }
}

pub async fn create_store(app: &TestApp, code: &str) -> store::Model {
    app.services
        .stores
        .create_store(
            CreateStoreInput {
                code: code.to_string(),
                name: format!("Toko {}", code),
            },
            app.actor,
        )
        .await
        .expect("create store")
}

pub async fn warehouse_master(app: &TestApp) -> store::Model {
    app.services
        .stores
        .warehouse_master()
        .await
        .expect("warehouse master seeded by migration")
}

pub async fn seed_warehouse_product(
    app: &TestApp,
    warehouse_store_id: Uuid,
    sku: &str,
    name: &str,
    price: i64,
    quantity: i32,
) -> warehouse_product::Model {
    let now = Utc::now();
    warehouse_product::ActiveModel {
        id: Set(Uuid::new_v4()),
        warehouse_store_id: Set(warehouse_store_id),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        category: Set("general".to_string()),
        price: Set(price),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("seed warehouse product")
}

/// Creates a shipment to `store_id` through the service layer, one line per
/// (product, quantity) pair.
pub async fn seed_batch(
    app: &TestApp,
    store_id: Uuid,
    invoice_number: &str,
    lines: &[(Uuid, i32)],
) -> sakinah_api::services::distributions::BatchView {
    app.services
        .distributions
        .create_batch(
            &TenantScope::unbound(),
            CreateDistributionInput {
                store_id,
                invoice_number: invoice_number.to_string(),
                items: lines
                    .iter()
                    .map(|&(product_id, quantity)| DistributionItemInput {
                        product_id,
                        quantity,
                    })
                    .collect(),
                notes: None,
            },
            app.actor,
        )
        .await
        .expect("create distribution batch")
}

pub async fn seed_product(
    app: &TestApp,
    store_id: Uuid,
    sku: &str,
    name: &str,
    price: i64,
    quantity: i32,
) -> product::Model {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        sku: Set(sku.to_string()),
        name: Set(name.to_string()),
        category: Set("general".to_string()),
        price: Set(price),
        quantity: Set(quantity),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("seed product")
}

pub async fn seed_receivable(
    app: &TestApp,
    store_id: Uuid,
    amount_due: i64,
    amount_paid: i64,
) -> receivable::Model {
    let now = Utc::now();
    receivable::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        transaction_id: Set(Uuid::new_v4()),
        customer_name: Set("Ibu Rina".to_string()),
        amount_due: Set(amount_due),
        amount_paid: Set(amount_paid),
        status: Set(ReceivableStatus::from_amounts(amount_paid, amount_due)),
        due_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("seed receivable")
}
