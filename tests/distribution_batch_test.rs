mod common;

use assert_matches::assert_matches;
use sea_orm::{ConnectionTrait, EntityTrait};

use sakinah_api::entities::warehouse_distribution::DistributionStatus;
use sakinah_api::entities::{product, warehouse_product};
use sakinah_api::errors::ServiceError;
use sakinah_api::tenant::TenantScope;

use common::{create_store, seed_batch, seed_warehouse_product, setup, warehouse_master};

#[tokio::test]
async fn rejecting_a_batch_rejects_every_pending_line_with_the_reason() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-01").await;

    let fabric = seed_warehouse_product(&app, warehouse.id, "KB-01", "Kain Batik", 10_000, 50).await;
    let sarong = seed_warehouse_product(&app, warehouse.id, "SR-01", "Sarung", 10_000, 50).await;

    let batch = seed_batch(&app, store.id, "INV-001", &[(fabric.id, 4), (sarong.id, 6)]).await;
    assert_eq!(batch.item_count, 2);

    let scope = TenantScope::for_store(store.id);
    let member_id = batch.items[0].distribution.id;
    let resolution = app
        .services
        .distributions
        .reject_batch(&scope, member_id, "damaged goods", app.actor)
        .await
        .expect("reject batch");

    assert_eq!(resolution.affected, 2);
    assert_eq!(resolution.status, DistributionStatus::Rejected);

    let view = app
        .services
        .distributions
        .get_batch(&scope, member_id)
        .await
        .expect("fetch batch");
    for item in &view.items {
        assert_eq!(item.distribution.status, DistributionStatus::Rejected);
        let notes = item.distribution.notes.as_deref().expect("notes set");
        assert!(
            notes.ends_with("Rejected: damaged goods"),
            "unexpected notes: {notes}"
        );
        assert_eq!(item.distribution.invoice_number, "INV-001");
    }
}

#[tokio::test]
async fn batch_view_aggregates_quantity_and_amount() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-02").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-1", "Teh", 10_000, 100).await;
    let b = seed_warehouse_product(&app, warehouse.id, "B-1", "Kopi", 10_000, 100).await;
    let c = seed_warehouse_product(&app, warehouse.id, "C-1", "Gula", 10_000, 100).await;

    let batch = seed_batch(&app, store.id, "INV-002", &[(a.id, 3), (b.id, 5), (c.id, 2)]).await;

    let view = app
        .services
        .distributions
        .get_batch(
            &TenantScope::for_store(store.id),
            batch.items[0].distribution.id,
        )
        .await
        .expect("fetch batch");

    assert_eq!(view.item_count, 3);
    assert_eq!(view.total_quantity, 10);
    assert_eq!(view.total_amount, 100_000);
}

#[tokio::test]
async fn single_item_resolution_leaves_siblings_pending() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-03").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-2", "Minyak", 12_000, 50).await;
    let b = seed_warehouse_product(&app, warehouse.id, "B-2", "Beras", 15_000, 50).await;

    let batch = seed_batch(&app, store.id, "INV-003", &[(a.id, 2), (b.id, 3)]).await;
    let scope = TenantScope::for_store(store.id);

    let first = batch.items[0].distribution.id;
    let second = batch.items[1].distribution.id;

    let updated = app
        .services
        .distributions
        .accept_item(&scope, first, app.actor)
        .await
        .expect("accept single item");
    assert_eq!(updated.status, DistributionStatus::Delivered);

    let view = app
        .services
        .distributions
        .get_batch(&scope, second)
        .await
        .expect("fetch batch");
    let sibling = view
        .items
        .iter()
        .find(|item| item.distribution.id == second)
        .expect("sibling present");
    assert_eq!(
        sibling.distribution.status,
        DistributionStatus::PendingAcceptance
    );

    // The sibling is still independently actionable.
    let rejected = app
        .services
        .distributions
        .reject_item(&scope, second, "wrong item", app.actor)
        .await
        .expect("reject sibling");
    assert_eq!(rejected.status, DistributionStatus::Rejected);
}

#[tokio::test]
async fn resolving_a_delivered_item_is_a_validation_error() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-04").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-3", "Susu", 8_000, 50).await;
    let batch = seed_batch(&app, store.id, "INV-004", &[(a.id, 1)]).await;
    let scope = TenantScope::for_store(store.id);
    let id = batch.items[0].distribution.id;

    app.services
        .distributions
        .accept_item(&scope, id, app.actor)
        .await
        .expect("first accept");

    let again = app
        .services
        .distributions
        .reject_item(&scope, id, "too late", app.actor)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));

    // Batch-level resolution now finds nothing pending.
    let batch_reject = app
        .services
        .distributions
        .reject_batch(&scope, id, "too late", app.actor)
        .await;
    assert_matches!(batch_reject, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn accepting_a_batch_credits_store_stock() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-05").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-4", "Garam", 5_000, 30).await;
    let batch = seed_batch(&app, store.id, "INV-005", &[(a.id, 7)]).await;
    let scope = TenantScope::for_store(store.id);

    let resolution = app
        .services
        .distributions
        .accept_batch(&scope, batch.items[0].distribution.id, app.actor)
        .await
        .expect("accept batch");
    assert_eq!(resolution.affected, 1);
    assert_eq!(resolution.status, DistributionStatus::Delivered);

    let stock = product::Entity::find()
        .all(&*app.db)
        .await
        .expect("load store products")
        .into_iter()
        .find(|p| p.store_id == store.id && p.sku == "A-4")
        .expect("store product created on acceptance");
    assert_eq!(stock.quantity, 7);
    assert_eq!(stock.price, 5_000);

    // Accepting the same line twice lands in the delivered guard, and a
    // second acceptance credits nothing.
    let again = app
        .services
        .distributions
        .accept_item(&scope, batch.items[0].distribution.id, app.actor)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn batch_creation_is_atomic_when_a_line_lacks_stock() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-06").await;

    let plenty = seed_warehouse_product(&app, warehouse.id, "A-5", "Tepung", 9_000, 100).await;
    let scarce = seed_warehouse_product(&app, warehouse.id, "B-5", "Telur", 2_000, 3).await;

    let result = app
        .services
        .distributions
        .create_batch(
            &TenantScope::unbound(),
            sakinah_api::services::distributions::CreateDistributionInput {
                store_id: store.id,
                invoice_number: "INV-006".to_string(),
                items: vec![
                    sakinah_api::services::distributions::DistributionItemInput {
                        product_id: plenty.id,
                        quantity: 10,
                    },
                    sakinah_api::services::distributions::DistributionItemInput {
                        product_id: scarce.id,
                        quantity: 5,
                    },
                ],
                notes: None,
            },
            app.actor,
        )
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    // The first line's stock debit rolled back with the failed batch.
    let reloaded = warehouse_product::Entity::find_by_id(plenty.id)
        .one(&*app.db)
        .await
        .expect("load warehouse product")
        .expect("row exists");
    assert_eq!(reloaded.quantity, 100);

    let rows = sakinah_api::entities::warehouse_distribution::Entity::find()
        .all(&*app.db)
        .await
        .expect("load distributions");
    assert!(rows.is_empty(), "no lines should survive the rollback");
}

#[tokio::test]
async fn batch_rejection_rolls_back_when_a_line_update_fails() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-09").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-7", "Kecap", 7_000, 50).await;
    let b = seed_warehouse_product(&app, warehouse.id, "B-7", "Sambal", 9_000, 50).await;
    let batch = seed_batch(&app, store.id, "INV-008", &[(a.id, 4), (b.id, 6)]).await;

    // Fault injection at the storage layer: the first rejection in the batch
    // goes through, the second aborts its statement.
    app.db
        .execute_unprepared("CREATE TABLE reject_faults (hits INTEGER NOT NULL)")
        .await
        .expect("create fault table");
    app.db
        .execute_unprepared("INSERT INTO reject_faults VALUES (0)")
        .await
        .expect("seed fault table");
    app.db
        .execute_unprepared(
            "CREATE TRIGGER fail_second_rejection \
             BEFORE UPDATE OF status ON warehouse_distributions \
             WHEN NEW.status = 'REJECTED' \
             BEGIN \
               UPDATE reject_faults SET hits = hits + 1; \
               SELECT RAISE(ABORT, 'injected storage failure') \
                 WHERE (SELECT hits FROM reject_faults) >= 2; \
             END",
        )
        .await
        .expect("create fault trigger");

    let scope = TenantScope::for_store(store.id);
    let member_id = batch.items[0].distribution.id;
    let result = app
        .services
        .distributions
        .reject_batch(&scope, member_id, "damaged goods", app.actor)
        .await;
    assert_matches!(result, Err(ServiceError::DatabaseError(_)));

    // The line rejected before the failure rolled back with the batch.
    let view = app
        .services
        .distributions
        .get_batch(&scope, member_id)
        .await
        .expect("fetch batch");
    assert_eq!(view.item_count, 2);
    for item in &view.items {
        assert_eq!(
            item.distribution.status,
            DistributionStatus::PendingAcceptance
        );
        assert!(item.distribution.notes.is_none());
    }
}

#[tokio::test]
async fn creating_a_batch_decrements_warehouse_stock() {
    let app = setup().await;
    let warehouse = warehouse_master(&app).await;
    let store = create_store(&app, "TK-07").await;

    let a = seed_warehouse_product(&app, warehouse.id, "A-6", "Mie", 3_000, 40).await;
    seed_batch(&app, store.id, "INV-007", &[(a.id, 15)]).await;

    let reloaded = warehouse_product::Entity::find_by_id(a.id)
        .one(&*app.db)
        .await
        .expect("load warehouse product")
        .expect("row exists");
    assert_eq!(reloaded.quantity, 25);
}

#[tokio::test]
async fn unknown_member_id_is_not_found() {
    let app = setup().await;
    let store = create_store(&app, "TK-08").await;
    let scope = TenantScope::for_store(store.id);

    let missing = uuid::Uuid::new_v4();
    let fetch = app.services.distributions.get_batch(&scope, missing).await;
    assert_matches!(fetch, Err(ServiceError::NotFound(_)));

    let reject = app
        .services
        .distributions
        .reject_batch(&scope, missing, "whatever", app.actor)
        .await;
    assert_matches!(reject, Err(ServiceError::NotFound(_)));
}
