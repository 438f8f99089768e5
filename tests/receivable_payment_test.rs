mod common;

use assert_matches::assert_matches;
use sea_orm::EntityTrait;

use sakinah_api::entities::receivable::{self, ReceivableStatus};
use sakinah_api::errors::ServiceError;
use sakinah_api::tenant::TenantScope;

use common::{create_store, seed_receivable, setup};

#[tokio::test]
async fn overpayment_is_rejected_without_changing_state() {
    let app = setup().await;
    let store = create_store(&app, "TK-R1").await;
    let row = seed_receivable(&app, store.id, 100_000, 30_000).await;
    let scope = TenantScope::for_store(store.id);

    let result = app
        .services
        .receivables
        .record_payment(&scope, row.id, 80_000, app.actor)
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let reloaded = receivable::Entity::find_by_id(row.id)
        .one(&*app.db)
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(reloaded.amount_paid, 30_000);
    assert_eq!(reloaded.status, ReceivableStatus::PartiallyPaid);
}

#[tokio::test]
async fn exact_remaining_payment_settles_the_receivable() {
    let app = setup().await;
    let store = create_store(&app, "TK-R2").await;
    let row = seed_receivable(&app, store.id, 100_000, 40_000).await;
    let scope = TenantScope::for_store(store.id);

    let updated = app
        .services
        .receivables
        .record_payment(&scope, row.id, 60_000, app.actor)
        .await
        .expect("exact payment");
    assert_eq!(updated.amount_paid, 100_000);
    assert_eq!(updated.status, ReceivableStatus::Paid);

    // Further payments are refused.
    let again = app
        .services
        .receivables
        .record_payment(&scope, row.id, 1, app.actor)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn partial_payment_moves_status_forward() {
    let app = setup().await;
    let store = create_store(&app, "TK-R3").await;
    let row = seed_receivable(&app, store.id, 50_000, 0).await;
    let scope = TenantScope::for_store(store.id);

    let updated = app
        .services
        .receivables
        .record_payment(&scope, row.id, 20_000, app.actor)
        .await
        .expect("partial payment");
    assert_eq!(updated.amount_paid, 20_000);
    assert_eq!(updated.status, ReceivableStatus::PartiallyPaid);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = setup().await;
    let store = create_store(&app, "TK-R4").await;
    let row = seed_receivable(&app, store.id, 50_000, 0).await;
    let scope = TenantScope::for_store(store.id);

    let zero = app
        .services
        .receivables
        .record_payment(&scope, row.id, 0, app.actor)
        .await;
    assert_matches!(zero, Err(ServiceError::ValidationError(_)));

    let negative = app
        .services
        .receivables
        .record_payment(&scope, row.id, -5_000, app.actor)
        .await;
    assert_matches!(negative, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn another_stores_receivable_is_invisible() {
    let app = setup().await;
    let mine = create_store(&app, "TK-R5").await;
    let other = create_store(&app, "TK-R6").await;
    let row = seed_receivable(&app, other.id, 10_000, 0).await;

    let scope = TenantScope::for_store(mine.id);
    let result = app
        .services
        .receivables
        .record_payment(&scope, row.id, 5_000, app.actor)
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}
