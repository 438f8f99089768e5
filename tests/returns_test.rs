mod common;

use assert_matches::assert_matches;
use sea_orm::EntityTrait;

use sakinah_api::entities::product;
use sakinah_api::entities::return_product::ReturnStatus;
use sakinah_api::errors::ServiceError;
use sakinah_api::services::returns::CreateReturnInput;
use sakinah_api::tenant::TenantScope;

use common::{create_store, seed_product, setup};

fn return_input(product_id: uuid::Uuid) -> CreateReturnInput {
    CreateReturnInput {
        transaction_id: uuid::Uuid::new_v4(),
        product_id,
        quantity: 2,
        reason: "torn packaging".to_string(),
    }
}

#[tokio::test]
async fn approving_a_return_restocks_the_product() {
    let app = setup().await;
    let store = create_store(&app, "TK-X1").await;
    let stock = seed_product(&app, store.id, "P-R1", "Gelas", 3_000, 10).await;
    let scope = TenantScope::for_store(store.id);

    let request = app
        .services
        .returns
        .create_return(&scope, return_input(stock.id), app.actor)
        .await
        .expect("create return");
    assert_eq!(request.status, ReturnStatus::Pending);

    let approved = app
        .services
        .returns
        .approve_return(&scope, request.id, app.actor)
        .await
        .expect("approve return");
    assert_eq!(approved.status, ReturnStatus::Approved);

    let reloaded = product::Entity::find_by_id(stock.id)
        .one(&*app.db)
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(reloaded.quantity, 12);
}

#[tokio::test]
async fn rejecting_a_return_leaves_stock_alone() {
    let app = setup().await;
    let store = create_store(&app, "TK-X2").await;
    let stock = seed_product(&app, store.id, "P-R2", "Piring", 4_000, 10).await;
    let scope = TenantScope::for_store(store.id);

    let request = app
        .services
        .returns
        .create_return(&scope, return_input(stock.id), app.actor)
        .await
        .expect("create return");

    let rejected = app
        .services
        .returns
        .reject_return(&scope, request.id, "outside return window", app.actor)
        .await
        .expect("reject return");
    assert_eq!(rejected.status, ReturnStatus::Rejected);

    let reloaded = product::Entity::find_by_id(stock.id)
        .one(&*app.db)
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(reloaded.quantity, 10);

    // A resolved return cannot be resolved again.
    let again = app
        .services
        .returns
        .approve_return(&scope, request.id, app.actor)
        .await;
    assert_matches!(again, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn returns_cannot_reference_another_stores_product() {
    let app = setup().await;
    let mine = create_store(&app, "TK-X3").await;
    let other = create_store(&app, "TK-X4").await;
    let theirs = seed_product(&app, other.id, "P-R3", "Sendok", 1_000, 10).await;

    let scope = TenantScope::for_store(mine.id);
    let result = app
        .services
        .returns
        .create_return(&scope, return_input(theirs.id), app.actor)
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}
