mod common;

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Set};
use uuid::Uuid;

use sakinah_api::entities::product;
use sakinah_api::tenant::{StoreFilter, TenantScope};

use common::{create_store, seed_product, setup};

#[tokio::test]
async fn bound_scope_only_reads_its_own_rows() {
    let app = setup().await;
    let mine = create_store(&app, "TK-A").await;
    let other = create_store(&app, "TK-B").await;

    seed_product(&app, mine.id, "P-1", "Teh Botol", 5_000, 10).await;
    seed_product(&app, other.id, "P-1", "Teh Botol", 5_000, 99).await;
    seed_product(&app, other.id, "P-2", "Kerupuk", 2_000, 50).await;

    let scope = TenantScope::for_store(mine.id);
    let rows = scope
        .select::<product::Entity>(StoreFilter::default())
        .all(&*app.db)
        .await
        .expect("scoped read");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].store_id, mine.id);

    // A caller-supplied filter for the other store is replaced, not honored.
    let rows = scope
        .select::<product::Entity>(StoreFilter::for_store(other.id))
        .all(&*app.db)
        .await
        .expect("scoped read with conflicting filter");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].store_id, mine.id);
}

#[tokio::test]
async fn scoped_update_cannot_touch_another_store() {
    let app = setup().await;
    let mine = create_store(&app, "TK-C").await;
    let other = create_store(&app, "TK-D").await;

    seed_product(&app, mine.id, "P-3", "Sabun", 4_000, 10).await;
    let theirs = seed_product(&app, other.id, "P-3", "Sabun", 4_000, 10).await;

    let scope = TenantScope::for_store(mine.id);
    let result = scope
        .update_many::<product::Entity>(StoreFilter {
            // Malicious caller targets the other store's rows explicitly.
            store_id: Some(other.id),
            condition: Condition::all().add(product::Column::Sku.eq("P-3")),
        })
        .col_expr(product::Column::Quantity, Expr::value(0))
        .exec(&*app.db)
        .await
        .expect("scoped update");
    assert_eq!(result.rows_affected, 1);

    let untouched = product::Entity::find_by_id(theirs.id)
        .one(&*app.db)
        .await
        .expect("load")
        .expect("row exists");
    assert_eq!(untouched.quantity, 10);
}

#[tokio::test]
async fn scoped_delete_is_confined_to_the_bound_store() {
    let app = setup().await;
    let mine = create_store(&app, "TK-E").await;
    let other = create_store(&app, "TK-F").await;

    seed_product(&app, mine.id, "P-4", "Kecap", 7_000, 5).await;
    seed_product(&app, other.id, "P-4", "Kecap", 7_000, 5).await;

    let scope = TenantScope::for_store(mine.id);
    let result = scope
        .delete_many::<product::Entity>(StoreFilter::default())
        .exec(&*app.db)
        .await
        .expect("scoped delete");
    assert_eq!(result.rows_affected, 1);

    let remaining = product::Entity::find()
        .all(&*app.db)
        .await
        .expect("load all");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].store_id, other.id);
}

#[tokio::test]
async fn create_stamping_overrides_a_forged_store_id() {
    let app = setup().await;
    let mine = create_store(&app, "TK-G").await;
    let other = create_store(&app, "TK-H").await;

    let scope = TenantScope::for_store(mine.id);
    let now = chrono::Utc::now();
    let forged = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(other.id),
        sku: Set("P-5".to_string()),
        name: Set("Sirup".to_string()),
        category: Set("general".to_string()),
        price: Set(12_000),
        quantity: Set(3),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = scope
        .stamp::<product::Entity, _>(forged)
        .insert(&*app.db)
        .await
        .expect("insert stamped row");
    assert_eq!(created.store_id, mine.id);
}

#[tokio::test]
async fn unbound_scope_passes_caller_filters_through() {
    let app = setup().await;
    let a = create_store(&app, "TK-I").await;
    let b = create_store(&app, "TK-J").await;

    seed_product(&app, a.id, "P-6", "Roti", 6_000, 8).await;
    seed_product(&app, b.id, "P-6", "Roti", 6_000, 9).await;

    let scope = TenantScope::unbound();
    let all = scope
        .select::<product::Entity>(StoreFilter::default())
        .all(&*app.db)
        .await
        .expect("unscoped read");
    assert_eq!(all.len(), 2);

    let only_b = scope
        .select::<product::Entity>(StoreFilter::for_store(b.id))
        .all(&*app.db)
        .await
        .expect("caller-filtered read");
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].quantity, 9);
}
