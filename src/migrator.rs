use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240201_000001_create_stores_table::Migration),
            Box::new(m20240201_000002_create_users_table::Migration),
            Box::new(m20240201_000003_create_products_tables::Migration),
            Box::new(m20240201_000004_create_distributions_table::Migration),
            Box::new(m20240201_000005_create_returns_table::Migration),
            Box::new(m20240201_000006_create_receivables_table::Migration),
            Box::new(m20240201_000007_create_audit_logs_table::Migration),
        ]
    }
}

mod m20240201_000001_create_stores_table {
    use sea_orm_migration::prelude::*;
    use uuid::Uuid;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000001_create_stores_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stores::Code).string().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(ColumnDef::new(Stores::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Stores::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Stores::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stores_code")
                        .table(Stores::Table)
                        .col(Stores::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Seed the reserved warehouse master store (virtual tenant for
            // central inventory).
            let now = chrono::Utc::now();
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Stores::Table)
                        .columns([
                            Stores::Id,
                            Stores::Code,
                            Stores::Name,
                            Stores::Status,
                            Stores::CreatedAt,
                            Stores::UpdatedAt,
                        ])
                        .values_panic([
                            Uuid::new_v4().into(),
                            crate::entities::store::WAREHOUSE_MASTER_CODE.into(),
                            "Central Warehouse".into(),
                            "SYSTEM".into(),
                            now.into(),
                            now.into(),
                        ])
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Stores {
        Table,
        Id,
        Code,
        Name,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000002_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000002_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::StoreId).uuid().null())
                        .col(ColumnDef::new(Users::Username).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FullName).string().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_username")
                        .table(Users::Table)
                        .col(Users::Username)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Users {
        Table,
        Id,
        StoreId,
        Username,
        PasswordHash,
        FullName,
        Role,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000003_create_products_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000003_create_products_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Category).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_store_sku")
                        .table(Products::Table)
                        .col(Products::StoreId)
                        .col(Products::Sku)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(WarehouseProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseProducts::WarehouseStoreId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseProducts::Sku).string().not_null())
                        .col(ColumnDef::new(WarehouseProducts::Name).string().not_null())
                        .col(
                            ColumnDef::new(WarehouseProducts::Category)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseProducts::Price)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseProducts::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_warehouse_products_store_sku")
                        .table(WarehouseProducts::Table)
                        .col(WarehouseProducts::WarehouseStoreId)
                        .col(WarehouseProducts::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseProducts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Products {
        Table,
        Id,
        StoreId,
        Sku,
        Name,
        Category,
        Price,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    pub enum WarehouseProducts {
        Table,
        Id,
        WarehouseStoreId,
        Sku,
        Name,
        Category,
        Price,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000004_create_distributions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000004_create_distributions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseDistributions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseDistributions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::StoreId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::WarehouseId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::ProductId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::BatchId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::InvoiceNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::TotalAmount)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::Status)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::DistributedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::DistributedBy)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseDistributions::Notes).string().null())
                        .col(
                            ColumnDef::new(WarehouseDistributions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseDistributions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Batch membership is resolved by (store_id, batch_id) on every
            // accept/reject, so it gets a covering index.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_distributions_store_batch")
                        .table(WarehouseDistributions::Table)
                        .col(WarehouseDistributions::StoreId)
                        .col(WarehouseDistributions::BatchId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_distributions_invoice")
                        .table(WarehouseDistributions::Table)
                        .col(WarehouseDistributions::StoreId)
                        .col(WarehouseDistributions::InvoiceNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_distributions_status")
                        .table(WarehouseDistributions::Table)
                        .col(WarehouseDistributions::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(WarehouseDistributions::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum WarehouseDistributions {
        Table,
        Id,
        StoreId,
        WarehouseId,
        ProductId,
        BatchId,
        InvoiceNumber,
        Quantity,
        TotalAmount,
        Status,
        DistributedAt,
        DistributedBy,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000005_create_returns_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000005_create_returns_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReturnProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReturnProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReturnProducts::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(ReturnProducts::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReturnProducts::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ReturnProducts::AttendantId).uuid().not_null())
                        .col(ColumnDef::new(ReturnProducts::Quantity).integer().not_null())
                        .col(ColumnDef::new(ReturnProducts::Reason).string().not_null())
                        .col(
                            ColumnDef::new(ReturnProducts::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReturnProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReturnProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_return_products_store_status")
                        .table(ReturnProducts::Table)
                        .col(ReturnProducts::StoreId)
                        .col(ReturnProducts::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ReturnProducts::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum ReturnProducts {
        Table,
        Id,
        StoreId,
        TransactionId,
        ProductId,
        AttendantId,
        Quantity,
        Reason,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000006_create_receivables_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000006_create_receivables_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Receivables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Receivables::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Receivables::TransactionId).uuid().not_null())
                        .col(ColumnDef::new(Receivables::CustomerName).string().not_null())
                        .col(
                            ColumnDef::new(Receivables::AmountDue)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Receivables::AmountPaid)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Receivables::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Receivables::DueDate).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Receivables::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Receivables::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_receivables_store_status")
                        .table(Receivables::Table)
                        .col(Receivables::StoreId)
                        .col(Receivables::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Receivables::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum Receivables {
        Table,
        Id,
        StoreId,
        TransactionId,
        CustomerName,
        AmountDue,
        AmountPaid,
        Status,
        DueDate,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240201_000007_create_audit_logs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240201_000007_create_audit_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLogs::ActorId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::Entity).string().not_null())
                        .col(ColumnDef::new(AuditLogs::RecordId).string().not_null())
                        .col(ColumnDef::new(AuditLogs::BeforeValue).json().null())
                        .col(ColumnDef::new(AuditLogs::AfterValue).json().null())
                        .col(ColumnDef::new(AuditLogs::StoreId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Metadata).string().null())
                        .col(ColumnDef::new(AuditLogs::CreatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_entity_record")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::Entity)
                        .col(AuditLogs::RecordId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    pub enum AuditLogs {
        Table,
        Id,
        ActorId,
        Action,
        Entity,
        RecordId,
        BeforeValue,
        AfterValue,
        StoreId,
        Metadata,
        CreatedAt,
    }
}
