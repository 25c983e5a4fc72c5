use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_plans_tables::Migration),
            Box::new(m20240301_000002_create_job_card_tables::Migration),
            Box::new(m20240301_000003_create_qa_tables::Migration),
        ]
    }
}

mod m20240301_000001_create_plans_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_plans_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionPlans::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductionPlans::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionPlans::SourceSpecId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionPlans::TargetSpecId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionPlans::TotalQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionPlans::Urgent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ProductionPlans::Notes).text().null())
                        .col(ColumnDef::new(ProductionPlans::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(ProductionPlans::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionPlans::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MaterialRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialRequests::PlanId).uuid().not_null())
                        .col(ColumnDef::new(MaterialRequests::JobCardId).uuid().null())
                        .col(
                            ColumnDef::new(MaterialRequests::RequestedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::SentQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(MaterialRequests::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(MaterialRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialRequests::FulfilledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_material_requests_plan_id")
                        .table(MaterialRequests::Table)
                        .col(MaterialRequests::PlanId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialRequests::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionPlans::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProductionPlans {
        Table,
        Id,
        SourceSpecId,
        TargetSpecId,
        TotalQuantity,
        Urgent,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MaterialRequests {
        Table,
        Id,
        PlanId,
        JobCardId,
        RequestedQuantity,
        SentQuantity,
        CreatedBy,
        CreatedAt,
        FulfilledAt,
    }
}

mod m20240301_000002_create_job_card_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_job_card_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(JobCards::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(JobCards::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(JobCards::PlanId).uuid().not_null())
                        .col(ColumnDef::new(JobCards::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(JobCards::CurrentStep)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(JobCards::Status)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(JobCards::AcceptedQuantity).integer().null())
                        .col(ColumnDef::new(JobCards::RejectedQuantity).integer().null())
                        .col(
                            ColumnDef::new(JobCards::Urgent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(JobCards::ReworkOf).uuid().null())
                        .col(
                            ColumnDef::new(JobCards::Version)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(JobCards::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(JobCards::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(JobCards::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_job_cards_plan_id")
                        .table(JobCards::Table)
                        .col(JobCards::PlanId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StepTransitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StepTransitions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StepTransitions::JobCardId).uuid().not_null())
                        .col(ColumnDef::new(StepTransitions::FromStep).integer().null())
                        .col(ColumnDef::new(StepTransitions::ToStep).integer().not_null())
                        .col(ColumnDef::new(StepTransitions::ActorId).uuid().not_null())
                        .col(ColumnDef::new(StepTransitions::Notes).text().null())
                        .col(
                            ColumnDef::new(StepTransitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_step_transitions_job_card_id")
                        .table(StepTransitions::Table)
                        .col(StepTransitions::JobCardId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StepTransitions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(JobCards::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum JobCards {
        Table,
        Id,
        PlanId,
        Quantity,
        CurrentStep,
        Status,
        AcceptedQuantity,
        RejectedQuantity,
        Urgent,
        ReworkOf,
        Version,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StepTransitions {
        Table,
        Id,
        JobCardId,
        FromStep,
        ToStep,
        ActorId,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000003_create_qa_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_qa_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(QaReports::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(QaReports::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(QaReports::JobCardId).uuid().not_null())
                        .col(ColumnDef::new(QaReports::QaActorId).uuid().not_null())
                        .col(
                            ColumnDef::new(QaReports::AcceptedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(QaReports::RejectedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(QaReports::QualityScore).integer().not_null())
                        .col(ColumnDef::new(QaReports::Notes).text().null())
                        .col(
                            ColumnDef::new(QaReports::InspectedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One report per card, enforced at the store level as well as in
            // the service.
            manager
                .create_index(
                    Index::create()
                        .name("idx_qa_reports_job_card_id")
                        .table(QaReports::Table)
                        .col(QaReports::JobCardId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Rejections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Rejections::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Rejections::QaReportId).uuid().not_null())
                        .col(ColumnDef::new(Rejections::JobCardId).uuid().not_null())
                        .col(ColumnDef::new(Rejections::PlanId).uuid().not_null())
                        .col(
                            ColumnDef::new(Rejections::RejectedQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Rejections::Reason).text().not_null())
                        .col(ColumnDef::new(Rejections::Severity).string_len(8).not_null())
                        .col(
                            ColumnDef::new(Rejections::IsResolved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Rejections::ResolutionAction)
                                .string_len(8)
                                .null(),
                        )
                        .col(ColumnDef::new(Rejections::ResolutionNotes).text().null())
                        .col(ColumnDef::new(Rejections::ResolvedBy).uuid().null())
                        .col(
                            ColumnDef::new(Rejections::ResolvedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Rejections::ReworkJobCardId).uuid().null())
                        .col(
                            ColumnDef::new(Rejections::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_rejections_plan_id")
                        .table(Rejections::Table)
                        .col(Rejections::PlanId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Rejections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(QaReports::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum QaReports {
        Table,
        Id,
        JobCardId,
        QaActorId,
        AcceptedQuantity,
        RejectedQuantity,
        QualityScore,
        Notes,
        InspectedAt,
    }

    #[derive(DeriveIden)]
    enum Rejections {
        Table,
        Id,
        QaReportId,
        JobCardId,
        PlanId,
        RejectedQuantity,
        Reason,
        Severity,
        IsResolved,
        ResolutionAction,
        ResolutionNotes,
        ResolvedBy,
        ResolvedAt,
        ReworkJobCardId,
        CreatedAt,
    }
}
