//! Create violation table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Violation::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Violation::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Violation::StudentId).string_len(64).not_null())
                    .col(ColumnDef::new(Violation::StudentName).string_len(256).not_null())
                    .col(ColumnDef::new(Violation::Department).string_len(128).not_null())
                    .col(ColumnDef::new(Violation::Category).string_len(64).not_null())
                    .col(ColumnDef::new(Violation::Description).text().not_null())
                    .col(
                        ColumnDef::new(Violation::Priority)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Violation::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Violation::DueDate).date().not_null())
                    .col(ColumnDef::new(Violation::EvidenceUrl).string_len(1024))
                    .col(ColumnDef::new(Violation::CorrectionUrl).string_len(1024))
                    .col(ColumnDef::new(Violation::RejectionReason).text())
                    .col(ColumnDef::new(Violation::ReportedBy).string_len(32).not_null())
                    .col(ColumnDef::new(Violation::VerifiedBy).string_len(32))
                    .col(
                        ColumnDef::new(Violation::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Violation::AcknowledgedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Violation::CorrectedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Violation::VerifiedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Violation::Revision)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_violation_reported_by")
                            .from(Violation::Table, Violation::ReportedBy)
                            .to(Account::Table, Account::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: reported_by (staff dashboard)
        manager
            .create_index(
                Index::create()
                    .name("idx_violation_reported_by")
                    .table(Violation::Table)
                    .col(Violation::ReportedBy)
                    .to_owned(),
            )
            .await?;

        // Index: student_id (student dashboard)
        manager
            .create_index(
                Index::create()
                    .name("idx_violation_student_id")
                    .table(Violation::Table)
                    .col(Violation::StudentId)
                    .to_owned(),
            )
            .await?;

        // Index: status
        manager
            .create_index(
                Index::create()
                    .name("idx_violation_status")
                    .table(Violation::Table)
                    .col(Violation::Status)
                    .to_owned(),
            )
            .await?;

        // Index: created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_violation_created_at")
                    .table(Violation::Table)
                    .col(Violation::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Violation::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Violation {
    Table,
    Id,
    StudentId,
    StudentName,
    Department,
    Category,
    Description,
    Priority,
    Status,
    DueDate,
    EvidenceUrl,
    CorrectionUrl,
    RejectionReason,
    ReportedBy,
    VerifiedBy,
    CreatedAt,
    AcknowledgedAt,
    CorrectedAt,
    VerifiedAt,
    Revision,
}

#[derive(Iden)]
enum Account {
    Table,
    Id,
}
