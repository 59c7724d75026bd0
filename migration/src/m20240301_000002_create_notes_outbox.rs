use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(NoteOutbox::Table)
                    .col(
                        ColumnDef::new(NoteOutbox::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NoteOutbox::EventId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(NoteOutbox::Action).string_len(16).not_null())
                    .col(ColumnDef::new(NoteOutbox::UserId).string().not_null())
                    .col(ColumnDef::new(NoteOutbox::NoteId).uuid().not_null())
                    .col(
                        ColumnDef::new(NoteOutbox::Sent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .take(),
            )
            .await?;

        // The dispatcher only ever scans for unsent rows.
        manager
            .create_index(
                Index::create()
                    .table(NoteOutbox::Table)
                    .col(NoteOutbox::Sent)
                    .name("idx_notes_outbox_sent")
                    .take(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(NoteOutbox::Table).take())
            .await
    }
}

#[derive(DeriveIden)]
enum NoteOutbox {
    #[sea_orm(iden = "notes_outbox")]
    Table,
    Id,
    EventId,
    Action,
    UserId,
    NoteId,
    Sent,
}
