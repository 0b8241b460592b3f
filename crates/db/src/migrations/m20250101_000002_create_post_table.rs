//! Create post table migration.

use sea_orm_migration::prelude::*;

use super::reaction_counter_columns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(Post::Table)
            .if_not_exists()
            .col(ColumnDef::new(Post::Id).string_len(32).not_null().primary_key())
            .col(ColumnDef::new(Post::AuthorId).string_len(32).not_null())
            .col(ColumnDef::new(Post::Content).text())
            .col(ColumnDef::new(Post::Images).json_binary().not_null().default("[]"));
        reaction_counter_columns(&mut table);
        table
            .col(
                ColumnDef::new(Post::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .col(ColumnDef::new(Post::UpdatedAt).timestamp_with_time_zone())
            .foreign_key(
                ForeignKey::create()
                    .name("fk_post_author")
                    .from(Post::Table, Post::AuthorId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager.create_table(table.to_owned()).await?;

        // Index: author_id (for listing a user's posts)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_author_id")
                    .table(Post::Table)
                    .col(Post::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (for timeline ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_post_created_at")
                    .table(Post::Table)
                    .col(Post::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Post::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
    AuthorId,
    Content,
    Images,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
