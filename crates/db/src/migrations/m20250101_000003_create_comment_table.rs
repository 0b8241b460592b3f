//! Create comment table migration.

use sea_orm_migration::prelude::*;

use super::reaction_counter_columns;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut table = Table::create();
        table
            .table(Comment::Table)
            .if_not_exists()
            .col(ColumnDef::new(Comment::Id).string_len(32).not_null().primary_key())
            .col(ColumnDef::new(Comment::PostId).string_len(32).not_null())
            .col(ColumnDef::new(Comment::AuthorId).string_len(32).not_null())
            .col(ColumnDef::new(Comment::ParentId).string_len(32))
            .col(ColumnDef::new(Comment::Content).text())
            .col(ColumnDef::new(Comment::Images).json_binary().not_null().default("[]"));
        reaction_counter_columns(&mut table);
        table
            .col(
                ColumnDef::new(Comment::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_comment_post")
                    .from(Comment::Table, Comment::PostId)
                    .to(Post::Table, Post::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_comment_author")
                    .from(Comment::Table, Comment::AuthorId)
                    .to(User::Table, User::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_comment_parent")
                    .from(Comment::Table, Comment::ParentId)
                    .to(Comment::Table, Comment::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            );

        manager.create_table(table.to_owned()).await?;

        // Index: (post_id, parent_id) - listing top-level comments and replies
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_post_parent")
                    .table(Comment::Table)
                    .col(Comment::PostId)
                    .col(Comment::ParentId)
                    .to_owned(),
            )
            .await?;

        // Index: parent_id (for counting replies)
        manager
            .create_index(
                Index::create()
                    .name("idx_comment_parent_id")
                    .table(Comment::Table)
                    .col(Comment::ParentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Comment {
    Table,
    Id,
    PostId,
    AuthorId,
    ParentId,
    Content,
    Images,
    CreatedAt,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
