//! Create share and save tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const TABLES: [&str; 2] = ["share", "save"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in TABLES {
            let table_iden = Alias::new(table);

            manager
                .create_table(
                    Table::create()
                        .table(table_iden.clone())
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PostMark::Id)
                                .string_len(32)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PostMark::UserId).string_len(32).not_null())
                        .col(ColumnDef::new(PostMark::PostId).string_len(32).not_null())
                        .col(
                            ColumnDef::new(PostMark::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{table}_user"))
                                .from(table_iden.clone(), PostMark::UserId)
                                .to(User::Table, User::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{table}_post"))
                                .from(table_iden.clone(), PostMark::PostId)
                                .to(Post::Table, Post::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Unique index: (user_id, post_id)
            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{table}_user_post"))
                        .table(table_iden.clone())
                        .col(PostMark::UserId)
                        .col(PostMark::PostId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Index: post_id (for listing who shared/saved a post)
            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{table}_post_id"))
                        .table(table_iden)
                        .col(PostMark::PostId)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in TABLES {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum PostMark {
    Id,
    UserId,
    PostId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Post {
    Table,
    Id,
}
