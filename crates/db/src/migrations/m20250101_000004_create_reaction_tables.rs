//! Create post and comment reaction tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (reaction table, target column, target table)
const REACTION_TABLES: [(&str, &str, &str); 2] = [
    ("post_reaction", "post_id", "post"),
    ("comment_reaction", "comment_id", "comment"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, target_col, target_table) in REACTION_TABLES {
            let table_iden = Alias::new(table);
            let target_iden = Alias::new(target_col);

            manager
                .create_table(
                    Table::create()
                        .table(table_iden.clone())
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reaction::Id)
                                .string_len(32)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Reaction::UserId).string_len(32).not_null())
                        .col(ColumnDef::new(target_iden.clone()).string_len(32).not_null())
                        .col(ColumnDef::new(Reaction::ReactionType).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Reaction::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{table}_user"))
                                .from(table_iden.clone(), Reaction::UserId)
                                .to(User::Table, User::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{table}_{target_table}"))
                                .from(table_iden.clone(), target_iden.clone())
                                .to(Alias::new(target_table), Alias::new("id"))
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Unique index: (user_id, target) - one reaction per user per entity
            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{table}_user_{target_table}"))
                        .table(table_iden.clone())
                        .col(Reaction::UserId)
                        .col(target_iden.clone())
                        .unique()
                        .to_owned(),
                )
                .await?;

            // Index: (target, reaction_type) - listing reactions of one type
            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{table}_{target_table}_type"))
                        .table(table_iden.clone())
                        .col(target_iden)
                        .col(Reaction::ReactionType)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, _, _) in REACTION_TABLES {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
enum Reaction {
    Id,
    UserId,
    ReactionType,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
