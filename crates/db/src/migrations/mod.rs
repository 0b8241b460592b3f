//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

use crate::entities::ReactionType;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_post_table;
mod m20250101_000003_create_comment_table;
mod m20250101_000004_create_reaction_tables;
mod m20250101_000005_create_share_and_save_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_post_table::Migration),
            Box::new(m20250101_000003_create_comment_table::Migration),
            Box::new(m20250101_000004_create_reaction_tables::Migration),
            Box::new(m20250101_000005_create_share_and_save_tables::Migration),
        ]
    }
}

/// Add the seven non-negative reaction counter columns to a reactable table.
fn reaction_counter_columns(table: &mut TableCreateStatement) {
    for reaction_type in ReactionType::ALL {
        let column = Alias::new(reaction_type.counter_column());
        table.col(
            ColumnDef::new(column.clone())
                .integer()
                .not_null()
                .default(0)
                .check(Expr::col(column).gte(0)),
        );
    }
}
