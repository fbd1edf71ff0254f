use sea_orm_migration::prelude::*;

use super::{
    m20250101_000001_create_accounts::Users, m20250101_000003_create_recipes::Recipes,
    unique_pair,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, fk_user, fk_recipe, unique) in [
            (
                Relation::Favorites,
                "fk_favorites_user",
                "fk_favorites_recipe",
                "uq_favorites_user_recipe",
            ),
            (
                Relation::ShoppingCarts,
                "fk_shopping_carts_user",
                "fk_shopping_carts_recipe",
                "uq_shopping_carts_user_recipe",
            ),
        ] {
            manager
                .create_table(
                    Table::create()
                        .table(table)
                        .if_not_exists()
                        .col(ColumnDef::new(Relation::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Relation::UserId).uuid().not_null())
                        .col(ColumnDef::new(Relation::RecipeId).uuid().not_null())
                        .col(
                            ColumnDef::new(Relation::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(fk_user)
                                .from(table, Relation::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(fk_recipe)
                                .from(table, Relation::RecipeId)
                                .to(Recipes::Table, Recipes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(unique_pair(
                    unique,
                    table,
                    Relation::UserId,
                    Relation::RecipeId,
                ))
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(Follows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Follows::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Follows::UserId).uuid().not_null())
                    .col(ColumnDef::new(Follows::FollowingId).uuid().not_null())
                    .col(
                        ColumnDef::new(Follows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_user")
                            .from(Follows::Table, Follows::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_follows_following")
                            .from(Follows::Table, Follows::FollowingId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(unique_pair(
                "uq_follows_user_following",
                Follows::Table,
                Follows::UserId,
                Follows::FollowingId,
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Follows::Table.into_iden(),
            Relation::ShoppingCarts.into_iden(),
            Relation::Favorites.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Columns shared by the two user → recipe relation tables.
#[derive(DeriveIden, Clone, Copy)]
enum Relation {
    Favorites,
    ShoppingCarts,
    Id,
    UserId,
    RecipeId,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Follows {
    Table,
    Id,
    UserId,
    FollowingId,
    CreatedAt,
}
