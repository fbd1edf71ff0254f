use sea_orm_migration::prelude::*;

mod m20250101_000001_create_accounts;
mod m20250101_000002_create_catalog;
mod m20250101_000003_create_recipes;
mod m20250101_000004_create_relations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_accounts::Migration),
            Box::new(m20250101_000002_create_catalog::Migration),
            Box::new(m20250101_000003_create_recipes::Migration),
            Box::new(m20250101_000004_create_relations::Migration),
        ]
    }
}

/// Unique index over a pair of columns, created outside `CREATE TABLE`
/// so the statement is portable between Postgres and SQLite.
pub(crate) fn unique_pair<T, A, B>(name: &str, table: T, a: A, b: B) -> IndexCreateStatement
where
    T: IntoIden + 'static,
    A: IntoIden,
    B: IntoIden,
{
    Index::create()
        .name(name)
        .table(table)
        .col(a)
        .col(b)
        .unique()
        .to_owned()
}
