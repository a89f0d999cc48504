use crate::orm::{comments, follows, groups, posts, sessions, users};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Schema,
};
use std::time::Duration;

/// Opens the database URL and returns the connection pool.
pub async fn init_db(database_url: String) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(true);

    Database::connect(opt).await
}

/// Creates any missing table from the entity definitions.
/// Order matters for backends which check foreign key targets.
pub async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, users::Entity).await?;
    create_table(db, sessions::Entity).await?;
    create_table(db, groups::Entity).await?;
    create_table(db, posts::Entity).await?;
    create_table(db, comments::Entity).await?;
    create_table(db, follows::Entity).await?;
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}
