pub mod entities;
pub mod schema;
pub mod services;

#[cfg(test)]
pub(crate) mod testing {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};

    /// Fresh in-memory sqlite database with every table created.
    pub async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        // A second pooled connection would open a different, empty database.
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("sqlite connects");
        super::schema::create_tables(&db).await.expect("tables created");
        db
    }
}
