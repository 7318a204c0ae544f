use log::info;
use mongodb::bson::doc;
use mongodb::{options::ClientOptions, Client, Database};

/// Shared handle to the HR database, initialized once at startup and passed
/// to the hub and the reconciliation job behind an `Arc`.
pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    pub async fn init(uri: &str, db_name: &str) -> Self {
        let client_options = ClientOptions::parse(uri)
            .await
            .expect("Failed to parse MongoDB connection string");
        let client = Client::with_options(client_options).expect("Failed to initialize client");
        let db = client.database(db_name);
        // An unreachable server must fail startup, not the first send.
        db.run_command(doc! { "ping": 1 })
            .await
            .expect("MongoDB ping failed");
        info!("Connected to MongoDB database {}", db_name);
        MongoDB { db }
    }
}
