//! A helper program to create the schema and load the default age groups
//! and memberships.

use std::env;
use std::error::Error;
use std::fs;

use movine::Movine;
use postgres::{Client, NoTls};

use log::{debug, info, initialize_logger};

const DEFAULT_SEED_PATH: &str = "./seeds/defaults.sql";

fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();
    let connection_string = env::var("BACKEND_DB_CONNECTION_STRING")
        .map_err(|_| "must define BACKEND_DB_CONNECTION_STRING environment variable")?;
    let seed_path = env::var("BACKEND_SEED_PATH").unwrap_or_else(|_| DEFAULT_SEED_PATH.to_owned());

    debug!(logger, "Connecting to database...");

    let client = Client::connect(&connection_string, NoTls)?;

    let mut movine = Movine::new(client);
    movine.set_migration_dir("./migrations");

    if movine.status().is_err() {
        debug!(logger, "Initializing movine...");
        movine
            .initialize()
            .map_err(|e| format!("failed to initialize movine: {:?}", e))?;
    }

    debug!(logger, "Running migrations...");
    movine
        .up()
        .map_err(|e| format!("failed to run migrations: {:?}", e))?;

    // movine keeps hold of its client, so seeding needs another one
    debug!(logger, "Seeding defaults..."; "path" => &seed_path);
    let sql = fs::read_to_string(&seed_path)?;
    let mut client = Client::connect(&connection_string, NoTls)?;
    client.batch_execute(&sql)?;

    info!(logger, "Completed initialization.");

    Ok(())
}
