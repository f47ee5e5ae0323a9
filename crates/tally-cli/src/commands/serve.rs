//! Web server command

use std::path::PathBuf;

use anyhow::Result;
use tally_server::ServerConfig;

use super::core::open_db;

pub async fn cmd_serve(db_flag: &Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    let (db, household_id) = open_db(db_flag.as_deref())?;

    let config = ServerConfig {
        default_household: household_id,
        ..Default::default()
    };

    tally_server::serve(db, host, port, config).await
}
