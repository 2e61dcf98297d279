use orderdesk_core::config::{AppConfig, LoadOptions, SessionStoreKind};
use orderdesk_db::{connect_with_settings, migrations};

use crate::commands::{block_on, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    if config.session.store != SessionStoreKind::Sqlite {
        return CommandResult::success(
            "migrate",
            "session.store is `memory`; no database schema to apply",
        );
    }

    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(Ok(())) => CommandResult::success("migrate", "applied pending session migrations"),
        Ok(Err((error_class, message, exit_code))) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
        Err(message) => CommandResult::failure("migrate", "runtime_init", message, 3),
    }
}
