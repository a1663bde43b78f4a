use crate::commands::{load_config, migrated_pool, runtime, CommandResult, StepError};
use concierge_core::config::LoadOptions;
use concierge_db::ping;

/// Preflight for `concierge-server`: the same config, database and schema
/// checks the server performs before it binds.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("start", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("start") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;
        ping(&pool).await.map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<(), StepError>(())
    });

    if let Err((error_class, message, exit_code)) = result {
        return CommandResult::failure("start", error_class, message, exit_code);
    }

    let llm_status = if config.llm.usable_api_key().is_some() || !config.llm.provider.requires_api_key()
    {
        "ready"
    } else {
        "missing API key, /chat will answer with a configuration error"
    };

    CommandResult::success(
        "start",
        format!(
            "preflight passed; serve on {} (llm {:?}/{}: {llm_status})",
            config.server.listen_address(),
            config.llm.provider,
            config.llm.model
        ),
    )
}
