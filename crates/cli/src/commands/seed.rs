use crate::commands::{load_config, migrated_pool, runtime, CommandResult, StepError};
use concierge_core::config::LoadOptions;
use concierge_db::{ResortSeedDataset, SeedResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;

        let seeded = ResortSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = ResortSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let outcome: Result<SeedResult, StepError> = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", summary(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    format!(
        "resort catalogue ready: {} rooms, {} spa services, {} activities",
        seeded.rooms, seeded.spa_services, seeded.activities
    )
}

fn verification_message(checks: &[(String, bool)]) -> String {
    let failed: Vec<&str> =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(check.as_str())).collect();

    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use concierge_db::SeedResult;

    use super::{summary, verification_message};

    #[test]
    fn verification_message_names_failed_checks() {
        let checks = vec![
            ("room-101".to_string(), true),
            ("room-401".to_string(), false),
            ("spa-couples-retreat".to_string(), false),
        ];
        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for checks: room-401, spa-couples-retreat"
        );
    }

    #[test]
    fn verification_message_falls_back_without_labels() {
        assert_eq!(verification_message(&[]), "Some seed data failed to load");
    }

    #[test]
    fn summary_counts_each_catalogue() {
        let seeded = SeedResult { rooms: 6, spa_services: 4, activities: 4 };
        assert_eq!(
            summary(&seeded),
            "resort catalogue ready: 6 rooms, 4 spa services, 4 activities"
        );
    }
}
