use crate::commands::{load_config, open_migrated_pool, runtime, CommandResult, Failure};
use guardian_db::{SeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let seeded = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let outcome: Result<SeedResult, Failure> = if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.failed_checks()), 6u8))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(seeded: &SeedResult) -> String {
    let products: Vec<String> =
        seeded.products_seeded.iter().map(|name| format!("  - {name}")).collect();
    format!(
        "inventory reset to demo dataset: {} products, {} shipments\n{}",
        seeded.products_seeded.len(),
        seeded.shipments_seeded,
        products.join("\n")
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
