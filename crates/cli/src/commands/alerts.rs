use chrono::Utc;
use guardian_alerting::{AlertService, CheckReport};
use serde_json::Value;

use crate::commands::{load_config, open_migrated_pool, runtime, CommandResult};

pub fn run(summary_only: bool) -> CommandResult {
    let config = match load_config("alerts") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("alerts") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let service = AlertService::from_pool(pool.clone(), &config);

        let outcome = if summary_only {
            service.summary().await.map(|summary| {
                let message = format!(
                    "{} active alerts ({} high, {} medium, {} low)",
                    summary.total_active,
                    summary.high.len(),
                    summary.medium.len(),
                    summary.low.len()
                );
                (message, serde_json::to_value(&summary).unwrap_or(Value::Null))
            })
        } else {
            service.check_and_alert(Utc::now()).await.map(|report| {
                (check_message(&report), serde_json::to_value(&report).unwrap_or(Value::Null))
            })
        };
        pool.close().await;
        outcome.map_err(|error| ("alert_check", error.to_string(), 5u8))
    });

    match result {
        Ok((message, details)) => CommandResult::success_with_details("alerts", message, details),
        Err(failure) => CommandResult::from_failure("alerts", failure),
    }
}

fn check_message(report: &CheckReport) -> String {
    format!(
        "checked {} products and {} delayed shipments: {} new alerts, {} delivered, {} already open",
        report.products_checked,
        report.delayed_shipments_checked,
        report.created.len(),
        report.delivered(),
        report.duplicates_skipped
    )
}

#[cfg(test)]
mod tests {
    use super::check_message;
    use guardian_alerting::CheckReport;

    #[test]
    fn check_message_reports_counts() {
        let report = CheckReport {
            products_checked: 4,
            delayed_shipments_checked: 1,
            created: Vec::new(),
            duplicates_skipped: 2,
        };

        assert_eq!(
            check_message(&report),
            "checked 4 products and 1 delayed shipments: 0 new alerts, 0 delivered, 2 already open"
        );
    }
}
