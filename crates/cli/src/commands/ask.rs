use std::sync::Arc;

use guardian_agent::{build_llm_client, AgentContext, Orchestrator, RoutingError};
use serde_json::json;
use uuid::Uuid;

use crate::commands::{load_config, open_migrated_pool, runtime, CommandResult};

pub fn run(query: &str) -> CommandResult {
    if query.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_query", "query must not be empty", 5);
    }
    let config = match load_config("ask") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let correlation_id = format!("cli-{}", Uuid::new_v4());
    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let context = Arc::new(AgentContext::from_pool(pool.clone(), &config));
        let orchestrator = Orchestrator::from_context(context, build_llm_client(&config.llm));

        let outcome = orchestrator.handle(query, &correlation_id).await.map_err(|error| {
            let class = match &error {
                RoutingError::EmptyQuery => "invalid_query",
                RoutingError::Agent(_) => "agent_execution",
            };
            (class, error.to_string(), 5u8)
        });
        pool.close().await;
        outcome.map(|reply| (reply, orchestrator.mode()))
    });

    match result {
        Ok((reply, mode)) => CommandResult::success_with_details(
            "ask",
            reply.text.clone(),
            json!({
                "agent": reply.agent_label(),
                "routing": reply.route.method.as_str(),
                "reply_mode": reply.mode(),
                "orchestrator_mode": mode,
                "correlation_id": correlation_id,
            }),
        ),
        Err(failure) => CommandResult::from_failure("ask", failure),
    }
}
