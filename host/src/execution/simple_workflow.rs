//! SimpleWorkflowExecutor (§4.11): sequential agent chaining. Each step's
//! final textual response becomes the next step's user message.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimpleWorkflowResult {
    Completed { final_message: String },
    CompletedEmpty { final_message: String },
    Failed { failed_step: usize, error: String },
}

/// Runs `steps` in order, calling `run_step(step_agent_name, current_message)`
/// for each one. Kept generic over the step-runner so it can be unit tested
/// without a live `ExecutionFacade`.
pub async fn run<F, Fut>(steps: &[String], initial_message: &str, mut run_step: F) -> SimpleWorkflowResult
where
    F: FnMut(String, String) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<String>>,
{
    if steps.is_empty() {
        return SimpleWorkflowResult::CompletedEmpty { final_message: initial_message.to_string() };
    }

    let mut current = initial_message.to_string();
    for (index, step_agent) in steps.iter().enumerate() {
        match run_step(step_agent.clone(), current.clone()).await {
            Ok(response) => current = response,
            Err(err) => return SimpleWorkflowResult::Failed { failed_step: index, error: err.to_string() },
        }
    }

    SimpleWorkflowResult::Completed { final_message: current }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_steps_returns_completed_empty() {
        let result = run(&[], "start", |_agent, _msg| async { Ok(String::new()) }).await;
        assert!(matches!(result, SimpleWorkflowResult::CompletedEmpty { final_message } if final_message == "start"));
    }

    #[tokio::test]
    async fn chains_step_output_into_next_step_input() {
        let steps = vec!["StepA".to_string(), "StepB".to_string()];
        let result = run(&steps, "start", |agent, msg| async move {
            Ok(format!("{agent}:{msg}"))
        })
        .await;

        match result {
            SimpleWorkflowResult::Completed { final_message } => {
                assert_eq!(final_message, "StepB:StepA:start");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn step_failure_stops_the_chain() {
        let steps = vec!["StepA".to_string(), "StepB".to_string()];
        let result = run(&steps, "start", |agent, _msg| async move {
            if agent == "StepA" {
                anyhow::bail!("boom")
            }
            Ok("unreachable".to_string())
        })
        .await;

        assert!(matches!(result, SimpleWorkflowResult::Failed { failed_step: 0, .. }));
    }
}
