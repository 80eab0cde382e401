use procura_core::config::LoadOptions;
use procura_core::domain::request::RequestId;
use procura_engine::bootstrap;

use crate::commands::{
    bootstrap_failure, current_thread_runtime, demo, engine_failure, render_ranking,
    CommandResult, StepFailure,
};

pub fn run(request_id: &str, top: Option<usize>) -> CommandResult {
    if top == Some(0) {
        return CommandResult::failure("rank", "validation_error", "--top must be at least 1", 2);
    }

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("rank", error_class, message, exit_code);
        }
    };

    let request_id = RequestId(request_id.trim().to_string());
    let result = runtime.block_on(async {
        let app = bootstrap(LoadOptions::default()).await.map_err(bootstrap_failure)?;
        let outcome = demo::engine(&app).rank_bids(&request_id, top).await.map_err(engine_failure);
        app.db_pool.close().await;
        let ranked = outcome?;
        Ok::<String, StepFailure>(format!("ranking for {request_id}:\n{}", render_ranking(&ranked)))
    });

    CommandResult::from_step("rank", result)
}
