use httpmock::prelude::*;
use tokio::sync::watch;

use sprint_client::{run_deep_sprint, ClientConfig, FixedSteps, RunOutcome, SprintClient};
use sprint_run::{StepState, TabKey};

fn client_for(server: &MockServer) -> SprintClient {
    SprintClient::new(ClientConfig {
        base_url: server.base_url(),
        csrf_token: None,
        connect_timeout_ms: 5_000,
    })
    .expect("client should be created")
}

async fn run_with_body(titles: &[&str], body: &str) -> sprint_client::DeepSprintRun {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/execute_deep_sprint");
        then.status(200)
            .header("content-type", "application/x-ndjson")
            .body(body);
    });

    let client = client_for(&server);
    let source = FixedSteps::new(titles.iter().map(|t| t.to_string()).collect());
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    run_deep_sprint(&client, &source, cancel_rx, None).await
}

#[tokio::test]
async fn canonical_two_step_run_matches_expected_final_state() {
    let run = run_with_body(
        &["Gather sources", "Summarize"],
        concat!(
            "{\"step\":2,\"result\":\"ok2\",\"execution_time\":\"1.2s\"}\n",
            "{\"step\":1,\"result\":\"ok1\",\"execution_time\":\"0.8s\"}\n",
            "{\"final_report\":\"Done.\"}\n",
        ),
    )
    .await;

    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(
        run.tabs.tab_keys(),
        &[TabKey::Step(2), TabKey::Step(1), TabKey::Final]
    );
    assert_eq!(run.tabs.active(), Some(TabKey::Final));
    assert!(matches!(
        run.state.step(1).expect("step 1").state,
        StepState::Completed { .. }
    ));
    assert!(matches!(
        run.state.step(2).expect("step 2").state,
        StepState::Completed { .. }
    ));
    assert_eq!(run.state.final_report_text(), Some("Done."));
}

#[tokio::test]
async fn tab_count_is_steps_plus_final_regardless_of_permutation() {
    let forward = run_with_body(
        &["a", "b", "c"],
        concat!(
            "{\"step\":1,\"result\":\"r1\",\"execution_time\":\"1s\"}\n",
            "{\"step\":2,\"result\":\"r2\",\"execution_time\":\"1s\"}\n",
            "{\"step\":3,\"error\":\"boom\"}\n",
            "{\"final_report\":\"report\"}\n",
        ),
    )
    .await;
    let shuffled = run_with_body(
        &["a", "b", "c"],
        concat!(
            "{\"step\":3,\"error\":\"boom\"}\n",
            "{\"step\":1,\"result\":\"r1\",\"execution_time\":\"1s\"}\n",
            "{\"final_report\":\"report\"}\n",
            "{\"step\":2,\"result\":\"r2\",\"execution_time\":\"1s\"}\n",
        ),
    )
    .await;

    assert_eq!(forward.tabs.tab_count(), 4);
    assert_eq!(shuffled.tabs.tab_count(), 4);
    // Identical record content no matter the arrival order.
    assert_eq!(forward.state, shuffled.state);
}

#[tokio::test]
async fn out_of_range_and_duplicate_frames_do_not_grow_the_strip() {
    let run = run_with_body(
        &["only"],
        concat!(
            "{\"step\":1,\"result\":\"first\",\"execution_time\":\"1s\"}\n",
            "{\"step\":1,\"result\":\"second\",\"execution_time\":\"2s\"}\n",
            "{\"step\":2,\"result\":\"phantom\",\"execution_time\":\"1s\"}\n",
            "{\"final_report\":\"report\"}\n",
        ),
    )
    .await;

    assert_eq!(run.tabs.tab_keys(), &[TabKey::Step(1), TabKey::Final]);
    assert_eq!(run.stats.duplicate_steps, 1);
    assert_eq!(run.stats.out_of_range, 1);
    // Last write wins on the duplicate.
    assert_eq!(run.state.step_report_text(1), Some("second"));
}

#[tokio::test]
async fn step_frames_after_the_final_report_are_still_applied() {
    let run = run_with_body(
        &["a", "b"],
        concat!(
            "{\"step\":1,\"result\":\"r1\",\"execution_time\":\"1s\"}\n",
            "{\"final_report\":\"report\"}\n",
            "{\"step\":2,\"result\":\"late\",\"execution_time\":\"5s\"}\n",
        ),
    )
    .await;

    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(run.state.step_report_text(2), Some("late"));
    assert_eq!(
        run.tabs.tab_keys(),
        &[TabKey::Step(1), TabKey::Final, TabKey::Step(2)]
    );
    // Most recently resolved wins the active slot.
    assert_eq!(run.tabs.active(), Some(TabKey::Step(2)));
}

#[tokio::test]
async fn backend_reported_step_failure_renders_as_content() {
    let run = run_with_body(
        &["fragile"],
        concat!(
            "{\"step\":1,\"error\":\"search quota exhausted\"}\n",
            "{\"final_report\":\"partial report\"}\n",
        ),
    )
    .await;

    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(
        run.state.step(1).expect("step 1").state,
        StepState::Failed {
            error: "search quota exhausted".to_string(),
            execution_time: None,
        }
    );
    assert_eq!(run.stats.parse_failures, 0);
}
