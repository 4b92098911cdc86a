use std::time::Duration;

use serial_test::serial;

use fifoline::Session;

use super::test_helpers::cat_config;

fn kill_child(pid: u32) {
    let pid = nix::unistd::Pid::from_raw(i32::try_from(pid).expect("pid fits"));
    nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGKILL).expect("sigkill delivered");
}

#[tokio::test]
#[serial]
async fn relaunches_exactly_one_child_after_external_kill() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut session = Session::connect(cat_config(temp.path())).expect("session connects");

    session.ensure_running().await.expect("first launch");
    let first_pid = session.child_id().expect("child running");

    kill_child(first_pid);
    tokio::time::sleep(Duration::from_millis(200)).await;

    session.ensure_running().await.expect("heal");
    let second_pid = session.child_id().expect("child relaunched");
    assert_ne!(first_pid, second_pid, "a new child must be launched");

    session.ensure_running().await.expect("steady state");
    assert_eq!(
        session.child_id(),
        Some(second_pid),
        "healing must not spawn further children"
    );
}

#[tokio::test]
#[serial]
async fn queue_serves_the_relaunched_child() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut session = Session::connect(cat_config(temp.path())).expect("session connects");

    session.ensure_running().await.expect("first launch");
    let first_pid = session.child_id().expect("child running");

    kill_child(first_pid);
    tokio::time::sleep(Duration::from_millis(200)).await;

    session.ensure_running().await.expect("heal");
    assert!(session.reader_alive(), "a reader must be serving the queue");

    // The output pipe is held in duplex mode, so the surviving reader did
    // not see EOF when the first child died; it now serves the new one.
    session.send("after-heal").expect("send").send("[end]").expect("send");
    let response = session
        .read_response(Some(Duration::from_secs(5)))
        .await
        .expect("response collected");

    assert_eq!(response.lines, vec!["after-heal\n".to_owned()]);
    assert!(response.complete);
}

#[tokio::test]
#[serial]
async fn dead_child_mid_response_reports_incomplete() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut session = Session::connect(cat_config(temp.path())).expect("session connects");

    session.ensure_running().await.expect("launch");
    session.send("partial").expect("send");

    // Give the echo time to arrive, then kill the child before a sentinel
    // is ever produced.
    tokio::time::sleep(Duration::from_millis(200)).await;
    kill_child(session.child_id().expect("child running"));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = session
        .read_response(Some(Duration::from_millis(300)))
        .await
        .expect("collection ends on timeout");

    assert_eq!(response.lines, vec!["partial\n".to_owned()]);
    assert!(!response.complete, "dead child surfaces as incomplete data");
}
