use std::time::Duration;

use lunyard::adapters::LockManager;
use lunyard::QuickEditOptions;
use serial_test::serial;

use crate::helpers::fixture::Fixture;
use crate::helpers::lockmgr::TestLockManager;

#[test]
#[serial]
fn orchestrator_runs_with_an_in_memory_lock() {
    let fx = Fixture::serving(&[("music", 0)]);
    let api = fx.api_with_lock(Box::new(TestLockManager::new()));
    let res = api.quick_edit("music", |_w| Ok("done".into()), QuickEditOptions::default());
    assert!(res.success, "{}", res.message);
    assert!(!fx.cfg.lock_path.exists(), "file lock never used");
    assert!(!api.check_operation_in_progress().in_progress);
}

#[test]
#[serial]
fn in_memory_lock_reports_progress_while_held() {
    let fx = Fixture::serving(&[("music", 0)]);
    let mgr = TestLockManager::new();
    let guard = mgr.acquire_process_lock(50).unwrap();
    let api = fx.api_with_lock(Box::new(TestLockManager::new()));

    let st = api.check_operation_in_progress();
    assert!(st.in_progress);
    let res = api.quick_edit(
        "music",
        |_w| Ok("x".into()),
        QuickEditOptions {
            lock_timeout: Duration::from_millis(50),
            exec_timeout: Duration::from_secs(1),
        },
    );
    assert!(!res.success);
    drop(guard);
    assert!(!api.check_operation_in_progress().in_progress);
}

#[test]
#[serial]
fn in_memory_guard_can_be_released_from_another_thread() {
    let mgr = TestLockManager::new();
    let guard = mgr.acquire_process_lock(50).unwrap();
    assert!(mgr.acquire_process_lock(20).is_err());

    std::thread::spawn(move || drop(guard)).join().unwrap();

    assert!(mgr.holder_age().is_none());
    let again = mgr.acquire_process_lock(50).expect("free after release");
    drop(again);
}
