use std::time::Duration;

use lunyard::constants::LOCK_STALE_SECS;
use lunyard::QuickEditOptions;

use crate::helpers::fixture::Fixture;

#[test]
fn stale_lock_from_crashed_run_is_reaped() {
    let fx = Fixture::serving(&[("lightshow", 1)]);
    fx.plant_lock(Duration::from_secs(LOCK_STALE_SECS + 10));
    let api = fx.api();

    assert!(!api.check_operation_in_progress().in_progress);
    let res = api.quick_edit(
        "lightshow",
        |_w| Ok("after crash".into()),
        QuickEditOptions {
            lock_timeout: Duration::from_millis(200),
            exec_timeout: Duration::from_secs(5),
        },
    );
    assert!(res.success, "{}", res.message);
    assert!(!fx.cfg.lock_path.exists());
}

#[test]
fn fresh_foreign_lock_is_respected() {
    let fx = Fixture::serving(&[("lightshow", 1)]);
    fx.plant_lock(Duration::from_secs(30));
    let res = fx.api().quick_edit(
        "lightshow",
        |_w| Ok("x".into()),
        QuickEditOptions {
            lock_timeout: Duration::from_millis(150),
            exec_timeout: Duration::from_secs(5),
        },
    );
    assert!(!res.success);
    assert!(res.message.contains("another operation is in progress"));
    assert!(fx.cfg.lock_path.exists(), "a live holder's record must survive");
}
