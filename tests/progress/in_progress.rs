use std::time::Duration;

use lunyard::constants::{CLEANUP_ALLOWANCE_SECS, LOCK_STALE_SECS};

use crate::helpers::fixture::Fixture;

#[test]
fn idle_system_reports_nothing() {
    let fx = Fixture::serving(&[("music", 0)]);
    let st = fx.api().check_operation_in_progress();
    assert!(!st.in_progress);
    assert_eq!(st.lock_age, None);
    assert_eq!(st.estimated_seconds_remaining, None);
}

#[test]
fn fresh_lock_yields_estimate() {
    let fx = Fixture::serving(&[("music", 0)]);
    fx.plant_lock(Duration::from_secs(20));
    let st = fx.api().check_operation_in_progress();
    assert!(st.in_progress);
    let age = st.lock_age.unwrap();
    assert!(age >= Duration::from_secs(20));
    let budget = fx.cfg.timeouts.exec_secs + CLEANUP_ALLOWANCE_SECS;
    let est = st.estimated_seconds_remaining.unwrap();
    assert!(est <= budget - 20 && est + 2 >= budget - 20, "{est}");
}

#[test]
fn estimate_floors_at_zero() {
    let fx = Fixture::serving(&[("music", 0)]);
    fx.plant_lock(Duration::from_secs(LOCK_STALE_SECS - 5));
    let st = fx.api().check_operation_in_progress();
    assert!(st.in_progress);
    assert_eq!(st.estimated_seconds_remaining, Some(0));
}

#[test]
fn stale_lock_is_not_in_progress_and_is_not_removed_by_polling() {
    let fx = Fixture::serving(&[("music", 0)]);
    fx.plant_lock(Duration::from_secs(LOCK_STALE_SECS + 10));
    let st = fx.api().check_operation_in_progress();
    assert!(!st.in_progress);
    assert!(st.lock_age.unwrap() >= Duration::from_secs(LOCK_STALE_SECS));
    assert!(fx.cfg.lock_path.exists());
}
