use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use lunyard::QuickEditOptions;

use crate::helpers::fixture::Fixture;

#[test]
fn concurrent_edits_on_different_partitions_never_overlap() {
    let fx = Fixture::serving(&[("lightshow", 1), ("music", 2)]);
    let barrier = Arc::new(Barrier::new(2));
    let opts = QuickEditOptions {
        lock_timeout: Duration::from_secs(10),
        exec_timeout: Duration::from_secs(5),
    };

    let handles: Vec<_> = ["lightshow", "music"]
        .into_iter()
        .map(|name| {
            // Separate orchestrator values share only the lock file and the host.
            let api = fx.api();
            let b = barrier.clone();
            thread::spawn(move || {
                b.wait();
                api.quick_edit(
                    name,
                    |_w| {
                        thread::sleep(Duration::from_millis(300));
                        Ok("slow edit".into())
                    },
                    opts,
                )
            })
        })
        .collect();

    for h in handles {
        let res = h.join().unwrap();
        assert!(res.success, "{}", res.message);
    }
    let st = fx.sys.state();
    assert_eq!(st.max_active_rw, 1, "read-write windows overlapped");
    assert_eq!(st.active_rw, 0);
}
