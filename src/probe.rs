//! Advisory process-table probe
//!
//! Best-effort check for a conflicting external invocation already running
//! for a (source, target) pair, e.g. one started by another process or a
//! cron job. The scan runs on a helper thread bounded by `recv_timeout`;
//! any failure (timeout, scan error) degrades to `false`. Never errors.

use crossbeam::channel::bounded;
use std::path::Path;
use std::time::Duration;
use sysinfo::System;

/// True if some other process appears to be running `tool` over the given
/// source (and target, when supplied). `false` on timeout or any failure.
pub(crate) fn has_conflicting_process(
    tool: &str,
    source: &Path,
    target: Option<&Path>,
    timeout: Duration,
) -> bool {
    let (tx, rx) = bounded(1);
    let tool = tool.to_string();
    let source = source.to_path_buf();
    let target = target.map(Path::to_path_buf);

    std::thread::spawn(move || {
        let found = scan(&tool, &source, target.as_deref());
        let _ = tx.send(found);
    });

    match rx.recv_timeout(timeout) {
        Ok(found) => found,
        Err(_) => {
            tracing::debug!("process probe timed out after {:?}", timeout);
            false
        }
    }
}

fn scan(tool: &str, source: &Path, target: Option<&Path>) -> bool {
    let sys = System::new_all();
    let own_pid = sysinfo::get_current_pid().ok();

    let source = source.to_string_lossy();
    let target = target.map(|t| t.to_string_lossy().into_owned());

    for (pid, process) in sys.processes() {
        if Some(*pid) == own_pid {
            continue;
        }
        if !process.name().to_string_lossy().contains(tool) {
            continue;
        }

        let cmdline: Vec<String> = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        let mentions_source = cmdline.iter().any(|arg| arg.contains(source.as_ref()));
        let mentions_target = target
            .as_ref()
            .map_or(true, |t| cmdline.iter().any(|arg| arg.contains(t.as_str())));

        if mentions_source && mentions_target {
            tracing::debug!("found conflicting {} invocation (pid {})", tool, pid);
            return true;
        }
    }

    false
}
