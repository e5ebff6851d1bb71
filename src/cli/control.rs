//! Handlers for the `halt` / `resume` commands.
//!
//! The kill-switch latch lives in the running process; these commands only
//! tell the operator how to act on it.

pub fn halt() {
    println!("halt acts on a running engine: stop the `pairlock run` process (Ctrl+C),");
    println!("or wait for the kill switch to latch on its configured thresholds.");
}

pub fn resume() {
    println!("resume acts on a running engine: restart `pairlock run` to clear the");
    println!("kill-switch latch. Rolling risk-event counts persist in the ledger and");
    println!("a still-breaching window will re-trip on the next book update.");
}
