//! Measuring how long preparation steps and queries take.

use super::*;
use std::sync::atomic::{compiler_fence, Ordering::SeqCst};
use std::time::*;

/// Run the lambda, print how long it took to stderr, report the time in ms as `running_time_ms`
/// and return the result of the lambda.
pub fn report_time<Out, F: FnOnce() -> Out>(name: &str, f: F) -> Out {
    report_time_with_key(name, "running_time_ms", f)
}

/// Run the lambda, print how long it took to stderr, report the time in ms under the given key
/// and return the result of the lambda.
pub fn report_time_with_key<Out, F: FnOnce() -> Out>(name: &str, key: &'static str, f: F) -> Out {
    eprintln!("starting {}", name);
    let (res, t_passed) = measure(f);
    let t_passed = t_passed.as_secs_f64() * 1000.0;
    eprintln!("{} done - took: {}ms", name, t_passed);
    report!(key, t_passed);
    res
}

/// Run the lambda and report the time in ms under the given key without printing anything.
pub fn silent_report_time_with_key<Out, F: FnOnce() -> Out>(key: &'static str, f: F) -> Out {
    let (res, t_passed) = measure(f);
    report_silent!(key, t_passed.as_secs_f64() * 1000.0);
    res
}

/// Run the lambda and return a tuple of its result and the time it took.
pub fn measure<Out, F: FnOnce() -> Out>(f: F) -> (Out, Duration) {
    compiler_fence(SeqCst);
    let start = Instant::now();
    let res = f();
    let t_passed = start.elapsed();
    compiler_fence(SeqCst);
    (res, t_passed)
}
