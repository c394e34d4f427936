//! Structured reporting of statistics and running times as JSON.
//!
//! Reporting is disabled until `enable_reporting` is called, so library code can report
//! unconditionally. Values end up in a tree of JSON objects and arrays which mirrors the
//! nesting of the context guards that were alive when they were reported.
//! The whole tree is printed to stdout when the `ReportingGuard` is dropped.
//! The reporter is thread local: values reported from rayon worker threads are dropped.

use crate::built_info;
use serde_json::{Map, Value};
use std::{cell::RefCell, mem::replace};

pub use serde_json::json;

#[derive(Debug)]
enum Frame {
    // an object waiting for the value under `key` to be completed
    Object(Map<String, Value>, String),
    // an array waiting for the current item to be completed
    Collection(Vec<Value>),
}

#[derive(Debug)]
enum Current {
    Object(Map<String, Value>),
    Collection(Vec<Value>),
}

#[derive(Debug)]
pub struct Reporter {
    current: Current,
    stack: Vec<Frame>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter {
            current: Current::Object(Map::new()),
            stack: Vec::new(),
        }
    }
}

impl Reporter {
    fn take_object(&mut self, context: &str) -> Map<String, Value> {
        match replace(&mut self.current, Current::Object(Map::new())) {
            Current::Object(object) => object,
            Current::Collection(_) => panic!("{} is only possible inside an object context", context),
        }
    }

    fn open_object(&mut self, key: String) {
        let parent = self.take_object("creating a nested object");
        self.stack.push(Frame::Object(parent, key));
    }

    fn open_collection(&mut self, key: String) {
        let parent = self.take_object("creating a collection");
        self.stack.push(Frame::Object(parent, key));
        self.current = Current::Collection(Vec::new());
    }

    fn open_collection_item(&mut self) {
        match replace(&mut self.current, Current::Object(Map::new())) {
            Current::Collection(items) => self.stack.push(Frame::Collection(items)),
            Current::Object(_) => panic!("collection items can only be created in a collection context"),
        }
    }

    fn report(&mut self, key: String, val: Value) {
        match &mut self.current {
            Current::Object(object) => {
                let prev = object.insert(key, val);
                if !cfg!(feature = "report-allow-override") {
                    assert!(prev.is_none(), "reported the same key twice in one context");
                }
            }
            Current::Collection(_) => panic!("values can only be reported in an object context"),
        }
    }

    fn close(&mut self) {
        let finished = match replace(&mut self.current, Current::Object(Map::new())) {
            Current::Object(object) => Value::Object(object),
            Current::Collection(items) => Value::Array(items),
        };

        match self.stack.pop().expect("tried to close the root context") {
            Frame::Object(mut parent, key) => {
                let prev = parent.insert(key, finished);
                assert_eq!(prev, None);
                self.current = Current::Object(parent);
            }
            Frame::Collection(mut items) => {
                items.push(finished);
                self.current = Current::Collection(items);
            }
        }
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = RefCell::new(None);
}

fn with_reporter(f: impl FnOnce(&mut Reporter)) {
    REPORTER.with(|reporter| {
        if let Some(r) = reporter.borrow_mut().as_mut() {
            f(r)
        }
    });
}

/// Closes the object context opened by `push_context` when dropped.
#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

/// All values reported while the guard lives will be nested in an object under `key`.
pub fn push_context(key: String) -> ContextGuard {
    with_reporter(|r| r.open_object(key));
    ContextGuard(())
}

/// Closes the array context opened by `push_collection_context` when dropped.
#[must_use]
pub struct CollectionContextGuard(());

impl Drop for CollectionContextGuard {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

/// Open an array under `key`. Values have to be reported within items created through `push_collection_item`.
pub fn push_collection_context(key: String) -> CollectionContextGuard {
    with_reporter(|r| r.open_collection(key));
    CollectionContextGuard(())
}

impl CollectionContextGuard {
    pub fn push_collection_item(&mut self) -> CollectionItemContextGuard {
        with_reporter(Reporter::open_collection_item);
        CollectionItemContextGuard(self)
    }
}

#[must_use]
pub struct CollectionItemContextGuard<'a>(&'a CollectionContextGuard);

impl<'a> Drop for CollectionItemContextGuard<'a> {
    fn drop(&mut self) {
        with_reporter(Reporter::close);
    }
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    report_silent(key, val)
}

pub fn report_silent(key: String, val: Value) {
    with_reporter(|r| r.report(key, val));
}

/// Prints everything reported so far as a single JSON object when dropped.
#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| {
            if let Some(mut r) = reporter.borrow_mut().take() {
                assert!(r.stack.is_empty(), "reporting contexts still open");
                println!("{}", Value::Object(r.take_object("printing the report")));
            }
        });
    }
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { $crate::report::report($k.to_string(), $crate::report::json!($($json)+)) };
}

#[macro_export]
macro_rules! report_silent {
    ($k:expr, $($json:tt)+) => { $crate::report::report_silent($k.to_string(), $crate::report::json!($($json)+)) };
}

/// Enable reporting for the current thread and record build and environment information.
pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));

    report!("git_revision", built_info::GIT_VERSION.unwrap_or(""));
    report!("build_target", built_info::TARGET);
    report!("build_profile", built_info::PROFILE);
    report!("feature_flags", built_info::FEATURES_STR);
    report!("build_time", built_info::BUILT_TIME_UTC);
    report!("build_with_rustc", built_info::RUSTC_VERSION);

    if let Ok(hostname) = std::process::Command::new("hostname").output() {
        report!("hostname", String::from_utf8_lossy(&hostname.stdout).trim());
    }

    report!("program", program);
    report!("start_time", format!("{}", time::now_utc().rfc822()));
    report!("args", std::env::args().collect::<Vec<String>>());

    ReportingGuard(())
}

pub mod benchmark;
pub use benchmark::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Value {
        REPORTER.with(|reporter| match &reporter.borrow().as_ref().unwrap().current {
            Current::Object(object) => Value::Object(object.clone()),
            Current::Collection(items) => Value::Array(items.clone()),
        })
    }

    #[test]
    fn nested_contexts_build_json_tree() {
        REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));

        report!("graph", { "num_nodes": 3 });
        {
            let _ctxt = push_context("preparation".to_string());
            report!("shortcuts", 2);
        }
        {
            let mut runs = push_collection_context("runs".to_string());
            for i in 0..2 {
                let _item = runs.push_collection_item();
                report!("query", i);
            }
        }

        assert_eq!(
            snapshot(),
            json!({
                "graph": { "num_nodes": 3 },
                "preparation": { "shortcuts": 2 },
                "runs": [{ "query": 0 }, { "query": 1 }]
            })
        );

        REPORTER.with(|reporter| reporter.replace(None));
    }

    #[test]
    fn reporting_is_a_noop_when_disabled() {
        report!("ignored", 1);
        let _ctxt = push_context("also_ignored".to_string());
        REPORTER.with(|reporter| assert!(reporter.borrow().is_none()));
    }
}
