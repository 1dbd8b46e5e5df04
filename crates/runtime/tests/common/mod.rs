//! Shared helpers for the stack-switching integration tests
#![allow(dead_code)]

use splice_runtime::{Host, RuntimeConfig, Value};
use std::sync::{Arc, Mutex};

/// Routines in the tests nest closures several levels deep
pub fn host() -> Host {
    splice_runtime::logging::init();
    Host::new(RuntimeConfig::default().with_stack_size(0x100000))
}

/// Records drops in order
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub struct Guard {
    name: String,
    log: Log,
}

impl Guard {
    pub fn new(log: &Log, name: impl Into<String>) -> Guard {
        Guard {
            name: name.into(),
            log: Arc::clone(log),
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.log.lock().unwrap().push(self.name.clone());
    }
}

pub fn ints(values: &[Value]) -> Vec<i64> {
    values.iter().map(|v| v.as_int().unwrap()).collect()
}
