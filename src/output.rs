// Script log output.
//
// The log node forwards its text to a sink the host installs once at
// startup. An instance may carry its own sink instead (tests do);
// with neither in place the log node is a no-op.

use std::sync::RwLock;


type Sink = Box<dyn Fn(&str) + Send + Sync>;

lazy_static! {
    static ref LOG_SINK: RwLock<Option<Sink>> = RwLock::new(None);
}


// Install the process-wide sink. Call once at startup.
pub fn install<F>(sink: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    *LOG_SINK.write().unwrap() = Some(Box::new(sink));
}

pub fn uninstall() {
    *LOG_SINK.write().unwrap() = None;
}

// Forward one script log line to the installed sink, if any.
pub fn emit(message: &str) {
    if let Some(sink) = LOG_SINK.read().unwrap().as_ref() {
        sink(message);
    }
}
