//! Log forwarding to the host callback

use std::ffi::{CString, c_char};
use std::fmt::Write;
use std::sync::Once;

use parking_lot::{RwLock, const_rwlock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Host log sink; receives one NUL-terminated line per event
pub type LogCallback = extern "C" fn(*const c_char);

static CALLBACK: RwLock<Option<LogCallback>> = const_rwlock(None);

pub fn set_callback(callback: Option<LogCallback>) {
    *CALLBACK.write() = callback;
}

/// Install the process-wide subscriber; later calls are no-ops
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let stderr = cfg!(debug_assertions).then(|| fmt::layer().with_writer(std::io::stderr));

        // Fails only if the embedding process already set a global default.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(CallbackLayer)
            .with(stderr)
            .try_init();
    });
}

/// Renders events into single lines for [`LogCallback`]
struct CallbackLayer;

impl<S: Subscriber> Layer<S> for CallbackLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // Copy the pointer out so the callback may re-register itself.
        let Some(callback) = *CALLBACK.read() else {
            return;
        };

        let mut line = LineRecorder::default();
        event.record(&mut line);

        let meta = event.metadata();
        let text = format!("[{}] {}", meta.level(), line.finish());
        if let Ok(text) = CString::new(text) {
            callback(text.as_ptr());
        }
    }
}

#[derive(Default)]
struct LineRecorder {
    message: String,
    fields: String,
}

impl LineRecorder {
    fn finish(self) -> String {
        self.message + &self.fields
    }
}

impl Visit for LineRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::ffi::CStr;

    static LINES: Mutex<Vec<String>> = parking_lot::const_mutex(Vec::new());

    extern "C" fn capture(line: *const c_char) {
        let line = unsafe { CStr::from_ptr(line) }.to_string_lossy().into_owned();
        LINES.lock().push(line);
    }

    #[test]
    fn test_events_reach_callback() {
        init();
        set_callback(Some(capture));

        tracing::warn!(destination = "rtsp://host/test", "open failed after {} tries", 3);

        let lines = LINES.lock().clone();
        assert!(
            lines.iter().any(|l| l.starts_with("[WARN] open failed after 3 tries")
                && l.contains("destination=rtsp://host/test")),
            "{lines:?}"
        );

        // Calling init again must not panic or replace the subscriber.
        init();
    }
}
