//! The queue-timeline profiling hook (§6 "VKD3D_QUEUE_PROFILE").
//!
//! The original keeps a ring of outstanding submissions per queue purely for
//! profiling/HUD correlation: an external collaborator (chrome-trace viewer,
//! in-process HUD, ...) wants to know when a batch was handed to the driver
//! and when the GPU actually retired it, without the submission engine
//! itself caring who's listening. [`QueueTimelineObserver`] is that seam.

use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

/// Identifies which [`CommandQueue`](crate::sync::command_queue::CommandQueue)
/// a timeline event belongs to, for collaborators tracking more than one queue.
pub type QueueLabel = &'static str;

/// Called by a queue's submission thread as batches are handed to the driver
/// and as the GPU retires them. Implementations must be cheap and non-blocking:
/// this runs inline on the submission thread, between the driver call and the
/// next mailbox entry.
pub trait QueueTimelineObserver: Send + Sync {
    /// A batch was just submitted to the driver, signaling `value` on `queue`'s
    /// internal timeline once the GPU completes it.
    fn on_enqueue(&self, queue: QueueLabel, value: u64, kind: &str);
    /// `queue`'s internal timeline has reached `value`: every batch retired at
    /// or before this value is now complete.
    fn on_retire(&self, queue: QueueLabel, value: u64);
}

/// Writes a [chrome://tracing](https://www.chromium.org/developers/how-tos/trace-event-profiling-tool/)
/// compatible JSON array to `VKD3D_PROFILE_PATH` (see [`Config::profile_path`](crate::core::config::Config::profile_path)),
/// one object per enqueue/retire event. Enabled by the `queue-profile` feature.
#[cfg(feature = "queue-profile")]
pub struct JsonQueueTimelineObserver {
    file: Mutex<File>,
    first: Mutex<bool>,
}

#[cfg(feature = "queue-profile")]
impl JsonQueueTimelineObserver {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = File::create(path)?;
        file.write_all(b"[\n")?;
        Ok(Self {
            file: Mutex::new(file),
            first: Mutex::new(true),
        })
    }

    fn write_event(&self, queue: QueueLabel, value: u64, phase: &str, kind: &str) {
        #[derive(serde::Serialize)]
        struct Event<'a> {
            name: &'a str,
            ph: &'a str,
            queue: &'a str,
            value: u64,
        }
        let event = Event {
            name: kind,
            ph: phase,
            queue,
            value,
        };
        let Ok(mut line) = serde_json::to_string(&event) else {
            return;
        };
        let mut first = self.first.lock().unwrap();
        if !*first {
            line.insert(0, ',');
        }
        *first = false;
        line.push('\n');
        let mut file = self.file.lock().unwrap();
        let _ = file.write_all(line.as_bytes());
    }
}

#[cfg(feature = "queue-profile")]
impl QueueTimelineObserver for JsonQueueTimelineObserver {
    fn on_enqueue(&self, queue: QueueLabel, value: u64, kind: &str) {
        self.write_event(queue, value, "B", kind);
    }

    fn on_retire(&self, queue: QueueLabel, value: u64) {
        self.write_event(queue, value, "E", "retire");
    }
}

#[cfg(all(test, feature = "queue-profile"))]
mod tests {
    use super::*;

    #[test]
    fn writes_events_as_json_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("d3d12vk-queue-profile-test-{:?}.json", std::thread::current().id()));
        let observer = JsonQueueTimelineObserver::create(&path).unwrap();
        observer.on_enqueue("graphics", 1, "ExecuteCommandLists");
        observer.on_retire("graphics", 1);
        drop(observer);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("ExecuteCommandLists"));
        assert!(contents.contains("\"ph\":\"E\""));
        let _ = std::fs::remove_file(&path);
    }
}
