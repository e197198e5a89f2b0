use std::io::{self, Write};
use std::time::Duration;

use console::style;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const INTERVAL: Duration = Duration::from_millis(100);
const CLEAR_LINE: &str = "\r\x1b[2K";

/// A "Thinking" indicator redrawn by a background task until stopped
pub struct Spinner {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start drawing. Must be called from within the tokio runtime.
    pub fn start() -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(INTERVAL);
            for frame in FRAMES.iter().cycle() {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        print!("\r{}", style(format!("⏺ Thinking {frame}")).dim());
                        let _ = io::stdout().flush();
                    }
                }
            }
        });

        Self {
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Stop drawing and clear the line. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        let _ = stop.send(());
        // The task only runs between our awaits, so once signalled it never draws again
        self.task.take();
        print!("{CLEAR_LINE}");
        let _ = io::stdout().flush();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_ends_the_task() {
        let mut spinner = Spinner::start();
        assert!(spinner.stop.is_some());

        let task = spinner.task.take().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        spinner.stop();
        assert!(spinner.stop.is_none());

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("spinner task should finish")
            .unwrap();

        spinner.stop();
    }
}
