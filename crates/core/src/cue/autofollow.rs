use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::messages::EngineCommand;

/// Single-slot delayed transition into the next cue.
///
/// At most one timer is armed at any moment: arming always cancels the
/// previous handle first. Cancellation is best-effort — a timer that has
/// already fired leaves a command in the channel, which at worst re-executes
/// its target cue once. The engine treats that as a benign race.
///
/// Must be used from within a tokio runtime.
pub struct AutofollowScheduler {
    commands: mpsc::Sender<EngineCommand>,
    /// Delays are quantized to whole frames at this rate, the host's native
    /// delay unit.
    frame_rate: f64,
    handle: Option<JoinHandle<()>>,
}

impl AutofollowScheduler {
    pub fn new(commands: mpsc::Sender<EngineCommand>, frame_rate: f64) -> Self {
        Self {
            commands,
            frame_rate,
            handle: None,
        }
    }

    /// Arm a transition to `target_index` after `duration_secs`. Replaces any
    /// previously armed timer.
    pub fn arm(&mut self, target_index: u32, duration_secs: f64) {
        self.cancel();

        let frames = (duration_secs * self.frame_rate).round().max(1.0);
        let delay = Duration::from_secs_f64(frames / self.frame_rate);
        log::debug!(
            "Arming autofollow: index {} in {:.3}s ({} frames)",
            target_index,
            delay.as_secs_f64(),
            frames as u64
        );

        let commands = self.commands.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            log::info!("Autofollow fired for cue index {}", target_index);
            if commands
                .send(EngineCommand::Go {
                    index: target_index,
                })
                .await
                .is_err()
            {
                log::warn!("Autofollow target dropped; engine channel closed");
            }
        }));
    }

    /// Abort the armed timer, if any. Safe to call when idle.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("Cancelled pending autofollow");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutofollowScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
