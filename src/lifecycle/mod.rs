//! Foreground/background monitor.
//!
//! The host reports `active`, `inactive` or `background` whenever the app's
//! visibility changes. Leaving the foreground during a running session is a
//! distraction; coming back to a paused one asks whether to continue.

use std::str::FromStr;

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::timer::{TimerController, TimerStatus};

const ENABLE_LOGS: bool = false;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    pub fn is_foreground(self) -> bool {
        self == AppLifecycle::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppLifecycle::Active => "active",
            AppLifecycle::Inactive => "inactive",
            AppLifecycle::Background => "background",
        }
    }
}

impl FromStr for AppLifecycle {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(AppLifecycle::Active),
            "inactive" => Ok(AppLifecycle::Inactive),
            "background" => Ok(AppLifecycle::Background),
            other => bail!("unknown app lifecycle state '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEffect {
    Distraction,
    ResumePrompt,
    Ignored,
}

/// Decides what a lifecycle change means for a timer in `status`.
pub fn classify(previous: AppLifecycle, next: AppLifecycle, status: TimerStatus) -> LifecycleEffect {
    match status {
        TimerStatus::Running if previous.is_foreground() && !next.is_foreground() => {
            LifecycleEffect::Distraction
        }
        TimerStatus::Paused if !previous.is_foreground() && next.is_foreground() => {
            LifecycleEffect::ResumePrompt
        }
        _ => LifecycleEffect::Ignored,
    }
}

/// Feeds signals into the controller one at a time, in arrival order, until
/// the channel closes or `cancel` fires.
pub(crate) async fn monitor_loop(
    controller: TimerController,
    mut signals: mpsc::Receiver<AppLifecycle>,
    mut previous: AppLifecycle,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            signal = signals.recv() => {
                let Some(next) = signal else { break };
                let effect = controller.handle_lifecycle(previous, next).await;
                log_info!("lifecycle {} -> {}: {:?}", previous.as_str(), next.as_str(), effect);
                previous = next;
            }
        }
    }
    log_info!("lifecycle monitor stopped");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        db::SessionStore,
        timer::{interaction::testing::RecordingHost, PromptKind, TimerConfig},
    };

    use super::AppLifecycle::{Active, Background, Inactive};

    #[test]
    fn leaving_foreground_while_running_is_a_distraction() {
        assert_eq!(classify(Active, Background, TimerStatus::Running), LifecycleEffect::Distraction);
        assert_eq!(classify(Active, Inactive, TimerStatus::Running), LifecycleEffect::Distraction);
    }

    #[test]
    fn returning_to_paused_session_prompts() {
        assert_eq!(classify(Background, Active, TimerStatus::Paused), LifecycleEffect::ResumePrompt);
        assert_eq!(classify(Inactive, Active, TimerStatus::Paused), LifecycleEffect::ResumePrompt);
    }

    #[test]
    fn everything_else_is_ignored() {
        for status in [TimerStatus::Idle, TimerStatus::Finalizing] {
            for previous in [Active, Inactive, Background] {
                for next in [Active, Inactive, Background] {
                    assert_eq!(classify(previous, next, status), LifecycleEffect::Ignored);
                }
            }
        }
        assert_eq!(classify(Inactive, Background, TimerStatus::Running), LifecycleEffect::Ignored);
        assert_eq!(classify(Active, Active, TimerStatus::Running), LifecycleEffect::Ignored);
        assert_eq!(classify(Active, Background, TimerStatus::Paused), LifecycleEffect::Ignored);
        assert_eq!(classify(Background, Active, TimerStatus::Running), LifecycleEffect::Ignored);
    }

    #[test]
    fn parses_host_values() {
        assert_eq!("background".parse::<AppLifecycle>().unwrap(), Background);
        assert!("hidden".parse::<AppLifecycle>().is_err());
    }

    fn controller(dir: &tempfile::TempDir, host: Arc<RecordingHost>) -> TimerController {
        TimerController::new(
            SessionStore::new(dir.path().join("focus.sqlite3")),
            host.clone(),
            host,
            TimerConfig {
                target_minutes: 25,
                category: "Coding".into(),
                tick_interval: Duration::from_secs(3600),
            },
        )
    }

    #[tokio::test]
    async fn attached_monitor_applies_signals_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(RecordingHost::default());
        let controller = controller(&dir, host.clone());
        let (tx, rx) = mpsc::channel(8);
        controller.attach_lifecycle(rx, Active).await;
        controller.start().await;

        for signal in [Inactive, Background, Active] {
            tx.send(signal).await.unwrap();
        }
        drop(tx);

        let mut snapshots = controller.subscribe();
        snapshots
            .wait_for(|s| s.pending_prompt == Some(PromptKind::ResumeAfterReturn))
            .await
            .unwrap();
        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.state.distraction_count, 1);
        assert_eq!(snapshot.state.status, TimerStatus::Paused);
        assert_eq!(host.prompt_kinds(), vec![PromptKind::ResumeAfterReturn]);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn reattaching_replaces_the_previous_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(RecordingHost::default());
        let controller = controller(&dir, host);
        let (old_tx, old_rx) = mpsc::channel(8);
        let (new_tx, new_rx) = mpsc::channel(8);
        controller.attach_lifecycle(old_rx, Active).await;
        controller.attach_lifecycle(new_rx, Active).await;
        controller.start().await;

        // The first monitor is cancelled; its receiver is dropped with it.
        old_tx.closed().await;
        assert!(old_tx.send(Background).await.is_err());

        new_tx.send(Background).await.unwrap();
        let mut snapshots = controller.subscribe();
        snapshots
            .wait_for(|s| s.state.distraction_count == 1)
            .await
            .unwrap();
        controller.shutdown().await;
    }
}
