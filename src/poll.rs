// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The reconciliation scheduler: an interval sleep that a ProjectMapping
//! watch can cut short, so CRD edits take effect without waiting out the
//! full polling interval.

use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::kubernetes::gateway::ClusterGateway;

/// A sleep that another task can cut short.
///
/// An interrupt with no sleeper in progress is latched: the next sleep
/// returns immediately, so a change notice delivered between sleeps is
/// never lost. Concurrent interrupts collapse into a single wakeup, and
/// the wakeup is consumed by the sleep it releases. At most one task may
/// sleep at a time.
pub struct InterruptibleSleep {
    notify: Notify,
}

impl InterruptibleSleep {
    pub fn new() -> Self {
        InterruptibleSleep {
            notify: Notify::new(),
        }
    }

    /// Block for up to `duration`, returning early when interrupted
    pub async fn sleep(&self, duration: Duration) {
        let _ = timeout(duration, self.notify.notified()).await;
    }

    /// Wake the current sleeper, or the next one if none is waiting
    pub fn interrupt(&self) {
        self.notify.notify_one();
    }
}

impl Default for InterruptibleSleep {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the reconciliation body on an interval, waking early whenever a
/// ProjectMapping changes in the cluster.
pub struct PollLoop {
    interval: Duration,
    sleep: Arc<InterruptibleSleep>,
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        PollLoop {
            interval,
            sleep: Arc::new(InterruptibleSleep::new()),
        }
    }

    /// Run `body` forever: each iteration opens a fresh watch on the
    /// ProjectMapping resources, runs the body, sleeps up to the polling
    /// interval, and closes the watch. Body failures are logged and never
    /// stop the loop; the loop only ends with the process.
    pub async fn with_polling<F, Fut>(
        &self,
        gateway: Arc<dyn ClusterGateway>,
        mut body: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        loop {
            let watcher = self.spawn_watcher(gateway.clone()).await;

            if let Err(e) = body().await {
                error!("Reconciliation pass failed: {:#}", e);
            }

            self.sleep.sleep(self.interval).await;

            // One watch per iteration, closed on every path
            if let Some(handle) = watcher {
                handle.abort();
            }
        }
    }

    /// Open a watch stream and hand it to a task that interrupts the
    /// sleep on the first change notice. A failure to open the watch is
    /// not fatal: the loop still polls on the interval.
    async fn spawn_watcher(&self, gateway: Arc<dyn ClusterGateway>) -> Option<JoinHandle<()>> {
        match gateway.watch_project_mappings().await {
            Ok(mut stream) => {
                let sleep = self.sleep.clone();
                Some(tokio::spawn(async move {
                    if let Some(notice) = stream.next().await {
                        match notice {
                            Ok(event) => debug!("ProjectMapping changed: {:?}", event),
                            Err(e) => warn!("ProjectMapping watch error: {}", e),
                        }
                        sleep.interrupt();
                    }
                }))
            }
            Err(e) => {
                warn!("Failed to open ProjectMapping watch: {}", e);
                None
            }
        }
    }
}
