// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The cooperative progress-reporting channel from the workspace core to
//! an editor client (spec §4.G).
//!
//! A [`Tracker`] maps a client-assigned-or-random token to an in-flight
//! [`WorkDone`] handle. `Start` either creates a real progress item via
//! the [`Client`] or, if the client does not advertise work-done
//! progress, falls back to a single informational message. `Report` and
//! `End` become no-ops once the work has been cancelled; exactly one
//! `End` is expected to follow a successful `Start`.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

/// Token identifying one piece of in-flight work. The wire shape is a
/// string (spec §6 "Token shape: string").
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProgressToken(pub String);

impl ProgressToken {
    /// Generates a token when the caller does not supply one, mirroring
    /// `Start(title, message, token?, cancel?)`'s optional token.
    pub fn random() -> Self {
        let n: u64 = rand::thread_rng().gen();
        ProgressToken(format!("wscore-{n:016x}"))
    }
}

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three value variants a `$/progress` notification can carry (spec
/// §6 Client boundary).
#[derive(Clone, Debug)]
pub enum ProgressValue {
    Begin {
        title: String,
        message: Option<String>,
        cancellable: bool,
    },
    Report {
        message: Option<String>,
        percentage: Option<u32>,
        cancellable: bool,
    },
    End {
        message: Option<String>,
    },
}

/// Capability subset of the language-server protocol this core depends
/// on (spec §6 Client boundary). The core never talks to the wire
/// directly -- it only consumes this trait, the same way it only
/// consumes `*parsed-file` values at the parser boundary without
/// constructing them.
#[async_trait::async_trait]
pub trait Client: Send + Sync {
    /// Equivalent to LSP `window/showMessage`.
    async fn show_message(&self, message: &str);

    /// Equivalent to LSP `window/workDoneProgress/create`. Returns
    /// `true` if the client accepted (and therefore advertises
    /// work-done-progress support), `false` otherwise.
    async fn work_done_progress_create(&self, token: &ProgressToken) -> bool;

    /// Equivalent to LSP `$/progress`.
    async fn progress(&self, token: &ProgressToken, value: ProgressValue);
}

/// A cancellation callback registered by the work that created a
/// `WorkDone` handle. Invoked at most once by [`Tracker::cancel`].
pub type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Eq, PartialEq)]
enum WorkDoneState {
    Active,
    Cancelled,
    Ended,
}

struct WorkDoneInner {
    client: Arc<dyn Client>,
    token: ProgressToken,
    /// `true` once `work_done_progress_create` succeeded and a real
    /// progress item is live; `false` means we fell back to a single
    /// `show_message` and further `Report`/`End` calls are no-ops.
    live: bool,
    state: WorkDoneState,
}

/// Handle to one piece of in-flight work. Obtained from
/// [`Tracker::start`].
pub struct WorkDone {
    inner: Mutex<WorkDoneInner>,
}

impl WorkDone {
    /// Reports incremental progress. A no-op once the work has been
    /// cancelled or ended (spec §4.G).
    pub async fn report(&self, message: Option<String>, percentage: Option<u32>) {
        let guard = self.inner.lock().await;
        if guard.state != WorkDoneState::Active {
            return;
        }
        if guard.live {
            guard
                .client
                .progress(
                    &guard.token,
                    ProgressValue::Report {
                        message,
                        percentage,
                        cancellable: true,
                    },
                )
                .await;
        }
    }

    /// Ends the work. A no-op if already ended or cancelled; otherwise
    /// exactly one `End` event is sent to the client.
    pub async fn end(&self, message: Option<String>) {
        let mut guard = self.inner.lock().await;
        if guard.state != WorkDoneState::Active {
            return;
        }
        if guard.live {
            guard
                .client
                .progress(&guard.token, ProgressValue::End { message })
                .await;
        }
        guard.state = WorkDoneState::Ended;
    }

    async fn mark_cancelled(&self) {
        let mut guard = self.inner.lock().await;
        if guard.state == WorkDoneState::Active {
            guard.state = WorkDoneState::Cancelled;
        }
    }
}

struct TrackedWork {
    handle: Arc<WorkDone>,
    cancel: Option<CancelCallback>,
}

/// Maps tokens to in-flight work. One `Tracker` per session; shared
/// across every long-running query that wants to report progress.
#[derive(Clone)]
pub struct Tracker {
    client: Arc<dyn Client>,
    inner: Arc<Mutex<HashMap<ProgressToken, TrackedWork>>>,
}

impl Tracker {
    pub fn new(client: Arc<dyn Client>) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a new piece of tracked work. If the client does not
    /// advertise work-done-progress support, falls back to a single
    /// `show_message` call instead of a `Begin`/`Report*`/`End`
    /// sequence.
    ///
    /// The `cancel` callback, if any, is invoked exactly once by
    /// [`Tracker::cancel`], and never by anything else -- in particular,
    /// dropping the returned handle does not invoke it.
    pub async fn start(
        &self,
        title: impl Into<String>,
        message: Option<String>,
        token: Option<ProgressToken>,
        cancel: Option<CancelCallback>,
    ) -> Arc<WorkDone> {
        let token = token.unwrap_or_else(ProgressToken::random);
        let title = title.into();
        let live = self.client.work_done_progress_create(&token).await;

        if live {
            self.client
                .progress(
                    &token,
                    ProgressValue::Begin {
                        title,
                        message,
                        cancellable: cancel.is_some(),
                    },
                )
                .await;
        } else {
            debug!(%token, "client has no work-done-progress support, falling back to show_message");
            let text = match message {
                Some(m) => format!("{title}: {m}"),
                None => title,
            };
            self.client.show_message(&text).await;
        }

        let handle = Arc::new(WorkDone {
            inner: Mutex::new(WorkDoneInner {
                client: Arc::clone(&self.client),
                token: token.clone(),
                live,
                state: WorkDoneState::Active,
            }),
        });

        self.inner.lock().await.insert(
            token,
            TrackedWork {
                handle: Arc::clone(&handle),
                cancel,
            },
        );
        handle
    }

    /// Invokes the registered cancellation callback for `token`, if any,
    /// exactly once. Repeated cancellation of the same token is
    /// idempotent -- the callback is taken out of the map on first
    /// cancellation, so later calls find nothing to invoke.
    pub async fn cancel(&self, token: &ProgressToken) {
        let (handle, cancel) = {
            let mut guard = self.inner.lock().await;
            match guard.get_mut(token) {
                Some(tracked) => (Arc::clone(&tracked.handle), tracked.cancel.take()),
                None => {
                    debug!(%token, "cancel requested for an unknown or already-forgotten token");
                    return;
                }
            }
        };
        debug!(%token, "cancelling progress work");
        handle.mark_cancelled().await;
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Removes bookkeeping for a token once its work has ended. Callers
    /// normally do this right after `WorkDone::end`.
    pub async fn forget(&self, token: &ProgressToken) {
        self.inner.lock().await.remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingClient {
        advertises_progress: bool,
        messages: Mutex<Vec<String>>,
        events: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Client for RecordingClient {
        async fn show_message(&self, message: &str) {
            self.messages.lock().await.push(message.to_string());
        }

        async fn work_done_progress_create(&self, _token: &ProgressToken) -> bool {
            self.advertises_progress
        }

        async fn progress(&self, _token: &ProgressToken, value: ProgressValue) {
            let label = match value {
                ProgressValue::Begin { .. } => "begin",
                ProgressValue::Report { .. } => "report",
                ProgressValue::End { .. } => "end",
            };
            self.events.lock().await.push(label.to_string());
        }
    }

    #[tokio::test]
    async fn start_report_end_sequence() {
        let client = Arc::new(RecordingClient {
            advertises_progress: true,
            ..Default::default()
        });
        let tracker = Tracker::new(client.clone());
        let handle = tracker.start("indexing", None, None, None).await;
        handle.report(Some("50%".into()), Some(50)).await;
        handle.end(None).await;

        let events = client.events.lock().await;
        assert_eq!(*events, vec!["begin", "report", "end"]);
    }

    #[tokio::test]
    async fn falls_back_to_show_message_without_progress_support() {
        let client = Arc::new(RecordingClient {
            advertises_progress: false,
            ..Default::default()
        });
        let tracker = Tracker::new(client.clone());
        let handle = tracker
            .start("indexing", Some("starting".into()), None, None)
            .await;
        handle.report(Some("ignored".into()), None).await;
        handle.end(None).await;

        assert!(client.events.lock().await.is_empty());
        assert_eq!(client.messages.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn report_and_end_are_noops_after_cancel() {
        let client = Arc::new(RecordingClient {
            advertises_progress: true,
            ..Default::default()
        });
        let tracker = Tracker::new(client.clone());
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled2 = cancelled.clone();
        let token = ProgressToken("tok".into());
        let handle = tracker
            .start(
                "indexing",
                None,
                Some(token.clone()),
                Some(Box::new(move || {
                    cancelled2.store(true, Ordering::SeqCst);
                })),
            )
            .await;

        tracker.cancel(&token).await;
        assert!(cancelled.load(Ordering::SeqCst));

        handle.report(Some("after-cancel".into()), None).await;
        handle.end(None).await;

        // Only the initial "begin" event was recorded -- report/end after
        // cancellation are no-ops.
        assert_eq!(*client.events.lock().await, vec!["begin"]);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let client = Arc::new(RecordingClient {
            advertises_progress: true,
            ..Default::default()
        });
        let tracker = Tracker::new(client);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let token = ProgressToken("tok".into());
        tracker
            .start(
                "indexing",
                None,
                Some(token.clone()),
                Some(Box::new(move || {
                    calls2.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .await;

        tracker.cancel(&token).await;
        tracker.cancel(&token).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
