//! Foreground location permission.
//!
//! [`verify_permissions`] is the only policy here: ask when undetermined,
//! never re-ask after a denial. Providers just report and request.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::PermissionError;
use crate::events::Event;

/// The current status of the foreground location permission.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Undetermined,
    Denied,
    Granted,
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionResponse {
    pub status: PermissionStatus,
    pub granted: bool,
}

impl From<bool> for PermissionResponse {
    fn from(granted: bool) -> Self {
        Self {
            status: if granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            },
            granted,
        }
    }
}

pub trait PermissionProvider {
    fn status(&self) -> PermissionStatus;

    /// Prompts the user. Only called while the status is undetermined.
    fn request(&self)
        -> impl Future<Output = Result<PermissionResponse, PermissionError>> + Send;
}

/// Returns whether the location may be read, prompting only when the
/// status is still undetermined.
///
/// A failed prompt counts as "not granted".
pub async fn verify_permissions<P: PermissionProvider>(provider: &P) -> bool {
    match provider.status() {
        PermissionStatus::Undetermined => match provider.request().await {
            Ok(response) => response.granted,
            Err(e) => {
                warn!("Location permission request failed: {}", e);
                false
            }
        },
        PermissionStatus::Denied => false,
        PermissionStatus::Granted => true,
    }
}

/// Asks the user through the UI event loop and remembers the answer.
pub struct PromptPermission {
    status: Mutex<PermissionStatus>,
    ui_tx: mpsc::UnboundedSender<Event>,
}

impl PromptPermission {
    pub fn new(initial: PermissionStatus, ui_tx: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            status: Mutex::new(initial),
            ui_tx,
        }
    }

    fn set_status(&self, status: PermissionStatus) {
        match self.status.lock() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }
}

impl PermissionProvider for PromptPermission {
    fn status(&self) -> PermissionStatus {
        match self.status.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    async fn request(&self) -> Result<PermissionResponse, PermissionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.ui_tx
            .send(Event::PermissionPrompt(reply_tx))
            .map_err(|_| PermissionError::Unavailable)?;

        let granted = reply_rx.await.map_err(|_| PermissionError::Unavailable)?;
        let response = PermissionResponse::from(granted);
        self.set_status(response.status);
        info!("Location permission answered: {:?}", response.status);
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed status with a scripted answer; counts prompts.
    pub struct StubPermission {
        pub status: PermissionStatus,
        pub answer: bool,
        pub requests: AtomicUsize,
    }

    impl StubPermission {
        pub fn new(status: PermissionStatus, answer: bool) -> Self {
            Self {
                status,
                answer,
                requests: AtomicUsize::new(0),
            }
        }

        pub fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    impl PermissionProvider for StubPermission {
        fn status(&self) -> PermissionStatus {
            self.status
        }

        async fn request(&self) -> Result<PermissionResponse, PermissionError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(PermissionResponse::from(self.answer))
        }
    }

    #[tokio::test]
    async fn undetermined_prompts_and_returns_answer() {
        let granted = StubPermission::new(PermissionStatus::Undetermined, true);
        assert!(verify_permissions(&granted).await);
        assert_eq!(granted.requests(), 1);

        let refused = StubPermission::new(PermissionStatus::Undetermined, false);
        assert!(!verify_permissions(&refused).await);
        assert_eq!(refused.requests(), 1);
    }

    #[tokio::test]
    async fn denied_returns_false_without_prompt() {
        let stub = StubPermission::new(PermissionStatus::Denied, true);
        assert!(!verify_permissions(&stub).await);
        assert_eq!(stub.requests(), 0);
    }

    #[tokio::test]
    async fn granted_returns_true_without_prompt() {
        let stub = StubPermission::new(PermissionStatus::Granted, false);
        assert!(verify_permissions(&stub).await);
        assert_eq!(stub.requests(), 0);
    }

    #[tokio::test]
    async fn prompt_round_trips_through_ui_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let perm = PromptPermission::new(PermissionStatus::Undetermined, tx);

        let ui = tokio::spawn(async move {
            match rx.recv().await {
                Some(Event::PermissionPrompt(reply)) => reply.send(true).unwrap(),
                _ => panic!("expected a permission prompt"),
            }
        });

        assert!(verify_permissions(&perm).await);
        ui.await.unwrap();
        assert_eq!(perm.status(), PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn prompt_without_ui_is_not_granted() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let perm = PromptPermission::new(PermissionStatus::Undetermined, tx);

        assert!(!verify_permissions(&perm).await);
        assert_eq!(perm.status(), PermissionStatus::Undetermined);
    }

    #[tokio::test]
    async fn dropped_reply_is_not_granted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let perm = PromptPermission::new(PermissionStatus::Undetermined, tx);

        let ui = tokio::spawn(async move {
            // UI closes the dialog without answering.
            drop(rx.recv().await);
        });

        assert!(!verify_permissions(&perm).await);
        ui.await.unwrap();
    }
}
