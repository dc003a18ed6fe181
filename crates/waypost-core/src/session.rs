//! The signed-in operator.

use tokio::sync::watch;
use tracing::info;

use waypost_types::OperatorId;

use crate::tracking::TrackingController;
use crate::traits::IdentityProvider;

/// An [`IdentityProvider`] driven by explicit sign-in and sign-out.
///
/// Sign-out stops the controller's tracking session, so no samples are
/// emitted under an identity that is no longer present.
#[derive(Debug)]
pub struct OperatorSession {
    current: watch::Sender<Option<OperatorId>>,
}

impl OperatorSession {
    /// A session with nobody signed in.
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self { current }
    }

    /// A session with `operator` already signed in.
    pub fn signed_in(operator: OperatorId) -> Self {
        let session = Self::new();
        session.sign_in(operator);
        session
    }

    pub fn sign_in(&self, operator: OperatorId) {
        info!("Operator {} signed in", operator);
        self.current.send_replace(Some(operator));
    }

    /// Clear the identity and stop `controller`.
    pub async fn sign_out(&self, controller: &TrackingController) {
        if let Some(operator) = self.current.send_replace(None) {
            info!("Operator {} signed out", operator);
        }
        controller.stop().await;
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// A receiver notified on sign-in and sign-out.
    pub fn watch(&self) -> watch::Receiver<Option<OperatorId>> {
        self.current.subscribe()
    }
}

impl Default for OperatorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for OperatorSession {
    fn current_operator(&self) -> Option<OperatorId> {
        self.current.borrow().clone()
    }
}
