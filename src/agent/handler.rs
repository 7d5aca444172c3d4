//! Invite auto-approval agent.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::gateway::{Gateway, GatewayError, GatewayEvent, GroupInviteRequest};
use crate::lifecycle::signal::Signaller;
use crate::observability::metrics;

/// Errors that end the dispatch loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The gateway rejected or failed the approval command.
    #[error("Failed to approve group invite from {user_id} to group {group_id}: {source}")]
    Approve {
        user_id: i64,
        group_id: i64,
        #[source]
        source: GatewayError,
    },
}

/// Reacts to gateway events: logs lifecycle changes, signals closure and
/// approves every group invite.
pub struct InviteAgent<G> {
    gateway: G,
    closed: Signaller<()>,
}

impl<G: Gateway> InviteAgent<G> {
    /// Create an agent that resolves `closed` whenever the gateway disconnects.
    pub fn new(gateway: G, closed: Signaller<()>) -> Self {
        Self { gateway, closed }
    }

    /// Handle one event.
    pub async fn handle(&self, event: GatewayEvent) -> Result<(), AgentError> {
        metrics::record_event(event.kind());

        match event {
            GatewayEvent::Connected => {
                tracing::info!("[NapCat] Connected.");
            }
            GatewayEvent::Disconnected => {
                tracing::info!("[NapCat] Disconnected.");
                // Reconnect cycles close more than once; only the first counts.
                self.closed.signal(());
            }
            GatewayEvent::GroupInvite(invite) => self.approve(invite).await?,
        }

        Ok(())
    }

    async fn approve(&self, invite: GroupInviteRequest) -> Result<(), AgentError> {
        self.gateway
            .set_group_add_request(&invite.flag, true)
            .await
            .map_err(|source| AgentError::Approve {
                user_id: invite.user_id,
                group_id: invite.group_id,
                source,
            })?;

        metrics::record_invite_approved();
        tracing::info!(
            flag = %invite.flag,
            "[NapCat] Approved group invite request from {} to group {}.",
            invite.user_id,
            invite.group_id
        );
        Ok(())
    }

    /// Handle events in delivery order until the stream ends or a handler fails.
    ///
    /// After a failure the remaining events are still watched for closure,
    /// so the close latch resolves even when an approval was cut off by the
    /// disconnect itself.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<GatewayEvent>) -> Result<(), AgentError> {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(event).await {
                tokio::spawn(self.watch_closure(events));
                return Err(e);
            }
        }

        tracing::debug!("Gateway event stream closed");
        Ok(())
    }

    /// Follow connection changes without acting on invites.
    async fn watch_closure(self, mut events: mpsc::UnboundedReceiver<GatewayEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                GatewayEvent::GroupInvite(invite) => {
                    tracing::warn!(
                        user_id = invite.user_id,
                        group_id = invite.group_id,
                        "Skipping group invite after agent failure"
                    );
                }
                lifecycle => {
                    let _ = self.handle(lifecycle).await;
                }
            }
        }
    }
}
