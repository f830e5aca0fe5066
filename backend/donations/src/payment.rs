//! Payment submission — one attempt, outcome reported as a notification.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::errors::Result;
use crate::notify::{Notification, NotificationCenter};
use crate::types::{MinLatency, PaymentRequest};

/// Anything that can execute a donation.
pub trait PaymentGateway: Send + Sync {
    fn pay(&self, request: &PaymentRequest) -> impl Future<Output = Result<()>> + Send;
}

pub struct PaymentSubmitter<G> {
    gateway: G,
    min_latency: MinLatency,
    notifications: Arc<NotificationCenter>,
}

impl<G: PaymentGateway> PaymentSubmitter<G> {
    pub fn new(gateway: G, min_latency: MinLatency, notifications: Arc<NotificationCenter>) -> Self {
        Self {
            gateway,
            min_latency,
            notifications,
        }
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Execute `request` exactly once. Never fails: a gateway error is
    /// logged in full and turned into a generic negative notification.
    pub async fn submit(&self, request: &PaymentRequest) -> Notification {
        let outcome = self.min_latency.hold(self.gateway.pay(request)).await;

        let notification = match outcome {
            Ok(()) => {
                info!(
                    "Donated {} {} to foundation {}",
                    request.amount, request.currency, request.foundation_id
                );
                Notification::donated()
            }
            Err(e) => {
                error!(
                    "Donation of {} {} to foundation {} failed: {e}",
                    request.amount, request.currency, request.foundation_id
                );
                Notification::donation_failed()
            }
        };

        self.notifications.push(notification.clone());
        notification
    }
}
