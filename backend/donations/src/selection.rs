//! # Selection controller
//!
//! Tracks which foundation the user is donating to and at what amount,
//! and keeps the [`PreferenceStore`] in step with every change.
//!
//! ```text
//! Idle ──pick──► DialogOpen ──begin_submit──► Submitting
//!  ▲                 │                            │
//!  └────close────────┘◄───────finish_submit───────┘  (success or failure)
//! ```
//!
//! Leaving `Submitting` always lands in `Idle` and drops the in-memory
//! selection. Stored preferences are never rolled back.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::errors::{DonationError, Result};
#[cfg(test)]
use crate::notify::Notification;
#[cfg(test)]
use crate::payment::{PaymentGateway, PaymentSubmitter};
use crate::store::{KeyValueStore, PreferenceStore};
use crate::types::{AmountChoice, Foundation, PaymentRequest, PreferenceRecord, Presets};

/// The open donation dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialog {
    pub foundation: Foundation,
    pub donation_amount: AmountChoice,
    pub custom_amount: u64,
}

impl Dialog {
    /// Amount that would be sent right now, if submission is allowed.
    pub fn effective_amount(&self) -> Option<u64> {
        match self.donation_amount {
            AmountChoice::Preset(n) => Some(n),
            AmountChoice::Custom => Some(self.custom_amount).filter(|n| *n > 0),
        }
    }

    fn record(&self) -> PreferenceRecord {
        PreferenceRecord {
            id: self.foundation.id.clone(),
            donation_amount: self.donation_amount.to_string(),
            custom_amount: self.stored_custom_amount(),
        }
    }

    fn stored_custom_amount(&self) -> Option<u64> {
        if self.donation_amount.is_custom() && self.custom_amount > 0 {
            Some(self.custom_amount)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    #[default]
    Idle,
    DialogOpen(Dialog),
    /// Waiting for the payment outcome; nothing else may happen.
    Submitting(Dialog),
}

impl SelectionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DialogOpen(_) => "a dialog is open",
            Self::Submitting(_) => "submitting",
        }
    }
}

pub struct SelectionController<K> {
    state: SelectionState,
    store: Arc<PreferenceStore<K>>,
    presets: Presets,
}

impl<K: KeyValueStore> SelectionController<K> {
    pub fn new(store: Arc<PreferenceStore<K>>, presets: Presets) -> Self {
        Self {
            state: SelectionState::Idle,
            store,
            presets,
        }
    }

    /// Current workflow state, as shown to the presentation layer.
    pub fn snapshot(&self) -> &SelectionState {
        &self.state
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    fn invalid(&self, operation: &'static str) -> DonationError {
        DonationError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }

    /// Open the dialog for `foundation`, seeded from its stored preference.
    /// A foundation seen for the first time is stored with the first preset.
    pub async fn pick_foundation(&mut self, foundation: Foundation) -> Result<()> {
        if self.state != SelectionState::Idle {
            return Err(self.invalid("pick a foundation"));
        }

        let stored = self.store.get(&foundation.id).await?;
        let seeded = stored.as_ref().and_then(|record| {
            AmountChoice::parse(&record.donation_amount).map(|amount| (amount, record.custom_amount))
        });

        let dialog = match seeded {
            Some((amount, custom)) => Dialog {
                foundation,
                donation_amount: amount,
                custom_amount: if amount.is_custom() { custom.unwrap_or(0) } else { 0 },
            },
            None => {
                // Unseen, or the stored value is unreadable.
                let dialog = Dialog {
                    foundation,
                    donation_amount: AmountChoice::Preset(self.presets.first()),
                    custom_amount: 0,
                };
                self.store.upsert(dialog.record()).await?;
                dialog
            }
        };

        debug!(
            "Dialog opened for foundation {} at {}",
            dialog.foundation.id, dialog.donation_amount
        );
        self.state = SelectionState::DialogOpen(dialog);
        Ok(())
    }

    /// Select a preset or the `custom` sentinel and remember it.
    pub async fn change_amount(&mut self, value: &str) -> Result<()> {
        let SelectionState::DialogOpen(dialog) = &self.state else {
            return Err(self.invalid("change the amount"));
        };

        let amount = match AmountChoice::parse(value) {
            Some(AmountChoice::Preset(n)) if !self.presets.contains(n) => None,
            other => other,
        }
        .ok_or_else(|| DonationError::UnknownAmount(value.to_string()))?;

        let mut next = dialog.clone();
        next.donation_amount = amount;
        if !amount.is_custom() {
            next.custom_amount = 0;
        }

        self.store.upsert(next.record()).await?;
        self.state = SelectionState::DialogOpen(next);
        Ok(())
    }

    /// Accept a typed custom amount. Only digits (or nothing, meaning 0)
    /// are accepted; anything else is ignored. Returns whether the input
    /// was taken.
    pub async fn edit_custom_amount(&mut self, raw: &str) -> Result<bool> {
        let SelectionState::DialogOpen(dialog) = &self.state else {
            return Err(self.invalid("edit the custom amount"));
        };
        if !dialog.donation_amount.is_custom() {
            return Ok(false);
        }

        let Some(custom) = parse_custom_input(raw) else {
            debug!("Ignoring custom amount input {raw:?}");
            return Ok(false);
        };

        let mut next = dialog.clone();
        next.custom_amount = custom;
        self.store.upsert(next.record()).await?;
        self.state = SelectionState::DialogOpen(next);
        Ok(true)
    }

    /// Dismiss the dialog without donating. Closing with nothing open is a no-op.
    pub fn close_dialog(&mut self) -> Result<()> {
        match self.state {
            SelectionState::Idle => Ok(()),
            SelectionState::DialogOpen(_) => {
                self.state = SelectionState::Idle;
                Ok(())
            }
            SelectionState::Submitting(_) => Err(self.invalid("close the dialog")),
        }
    }

    pub fn can_submit(&self) -> bool {
        match &self.state {
            SelectionState::DialogOpen(dialog) => dialog.effective_amount().is_some(),
            SelectionState::Idle | SelectionState::Submitting(_) => false,
        }
    }

    /// Move to `Submitting` and build the request to send.
    pub fn begin_submit(&mut self) -> Result<PaymentRequest> {
        let SelectionState::DialogOpen(dialog) = &self.state else {
            return Err(self.invalid("submit"));
        };
        let amount = dialog
            .effective_amount()
            .ok_or(DonationError::SubmitDisabled)?;

        let request = PaymentRequest {
            foundation_id: dialog.foundation.id.clone(),
            amount,
            currency: dialog.foundation.currency.clone(),
        };

        let dialog = dialog.clone();
        self.state = SelectionState::Submitting(dialog);
        Ok(request)
    }

    /// The payment resolved, whichever way: back to `Idle`.
    pub fn finish_submit(&mut self) -> Result<()> {
        if !matches!(self.state, SelectionState::Submitting(_)) {
            return Err(self.invalid("finish a submission"));
        }
        self.state = SelectionState::Idle;
        Ok(())
    }

    /// Submit the current selection through `submitter` and wait for it,
    /// for callers that own the controller outright.
    #[cfg(test)]
    pub async fn submit<G: PaymentGateway>(
        &mut self,
        submitter: &PaymentSubmitter<G>,
    ) -> Result<Notification> {
        let request = self.begin_submit()?;
        let notification = submitter.submit(&request).await;
        self.finish_submit()?;
        Ok(notification)
    }
}

/// `""` is 0, digits are a number, anything else is rejected.
fn parse_custom_input(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return Some(0);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
