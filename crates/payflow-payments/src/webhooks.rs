//! External provider webhook adapters.
//!
//! Parses provider-specific webhook shapes into one normalized update and
//! maps provider status vocabularies onto the canonical
//! `{completed, failed, cancelled, processing}` set. The mappings are data
//! tables: supporting a new provider status means adding an entry.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use payflow_core::error::DomainError;

use crate::domain::operation::{OperationKind, OperationMetadata};

/// The canonical status vocabulary every provider update is reduced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedStatus {
    /// The provider settled the operation.
    Completed,
    /// The provider rejected the operation.
    Failed,
    /// The provider cancelled or voided the operation.
    Cancelled,
    /// The operation is still in flight.
    Processing,
}

/// Provider status strings mapped to the canonical vocabulary.
const STATUS_TABLE: &[(&str, NormalizedStatus)] = &[
    ("succeeded", NormalizedStatus::Completed),
    ("success", NormalizedStatus::Completed),
    ("completed", NormalizedStatus::Completed),
    ("paid", NormalizedStatus::Completed),
    ("confirmed", NormalizedStatus::Completed),
    ("failed", NormalizedStatus::Failed),
    ("failure", NormalizedStatus::Failed),
    ("error", NormalizedStatus::Failed),
    ("declined", NormalizedStatus::Failed),
    ("canceled", NormalizedStatus::Cancelled),
    ("cancelled", NormalizedStatus::Cancelled),
    ("void", NormalizedStatus::Cancelled),
    ("processing", NormalizedStatus::Processing),
    ("pending", NormalizedStatus::Processing),
    ("in_progress", NormalizedStatus::Processing),
];

/// Event types whose status can be inferred when the status string alone
/// is not in the table.
const EVENT_TYPE_TABLE: &[(&str, NormalizedStatus)] = &[
    ("payment_intent.succeeded", NormalizedStatus::Completed),
    ("charge.succeeded", NormalizedStatus::Completed),
    ("payment_intent.payment_failed", NormalizedStatus::Failed),
    ("charge.failed", NormalizedStatus::Failed),
    ("payment_intent.canceled", NormalizedStatus::Cancelled),
    ("payment_intent.processing", NormalizedStatus::Processing),
];

/// Event types that select a non-debit operation kind.
const OPERATION_KIND_TABLE: &[(&str, OperationKind)] = &[
    ("refund.created", OperationKind::Refund),
    ("refund.succeeded", OperationKind::Refund),
    ("refund.updated", OperationKind::Refund),
    ("payment_intent.canceled", OperationKind::Reversal),
    ("charge.dispute.created", OperationKind::Reversal),
];

/// Reduces a provider status (falling back to the event type) to the
/// canonical vocabulary.
///
/// # Errors
///
/// Returns `DomainError::Unsupported` when neither table knows the value.
pub fn normalize_status(status: &str, event_type: &str) -> Result<NormalizedStatus, DomainError> {
    if let Some((_, normalized)) = STATUS_TABLE.iter().find(|(s, _)| *s == status) {
        return Ok(*normalized);
    }
    if let Some((_, normalized)) = EVENT_TYPE_TABLE.iter().find(|(t, _)| *t == event_type) {
        return Ok(*normalized);
    }
    Err(DomainError::Unsupported(format!(
        "unknown external provider status: {status}"
    )))
}

/// Derives the operation kind from the provider event type. Everything not
/// in the table is a debit.
#[must_use]
pub fn operation_kind_for(event_type: &str) -> OperationKind {
    OPERATION_KIND_TABLE
        .iter()
        .find(|(t, _)| *t == event_type)
        .map_or(OperationKind::Debit, |(_, kind)| *kind)
}

/// A provider webhook reduced to one shape.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUpdate {
    /// Reporting provider. Filled in by the parser.
    #[serde(default)]
    pub provider: String,
    /// Provider-specific event type.
    pub event_type: String,
    /// Provider-assigned transaction id.
    #[serde(default)]
    pub transaction_id: String,
    /// Secondary external id.
    #[serde(default)]
    pub external_id: String,
    /// The payment this update refers to.
    pub payment_reference: String,
    /// Amount in minor units.
    pub amount: i64,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Provider-specific status string.
    pub status: String,
    /// Machine-readable code, when failed.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Human-readable message, when failed.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Provider metadata.
    #[serde(default)]
    pub metadata: OperationMetadata,
    /// When the provider produced the update.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Nested shape used by the `stripe` provider.
#[derive(Debug, Deserialize)]
struct StripeEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeData,
}

#[derive(Debug, Deserialize)]
struct StripeData {
    object: StripeObject,
}

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    #[serde(default)]
    metadata: StripeMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct StripeMetadata {
    #[serde(default)]
    payment_reference: Option<String>,
}

/// Parses a raw webhook body for the given provider.
///
/// # Errors
///
/// `Validation` for malformed bodies or missing payment references,
/// `Unsupported` for unknown providers.
pub fn parse(provider: &str, payload: &[u8]) -> Result<WebhookUpdate, DomainError> {
    match provider {
        "external_gateway" => {
            let mut update: WebhookUpdate = serde_json::from_slice(payload).map_err(|e| {
                DomainError::Validation(format!("malformed external_gateway webhook: {e}"))
            })?;
            update.provider = provider.to_owned();
            Ok(update)
        }
        "stripe" => {
            let envelope: StripeEnvelope = serde_json::from_slice(payload)
                .map_err(|e| DomainError::Validation(format!("malformed stripe webhook: {e}")))?;
            let payment_reference = envelope.data.object.metadata.payment_reference.ok_or_else(
                || DomainError::Validation("stripe webhook is missing payment_reference".into()),
            )?;
            Ok(WebhookUpdate {
                provider: provider.to_owned(),
                event_type: envelope.event_type,
                transaction_id: envelope.data.object.id,
                external_id: String::new(),
                payment_reference,
                amount: envelope.data.object.amount,
                currency: envelope.data.object.currency.to_uppercase(),
                status: envelope.data.object.status,
                error_code: None,
                error_message: None,
                metadata: OperationMetadata::new(),
                timestamp: None,
            })
        }
        other => Err(DomainError::Unsupported(format!(
            "unsupported webhook provider: {other}"
        ))),
    }
}

/// Per-provider webhook signature check.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies the signature over the raw payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` when the signature is missing or
    /// wrong under the verifier's policy.
    fn verify(
        &self,
        provider: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), DomainError>;
}

/// Development policy: absent signatures are accepted, present ones are
/// not checked.
#[derive(Debug, Clone, Copy)]
pub struct PermissiveVerifier;

impl SignatureVerifier for PermissiveVerifier {
    fn verify(
        &self,
        _provider: &str,
        _payload: &[u8],
        _signature: Option<&str>,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Production policy: every webhook must carry a hex SHA-256 digest of the
/// shared secret concatenated with the payload.
#[derive(Debug, Clone)]
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    /// Creates a verifier with the given shared secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn digest(&self, payload: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(payload);
        format!("{:x}", hasher.finalize())
    }
}

impl SignatureVerifier for SharedSecretVerifier {
    fn verify(
        &self,
        provider: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<(), DomainError> {
        let Some(signature) = signature else {
            return Err(DomainError::Validation(format!(
                "missing webhook signature for provider {provider}"
            )));
        };
        if self.digest(payload) != signature {
            return Err(DomainError::Validation(format!(
                "invalid webhook signature for provider {provider}"
            )));
        }
        Ok(())
    }
}
