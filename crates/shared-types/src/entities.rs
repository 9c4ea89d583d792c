//! # Core Domain Entities
//!
//! Defines the entities exchanged with the commerce platform.
//!
//! ## Clusters
//!
//! - **Catalog**: `ProductId`, `ProductKind`, `CatalogItem`, `SubscriptionInfo`
//! - **Ledger**: `Transaction`, `TransactionId`, `VerificationResult`
//! - **Subscriptions**: `SubscriptionGroupId`, `RenewalState`
//! - **Purchasing**: `PlatformPurchaseResult`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: THE CATALOG
// =============================================================================

/// Opaque product identifier as registered with the platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of a purchasable product.
///
/// `Unknown` carries whatever tag the platform reported for a kind this
/// crate does not model. The catalog store drops those items.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Used up once and purchasable again.
    Consumable,
    /// Bought once, owned forever.
    NonConsumable,
    /// Subscription that renews until cancelled.
    AutoRenewable,
    /// Subscription with a fixed duration.
    NonRenewable,
    /// A kind the platform reported but this crate does not recognize.
    Unknown(String),
}

impl ProductKind {
    /// The four kinds a catalog is partitioned into.
    pub const KNOWN: [ProductKind; 4] = [
        ProductKind::Consumable,
        ProductKind::NonConsumable,
        ProductKind::AutoRenewable,
        ProductKind::NonRenewable,
    ];

    /// Whether this is one of the four modelled kinds.
    pub fn is_known(&self) -> bool {
        !matches!(self, ProductKind::Unknown(_))
    }

    /// Whether ownership of this kind is tracked through entitlements.
    pub fn is_entitlement_backed(&self) -> bool {
        matches!(
            self,
            ProductKind::NonConsumable | ProductKind::AutoRenewable | ProductKind::NonRenewable
        )
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKind::Consumable => f.write_str("consumable"),
            ProductKind::NonConsumable => f.write_str("non_consumable"),
            ProductKind::AutoRenewable => f.write_str("auto_renewable"),
            ProductKind::NonRenewable => f.write_str("non_renewable"),
            ProductKind::Unknown(tag) => write!(f, "unknown({tag})"),
        }
    }
}

/// Identifier of a subscription group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionGroupId(pub String);

impl SubscriptionGroupId {
    /// Create a group identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SubscriptionGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subscription metadata attached to auto-renewable products.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Group the subscription belongs to. Renewal state is per group.
    pub group_id: SubscriptionGroupId,
}

/// A purchasable item definition as returned by the platform catalog.
///
/// Price and display metadata are platform-owned and carried verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Product identifier.
    pub id: ProductId,
    /// Product kind.
    pub kind: ProductKind,
    /// Localized display name.
    pub display_name: String,
    /// Localized, formatted price.
    pub display_price: String,
    /// Subscription details, present for auto-renewables.
    pub subscription: Option<SubscriptionInfo>,
}

impl CatalogItem {
    /// Create an item without subscription metadata.
    pub fn new(id: impl Into<ProductId>, kind: ProductKind) -> Self {
        let id = id.into();
        Self {
            display_name: id.0.clone(),
            display_price: String::new(),
            id,
            kind,
            subscription: None,
        }
    }

    /// Attach a subscription group.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.subscription = Some(SubscriptionInfo {
            group_id: SubscriptionGroupId::new(group_id),
        });
        self
    }

    /// Set the display price.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.display_price = price.into();
        self
    }

    /// Subscription group, if any.
    pub fn group_id(&self) -> Option<&SubscriptionGroupId> {
        self.subscription.as_ref().map(|s| &s.group_id)
    }
}

// =============================================================================
// CLUSTER B: THE LEDGER
// =============================================================================

/// Platform transaction identifier (opaque 64-bit).
pub type TransactionId = u64;

/// A purchase or renewal record issued by the platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier of this transaction.
    pub id: TransactionId,
    /// Identifier of the first transaction in a renewal chain.
    pub original_id: TransactionId,
    /// Product purchased.
    pub product_id: ProductId,
    /// Kind of the product purchased.
    pub product_kind: ProductKind,
    /// When this transaction was charged.
    pub purchase_date: DateTime<Utc>,
    /// When the original transaction was charged.
    pub original_purchase_date: DateTime<Utc>,
    /// End of the subscription period, if any.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Set when the platform refunded or revoked the purchase.
    pub revocation_date: Option<DateTime<Utc>>,
    /// Whether the customer upgraded to another subscription in the group.
    pub is_upgraded: bool,
    /// Quantity purchased.
    pub purchased_quantity: u32,
}

impl Transaction {
    /// Whether this transaction renews an earlier one.
    pub fn is_renewal(&self) -> bool {
        self.purchase_date != self.original_purchase_date
    }

    /// Whether the platform revoked this transaction.
    pub fn is_revoked(&self) -> bool {
        self.revocation_date.is_some()
    }
}

/// Reason the platform gave for rejecting a transaction signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationFailure {
    /// The signed payload did not match its signature.
    InvalidSignature,
    /// The certificate chain was rejected.
    InvalidCertificateChain,
    /// The payload was issued for another device or bundle.
    InvalidDeviceVerification,
    /// Anything else the platform reported.
    Other(String),
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationFailure::InvalidSignature => f.write_str("invalid signature"),
            VerificationFailure::InvalidCertificateChain => {
                f.write_str("invalid certificate chain")
            }
            VerificationFailure::InvalidDeviceVerification => {
                f.write_str("invalid device verification")
            }
            VerificationFailure::Other(reason) => f.write_str(reason),
        }
    }
}

/// A platform value wrapped with its verification outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationResult<T> {
    /// The platform verified the payload.
    Verified(T),
    /// The payload parsed but failed verification.
    Unverified(T, VerificationFailure),
}

impl<T> VerificationResult<T> {
    /// Whether the payload was verified.
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationResult::Verified(_))
    }

    /// Borrow the payload regardless of outcome.
    pub fn payload(&self) -> &T {
        match self {
            VerificationResult::Verified(value) | VerificationResult::Unverified(value, _) => value,
        }
    }
}

// =============================================================================
// CLUSTER C: SUBSCRIPTIONS
// =============================================================================

/// Renewal state of a subscription group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalState {
    /// Active and renewing.
    Subscribed,
    /// Lapsed.
    Expired,
    /// Renewal charge failed, platform is retrying.
    InBillingRetry,
    /// Renewal charge failed, service continues during the grace period.
    InGracePeriod,
    /// Refunded or revoked.
    Revoked,
}

impl RenewalState {
    /// Whether the customer should currently receive service.
    pub fn grants_access(&self) -> bool {
        matches!(self, RenewalState::Subscribed | RenewalState::InGracePeriod)
    }
}

// =============================================================================
// CLUSTER D: PURCHASING
// =============================================================================

/// Raw result of a purchase request, before the store verifies it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformPurchaseResult {
    /// The platform charged the customer.
    Success(VerificationResult<Transaction>),
    /// The customer dismissed the purchase sheet.
    UserCancelled,
    /// The purchase awaits approval (e.g. parental consent).
    Pending,
}
