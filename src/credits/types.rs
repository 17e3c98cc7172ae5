use crate::error::{Result, SeedanceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why credits moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionKind {
    /// Bought a credit package.
    Purchase,
    /// Periodic subscription allowance.
    SubscriptionRenewal,
    /// Welcome credits on sign-up.
    RegisterGift,
    /// Granted by an operator.
    AdminGrant,
    /// Spent on a generation.
    Usage,
    /// Returned after a failed generation.
    Refund,
    /// Removed when a grant expired.
    Expire,
}

impl CreditTransactionKind {
    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::SubscriptionRenewal => "subscription_renewal",
            Self::RegisterGift => "register_gift",
            Self::AdminGrant => "admin_grant",
            Self::Usage => "usage",
            Self::Refund => "refund",
            Self::Expire => "expire",
        }
    }
}

impl std::fmt::Display for CreditTransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CreditTransactionKind {
    type Err = SeedanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "subscription_renewal" => Ok(Self::SubscriptionRenewal),
            "register_gift" => Ok(Self::RegisterGift),
            "admin_grant" => Ok(Self::AdminGrant),
            "usage" => Ok(Self::Usage),
            "refund" => Ok(Self::Refund),
            "expire" => Ok(Self::Expire),
            other => Err(SeedanceError::Decode(format!(
                "unknown credit transaction kind: {other}"
            ))),
        }
    }
}

/// Parameters of a credit grant.
#[derive(Debug, Clone)]
pub struct AddCredits {
    /// Recipient.
    pub user_id: String,
    /// Credits to grant, must be positive.
    pub amount: i64,
    /// Reason recorded in the audit log.
    pub kind: CreditTransactionKind,
    /// Human-readable note.
    pub description: String,
    /// Days until the grant expires; `None` never expires.
    pub expire_days: Option<u32>,
    /// Payment reference for purchases.
    pub payment_id: Option<String>,
}

impl AddCredits {
    /// A non-expiring grant.
    pub fn new(
        user_id: impl Into<String>,
        amount: i64,
        kind: CreditTransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            kind,
            description: description.into(),
            expire_days: None,
            payment_id: None,
        }
    }

    /// Sets the expiry, in days from now.
    pub fn expiring_in(mut self, days: u32) -> Self {
        self.expire_days = Some(days);
        self
    }

    /// Sets the payment reference.
    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }
}

/// One entry of the credit audit log.
#[derive(Debug, Clone, Serialize)]
pub struct CreditTransaction {
    /// Entry id, a UUID.
    pub id: String,
    /// Whose balance moved.
    pub user_id: String,
    /// Why it moved.
    pub kind: CreditTransactionKind,
    /// Positive for grants, negative for usage and expiry.
    pub amount: i64,
    /// Human-readable note.
    pub description: String,
    /// Payment reference for purchases.
    pub payment_id: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}
