//! Domain models for the wallet reconciliation service.

pub mod method;
pub mod money;
pub mod msisdn;
pub mod notification;
pub mod subscription;
pub mod transaction;
pub mod wallet;

pub use method::normalize_method;
pub use money::{CURRENCY_CODE, Money};
pub use msisdn::{Msisdn, normalize_msisdn};
pub use notification::{GatewayNotification, classify_status};
pub use subscription::{PaymentStatus, SubscriptionId, SubscriptionPayment, SubscriptionStatus};
pub use transaction::{Direction, Transaction, TransactionId, TransactionStatus};
pub use wallet::{Role, UserId, Wallet, WalletId};
