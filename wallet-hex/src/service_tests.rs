//! LedgerService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use wallet_types::{
        AppError, GatewayAck, GatewayError, GatewayOrder, LedgerRepository, PaymentGateway,
        PaymentStatus, RepoError, Role, SettleOutcome, SettleRequest, SubscriptionId,
        SubscriptionPayRequest, SubscriptionPayment, SubscriptionStatus, TopupRequest,
        Transaction, TransactionId, TransactionStatus, UserId, Wallet, WithdrawRequest,
    };

    use crate::LedgerService;

    /// In-memory ledger for testing the service layer.
    pub struct MockRepo {
        wallets: Mutex<HashMap<(String, Role), Wallet>>,
        transactions: Mutex<Vec<Transaction>>,
        subscriptions: Mutex<HashMap<String, SubscriptionPayment>>,
        fail_settles: bool,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                wallets: Mutex::new(HashMap::new()),
                transactions: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(HashMap::new()),
                fail_settles: false,
            }
        }

        /// A repo whose settle primitive always fails, for exercising
        /// the webhook handler's error downgrade.
        fn failing_settles() -> Self {
            Self {
                fail_settles: true,
                ..Self::new()
            }
        }

        fn balance_of(&self, user: &str, role: Role) -> i64 {
            self.wallets
                .lock()
                .unwrap()
                .get(&(user.to_string(), role))
                .map(|w| w.balance.minor())
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl LedgerRepository for MockRepo {
        async fn find_or_create_wallet(
            &self,
            user_id: &UserId,
            role: Role,
        ) -> Result<Wallet, RepoError> {
            let mut wallets = self.wallets.lock().unwrap();
            let wallet = wallets
                .entry((user_id.as_str().to_string(), role))
                .or_insert_with(|| Wallet::new(user_id.clone(), role));
            Ok(wallet.clone())
        }

        async fn get_wallet(
            &self,
            user_id: &UserId,
            role: Role,
        ) -> Result<Option<Wallet>, RepoError> {
            Ok(self
                .wallets
                .lock()
                .unwrap()
                .get(&(user_id.as_str().to_string(), role))
                .cloned())
        }

        async fn deactivate_wallet(&self, user_id: &UserId, role: Role) -> Result<bool, RepoError> {
            let mut wallets = self.wallets.lock().unwrap();
            match wallets.get_mut(&(user_id.as_str().to_string(), role)) {
                Some(w) if w.is_active => {
                    w.is_active = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn create_transaction(&self, tx: &Transaction) -> Result<(), RepoError> {
            let mut transactions = self.transactions.lock().unwrap();
            if transactions.iter().any(|t| t.ref_id == tx.ref_id) {
                return Err(RepoError::Conflict(format!(
                    "duplicate ref id: {}",
                    tx.ref_id
                )));
            }
            transactions.push(tx.clone());
            Ok(())
        }

        async fn record_gateway_ack(
            &self,
            id: TransactionId,
            txn_id: Option<&str>,
            metadata: &Value,
        ) -> Result<(), RepoError> {
            let mut transactions = self.transactions.lock().unwrap();
            let tx = transactions
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(RepoError::NotFound)?;
            if let Some(txn_id) = txn_id {
                tx.txn_id = Some(txn_id.to_string());
            }
            tx.metadata = metadata.clone();
            Ok(())
        }

        async fn mark_transaction_failed(
            &self,
            id: TransactionId,
            metadata: &Value,
        ) -> Result<(), RepoError> {
            let mut transactions = self.transactions.lock().unwrap();
            let tx = transactions
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(RepoError::NotFound)?;
            if tx.status == TransactionStatus::Pending {
                tx.status = TransactionStatus::Failed;
                tx.metadata = metadata.clone();
            }
            Ok(())
        }

        async fn find_transaction_by_ref(
            &self,
            ref_id: &str,
        ) -> Result<Option<Transaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.ref_id == ref_id)
                .cloned())
        }

        async fn find_transaction_by_txn(
            &self,
            txn_id: &str,
        ) -> Result<Option<Transaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.txn_id.as_deref() == Some(txn_id))
                .cloned())
        }

        async fn list_transactions_for_user(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<Transaction>, RepoError> {
            Ok(self
                .transactions
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.user_id == *user_id)
                .cloned()
                .collect())
        }

        async fn settle_transaction(&self, req: SettleRequest) -> Result<SettleOutcome, RepoError> {
            if self.fail_settles {
                return Err(RepoError::Database("disk I/O error".to_string()));
            }
            let mut transactions = self.transactions.lock().unwrap();
            let tx = transactions
                .iter_mut()
                .find(|t| t.id == req.transaction_id)
                .ok_or(RepoError::NotFound)?;

            if tx.status.is_terminal() {
                tx.metadata = req.metadata;
                return Ok(SettleOutcome::AlreadyFinal);
            }

            tx.status = req.status;
            if req.txn_id.is_some() {
                tx.txn_id = req.txn_id;
            }
            tx.metadata = req.metadata;
            let key = (tx.user_id.as_str().to_string(), tx.role);
            let user_id = tx.user_id.clone();
            let role = tx.role;
            drop(transactions);

            if req.balance_delta != 0 {
                let mut wallets = self.wallets.lock().unwrap();
                let wallet = wallets
                    .entry(key)
                    .or_insert_with(|| Wallet::new(user_id, role));
                let minor = wallet.balance.minor() + req.balance_delta;
                wallet.balance = wallet_types::Money::from_signed(minor);
                wallet.last_transaction_at = Some(chrono::Utc::now());
            }

            Ok(SettleOutcome::Applied)
        }

        async fn upsert_subscription_payment(
            &self,
            payment: &SubscriptionPayment,
        ) -> Result<(), RepoError> {
            let mut subs = self.subscriptions.lock().unwrap();
            match subs.get_mut(payment.subscription_id.as_str()) {
                Some(existing) if existing.payment_status == PaymentStatus::Pending => {
                    existing.amount = payment.amount;
                }
                Some(_) => {}
                None => {
                    subs.insert(payment.subscription_id.as_str().to_string(), payment.clone());
                }
            }
            Ok(())
        }

        async fn record_subscription_gateway_ref(
            &self,
            id: &SubscriptionId,
            gateway_ref: &str,
        ) -> Result<(), RepoError> {
            let mut subs = self.subscriptions.lock().unwrap();
            let payment = subs.get_mut(id.as_str()).ok_or(RepoError::NotFound)?;
            payment.gateway_ref = Some(gateway_ref.to_string());
            Ok(())
        }

        async fn find_subscription_payment(
            &self,
            correlation_id: Option<&str>,
            gateway_ref: Option<&str>,
        ) -> Result<Option<SubscriptionPayment>, RepoError> {
            let subs = self.subscriptions.lock().unwrap();
            if let Some(id) = correlation_id {
                if let Some(p) = subs.get(id) {
                    return Ok(Some(p.clone()));
                }
            }
            if let Some(gw) = gateway_ref {
                if let Some(p) = subs
                    .values()
                    .find(|p| p.gateway_ref.as_deref() == Some(gw))
                {
                    return Ok(Some(p.clone()));
                }
            }
            Ok(None)
        }

        async fn settle_subscription_payment(
            &self,
            id: &SubscriptionId,
            status: PaymentStatus,
            metadata: &Value,
        ) -> Result<SettleOutcome, RepoError> {
            let mut subs = self.subscriptions.lock().unwrap();
            let payment = subs.get_mut(id.as_str()).ok_or(RepoError::NotFound)?;

            if payment.payment_status != PaymentStatus::Pending {
                payment.metadata = metadata.clone();
                return Ok(SettleOutcome::AlreadyFinal);
            }

            payment.payment_status = status;
            if status == PaymentStatus::Paid {
                payment.subscription_status = SubscriptionStatus::Active;
            }
            payment.metadata = metadata.clone();
            Ok(SettleOutcome::Applied)
        }
    }

    /// Scriptable gateway double; records every outbound call.
    pub struct MockGateway {
        fail: bool,
        txn_id: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGateway {
        pub fn accepting(txn_id: &str) -> Self {
            Self {
                fail: false,
                txn_id: Some(txn_id.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn rejecting() -> Self {
            Self {
                fail: true,
                txn_id: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: &str) -> Result<GatewayAck, GatewayError> {
            self.calls.lock().unwrap().push(call.to_string());
            if self.fail {
                return Err(GatewayError::Status {
                    status: 500,
                    body: "gateway unavailable".to_string(),
                });
            }
            Ok(GatewayAck {
                txn_id: self.txn_id.clone(),
                raw: json!({ "status": "accepted" }),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn direct_payment(&self, _order: &GatewayOrder) -> Result<GatewayAck, GatewayError> {
            self.record("direct_payment")
        }

        async fn payout_transfer(&self, _order: &GatewayOrder) -> Result<GatewayAck, GatewayError> {
            self.record("payout_transfer")
        }

        async fn check_transaction_status(&self, _ref_id: &str) -> Result<Value, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push("check_transaction_status".to_string());
            Ok(json!({ "Status": "COMPLETED" }))
        }
    }

    fn service(gateway: MockGateway, rate: f64) -> LedgerService<MockRepo, MockGateway> {
        LedgerService::new(MockRepo::new(), gateway, rate)
    }

    fn topup_request(user: &str, role: Role, amount: i64) -> TopupRequest {
        TopupRequest {
            user_id: user.to_string(),
            role,
            amount,
            payment_method: "telebirr".to_string(),
            phone_number: "0912345678".to_string(),
            reason: None,
        }
    }

    fn completed_webhook(correlation_id: &str, amount_birr: f64) -> Value {
        json!({
            "thirdPartyId": correlation_id,
            "TxnId": "GW-77",
            "Status": "COMPLETED",
            "amount": amount_birr,
            "Msisdn": "+251912345678"
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Initiation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_topup_creates_pending_transaction() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();

        assert_eq!(res.status, TransactionStatus::Pending);
        assert_eq!(res.gateway_txn_id.as_deref(), Some("GW-1"));

        let stored = svc
            .repo()
            .find_transaction_by_ref(&res.ref_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(stored.txn_id.as_deref(), Some("GW-1"));
        assert_eq!(stored.method.as_deref(), Some("Telebirr"));
        assert_eq!(
            stored.msisdn.as_ref().map(|m| m.as_str()),
            Some("+251912345678")
        );
        // Initiation never touches the balance.
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_topup_invalid_phone_never_reaches_gateway() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        let mut req = topup_request("u-1", Role::Passenger, 10_000);
        req.phone_number = "0112345678".to_string(); // landline

        let result = svc.topup(req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(svc.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn test_topup_nonpositive_amount_fails() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        for amount in [0, -100] {
            let result = svc.topup(topup_request("u-1", Role::Passenger, amount)).await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[tokio::test]
    async fn test_topup_gateway_failure_marks_transaction_failed() {
        let svc = service(MockGateway::rejecting(), 0.0);

        let result = svc.topup(topup_request("u-1", Role::Passenger, 10_000)).await;
        assert!(matches!(result, Err(AppError::Gateway(_))));

        let transactions = svc
            .repo()
            .list_transactions_for_user(&UserId::new("u-1"))
            .await
            .unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Failed);
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_withdraw_over_balance_rejected_before_gateway() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);
        svc.repo()
            .find_or_create_wallet(&UserId::new("d-1"), Role::Driver)
            .await
            .unwrap();

        let result = svc
            .withdraw(WithdrawRequest {
                user_id: "d-1".to_string(),
                role: Role::Driver,
                amount: 5_000,
                payment_method: "telebirr".to_string(),
                destination: "0912345678".to_string(),
                reason: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::InsufficientFunds { .. })));
        assert_eq!(svc.gateway.call_count(), 0);
        assert!(
            svc.repo()
                .list_transactions_for_user(&UserId::new("d-1"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_withdraw_without_wallet_not_found() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        let result = svc
            .withdraw(WithdrawRequest {
                user_id: "ghost".to_string(),
                role: Role::Driver,
                amount: 5_000,
                payment_method: "telebirr".to_string(),
                destination: "0912345678".to_string(),
                reason: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Webhook reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_replayed_webhook_credits_once() {
        // Topup 100.00 birr from 0912345678, then the gateway delivers
        // the same COMPLETED webhook three times.
        let svc = service(MockGateway::accepting("GW-77"), 0.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();

        for _ in 0..3 {
            let ack = svc
                .apply_webhook(&completed_webhook(&res.ref_id, 100.0))
                .await
                .unwrap();
            assert!(ack.ok);
        }

        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 10_000);

        let stored = svc
            .repo()
            .find_transaction_by_ref(&res.ref_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
    }

    #[tokio::test]
    async fn test_driver_credit_applies_commission() {
        // 1000.00 birr driver credit at 15% commission lands 850.00.
        let svc = service(MockGateway::accepting("GW-77"), 15.0);

        let res = svc
            .topup(topup_request("d-1", Role::Driver, 100_000))
            .await
            .unwrap();
        svc.apply_webhook(&completed_webhook(&res.ref_id, 1000.0))
            .await
            .unwrap();

        assert_eq!(svc.repo().balance_of("d-1", Role::Driver), 85_000);
    }

    #[tokio::test]
    async fn test_passenger_credit_has_no_commission() {
        let svc = service(MockGateway::accepting("GW-77"), 15.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 100_000))
            .await
            .unwrap();
        svc.apply_webhook(&completed_webhook(&res.ref_id, 1000.0))
            .await
            .unwrap();

        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 100_000);
    }

    #[tokio::test]
    async fn test_adjusted_amount_overrides_requested() {
        let svc = service(MockGateway::accepting("GW-77"), 0.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();
        // Provider confirms 90.00, not the requested 100.00.
        svc.apply_webhook(&json!({
            "thirdPartyId": res.ref_id,
            "Status": "COMPLETED",
            "adjustedAmount": 90.0,
            "amount": 100.0
        }))
        .await
        .unwrap();

        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 9_000);
    }

    #[tokio::test]
    async fn test_failed_webhook_settles_without_credit() {
        let svc = service(MockGateway::accepting("GW-77"), 0.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();
        let ack = svc
            .apply_webhook(&json!({
                "thirdPartyId": res.ref_id,
                "Status": "FAILED"
            }))
            .await
            .unwrap();
        assert!(ack.ok);

        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
        let stored = svc
            .repo()
            .find_transaction_by_ref(&res.ref_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn test_pending_webhook_changes_nothing() {
        let svc = service(MockGateway::accepting("GW-77"), 0.0);

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();
        let ack = svc
            .apply_webhook(&json!({
                "thirdPartyId": res.ref_id,
                "Status": "PROCESSING"
            }))
            .await
            .unwrap();
        assert!(ack.ok);

        let stored = svc
            .repo()
            .find_transaction_by_ref(&res.ref_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_ref_id_match_wins_over_txn_id() {
        let svc = service(MockGateway::accepting("GW-B"), 0.0);

        // Transaction A is matched by correlation id even though the
        // webhook also carries transaction B's gateway id.
        let a = svc
            .topup(topup_request("u-a", Role::Passenger, 10_000))
            .await
            .unwrap();
        let _b = svc
            .topup(topup_request("u-b", Role::Passenger, 20_000))
            .await
            .unwrap();

        svc.apply_webhook(&json!({
            "thirdPartyId": a.ref_id,
            "TxnId": "GW-B",
            "Status": "COMPLETED",
            "amount": 100.0
        }))
        .await
        .unwrap();

        assert_eq!(svc.repo().balance_of("u-a", Role::Passenger), 10_000);
        assert_eq!(svc.repo().balance_of("u-b", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_txn_id_match_when_correlation_unknown() {
        let svc = service(MockGateway::accepting("GW-9"), 0.0);

        svc.topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();

        // Correlation id is the gateway's own, unknown to us; the txn
        // id still finds the transaction.
        let ack = svc
            .apply_webhook(&json!({
                "thirdPartyId": "gateway-internal-id",
                "TxnId": "GW-9",
                "Status": "COMPLETED",
                "amount": 100.0
            }))
            .await
            .unwrap();

        assert!(ack.ok);
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 10_000);
    }

    #[tokio::test]
    async fn test_unknown_ids_ack_not_ok_and_mutate_nothing() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        svc.topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();

        let ack = svc
            .apply_webhook(&json!({
                "thirdPartyId": "no-such-ref",
                "TxnId": "no-such-txn",
                "Status": "COMPLETED",
                "amount": 100.0
            }))
            .await
            .unwrap();

        assert!(!ack.ok);
        assert_eq!(ack.third_party_id.as_deref(), Some("no-such-ref"));
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_webhook_internal_failure_still_acks() {
        // A storage fault during settle must come back as a 200-class
        // {ok:false} acknowledgment, never as an error response.
        let svc = LedgerService::new(
            MockRepo::failing_settles(),
            MockGateway::accepting("GW-1"),
            0.0,
        );

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();

        let ack = svc
            .apply_webhook(&completed_webhook(&res.ref_id, 100.0))
            .await
            .unwrap();
        assert!(!ack.ok);

        let stored = svc
            .repo()
            .find_transaction_by_ref(&res.ref_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(svc.repo().balance_of("u-1", Role::Passenger), 0);
    }

    #[tokio::test]
    async fn test_structurally_invalid_webhook_is_bad_request() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        let result = svc.apply_webhook(&json!({ "Status": "COMPLETED" })).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_withdraw_settles_by_decrementing() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        // Fund the driver wallet through the normal path.
        let fund = svc
            .topup(topup_request("d-1", Role::Driver, 50_000))
            .await
            .unwrap();
        svc.apply_webhook(&completed_webhook(&fund.ref_id, 500.0))
            .await
            .unwrap();
        assert_eq!(svc.repo().balance_of("d-1", Role::Driver), 50_000);

        let res = svc
            .withdraw(WithdrawRequest {
                user_id: "d-1".to_string(),
                role: Role::Driver,
                amount: 20_000,
                payment_method: "telebirr".to_string(),
                destination: "0912345678".to_string(),
                reason: None,
            })
            .await
            .unwrap();
        assert_eq!(svc.repo().balance_of("d-1", Role::Driver), 50_000);

        svc.apply_webhook(&json!({
            "thirdPartyId": res.ref_id,
            "Status": "COMPLETED",
            "amount": 200.0
        }))
        .await
        .unwrap();

        assert_eq!(svc.repo().balance_of("d-1", Role::Driver), 30_000);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription bridge
    // ─────────────────────────────────────────────────────────────────────────

    fn subscription_request(amount: i64) -> SubscriptionPayRequest {
        SubscriptionPayRequest {
            amount,
            payment_method: "telebirr".to_string(),
            phone_number: "0912345678".to_string(),
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_subscription_pay_then_webhook_activates() {
        let svc = service(MockGateway::accepting("GW-SUB"), 0.0);

        let res = svc
            .pay_subscription(SubscriptionId::new("sub-1"), subscription_request(50_000))
            .await
            .unwrap();
        assert_eq!(res.payment_status, "PENDING");
        assert_eq!(res.gateway_txn_id.as_deref(), Some("GW-SUB"));

        let ack = svc
            .apply_webhook(&json!({
                "thirdPartyId": "sub-1",
                "Status": "COMPLETED",
                "amount": 500.0
            }))
            .await
            .unwrap();
        assert!(ack.ok);

        let payment = svc
            .repo()
            .find_subscription_payment(Some("sub-1"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Paid);
        assert_eq!(payment.subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_subscription_webhook_matches_gateway_ref() {
        let svc = service(MockGateway::accepting("GW-SUB"), 0.0);

        svc.pay_subscription(SubscriptionId::new("sub-1"), subscription_request(50_000))
            .await
            .unwrap();

        // Correlation id unknown, but the stored gateway reference
        // resolves the payment.
        let ack = svc
            .apply_webhook(&json!({
                "ID": "provider-side-id",
                "TxnId": "GW-SUB",
                "Status": "COMPLETED"
            }))
            .await
            .unwrap();
        assert!(ack.ok);

        let payment = svc
            .repo()
            .find_subscription_payment(Some("sub-1"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_subscription_gateway_failure_marks_failed() {
        let svc = service(MockGateway::rejecting(), 0.0);

        let result = svc
            .pay_subscription(SubscriptionId::new("sub-1"), subscription_request(50_000))
            .await;
        assert!(matches!(result, Err(AppError::Gateway(_))));

        let payment = svc
            .repo()
            .find_subscription_payment(Some("sub-1"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.payment_status, PaymentStatus::Failed);
        assert_eq!(payment.subscription_status, SubscriptionStatus::Pending);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_check_status_requires_known_transaction() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);

        let result = svc.check_status("no-such-ref").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let res = svc
            .topup(topup_request("u-1", Role::Passenger, 10_000))
            .await
            .unwrap();
        let status = svc.check_status(&res.ref_id).await.unwrap();
        assert_eq!(status["Status"], "COMPLETED");
    }

    #[tokio::test]
    async fn test_deactivated_wallet_rejects_topup() {
        let svc = service(MockGateway::accepting("GW-1"), 0.0);
        let user = UserId::new("u-1");

        svc.repo()
            .find_or_create_wallet(&user, Role::Passenger)
            .await
            .unwrap();
        svc.deactivate_wallet(&user, Role::Passenger).await.unwrap();

        let result = svc.topup(topup_request("u-1", Role::Passenger, 10_000)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
