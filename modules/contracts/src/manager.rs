//! Contract lifecycle manager
//!
//! Proposes contracts to the remote service, funds them through the payment
//! backend, persists them and broadcasts every persisted record.

use lac_core::{
    percent_of_asset_to_sats, ClientConfig, Contract, ContractId, ContractProposal,
    ContractService, ContractType, CreatedContract, LacError, LacResult, PaymentBackend,
    PriceSource, Sats,
};
use dashmap::DashMap;
use lac_state::SharedContractStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::hub::{ContractHub, ContractSubscription};

/// Manager settings taken from the client configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Address sent to the remote service with every proposal
    pub net_address: String,
    pub rpc_timeout: Duration,
    pub subscriber_capacity: usize,
}

impl From<&ClientConfig> for ManagerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            net_address: config.net_address.clone(),
            rpc_timeout: config.rpc_timeout(),
            subscriber_capacity: config.subscriber_capacity,
        }
    }
}

/// Orchestrates the contract lifecycle
pub struct ContractManager {
    config: ManagerConfig,
    store: SharedContractStore,
    payments: Arc<dyn PaymentBackend>,
    service: Arc<dyn ContractService>,
    prices: Arc<dyn PriceSource>,
    hub: Arc<ContractHub>,
    /// Per-contract locks held while a contract is being opened
    opening: DashMap<ContractId, Arc<Mutex<()>>>,
}

impl ContractManager {
    pub fn new(
        config: ManagerConfig,
        store: SharedContractStore,
        payments: Arc<dyn PaymentBackend>,
        service: Arc<dyn ContractService>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        let hub = Arc::new(ContractHub::new(config.subscriber_capacity));
        Self {
            config,
            store,
            payments,
            service,
            prices,
            hub,
            opening: DashMap::new(),
        }
    }

    /// Propose a contract and record it as unpaid.
    ///
    /// The returned quote is for the caller to accept (by opening the
    /// contract) or reject.
    pub async fn create_contract(
        &self,
        asset: &str,
        amount: f64,
        contract_type: ContractType,
    ) -> LacResult<CreatedContract> {
        info!("Received create contract request: {} {} ({})", amount, asset, contract_type);

        if amount == 0.0 {
            return Err(LacError::InvalidArgument("amount can not be 0".into()));
        }
        if !amount.is_finite() || amount < 0.0 {
            return Err(LacError::InvalidArgument(format!("invalid amount {}", amount)));
        }
        if !self.prices.is_supported(asset) {
            return Err(LacError::InvalidArgument(format!("asset {} not supported", asset)));
        }

        let our_price = self
            .prices
            .price(asset)
            .map(|p| p.price)
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| LacError::PriceUnavailable(format!("no price known for {}", asset)))?;

        let proposal = ContractProposal {
            asset: asset.to_string(),
            amount,
            host: self.config.net_address.clone(),
            contract_type,
        };
        let quote = self
            .remote_call("propose contract", self.service.propose_contract(&proposal))
            .await?;

        if quote.id.as_str().is_empty() {
            return Err(LacError::RemoteFailure("server returned an empty contract id".into()));
        }
        if !quote.percent_margin.is_finite() || quote.percent_margin < 0.0 {
            return Err(LacError::RemoteFailure(format!(
                "server quoted invalid margin percentage {}",
                quote.percent_margin
            )));
        }
        if self.store.exists(&quote.id).await? {
            return Err(LacError::RemoteFailure(format!(
                "server reused existing contract id {}",
                quote.id
            )));
        }

        let amount_sat_margin = self
            .payment_call("decode margin invoice", self.payments.decode_payment_request(&quote.margin_pay_req))
            .await?;

        let mut expected_init_amount = percent_of_asset_to_sats(amount, our_price, 100.0)?;
        let expected_margin_amount = percent_of_asset_to_sats(amount, our_price, quote.percent_margin)?;

        let mut contract = Contract {
            id: quote.id.clone(),
            asset: asset.to_string(),
            amount,
            contract_type,
            margin_invoice: quote.margin_pay_req.clone(),
            amount_sat_margin,
            init_invoice: None,
            amount_sat_init: Sats::ZERO,
            invoices_paid: false,
        };

        match contract_type {
            ContractType::Funded => {
                let init_pay_req = quote
                    .init_pay_req
                    .clone()
                    .filter(|req| !req.is_empty())
                    .ok_or_else(|| {
                        LacError::RemoteFailure(format!(
                            "server sent no initiating invoice for funded contract {}",
                            quote.id
                        ))
                    })?;
                contract.amount_sat_init = self
                    .payment_call("decode init invoice", self.payments.decode_payment_request(&init_pay_req))
                    .await?;
                contract.init_invoice = Some(init_pay_req);
            }
            ContractType::Unfunded => {
                expected_init_amount = Sats::ZERO;
            }
        }

        contract
            .validate()
            .map_err(|e| LacError::RemoteFailure(format!("server quoted an invalid contract: {}", e)))?;

        self.save(&contract).await?;

        info!(
            "Created contract {}: margin {}, init {}",
            contract.id, contract.amount_sat_margin, contract.amount_sat_init
        );

        Ok(CreatedContract {
            contract,
            server_price: quote.asset_price,
            our_price,
            percent_margin: quote.percent_margin,
            expected_margin_amount,
            expected_init_amount,
        })
    }

    /// Pay the invoices of a contract and mark it as paid.
    ///
    /// The margin invoice is paid first, the init invoice second. If either
    /// payment fails the record stays unpaid.
    pub async fn open_contract(&self, id: &ContractId) -> LacResult<Contract> {
        info!("Received open contract request for {}", id);

        // Concurrent opens of one contract run one at a time, so a later
        // call sees the paid record instead of paying again
        let lock = self
            .opening
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        let result = self.pay_and_mark_open(id).await;

        self.opening.remove_if(id, |_, l| Arc::strong_count(l) <= 2);
        drop(guard);

        result
    }

    async fn pay_and_mark_open(&self, id: &ContractId) -> LacResult<Contract> {
        let contract = self.store.get(id).await?;
        contract
            .validate()
            .map_err(|e| LacError::Corrupt(format!("stored contract {} is invalid: {}", id, e)))?;

        if contract.invoices_paid {
            info!("Contract {} is already open", id);
            return Ok(contract);
        }

        for (paid, invoice) in contract.required_invoices().into_iter().enumerate() {
            if let Err(e) = self.pay_invoice(invoice).await {
                if paid > 0 {
                    error!(
                        contract_id = %id,
                        "Margin invoice was paid but init payment failed: {}", e
                    );
                }
                return Err(e);
            }
        }

        let mut opened = contract.clone();
        opened.invoices_paid = true;

        if let Err(e) = self.store.replace(&contract, &opened).await {
            error!(contract_id = %id, "Invoices paid but contract could not be updated: {}", e);
            return Err(e);
        }
        self.hub.publish(&opened);

        info!("Opened contract {}", id);

        Ok(opened)
    }

    /// Close a contract remotely, then forget it locally
    pub async fn close_contract(&self, id: &ContractId) -> LacResult<()> {
        info!("Received close contract request for {}", id);

        // Fails with NotFound before anything is sent to the server
        self.store.get(id).await?;

        if let Err(e) = self
            .remote_call("close contract", self.service.close_contract(id))
            .await
        {
            warn!("Could not close contract {} with server: {}", id, e);
            return Err(e);
        }

        self.store.delete(id).await?;

        info!("Closed contract {}", id);

        Ok(())
    }

    /// All locally known contracts
    pub async fn list_contracts(&self) -> LacResult<Vec<Contract>> {
        info!("Received list contracts request");
        self.store.list().await
    }

    /// Subscribe to contract updates written from now on
    pub fn subscribe(&self) -> ContractSubscription {
        info!("Received subscribe client contracts request");
        self.hub.subscribe()
    }

    /// Create a payment request for `amount`
    pub async fn request_payment_request(&self, amount: Sats) -> LacResult<String> {
        info!("Received payment request request for {}", amount);
        self.payment_call("create invoice", self.payments.create_payment_request(amount))
            .await
    }

    /// Pay a payment request on behalf of the caller
    pub async fn request_payment(&self, pay_req: &str) -> LacResult<()> {
        info!("Received payment request");
        if pay_req.trim().is_empty() {
            return Err(LacError::InvalidArgument("payment request can not be empty".into()));
        }
        self.pay_invoice(pay_req).await
    }

    pub fn hub(&self) -> &Arc<ContractHub> {
        &self.hub
    }

    async fn pay_invoice(&self, pay_req: &str) -> LacResult<()> {
        self.payment_call("pay invoice", self.payments.pay(pay_req)).await?;
        info!(payment_request = %pay_req, "paid");
        Ok(())
    }

    async fn save(&self, contract: &Contract) -> LacResult<()> {
        self.store.put(contract).await?;
        self.hub.publish(contract);
        Ok(())
    }

    async fn remote_call<T>(
        &self,
        what: &str,
        call: impl Future<Output = LacResult<T>>,
    ) -> LacResult<T> {
        self.bounded(what, call, LacError::RemoteFailure).await
    }

    async fn payment_call<T>(
        &self,
        what: &str,
        call: impl Future<Output = LacResult<T>>,
    ) -> LacResult<T> {
        self.bounded(what, call, LacError::PaymentFailure).await
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = LacResult<T>>,
        on_timeout: fn(String) -> LacError,
    ) -> LacResult<T> {
        match tokio::time::timeout(self.config.rpc_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "{} timed out after {:?}",
                what, self.config.rpc_timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::PriceBook;
    use async_trait::async_trait;
    use lac_core::{ContractQuote, ContractService, PaymentBackend};
    use lac_state::{ContractStore, MemoryContractStore, PersistentContractStore};
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};

    const MARGIN_REQ: &str = "lnbcrt310u1margin";
    const INIT_REQ: &str = "lnbcrt3100u1init";

    struct FakeService {
        init_pay_req: Option<String>,
        asset_price: f64,
        percent_margin: f64,
        fail_propose: AtomicBool,
        fail_close: AtomicBool,
        proposals: Mutex<Vec<ContractProposal>>,
        closed: Mutex<Vec<ContractId>>,
    }

    impl FakeService {
        fn new() -> Self {
            Self {
                init_pay_req: Some(INIT_REQ.to_string()),
                asset_price: 50.5,
                percent_margin: 10.0,
                fail_propose: AtomicBool::new(false),
                fail_close: AtomicBool::new(false),
                proposals: Mutex::new(Vec::new()),
                closed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContractService for FakeService {
        async fn propose_contract(&self, proposal: &ContractProposal) -> LacResult<ContractQuote> {
            self.proposals.lock().push(proposal.clone());
            if self.fail_propose.load(Ordering::SeqCst) {
                return Err(LacError::RemoteFailure("asset server rejected proposal".into()));
            }
            Ok(ContractQuote {
                id: ContractId::new(uuid::Uuid::new_v4().to_string()),
                margin_pay_req: MARGIN_REQ.to_string(),
                init_pay_req: self.init_pay_req.clone(),
                asset_price: self.asset_price,
                percent_margin: self.percent_margin,
            })
        }

        async fn close_contract(&self, id: &ContractId) -> LacResult<()> {
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(LacError::RemoteFailure("asset server unavailable".into()));
            }
            self.closed.lock().push(id.clone());
            Ok(())
        }
    }

    struct FakePayments {
        amounts: HashMap<String, Sats>,
        failing: Mutex<HashSet<String>>,
        paid: Mutex<Vec<String>>,
        hang: AtomicBool,
        pay_delay: Mutex<Duration>,
        delete_on_pay: Mutex<Option<(Arc<MemoryContractStore>, ContractId)>>,
    }

    impl FakePayments {
        fn new() -> Self {
            let mut amounts = HashMap::new();
            amounts.insert(MARGIN_REQ.to_string(), Sats(31_000));
            amounts.insert(INIT_REQ.to_string(), Sats(310_000));
            Self {
                amounts,
                failing: Mutex::new(HashSet::new()),
                paid: Mutex::new(Vec::new()),
                hang: AtomicBool::new(false),
                pay_delay: Mutex::new(Duration::ZERO),
                delete_on_pay: Mutex::new(None),
            }
        }

        fn fail(&self, pay_req: &str) {
            self.failing.lock().insert(pay_req.to_string());
        }

        fn paid(&self) -> Vec<String> {
            self.paid.lock().clone()
        }
    }

    #[async_trait]
    impl PaymentBackend for FakePayments {
        async fn decode_payment_request(&self, pay_req: &str) -> LacResult<Sats> {
            self.amounts
                .get(pay_req)
                .copied()
                .ok_or_else(|| LacError::PaymentFailure(format!("invalid payment request {}", pay_req)))
        }

        async fn pay(&self, pay_req: &str) -> LacResult<()> {
            let delay = *self.pay_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.hang.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.failing.lock().contains(pay_req) {
                return Err(LacError::PaymentFailure("unable to find a path to destination".into()));
            }
            self.paid.lock().push(pay_req.to_string());

            let target = self.delete_on_pay.lock().take();
            if let Some((store, id)) = target {
                store.delete(&id).await?;
            }
            Ok(())
        }

        async fn create_payment_request(&self, amount: Sats) -> LacResult<String> {
            Ok(format!("lnbcrt{}n1generated", amount.0))
        }
    }

    struct Fixture {
        manager: ContractManager,
        store: Arc<MemoryContractStore>,
        service: Arc<FakeService>,
        payments: Arc<FakePayments>,
    }

    fn fixture_with(service: FakeService, rpc_timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryContractStore::new());
        let service = Arc::new(service);
        let payments = Arc::new(FakePayments::new());
        let prices = Arc::new(PriceBook::new(vec!["USD".into(), "NOK".into()]));
        prices.update("USD", 50.0).unwrap();

        let config = ManagerConfig {
            net_address: "10.0.0.7:10456".into(),
            rpc_timeout,
            subscriber_capacity: 8,
        };
        let manager = ContractManager::new(
            config,
            store.clone(),
            payments.clone(),
            service.clone(),
            prices,
        );

        Fixture {
            manager,
            store,
            service,
            payments,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(FakeService::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_create_unfunded() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();

        let contract = &created.contract;
        assert_eq!(contract.amount, 100.0);
        assert_eq!(contract.contract_type, ContractType::Unfunded);
        assert_eq!(contract.amount_sat_margin, Sats(31_000));
        assert_eq!(contract.init_invoice, None);
        assert_eq!(contract.amount_sat_init, Sats::ZERO);
        assert!(!contract.invoices_paid);
        assert_eq!(created.expected_init_amount, Sats::ZERO);

        assert_eq!(f.store.get(&contract.id).await.unwrap(), *contract);

        let proposals = f.service.proposals.lock();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].host, "10.0.0.7:10456");
        assert_eq!(proposals[0].contract_type, ContractType::Unfunded);
    }

    #[tokio::test]
    async fn test_create_unfunded_ignores_init_quote() {
        // The fake service always quotes an init invoice
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 1.0, ContractType::Unfunded)
            .await
            .unwrap();
        assert!(created.contract.init_invoice.is_none());
        assert_eq!(created.expected_init_amount, Sats::ZERO);
    }

    #[tokio::test]
    async fn test_create_funded() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Funded)
            .await
            .unwrap();

        assert_eq!(created.contract.contract_type, ContractType::Funded);
        assert_eq!(created.contract.init_invoice.as_deref(), Some(INIT_REQ));
        assert_eq!(created.contract.amount_sat_init, Sats(310_000));

        // 100 USD at 50 USD per BTC is 2 BTC
        assert_eq!(created.expected_init_amount, Sats(200_000_000));
        assert_eq!(created.expected_margin_amount, Sats(20_000_000));
        assert_eq!(created.our_price, 50.0);
        assert_eq!(created.server_price, 50.5);
        assert_eq!(created.percent_margin, 10.0);
    }

    #[tokio::test]
    async fn test_create_rejects_zero_amount() {
        let f = fixture();
        let result = f.manager.create_contract("USD", 0.0, ContractType::Funded).await;
        assert!(matches!(result, Err(LacError::InvalidArgument(_))));
        assert!(f.service.proposals.lock().is_empty());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_unsupported_asset() {
        let f = fixture();
        let result = f.manager.create_contract("EUR", 10.0, ContractType::Unfunded).await;
        assert!(matches!(result, Err(LacError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_create_without_price() {
        let f = fixture();
        let result = f.manager.create_contract("NOK", 10.0, ContractType::Unfunded).await;
        assert!(matches!(result, Err(LacError::PriceUnavailable(_))));
        assert!(f.service.proposals.lock().is_empty());
    }

    #[tokio::test]
    async fn test_create_surfaces_remote_failure() {
        let f = fixture();
        f.service.fail_propose.store(true, Ordering::SeqCst);

        let result = f.manager.create_contract("USD", 10.0, ContractType::Unfunded).await;
        match result {
            Err(LacError::RemoteFailure(msg)) => assert!(msg.contains("rejected proposal")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_create_funded_without_init_invoice() {
        let service = FakeService {
            init_pay_req: None,
            ..FakeService::new()
        };
        let f = fixture_with(service, Duration::from_secs(5));

        let result = f.manager.create_contract("USD", 10.0, ContractType::Funded).await;
        assert!(matches!(result, Err(LacError::RemoteFailure(_))));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_open_funded() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Funded)
            .await
            .unwrap();

        let opened = f.manager.open_contract(&created.contract.id).await.unwrap();
        assert!(opened.invoices_paid);
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ, INIT_REQ]);
        assert!(f.store.get(&opened.id).await.unwrap().invoices_paid);
    }

    #[tokio::test]
    async fn test_open_unfunded_pays_margin_only() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();

        f.manager.open_contract(&created.contract.id).await.unwrap();
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ]);
    }

    #[tokio::test]
    async fn test_open_margin_failure_leaves_record_unchanged() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Funded)
            .await
            .unwrap();
        f.payments.fail(MARGIN_REQ);

        let result = f.manager.open_contract(&created.contract.id).await;
        assert!(matches!(result, Err(LacError::PaymentFailure(_))));
        assert!(f.payments.paid().is_empty());
        assert_eq!(f.store.get(&created.contract.id).await.unwrap(), created.contract);
    }

    #[tokio::test]
    async fn test_open_init_failure_after_margin() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Funded)
            .await
            .unwrap();
        f.payments.fail(INIT_REQ);

        let result = f.manager.open_contract(&created.contract.id).await;
        assert!(matches!(result, Err(LacError::PaymentFailure(_))));
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ]);
        assert!(!f.store.get(&created.contract.id).await.unwrap().invoices_paid);
    }

    #[tokio::test]
    async fn test_open_unknown_contract() {
        let f = fixture();
        let result = f.manager.open_contract(&ContractId::new("missing")).await;
        assert!(matches!(result, Err(LacError::NotFound(_))));
        assert!(f.payments.paid().is_empty());
    }

    #[tokio::test]
    async fn test_open_twice_pays_once() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();

        f.manager.open_contract(&created.contract.id).await.unwrap();
        let again = f.manager.open_contract(&created.contract.id).await.unwrap();
        assert!(again.invoices_paid);
        assert_eq!(f.payments.paid().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_opens_pay_once() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        *f.payments.pay_delay.lock() = Duration::from_millis(50);

        let id = created.contract.id.clone();
        let (first, second) = tokio::join!(f.manager.open_contract(&id), f.manager.open_contract(&id));

        assert!(first.unwrap().invoices_paid);
        assert!(second.unwrap().invoices_paid);
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ]);
    }

    #[tokio::test]
    async fn test_concurrent_opens_funded_pay_each_invoice_once() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Funded)
            .await
            .unwrap();
        *f.payments.pay_delay.lock() = Duration::from_millis(20);

        let id = created.contract.id.clone();
        let (first, second, third) = tokio::join!(
            f.manager.open_contract(&id),
            f.manager.open_contract(&id),
            f.manager.open_contract(&id)
        );

        for result in [first, second, third] {
            assert!(result.unwrap().invoices_paid);
        }
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ, INIT_REQ]);
        assert!(f.manager.opening.is_empty());
    }

    #[tokio::test]
    async fn test_failed_open_can_be_retried() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        f.payments.fail(MARGIN_REQ);
        assert!(f.manager.open_contract(&created.contract.id).await.is_err());
        assert!(f.manager.opening.is_empty());

        f.payments.failing.lock().clear();
        let opened = f.manager.open_contract(&created.contract.id).await.unwrap();
        assert!(opened.invoices_paid);
        assert_eq!(f.payments.paid(), vec![MARGIN_REQ]);
    }

    #[tokio::test]
    async fn test_close_during_open_is_not_undone() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        *f.payments.delete_on_pay.lock() = Some((f.store.clone(), created.contract.id.clone()));

        let result = f.manager.open_contract(&created.contract.id).await;
        assert!(matches!(result, Err(LacError::NotFound(_))));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_payment_timeout() {
        let f = fixture_with(FakeService::new(), Duration::from_millis(50));
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        f.payments.hang.store(true, Ordering::SeqCst);

        let result = f.manager.open_contract(&created.contract.id).await;
        match result {
            Err(LacError::PaymentFailure(msg)) => assert!(msg.contains("timed out")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!f.store.get(&created.contract.id).await.unwrap().invoices_paid);
    }

    #[tokio::test]
    async fn test_close_unknown_contract() {
        let f = fixture();
        f.manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();

        let result = f.manager.close_contract(&ContractId::new("missing")).await;
        assert!(matches!(result, Err(LacError::NotFound(_))));
        assert_eq!(f.store.len(), 1);
        assert!(f.service.closed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_remote_failure_keeps_record() {
        let f = fixture();
        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        f.service.fail_close.store(true, Ordering::SeqCst);

        let result = f.manager.close_contract(&created.contract.id).await;
        assert!(matches!(result, Err(LacError::RemoteFailure(_))));
        assert!(f.store.exists(&created.contract.id).await.unwrap());

        // Retrying once the server is back succeeds
        f.service.fail_close.store(false, Ordering::SeqCst);
        f.manager.close_contract(&created.contract.id).await.unwrap();
        assert!(!f.store.exists(&created.contract.id).await.unwrap());
        assert_eq!(*f.service.closed.lock(), vec![created.contract.id.clone()]);
    }

    #[tokio::test]
    async fn test_list_contracts() {
        let f = fixture();
        assert!(f.manager.list_contracts().await.unwrap().is_empty());

        let mut created = Vec::new();
        for amount in [10.0, 20.0, 30.0] {
            let c = f
                .manager
                .create_contract("USD", amount, ContractType::Unfunded)
                .await
                .unwrap();
            created.push(c.contract.id);
        }

        let mut listed: Vec<ContractId> = f
            .manager
            .list_contracts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        listed.sort();
        created.sort();
        assert_eq!(listed, created);
    }

    #[tokio::test]
    async fn test_subscriber_receives_create_and_open() {
        let f = fixture();
        let mut sub = f.manager.subscribe();

        let created = f
            .manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();
        f.manager.open_contract(&created.contract.id).await.unwrap();

        let first = sub.recv().await.unwrap();
        assert_eq!(first.id, created.contract.id);
        assert!(!first.invoices_paid);

        let second = sub.recv().await.unwrap();
        assert_eq!(second.id, created.contract.id);
        assert!(second.invoices_paid);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let f = fixture();
        f.manager
            .create_contract("USD", 100.0, ContractType::Unfunded)
            .await
            .unwrap();

        let mut sub = f.manager.subscribe();
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_payment_requests() {
        let f = fixture();
        let pay_req = f.manager.request_payment_request(Sats(1_500)).await.unwrap();
        assert_eq!(pay_req, "lnbcrt1500n1generated");

        assert!(matches!(
            f.manager.request_payment("  ").await,
            Err(LacError::InvalidArgument(_))
        ));

        f.manager.request_payment(&pay_req).await.unwrap();
        assert_eq!(f.payments.paid(), vec![pay_req]);
    }

    #[tokio::test]
    async fn test_with_persistent_store() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = Arc::new(PersistentContractStore::open(tmp.path()).unwrap());
        let prices = Arc::new(PriceBook::new(vec!["USD".into()]));
        prices.update("USD", 8_000.0).unwrap();

        let manager = ContractManager::new(
            ManagerConfig {
                net_address: "localhost:10456".into(),
                rpc_timeout: Duration::from_secs(5),
                subscriber_capacity: 4,
            },
            store.clone(),
            Arc::new(FakePayments::new()),
            Arc::new(FakeService::new()),
            prices,
        );

        let created = manager
            .create_contract("USD", 250.0, ContractType::Funded)
            .await
            .unwrap();
        let opened = manager.open_contract(&created.contract.id).await.unwrap();
        assert_eq!(store.get(&opened.id).await.unwrap(), opened);

        manager.close_contract(&opened.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
