#![allow(dead_code)]

use recharge_service::config::{
    CatalogConfig, Config, PaymentConfig, ServerConfig, StorageConfig,
};
use recharge_service::services::{
    LedgerStore, MemoryStore, PaymentGateway, PlanCatalog, RechargeLedger, SimulatedGateway,
};
use recharge_service::{AppState, Application};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_USER_ID: &str = "test-user";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

pub fn test_config(catalog_url: Option<String>) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        catalog: CatalogConfig {
            base_url: catalog_url,
            timeout_ms: 1_000,
        },
        payment: PaymentConfig {
            simulated_delay_ms: 0,
            ..PaymentConfig::default()
        },
        storage: StorageConfig::default(),
        service_name: "recharge-service-test".to_string(),
        ..Config::default()
    }
}

impl TestApp {
    /// Simulated payments, in-memory ledger, built-in catalog.
    pub async fn spawn() -> Self {
        Self::spawn_with(None, Arc::new(SimulatedGateway::new(Duration::ZERO))).await
    }

    pub async fn spawn_with_catalog(catalog_url: String) -> Self {
        Self::spawn_with(
            Some(catalog_url),
            Arc::new(SimulatedGateway::new(Duration::ZERO)),
        )
        .await
    }

    pub async fn spawn_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::spawn_with(None, gateway).await
    }

    /// Simulated payments over a caller-provided ledger store.
    pub async fn spawn_with_store(store: Arc<dyn LedgerStore>) -> Self {
        Self::spawn_with_parts(
            None,
            Arc::new(SimulatedGateway::new(Duration::ZERO)),
            store,
        )
        .await
    }

    async fn spawn_with(catalog_url: Option<String>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::spawn_with_parts(catalog_url, gateway, Arc::new(MemoryStore::default())).await
    }

    async fn spawn_with_parts(
        catalog_url: Option<String>,
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        let config = test_config(catalog_url);
        let state = AppState {
            config: config.clone(),
            catalog: PlanCatalog::new(&config.catalog),
            ledger: Arc::new(RechargeLedger::new(store, gateway)),
        };

        let app = Application::build_with_state(config, state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_recharge(&self, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/recharges", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Airtel recharge of the Premium Plan from the built-in catalog.
pub fn premium_recharge() -> serde_json::Value {
    serde_json::json!({
        "phone_number": "9876543210",
        "operator": "Airtel",
        "plan_type": "prepaid",
        "amount": 399,
        "selected_plan": {
            "id": "2",
            "name": "Premium Plan",
            "price": 399,
            "validity": "56 days",
            "data": "2GB/day",
            "type": "prepaid",
            "description": "Unlimited calls + SMS + Disney+ Hotstar"
        },
        "user_id": TEST_USER_ID
    })
}
