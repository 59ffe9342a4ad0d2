use curvebook_core::{AccountId, AggregateId};
use curvebook_ledger::LedgerId;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = curvebook_api::app::build_app(LedgerId::new(AggregateId::new()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, caller: Option<AccountId>, path: &str, body: Value) -> (StatusCode, Value) {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body);
        if let Some(caller) = caller {
            req = req.header("x-account-id", caller.to_string());
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn amount(v: &Value, field: &str) -> u128 {
    v[field].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutating_routes_require_a_caller() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.post(None, "/buy", json!({ "value": "1" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_caller");

    let res = srv
        .client
        .post(format!("{}/buy", srv.base_url))
        .header("x-account-id", "not-a-uuid")
        .json(&json!({ "value": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn buy_sell_lifecycle_with_default_curve() {
    let srv = TestServer::spawn().await;
    let alice = AccountId::new();
    let one_unit = 10u128.pow(18);

    let (status, price) = srv.get("/price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&price, "price"), 10u128.pow(15));

    // Unfunded wallet: the deposit cannot be collected.
    let (status, body) = srv
        .post(Some(alice), "/buy", json!({ "value": one_unit.to_string() }))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "deposit_failed");

    srv.post(Some(alice), "/wallets/fund", json!({ "value": (2 * one_unit).to_string() }))
        .await;

    let (_, quote) = srv.get(&format!("/quote/buy?value={one_unit}")).await;
    let (status, bought) = srv
        .post(Some(alice), "/buy", json!({ "value": one_unit.to_string() }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&bought, "minted"), 10u128.pow(21));
    assert_eq!(amount(&quote, "minted"), 10u128.pow(21));

    let (_, balance) = srv.get(&format!("/balances/{alice}")).await;
    assert_eq!(amount(&balance, "balance"), 10u128.pow(21));

    let (_, state) = srv.get("/state").await;
    assert_eq!(amount(&state, "total_supply"), 10u128.pow(21));
    assert_eq!(amount(&state, "reserve"), one_unit);
    assert_eq!(amount(&state, "current_price"), 10u128.pow(15) + 10u128.pow(12));
    assert_eq!(state["version"], 1);

    // Selling everything back would owe more than the reserve holds.
    let (status, body) = srv
        .post(Some(alice), "/sell", json!({ "amount": 10u128.pow(21).to_string() }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "reserve_exhausted");

    let half = 10u128.pow(20) * 5;
    let (status, sold) = srv
        .post(Some(alice), "/sell", json!({ "amount": half.to_string() }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let payout = amount(&sold, "payout");
    assert!(payout > 0 && payout < one_unit);

    let (_, wallet) = srv.get(&format!("/wallets/{alice}")).await;
    assert_eq!(amount(&wallet, "balance"), one_unit + payout);
}

#[tokio::test]
async fn transfer_and_allowance_flow() {
    let srv = TestServer::spawn().await;
    let alice = AccountId::new();
    let bob = AccountId::new();
    let carol = AccountId::new();
    let deposit = 10u128.pow(18);

    srv.post(Some(alice), "/wallets/fund", json!({ "value": deposit.to_string() }))
        .await;
    srv.post(Some(alice), "/buy", json!({ "value": deposit.to_string() }))
        .await;

    let (status, body) = srv
        .post(Some(alice), "/transfer", json!({ "to": bob.to_string(), "value": "1000" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (status, body) = srv
        .post(
            Some(alice),
            "/transfer",
            json!({ "to": AccountId::NULL.to_string(), "value": "1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "transfer_to_null_identity");

    srv.post(Some(alice), "/approve", json!({ "spender": carol.to_string(), "value": "300" }))
        .await;
    srv.post(
        Some(alice),
        "/allowances/increase",
        json!({ "spender": carol.to_string(), "delta": "50" }),
    )
    .await;
    let (_, allowance) = srv.get(&format!("/allowances/{alice}/{carol}")).await;
    assert_eq!(amount(&allowance, "allowance"), 350);

    let (status, body) = srv
        .post(
            Some(carol),
            "/transfer-from",
            json!({ "from": alice.to_string(), "to": bob.to_string(), "value": "351" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "allowance_exceeded");

    let (status, _) = srv
        .post(
            Some(carol),
            "/transfer-from",
            json!({ "from": alice.to_string(), "to": bob.to_string(), "value": "350" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, bob_balance) = srv.get(&format!("/balances/{bob}")).await;
    assert_eq!(amount(&bob_balance, "balance"), 1_350);
    let (_, allowance) = srv.get(&format!("/allowances/{alice}/{carol}")).await;
    assert_eq!(amount(&allowance, "allowance"), 0);
}

#[tokio::test]
async fn receive_and_fallback_top_up_reserve() {
    let srv = TestServer::spawn().await;
    let funder = AccountId::new();

    srv.post(Some(funder), "/wallets/fund", json!({ "value": "500" }))
        .await;
    let (status, _) = srv
        .post(Some(funder), "/receive", json!({ "value": "200" }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = srv
        .post(Some(funder), "/fallback", json!({ "value": "100", "data": "ping" }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, state) = srv.get("/state").await;
    assert_eq!(amount(&state, "reserve"), 300);
    assert_eq!(amount(&state, "total_supply"), 0);

    let (_, wallet) = srv.get(&format!("/wallets/{funder}")).await;
    assert_eq!(amount(&wallet, "balance"), 200);
}
