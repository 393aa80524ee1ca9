use std::{sync::Arc, time::Duration};

use audioforge_generation::ThrottlePolicy;
use audioforge_infra::{
    BackendConfig, BlobGateway, CreditLedger, HttpBackendDispatcher, InMemoryCreditLedger,
    InMemoryJobStore, JobStore, Orchestrator, OrchestratorConfig, OrchestratorHandle,
    SignedBlobGateway, SignedUrlConfig,
};

#[cfg(feature = "postgres")]
use audioforge_infra::{PostgresCreditLedger, PostgresJobStore};
#[cfg(feature = "postgres")]
use sqlx::PgPool;

/// Lifetime of fetch URLs handed out for succeeded results and history.
const FETCH_TTL: Duration = Duration::from_secs(3600);

/// History page size.
const HISTORY_LIMIT: usize = 10;

/// Everything the handlers need, behind one `Extension`.
pub struct AppServices {
    pub jobs: Arc<dyn JobStore>,
    pub blobs: Arc<dyn BlobGateway>,
    pub credits: Arc<dyn CreditLedger>,
    pub generator: OrchestratorHandle,
    pub throttle: ThrottlePolicy,
    pub fetch_ttl: Duration,
    pub history_limit: usize,
}

pub async fn build_services() -> AppServices {
    let backend = backend_config_from_env();
    let dispatcher = Arc::new(HttpBackendDispatcher::new(backend));

    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let jobs: Arc<dyn JobStore>;
    let credits: Arc<dyn CreditLedger>;
    if use_persistent {
        #[cfg(feature = "postgres")]
        {
            let database_url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
            let pool = PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to Postgres");

            let store = PostgresJobStore::new(pool.clone());
            store
                .ensure_schema()
                .await
                .expect("Failed to prepare generation_jobs schema");
            let ledger = PostgresCreditLedger::new(pool);
            ledger
                .ensure_schema()
                .await
                .expect("Failed to prepare credit_balances schema");

            jobs = Arc::new(store);
            credits = Arc::new(ledger);
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
            jobs = Arc::new(InMemoryJobStore::new());
            credits = Arc::new(InMemoryCreditLedger::new());
        }
    } else {
        jobs = Arc::new(InMemoryJobStore::new());
        credits = Arc::new(InMemoryCreditLedger::new());
    }

    let blobs: Arc<dyn BlobGateway> = Arc::new(SignedBlobGateway::new(storage_config_from_env()));

    let generator = Orchestrator::new(
        jobs.clone(),
        dispatcher,
        credits.clone(),
        OrchestratorConfig::default(),
    )
    .spawn();

    AppServices {
        jobs,
        blobs,
        credits,
        generator,
        throttle: ThrottlePolicy::default(),
        fetch_ttl: FETCH_TTL,
        history_limit: HISTORY_LIMIT,
    }
}

fn backend_config_from_env() -> BackendConfig {
    let tts_url = env_or("TTS_API_URL", "http://localhost:8001");
    let vc_url = env_or("VOICE_CONVERSION_API_URL", "http://localhost:8002");
    let sfx_url = env_or("SOUND_EFFECT_API_URL", "http://localhost:8003");
    let api_key = std::env::var("BACKEND_API_KEY").unwrap_or_else(|_| {
        tracing::warn!("BACKEND_API_KEY not set; using insecure dev default");
        "dev-key".to_string()
    });

    BackendConfig::new(tts_url, vc_url, sfx_url, api_key)
}

fn storage_config_from_env() -> SignedUrlConfig {
    let base_url = env_or("STORAGE_BASE_URL", "http://localhost:9000");
    let bucket = env_or("STORAGE_BUCKET", "audioforge-dev");
    let secret = std::env::var("STORAGE_SIGNING_SECRET").unwrap_or_else(|_| {
        tracing::warn!("STORAGE_SIGNING_SECRET not set; using insecure dev default");
        "dev-storage-secret".to_string()
    });

    SignedUrlConfig {
        base_url,
        bucket,
        secret,
        upload_ttl: Duration::from_secs(600),
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
