use app_state::AppSettings;
use common_services::access::AccessCodes;
use common_services::database::MetadataStore;
use common_services::faces::FaceExtractor;
use common_services::nice_id;
use common_services::storage::ObjectStorage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything the controller, pipeline, and queries need, constructed once
/// at process start. The extractor in particular is expensive to stand up,
/// so it is built here and shared.
pub struct ServiceContext {
    pub worker_id: String,
    pub settings: AppSettings,
    pub store: Arc<dyn MetadataStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub extractor: Arc<dyn FaceExtractor>,
    pub access_codes: AccessCodes,
    submission_locks: FingerprintLocks,
}

impl ServiceContext {
    #[must_use]
    pub fn new(
        settings: AppSettings,
        store: Arc<dyn MetadataStore>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Arc<dyn FaceExtractor>,
    ) -> Self {
        let access_codes = AccessCodes::new(settings.secrets.access_code_salt.as_deref());
        Self {
            worker_id: nice_id(8),
            settings,
            store,
            storage,
            extractor,
            access_codes,
            submission_locks: FingerprintLocks::default(),
        }
    }

    /// Serializes the check-and-create sequence for one fingerprint, so two
    /// near-simultaneous submissions can't both create a job.
    pub async fn lock_fingerprint(&self, fingerprint: &str) -> tokio::sync::OwnedMutexGuard<()> {
        self.submission_locks.acquire(fingerprint).await
    }
}

/// A mutex per fingerprint. Entries are never evicted; the map stays
/// bounded by the number of distinct fingerprints seen by this process.
#[derive(Default)]
struct FingerprintLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FingerprintLocks {
    async fn acquire(&self, fingerprint: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(fingerprint.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
