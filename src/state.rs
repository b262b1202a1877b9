use std::sync::Arc;

use crate::{
    certification::CertificationEngine,
    config::AppConfig,
    delivery::{DeliveryChannel, MailTransport},
    matcher::FingerprintMatcher,
    sources::DocumentSources,
    stamp::StampRenderer,
    storage::BlobStorage,
    store::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn BlobStorage>,
    pub matcher: Arc<dyn FingerprintMatcher>,
    pub sources: DocumentSources,
    pub certification: CertificationEngine,
    pub delivery: DeliveryChannel,
}

impl AppState {
    /// Wires components around the injected store, storage and matcher.
    /// `mailer` is `None` when mail settings are incomplete.
    pub fn new(
        store: Arc<dyn Store>,
        config: AppConfig,
        storage: Arc<dyn BlobStorage>,
        matcher: Arc<dyn FingerprintMatcher>,
        mailer: Option<Arc<dyn MailTransport>>,
    ) -> anyhow::Result<Self> {
        let sources = DocumentSources::new(storage.clone(), config.google_api_key.clone())?;
        let renderer = StampRenderer::new(
            config.pdfium_library_path.clone(),
            config.stamp_issuer.clone(),
        );
        let certification = CertificationEngine::new(store.clone(), matcher.clone());
        let delivery = DeliveryChannel::new(store.clone(), renderer, config.mail.clone(), mailer);

        Ok(Self {
            store,
            config: Arc::new(config),
            storage,
            matcher,
            sources,
            certification,
            delivery,
        })
    }

    pub fn renderer(&self) -> &StampRenderer {
        self.delivery.renderer()
    }
}
