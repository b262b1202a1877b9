use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::audit;
use crate::error::{AppError, AppResult};
use crate::matcher::FingerprintMatcher;
use crate::models::{Certification, Citizen, Document, NewCertification};
use crate::store::Store;

/// Appended to a document reference to form the certified reference.
pub const CERTIFIED_SUFFIX: &str = "_certified";
pub const DEFAULT_OUTPUT_FORMAT: &str = "pdf";

#[derive(Debug, Clone)]
pub struct CertifyRequest {
    pub citizen_id: Uuid,
    pub document_id: Uuid,
    pub fingerprint_template: String,
    pub stamp_details: String,
    pub output_format: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CertificationOutcome {
    pub certification: Certification,
    pub citizen: Citizen,
    pub document: Document,
}

#[derive(Clone)]
pub struct CertificationEngine {
    store: Arc<dyn Store>,
    matcher: Arc<dyn FingerprintMatcher>,
}

impl CertificationEngine {
    pub fn new(store: Arc<dyn Store>, matcher: Arc<dyn FingerprintMatcher>) -> Self {
        Self { store, matcher }
    }

    /// Validates citizen, fingerprint and document in that order, then
    /// records an approved certification. Existing certifications for the
    /// same pair are not consulted.
    pub fn certify(&self, request: CertifyRequest) -> AppResult<CertificationOutcome> {
        let citizen = self
            .store
            .find_citizen(request.citizen_id)?
            .ok_or_else(|| AppError::not_found("citizen not found"))?;

        let enrolled = self
            .store
            .find_fingerprint_by_citizen(citizen.id)?
            .ok_or_else(|| AppError::unauthorized("fingerprint verification failed"))?;
        if !self
            .matcher
            .verify(&enrolled.template, &request.fingerprint_template)
        {
            return Err(AppError::unauthorized("fingerprint verification failed"));
        }

        let document = self
            .store
            .find_document(request.document_id)?
            .ok_or_else(|| AppError::not_found("document not found"))?;
        if !document.is_active {
            return Err(AppError::invalid_state(
                "document is inactive and cannot be certified",
            ));
        }

        let output_format = request
            .output_format
            .filter(|format| !format.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

        let certification = self.store.insert_certification(NewCertification {
            id: Uuid::new_v4(),
            citizen_id: citizen.id,
            document_id: document.id,
            approved: true,
            certified_reference: certified_reference(&document.reference_url),
            stamp_details: request.stamp_details,
            output_format,
        })?;

        info!(
            certification_id = %certification.id,
            citizen_id = %citizen.id,
            document_id = %document.id,
            "document certified"
        );
        audit::record(
            self.store.as_ref(),
            audit::DOCUMENT_CERTIFIED,
            format!("Document certified for {}", citizen.full_name()),
            certification.id.to_string(),
        );

        Ok(CertificationOutcome {
            certification,
            citizen,
            document,
        })
    }

    /// Sets approval to false. Revoking an already revoked record succeeds.
    pub fn revoke(&self, certification_id: Uuid) -> AppResult<Certification> {
        let now = Utc::now().naive_utc();
        let certification = self
            .store
            .revoke_certification(certification_id, now)?
            .ok_or_else(|| AppError::not_found("certification not found"))?;
        info!(certification_id = %certification.id, "certification revoked");
        Ok(certification)
    }

    pub fn delete(&self, certification_id: Uuid) -> AppResult<()> {
        if !self.store.delete_certification(certification_id)? {
            return Err(AppError::not_found("certification not found"));
        }
        info!(certification_id = %certification_id, "certification deleted");
        Ok(())
    }
}

pub fn certified_reference(reference: &str) -> String {
    format!("{reference}{CERTIFIED_SUFFIX}")
}
