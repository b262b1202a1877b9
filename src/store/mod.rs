//! Persistence capability handed to every component. Records reference each
//! other by id only; nothing here enforces cascades between citizens,
//! documents and certifications.

mod postgres;

pub use postgres::PgStore;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    AuditEntry, Certification, Citizen, CitizenChangeset, Document, DocumentChangeset,
    Fingerprint, NewAuditEntry, NewCertification, NewCitizen, NewDocument, NewFingerprint,
};
use crate::utils::pagination::PageRequest;

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub search: Option<String>,
    pub national_id: Option<i64>,
    pub owner_user_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CertificationFilter {
    pub citizen_id: Option<Uuid>,
    pub document_id: Option<Uuid>,
}

/// Listing results come back as the requested page plus the total number of
/// matching rows.
pub type Page<T> = (Vec<T>, i64);

pub trait Store: Send + Sync + 'static {
    fn insert_citizen(&self, citizen: NewCitizen) -> AppResult<Citizen>;
    fn find_citizen(&self, id: Uuid) -> AppResult<Option<Citizen>>;
    fn find_citizen_by_national_id(&self, national_id: i64) -> AppResult<Option<Citizen>>;
    fn list_citizens(&self, search: Option<&str>, page: PageRequest) -> AppResult<Page<Citizen>>;
    fn update_citizen(&self, id: Uuid, changes: CitizenChangeset) -> AppResult<Option<Citizen>>;
    fn delete_citizen(&self, id: Uuid) -> AppResult<bool>;

    fn insert_fingerprint(&self, fingerprint: NewFingerprint) -> AppResult<Fingerprint>;
    fn find_fingerprint_by_citizen(&self, citizen_id: Uuid) -> AppResult<Option<Fingerprint>>;
    /// Oldest enrollment whose template equals `template` exactly.
    fn find_fingerprint_by_template(&self, template: &str) -> AppResult<Option<Fingerprint>>;
    fn all_fingerprints(&self) -> AppResult<Vec<Fingerprint>>;
    fn list_fingerprints(&self, page: PageRequest) -> AppResult<Page<Fingerprint>>;
    fn update_fingerprint(
        &self,
        citizen_id: Uuid,
        template: String,
        updated_at: NaiveDateTime,
    ) -> AppResult<Option<Fingerprint>>;
    fn delete_fingerprint(&self, citizen_id: Uuid) -> AppResult<bool>;

    fn insert_document(&self, document: NewDocument) -> AppResult<Document>;
    fn find_document(&self, id: Uuid) -> AppResult<Option<Document>>;
    fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> AppResult<Page<Document>>;
    fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChangeset,
    ) -> AppResult<Option<Document>>;
    fn delete_document(&self, id: Uuid) -> AppResult<bool>;

    fn insert_certification(&self, certification: NewCertification)
        -> AppResult<Certification>;
    fn find_certification(&self, id: Uuid) -> AppResult<Option<Certification>>;
    fn list_certifications(
        &self,
        filter: &CertificationFilter,
        page: PageRequest,
    ) -> AppResult<Page<Certification>>;
    fn revoke_certification(
        &self,
        id: Uuid,
        updated_at: NaiveDateTime,
    ) -> AppResult<Option<Certification>>;
    fn delete_certification(&self, id: Uuid) -> AppResult<bool>;

    fn append_audit(&self, entry: NewAuditEntry) -> AppResult<AuditEntry>;
    fn list_audit_entries(
        &self,
        action: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<AuditEntry>>;
}
