use chrono::NaiveDateTime;
use diesel::{
    pg::{Pg, PgConnection},
    prelude::*,
    r2d2::{ConnectionManager, PooledConnection},
};
use uuid::Uuid;

use super::{CertificationFilter, DocumentFilter, Page, Store};
use crate::db::PgPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    AuditEntry, Certification, Citizen, CitizenChangeset, Document, DocumentChangeset,
    Fingerprint, NewAuditEntry, NewCertification, NewCitizen, NewDocument, NewFingerprint,
};
use crate::schema::{audit_logs, certifications, citizens, documents, fingerprints};
use crate::utils::pagination::PageRequest;

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::storage(format!("database pool error: {err}")))
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn citizen_query(search: Option<&str>) -> citizens::BoxedQuery<'static, Pg> {
    let mut query = citizens::table.into_boxed();
    if let Some(term) = search {
        let pattern = like_pattern(term);
        query = query.filter(
            citizens::first_name
                .ilike(pattern.clone())
                .or(citizens::last_name.ilike(pattern)),
        );
    }
    query
}

fn document_query(filter: &DocumentFilter) -> documents::BoxedQuery<'static, Pg> {
    let mut query = documents::table.into_boxed();
    if let Some(term) = filter.search.as_deref() {
        query = query.filter(documents::document_type.ilike(like_pattern(term)));
    }
    if let Some(national_id) = filter.national_id {
        query = query.filter(documents::national_id.eq(national_id));
    }
    if let Some(owner) = filter.owner_user_id {
        query = query.filter(documents::owner_user_id.eq(owner));
    }
    if let Some(active) = filter.is_active {
        query = query.filter(documents::is_active.eq(active));
    }
    query
}

fn certification_query(filter: &CertificationFilter) -> certifications::BoxedQuery<'static, Pg> {
    let mut query = certifications::table.into_boxed();
    if let Some(citizen_id) = filter.citizen_id {
        query = query.filter(certifications::citizen_id.eq(citizen_id));
    }
    if let Some(document_id) = filter.document_id {
        query = query.filter(certifications::document_id.eq(document_id));
    }
    query
}

fn audit_query(action: Option<&str>) -> audit_logs::BoxedQuery<'static, Pg> {
    let mut query = audit_logs::table.into_boxed();
    if let Some(action) = action {
        query = query.filter(audit_logs::action.eq(action.to_string()));
    }
    query
}

impl Store for PgStore {
    fn insert_citizen(&self, citizen: NewCitizen) -> AppResult<Citizen> {
        let mut conn = self.conn()?;
        diesel::insert_into(citizens::table)
            .values(&citizen)
            .get_result(&mut conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::conflict("a citizen with this national ID already exists"),
                other => other.into(),
            })
    }

    fn find_citizen(&self, id: Uuid) -> AppResult<Option<Citizen>> {
        let mut conn = self.conn()?;
        Ok(citizens::table.find(id).first(&mut conn).optional()?)
    }

    fn find_citizen_by_national_id(&self, national_id: i64) -> AppResult<Option<Citizen>> {
        let mut conn = self.conn()?;
        Ok(citizens::table
            .filter(citizens::national_id.eq(national_id))
            .first(&mut conn)
            .optional()?)
    }

    fn list_citizens(&self, search: Option<&str>, page: PageRequest) -> AppResult<Page<Citizen>> {
        let mut conn = self.conn()?;
        let total: i64 = citizen_query(search).count().get_result(&mut conn)?;
        let rows = citizen_query(search)
            .order(citizens::created_at.desc())
            .offset(page.offset())
            .limit(page.limit)
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn update_citizen(&self, id: Uuid, changes: CitizenChangeset) -> AppResult<Option<Citizen>> {
        let mut conn = self.conn()?;
        Ok(diesel::update(citizens::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    fn delete_citizen(&self, id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(citizens::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn insert_fingerprint(&self, fingerprint: NewFingerprint) -> AppResult<Fingerprint> {
        let mut conn = self.conn()?;
        diesel::insert_into(fingerprints::table)
            .values(&fingerprint)
            .get_result(&mut conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => AppError::conflict("fingerprint already enrolled for this citizen"),
                other => other.into(),
            })
    }

    fn find_fingerprint_by_citizen(&self, citizen_id: Uuid) -> AppResult<Option<Fingerprint>> {
        let mut conn = self.conn()?;
        Ok(fingerprints::table
            .filter(fingerprints::citizen_id.eq(citizen_id))
            .first(&mut conn)
            .optional()?)
    }

    fn find_fingerprint_by_template(&self, template: &str) -> AppResult<Option<Fingerprint>> {
        let mut conn = self.conn()?;
        Ok(fingerprints::table
            .filter(fingerprints::template.eq(template))
            .order(fingerprints::created_at.asc())
            .first(&mut conn)
            .optional()?)
    }

    fn all_fingerprints(&self) -> AppResult<Vec<Fingerprint>> {
        let mut conn = self.conn()?;
        Ok(fingerprints::table
            .order(fingerprints::created_at.asc())
            .load(&mut conn)?)
    }

    fn list_fingerprints(&self, page: PageRequest) -> AppResult<Page<Fingerprint>> {
        let mut conn = self.conn()?;
        let total: i64 = fingerprints::table.count().get_result(&mut conn)?;
        let rows = fingerprints::table
            .order(fingerprints::created_at.desc())
            .offset(page.offset())
            .limit(page.limit)
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn update_fingerprint(
        &self,
        citizen_id: Uuid,
        template: String,
        updated_at: NaiveDateTime,
    ) -> AppResult<Option<Fingerprint>> {
        let mut conn = self.conn()?;
        Ok(
            diesel::update(fingerprints::table.filter(fingerprints::citizen_id.eq(citizen_id)))
                .set((
                    fingerprints::template.eq(template),
                    fingerprints::updated_at.eq(updated_at),
                ))
                .get_result(&mut conn)
                .optional()?,
        )
    }

    fn delete_fingerprint(&self, citizen_id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted =
            diesel::delete(fingerprints::table.filter(fingerprints::citizen_id.eq(citizen_id)))
                .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn insert_document(&self, document: NewDocument) -> AppResult<Document> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(documents::table)
            .values(&document)
            .get_result(&mut conn)?)
    }

    fn find_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        let mut conn = self.conn()?;
        Ok(documents::table.find(id).first(&mut conn).optional()?)
    }

    fn list_documents(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> AppResult<Page<Document>> {
        let mut conn = self.conn()?;
        let total: i64 = document_query(filter).count().get_result(&mut conn)?;
        let rows = document_query(filter)
            .order(documents::created_at.desc())
            .offset(page.offset())
            .limit(page.limit)
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChangeset,
    ) -> AppResult<Option<Document>> {
        let mut conn = self.conn()?;
        Ok(diesel::update(documents::table.find(id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?)
    }

    fn delete_document(&self, id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(documents::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn insert_certification(
        &self,
        certification: NewCertification,
    ) -> AppResult<Certification> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(certifications::table)
            .values(&certification)
            .get_result(&mut conn)?)
    }

    fn find_certification(&self, id: Uuid) -> AppResult<Option<Certification>> {
        let mut conn = self.conn()?;
        Ok(certifications::table.find(id).first(&mut conn).optional()?)
    }

    fn list_certifications(
        &self,
        filter: &CertificationFilter,
        page: PageRequest,
    ) -> AppResult<Page<Certification>> {
        let mut conn = self.conn()?;
        let total: i64 = certification_query(filter).count().get_result(&mut conn)?;
        let rows = certification_query(filter)
            .order(certifications::created_at.desc())
            .offset(page.offset())
            .limit(page.limit)
            .load(&mut conn)?;
        Ok((rows, total))
    }

    fn revoke_certification(
        &self,
        id: Uuid,
        updated_at: NaiveDateTime,
    ) -> AppResult<Option<Certification>> {
        let mut conn = self.conn()?;
        Ok(diesel::update(certifications::table.find(id))
            .set((
                certifications::approved.eq(false),
                certifications::updated_at.eq(updated_at),
            ))
            .get_result(&mut conn)
            .optional()?)
    }

    fn delete_certification(&self, id: Uuid) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(certifications::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn append_audit(&self, entry: NewAuditEntry) -> AppResult<AuditEntry> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(audit_logs::table)
            .values(&entry)
            .get_result(&mut conn)?)
    }

    fn list_audit_entries(
        &self,
        action: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<AuditEntry>> {
        let mut conn = self.conn()?;
        let total: i64 = audit_query(action).count().get_result(&mut conn)?;
        let rows = audit_query(action)
            .order(audit_logs::created_at.desc())
            .offset(page.offset())
            .limit(page.limit)
            .load(&mut conn)?;
        Ok((rows, total))
    }
}
