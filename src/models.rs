use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = citizens)]
pub struct Citizen {
    pub id: Uuid,
    pub national_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Citizen {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = citizens)]
pub struct NewCitizen {
    pub id: Uuid,
    pub national_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = citizens)]
pub struct CitizenChangeset {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = fingerprints)]
pub struct Fingerprint {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub template: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fingerprints)]
pub struct NewFingerprint {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub template: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: Uuid,
    pub national_id: i64,
    pub owner_user_id: Option<Uuid>,
    pub document_type: String,
    pub reference_url: String,
    pub content_type: Option<String>,
    pub issue_date: NaiveDate,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub national_id: i64,
    pub owner_user_id: Option<Uuid>,
    pub document_type: String,
    pub reference_url: String,
    pub content_type: Option<String>,
    pub issue_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = documents)]
pub struct DocumentChangeset {
    pub national_id: Option<i64>,
    pub owner_user_id: Option<Option<Uuid>>,
    pub document_type: Option<String>,
    pub reference_url: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = certifications)]
pub struct Certification {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub document_id: Uuid,
    pub approved: bool,
    pub certified_reference: String,
    pub stamp_details: String,
    pub output_format: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = certifications)]
pub struct NewCertification {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub document_id: Uuid,
    pub approved: bool,
    pub certified_reference: String,
    pub stamp_details: String,
    pub output_format: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = audit_logs)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub description: String,
    pub reference: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditEntry {
    pub id: Uuid,
    pub action: String,
    pub description: String,
    pub reference: String,
}
