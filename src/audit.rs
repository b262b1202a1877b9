use tracing::warn;
use uuid::Uuid;

use crate::models::NewAuditEntry;
use crate::store::Store;

pub const CITIZEN_REGISTERED: &str = "citizen_registered";
pub const FINGERPRINT_ENROLLED: &str = "fingerprint_enrolled";
pub const DOCUMENT_REGISTERED: &str = "document_registered";
pub const DOCUMENT_CERTIFIED: &str = "document_certified";
pub const DOCUMENT_EMAILED: &str = "document_email";

/// Appends an audit row. Failures are logged and swallowed so the calling
/// operation keeps its result.
pub fn record(store: &dyn Store, action: &str, description: String, reference: String) {
    let entry = NewAuditEntry {
        id: Uuid::new_v4(),
        action: action.to_string(),
        description,
        reference,
    };

    if let Err(err) = store.append_audit(entry) {
        warn!(action, error = %err, "failed to append audit entry");
    }
}
