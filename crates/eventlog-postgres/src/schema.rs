//! Event table schema.

use sqlx::migrate::Migrator;

/// Migrations creating the `event` table and its indexes.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Columns selected for every event read, in `Event` field order.
pub const SELECT_EVENTS: &str =
    "SELECT id, tenant_id, entity_type, entity_id, event_type, event_uid, body FROM event";

/// Unconditional write keyed by id.
pub const UPSERT_EVENT: &str = r"
INSERT INTO event (id, tenant_id, entity_type, entity_id, event_type, event_uid, body)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (id) DO UPDATE SET
    tenant_id   = EXCLUDED.tenant_id,
    entity_type = EXCLUDED.entity_type,
    entity_id   = EXCLUDED.entity_id,
    event_type  = EXCLUDED.event_type,
    event_uid   = EXCLUDED.event_uid,
    body        = EXCLUDED.body
";

/// Coarse existence check on tenant and entity.
pub const EXISTS_FOR_ENTITY: &str = r"
SELECT EXISTS (
    SELECT 1 FROM event
    WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
)
";

/// Serializes idempotent inserts for one tenant and entity until the
/// surrounding transaction ends.
pub const LOCK_ENTITY: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";
