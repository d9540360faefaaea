/// Database row types, mapped directly from SQLite rows.
/// Kept apart from parley-types so the wire format can change without a migration.
pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub sender_id: String,
    pub body: String,
    pub recipient_id: Option<String>,
    pub is_private: bool,
    pub created_at: String,
}
