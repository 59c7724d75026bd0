pub mod notes;
pub mod notes_outbox;
