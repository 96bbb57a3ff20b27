pub mod record;
pub mod sync_state;
