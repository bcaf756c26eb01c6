//! Token secrets, provider bundles, and the persisted token record.

pub mod bundle;
pub mod record;
pub mod secret;
