//! Auth-domain identifiers, scope sets, registration data, and token models.

pub mod id;
pub mod registration;
pub mod scope;
pub mod token;

pub use id::*;
pub use registration::*;
pub use scope::*;
pub use token::{bundle::*, record::*, secret::*};
