pub mod error;
pub mod identity;
pub mod squash;
pub mod translate;
