//! Provider integrations.

pub mod gateway_client {
    pub use crate::gateway_client::*;
}

pub mod providers {
    pub use crate::providers::*;
}

pub mod validation {
    pub use crate::validation::*;
}
