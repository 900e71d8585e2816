pub use droplink_core::model::PeerId;

pub mod model {
    pub use droplink_core::model::*;
}

pub mod error {
    pub use droplink_core::error::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use droplink_peer::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use droplink_server::*;
}
