pub mod mock_transport;

pub use helpers::*;
pub use mock_transport::{MockHub, MockTransportFactory};
