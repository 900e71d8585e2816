mod utils;

mod connection_tests;
mod multi_peer_tests;
mod relay_tests;
