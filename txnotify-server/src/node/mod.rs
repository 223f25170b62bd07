//! bitcoind integration: the RPC client used for height lookups and the ZMQ
//! feeder that turns raw node notifications into core events.

pub mod feeder;
pub mod rpc;

pub use feeder::ZmqFeeder;
pub use rpc::BitcoindRpc;
