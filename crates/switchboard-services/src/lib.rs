//! switchboard-services — the registry core: peer table, connection
//! sessions, and pulse dispatch.

pub mod dispatch;
pub mod session;
pub mod table;

pub use dispatch::PulseDispatcher;
pub use session::{
    broadcast, new_connection_table, send_to, ConnectionHandle, ConnectionSession, ConnectionTable,
};
pub use table::{
    new_shared_table, Endpoint, PeerTable, SharedPeerTable, SwitchRecord, UpsertOutcome,
};
