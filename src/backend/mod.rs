/// Backend submodules for connection and message handling
///
/// - `connection`: TCP connection establishment and the framed line transport
/// - `main_loop`: connection state machine, line dispatch, outbound throttle
mod connection;
mod main_loop;

pub use connection::{establish_connection, Transport};
pub use main_loop::{run_backend, ConnectionState};
