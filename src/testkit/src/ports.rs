//! Free-port allocation for concurrently running test classes.

use std::io;
use std::net::TcpListener;

/// Allocate the next available TCP port on localhost.
///
/// Binds port 0, takes the kernel-assigned port, and releases the listener.
pub fn next_available_port() -> io::Result<u16> {
    Ok(next_available_ports(1)?[0])
}

/// Allocate several available ports at once.
///
/// All listeners are held open until every port is taken, so the returned
/// ports are distinct from each other.
pub fn next_available_ports(count: usize) -> io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0"))
        .collect::<io::Result<Vec<_>>>()?;

    listeners
        .iter()
        .map(|listener| Ok(listener.local_addr()?.port()))
        .collect()
}
