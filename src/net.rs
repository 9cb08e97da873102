//! Socket helpers for the server lifecycle
//!
//! Binding goes through `socket2` so `SO_REUSEADDR` is set before `bind`;
//! tests restart servers on the same port in quick succession and a
//! lingering `TIME_WAIT` must not make the second bind fail.

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Listen backlog
pub const BACKLOG: i32 = 128;

/// Bind a listening TCP socket
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    Ok(socket.into())
}

/// The address a client should dial to reach a listener bound to `addr`
///
/// A wildcard bind address is not connectable everywhere, so it maps to
/// the loopback address of the same family.
pub fn connectable(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

/// Wake a thread blocked in `accept` on `addr`
///
/// Opens a connection to the listener and drops it straight away.
pub fn unblock_accept(addr: SocketAddr, timeout: Duration) -> io::Result<()> {
    let stream = TcpStream::connect_timeout(&connectable(addr), timeout)?;
    drop(stream);
    Ok(())
}

/// Shut the listener down so a pending `accept` returns with an error
pub fn shutdown_listener(listener: &TcpListener) -> io::Result<()> {
    SockRef::from(listener).shutdown(Shutdown::Both)
}
