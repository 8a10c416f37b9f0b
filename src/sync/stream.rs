use std::io::{BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::unix::net::UnixStream;

#[cfg(feature = "sync-tls")]
use native_tls::{TlsConnector, TlsStream};

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::packet::{HEADER_SIZE, MAX_PACKET_SIZE, process_header};

pub enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(feature = "sync-tls")]
    Tls(BufReader<TlsStream<TcpStream>>),
    Unix(BufReader<UnixStream>),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(BufReader::new(stream))
    }

    pub fn unix(stream: UnixStream) -> Self {
        Self::Unix(BufReader::new(stream))
    }

    /// Open the transport described by `opts`.
    pub fn connect(opts: &Opts) -> Result<Self> {
        if let Some(socket_path) = &opts.socket {
            return Ok(Self::unix(UnixStream::connect(socket_path)?));
        }
        if opts.host.is_empty() {
            return Err(Error::InvalidUsage("host is empty".into()));
        }
        let tcp = TcpStream::connect((opts.host.as_str(), opts.port))?;
        tcp.set_nodelay(true)?;
        Ok(Self::tcp(tcp))
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.read_exact(buf),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.read_exact(buf),
            Stream::Unix(r) => r.read_exact(buf),
        }
    }

    pub fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().write_all(buf),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_mut().write_all(buf),
            Stream::Unix(r) => r.get_mut().write_all(buf),
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().flush(),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_mut().flush(),
            Stream::Unix(r) => r.get_mut().flush(),
        }
    }

    /// Read one packet into `buffer_set.read_buffer`, joining split frames.
    pub fn read_packet(&mut self, buffer_set: &mut BufferSet) -> Result<()> {
        buffer_set.read_buffer.clear();
        loop {
            let mut header = [0u8; HEADER_SIZE];
            self.read_exact(&mut header)?;
            let length = process_header(buffer_set, &header)?;

            let start = buffer_set.read_buffer.len();
            buffer_set.read_buffer.resize(start + length, 0);
            self.read_exact(&mut buffer_set.read_buffer[start..])?;

            if length < MAX_PACKET_SIZE {
                return Ok(());
            }
        }
    }

    /// Write the whole write buffer and flush.
    pub fn write_packets(&mut self, buffer_set: &BufferSet) -> Result<()> {
        self.write_all(&buffer_set.write_buffer)?;
        self.flush()?;
        Ok(())
    }

    /// Upgrade a TCP stream to TLS.
    #[cfg(feature = "sync-tls")]
    pub fn upgrade_tls(self, domain: &str) -> Result<Self> {
        let tcp = match self {
            Stream::Tcp(r) => r.into_inner(),
            _ => return Err(Error::InvalidUsage("TLS upgrade requires a plain TCP stream".into())),
        };
        let connector = TlsConnector::new()?;
        let tls = connector.connect(domain, tcp).map_err(|e| match e {
            native_tls::HandshakeError::Failure(e) => Error::Tls(e),
            native_tls::HandshakeError::WouldBlock(_) => {
                Error::Protocol("TLS handshake interrupted on a blocking socket".into())
            }
        })?;
        Ok(Self::Tls(BufReader::new(tls)))
    }

    /// Send a TLS close_notify. No-op on plain streams.
    pub fn shutdown_tls(&mut self) -> Result<()> {
        match self {
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => Ok(r.get_mut().shutdown()?),
            _ => Ok(()),
        }
    }

    /// Shut down both directions of the socket.
    pub fn close(self) -> Result<()> {
        let result = match self {
            Stream::Tcp(r) => r.get_ref().shutdown(Shutdown::Both),
            #[cfg(feature = "sync-tls")]
            Stream::Tls(r) => r.get_ref().get_ref().shutdown(Shutdown::Both),
            Stream::Unix(r) => r.get_ref().shutdown(Shutdown::Both),
        };
        match result {
            // The peer may already have closed the socket after COM_QUIT
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => Ok(other?),
        }
    }
}
