//! Async stream abstraction for tokio.

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::UnixStream;

#[cfg(feature = "tokio-tls")]
use tokio_native_tls::TlsStream;

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::packet::{HEADER_SIZE, MAX_PACKET_SIZE, process_header};

pub enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(feature = "tokio-tls")]
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
    pub async fn connect(opts: &Opts) -> Result<Self> {
        if let Some(socket_path) = &opts.socket {
            return Ok(Self::unix(UnixStream::connect(socket_path).await?));
        }
        if opts.host.is_empty() {
            return Err(Error::InvalidUsage("host is empty".into()));
        }
        let tcp = TcpStream::connect((opts.host.as_str(), opts.port)).await?;
        tcp.set_nodelay(true)?;
        Ok(Self::tcp(tcp))
    }

    pub async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.read_exact(buf).await.map(|_| ()),
            #[cfg(feature = "tokio-tls")]
            Stream::Tls(r) => r.read_exact(buf).await.map(|_| ()),
            Stream::Unix(r) => r.read_exact(buf).await.map(|_| ()),
        }
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().write_all(buf).await,
            #[cfg(feature = "tokio-tls")]
            Stream::Tls(r) => r.get_mut().write_all(buf).await,
            Stream::Unix(r) => r.get_mut().write_all(buf).await,
        }
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().flush().await,
            #[cfg(feature = "tokio-tls")]
            Stream::Tls(r) => r.get_mut().flush().await,
            Stream::Unix(r) => r.get_mut().flush().await,
        }
    }

    /// Read one packet into `buffer_set.read_buffer`, joining split frames.
    pub async fn read_packet(&mut self, buffer_set: &mut BufferSet) -> Result<()> {
        buffer_set.read_buffer.clear();
        loop {
            let mut header = [0u8; HEADER_SIZE];
            self.read_exact(&mut header).await?;
            let length = process_header(buffer_set, &header)?;

            let start = buffer_set.read_buffer.len();
            buffer_set.read_buffer.resize(start + length, 0);
            self.read_exact(&mut buffer_set.read_buffer[start..]).await?;

            if length < MAX_PACKET_SIZE {
                return Ok(());
            }
        }
    }

    /// Write the whole write buffer and flush.
    pub async fn write_packets(&mut self, buffer_set: &BufferSet) -> Result<()> {
        self.write_all(&buffer_set.write_buffer).await?;
        self.flush().await?;
        Ok(())
    }

    /// Upgrade a TCP stream to TLS.
    #[cfg(feature = "tokio-tls")]
    pub async fn upgrade_tls(self, domain: &str) -> Result<Self> {
        let tcp = match self {
            Stream::Tcp(r) => r.into_inner(),
            _ => return Err(Error::InvalidUsage("TLS upgrade requires a plain TCP stream".into())),
        };
        let connector = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
        let tls = connector.connect(domain, tcp).await?;
        Ok(Self::Tls(BufReader::new(tls)))
    }

    /// Send a TLS close_notify. No-op on plain streams.
    pub async fn shutdown_tls(&mut self) -> Result<()> {
        match self {
            #[cfg(feature = "tokio-tls")]
            Stream::Tls(r) => Ok(r.get_mut().shutdown().await?),
            _ => Ok(()),
        }
    }

    /// Shut down the write half and drop the socket.
    pub async fn close(mut self) -> Result<()> {
        let result = match &mut self {
            Stream::Tcp(r) => r.get_mut().shutdown().await,
            #[cfg(feature = "tokio-tls")]
            // close_notify was already sent by the quit exchange
            Stream::Tls(_) => Ok(()),
            Stream::Unix(r) => r.get_mut().shutdown().await,
        };
        match result {
            // The peer may already have closed the socket after COM_QUIT
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => Ok(other?),
        }
    }
}
