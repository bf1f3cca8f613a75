//! Address parsing and stream establishment for the socket transport.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::Error;

pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A parsed `tcp://host:port` or `unix:///path.sock` address. A bare
/// `host:port` is taken as TCP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Tcp(String),
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

pub(crate) fn parse_addr(addr: &str) -> Result<Target, Error> {
    if let Some(rest) = addr.strip_prefix("tcp://") {
        return Ok(Target::Tcp(rest.to_string()));
    }

    if let Some(rest) = addr.strip_prefix("unix://") {
        #[cfg(unix)]
        {
            return Ok(Target::Unix(std::path::PathBuf::from(rest)));
        }
        #[cfg(not(unix))]
        {
            let _ = rest;
            return Err(Error::InvalidAddress(addr.to_string()));
        }
    }

    if addr.contains("://") {
        return Err(Error::InvalidAddress(addr.to_string()));
    }

    Ok(Target::Tcp(addr.to_string()))
}

pub(crate) async fn dial(
    target: &Target,
    timeout: Duration,
) -> Result<(BoxedReader, BoxedWriter), Error> {
    match target {
        Target::Tcp(addr) => {
            let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| Error::DialTimeout {
                    addr: addr.clone(),
                    timeout,
                })??;

            stream.set_nodelay(true)?;

            let (read, write) = stream.into_split();
            Ok((Box::new(read), Box::new(write)))
        }

        #[cfg(unix)]
        Target::Unix(path) => {
            let stream = tokio::time::timeout(timeout, tokio::net::UnixStream::connect(path))
                .await
                .map_err(|_| Error::DialTimeout {
                    addr: path.display().to_string(),
                    timeout,
                })??;

            let (read, write) = stream.into_split();
            Ok((Box::new(read), Box::new(write)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_and_bare_addresses() {
        assert_eq!(
            parse_addr("tcp://127.0.0.1:26658").unwrap(),
            Target::Tcp("127.0.0.1:26658".to_string())
        );
        assert_eq!(
            parse_addr("127.0.0.1:26658").unwrap(),
            Target::Tcp("127.0.0.1:26658".to_string())
        );
    }

    #[cfg(unix)]
    #[test]
    fn parses_unix_addresses() {
        assert_eq!(
            parse_addr("unix:///tmp/app.sock").unwrap(),
            Target::Unix(std::path::PathBuf::from("/tmp/app.sock"))
        );
    }

    #[test]
    fn rejects_unknown_schemes() {
        assert!(matches!(
            parse_addr("quic://host:1"),
            Err(Error::InvalidAddress(_))
        ));
    }
}
