// RouterOS API connection.
//
// One TCP connection per logical operation: connect, log in, run one or
// more sentences, drop. Framing is delegated to `SentenceCodec`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::Error;

use super::codec::{Sentence, SentenceCodec};
use super::reply::{Attributes, Reply, trap_error};

/// Plain-text API service port.
pub const DEFAULT_API_PORT: u16 = 8728;

/// Everything needed to open an authenticated API session.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Bound on the TCP connect step alone. Callers wrap whole
    /// operations in their own deadline.
    pub connect_timeout: Duration,
}

/// An open API connection.
pub struct RouterOsClient {
    framed: Framed<TcpStream, SentenceCodec>,
    peer: String,
}

impl RouterOsClient {
    /// Open a TCP connection to the router's API port. Does NOT log in.
    pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self, Error> {
        let peer = format!("{host}:{port}");
        debug!(%peer, "connecting to RouterOS API");

        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: connect_timeout.as_secs(),
            })??;
        stream.set_nodelay(true)?;

        Ok(Self {
            framed: Framed::new(stream, SentenceCodec),
            peer,
        })
    }

    /// Connect and authenticate in one step.
    pub async fn open(config: &ConnectConfig) -> Result<Self, Error> {
        let mut client = Self::connect(&config.host, config.port, config.connect_timeout).await?;
        client.login(&config.username, &config.password).await?;
        Ok(client)
    }

    /// Authenticate with the post-6.43 plain login.
    ///
    /// Routers older than 6.43 answer with a `=ret=` challenge instead of
    /// accepting the password; that MD5 handshake is not supported.
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), Error> {
        let sentence = Sentence::command("/login")
            .attr("name", username)
            .attr("password", password.expose_secret());

        match self.run(sentence).await {
            Ok(done) => {
                if done.done.get("ret").is_some() {
                    return Err(Error::UnsupportedOperation(
                        "challenge login (RouterOS older than 6.43)",
                    ));
                }
                debug!(peer = %self.peer, username, "RouterOS login accepted");
                Ok(())
            }
            Err(Error::Trap { message, .. }) => Err(Error::Authentication { message }),
            Err(e) => Err(e),
        }
    }

    /// Send one command sentence and collect its `!re` rows.
    pub async fn execute(&mut self, sentence: Sentence) -> Result<Vec<Attributes>, Error> {
        self.run(sentence).await.map(|r| r.rows)
    }

    /// Send one command sentence and return the full response, including
    /// attributes carried on the closing `!done`.
    pub async fn run(&mut self, sentence: Sentence) -> Result<Response, Error> {
        debug!(peer = %self.peer, command = sentence.head().unwrap_or(""), "sending sentence");
        self.framed.send(sentence).await?;

        let mut rows = Vec::new();
        let mut trap: Option<Error> = None;

        loop {
            let sentence = self
                .framed
                .next()
                .await
                .ok_or(Error::ConnectionClosed)??;

            match Reply::try_from(sentence)? {
                Reply::Re(attrs) => rows.push(attrs),
                Reply::Empty => {}
                Reply::Trap(attrs) => {
                    // Keep the first trap; the router still closes with !done.
                    trap.get_or_insert_with(|| trap_error(&attrs));
                }
                Reply::Fatal(message) => return Err(Error::Fatal(message)),
                Reply::Done(done) => {
                    return match trap {
                        Some(err) => Err(err),
                        None => Ok(Response { rows, done }),
                    };
                }
            }
        }
    }

    /// Address this client is talking to, as `host:port`.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Flush and close the connection.
    pub async fn close(mut self) -> Result<(), Error> {
        self.framed.close().await
    }
}

/// Collected reply to one command.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub rows: Vec<Attributes>,
    pub done: Attributes,
}
