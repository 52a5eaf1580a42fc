//! Sentinel-framed request/response exchange with the build server.
//!
//! ```text
//! Client → Server:              Server → Client:
//!   <file name>                   <result line 1>
//!   END_OF_FILENAME               ...
//!   <source, may span lines>      END_OF_RESULT
//!   END_OF_CODE
//! ```
//!
//! Lines are `\n`-terminated. One request per connection: the stream is
//! opened, used once and dropped.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::compile::{CompileRequest, CompileResponse};

pub const END_OF_FILENAME: &str = "END_OF_FILENAME";
pub const END_OF_CODE: &str = "END_OF_CODE";
pub const END_OF_RESULT: &str = "END_OF_RESULT";

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:8080";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Matches the server's own per-step process timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on a framed result, sentinel line included
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not resolve server address {address}")]
    Resolve { address: String },
    #[error("Failed to connect to {address}: {source}")]
    Connect { address: String, source: io::Error },
    #[error("Timed out while {0}")]
    Timeout(&'static str),
    #[error("Connection closed before {END_OF_RESULT}")]
    ConnectionClosed,
    #[error("Result exceeded {limit} bytes")]
    ResponseTooLarge { limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    fn from_io(stage: &'static str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout(stage),
            _ => TransportError::Io(err),
        }
    }
}

/// Write one framed request.
pub fn write_request<W: Write>(writer: &mut W, request: &CompileRequest) -> io::Result<()> {
    writeln!(writer, "{}", request.file_name)?;
    writeln!(writer, "{END_OF_FILENAME}")?;
    writeln!(writer, "{}", request.source_code)?;
    writeln!(writer, "{END_OF_CODE}")?;
    writer.flush()
}

/// Bounds on reading one result, independent of per-read socket timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLimits {
    /// Total time allowed from the first read to the sentinel
    pub total_time: Duration,
    pub max_bytes: usize,
}

impl Default for ResponseLimits {
    fn default() -> Self {
        Self {
            total_time: DEFAULT_READ_TIMEOUT,
            max_bytes: MAX_RESPONSE_BYTES,
        }
    }
}

const READING: &str = "reading the result";

/// Read result lines up to the `END_OF_RESULT` sentinel.
///
/// Lines are joined with `\n` and trailing whitespace is trimmed. End of
/// stream before the sentinel is an error; a partial result is never
/// returned. The deadline is checked between reads, so a server trickling
/// bytes cannot hold the reader past `limits.total_time` plus one read.
pub fn read_response<R: BufRead>(
    reader: &mut R,
    limits: ResponseLimits,
) -> Result<CompileResponse, TransportError> {
    let deadline = Instant::now() + limits.total_time;
    let mut lines = Vec::new();
    let mut line = Vec::new();
    let mut total = 0usize;

    loop {
        if Instant::now() >= deadline {
            return Err(TransportError::Timeout(READING));
        }

        let available = reader
            .fill_buf()
            .map_err(|e| TransportError::from_io(READING, e))?;
        if available.is_empty() {
            // A sentinel may end the stream without its newline
            if is_sentinel(&line) {
                break;
            }
            return Err(TransportError::ConnectionClosed);
        }

        let (taken, line_done) = match available.iter().position(|&b| b == b'\n') {
            Some(at) => (at + 1, true),
            None => (available.len(), false),
        };
        total += taken;
        if total > limits.max_bytes {
            return Err(TransportError::ResponseTooLarge {
                limit: limits.max_bytes,
            });
        }
        line.extend_from_slice(&available[..taken]);
        reader.consume(taken);

        if !line_done {
            continue;
        }
        if is_sentinel(&line) {
            break;
        }
        lines.push(decode_line(&line));
        line.clear();
    }

    let raw_output = lines.join("\n").trim_end().to_string();
    Ok(CompileResponse { raw_output })
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

fn is_sentinel(raw: &[u8]) -> bool {
    decode_line(raw) == END_OF_RESULT
}

/// A single request/response exchange over an open stream.
pub struct Exchange<S> {
    stream: S,
    limits: ResponseLimits,
}

impl<S: Read + Write> Exchange<S> {
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, ResponseLimits::default())
    }

    pub fn with_limits(stream: S, limits: ResponseLimits) -> Self {
        Self { stream, limits }
    }

    pub fn send(&mut self, request: &CompileRequest) -> Result<(), TransportError> {
        log::debug!(
            "sending {} ({} bytes of source)",
            request.file_name,
            request.source_code.len()
        );
        write_request(&mut self.stream, request)
            .map_err(|e| TransportError::from_io("sending the request", e))
    }

    /// Consume the exchange and read the framed result.
    pub fn receive(self) -> Result<CompileResponse, TransportError> {
        let mut reader = BufReader::new(self.stream);
        let response = read_response(&mut reader, self.limits)?;
        log::debug!("received {} bytes of output", response.raw_output.len());
        Ok(response)
    }
}

/// Something that can open a fresh connection to the build server.
pub trait Transport: Send + Sync + 'static {
    type Stream: Read + Write;

    fn connect(&self) -> Result<Self::Stream, TransportError>;

    fn response_limits(&self) -> ResponseLimits {
        ResponseLimits::default()
    }
}

/// Connection and I/O bounds for [`TcpTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub address: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDRESS.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

/// Plain TCP connection to the build server, usually `localhost:8080`
/// forwarded to the desktop with `adb reverse`.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport {
    settings: TransportSettings,
}

impl TcpTransport {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

impl Transport for TcpTransport {
    type Stream = TcpStream;

    fn connect(&self) -> Result<TcpStream, TransportError> {
        let address = &self.settings.address;
        let addrs = address
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve {
                address: address.clone(),
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.settings.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.settings.read_timeout))?;
                    stream.set_write_timeout(Some(self.settings.write_timeout))?;
                    log::debug!("connected to {addr}");
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) if e.kind() == io::ErrorKind::TimedOut => {
                Err(TransportError::Timeout("connecting to the server"))
            }
            Some(source) => Err(TransportError::Connect {
                address: address.clone(),
                source,
            }),
            None => Err(TransportError::Resolve {
                address: address.clone(),
            }),
        }
    }

    fn response_limits(&self) -> ResponseLimits {
        ResponseLimits {
            total_time: self.settings.read_timeout,
            ..ResponseLimits::default()
        }
    }
}

/// Run one full exchange: connect, send, then receive. `on_sent` runs once
/// the request has been written.
pub fn exchange<T: Transport>(
    transport: &T,
    request: &CompileRequest,
    on_sent: impl FnOnce(),
) -> Result<CompileResponse, TransportError> {
    let mut exchange = Exchange::with_limits(transport.connect()?, transport.response_limits());
    exchange.send(request)?;
    on_sent();
    exchange.receive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn request(file_name: &str, source_code: &str) -> CompileRequest {
        CompileRequest {
            file_name: file_name.to_string(),
            source_code: source_code.to_string(),
        }
    }

    #[test]
    fn test_request_framing_is_wire_exact() {
        let mut wire = Vec::new();
        write_request(&mut wire, &request("x.py", "a = 1\nprint(a)")).unwrap();

        assert_eq!(
            String::from_utf8(wire).unwrap(),
            "x.py\nEND_OF_FILENAME\na = 1\nprint(a)\nEND_OF_CODE\n"
        );
    }

    #[test]
    fn test_response_joins_lines_and_trims_trailing_whitespace() {
        let mut wire = Cursor::new("Compilation failed!\r\nline 2  \n\n\nEND_OF_RESULT\n");
        let response = read_response(&mut wire, ResponseLimits::default()).unwrap();

        assert_eq!(response.raw_output, "Compilation failed!\nline 2");
    }

    #[test]
    fn test_response_ignores_data_after_sentinel() {
        let mut wire = Cursor::new("ok\nEND_OF_RESULT\ntrailing junk\n");
        let response = read_response(&mut wire, ResponseLimits::default()).unwrap();

        assert_eq!(response.raw_output, "ok");
    }

    #[test]
    fn test_sentinel_must_match_whole_line() {
        let mut wire = Cursor::new("not END_OF_RESULT\nEND_OF_RESULT");
        let response = read_response(&mut wire, ResponseLimits::default()).unwrap();

        assert_eq!(response.raw_output, "not END_OF_RESULT");
    }

    #[test]
    fn test_eof_before_sentinel_is_an_error() {
        let mut wire = Cursor::new("partial output\nmore output\n");
        let result = read_response(&mut wire, ResponseLimits::default());

        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[test]
    fn test_empty_result() {
        let mut wire = Cursor::new("END_OF_RESULT\n");
        assert_eq!(read_response(&mut wire, ResponseLimits::default()).unwrap().raw_output, "");
    }

    #[test]
    fn test_result_past_the_deadline_times_out() {
        let mut wire = Cursor::new("ok\nEND_OF_RESULT\n");
        let limits = ResponseLimits {
            total_time: Duration::ZERO,
            ..ResponseLimits::default()
        };

        let result = read_response(&mut wire, limits);
        assert!(matches!(result, Err(TransportError::Timeout("reading the result"))));
    }

    #[test]
    fn test_oversized_result_is_rejected() {
        let mut wire = Cursor::new(format!("{}\nEND_OF_RESULT\n", "x".repeat(64)));
        let limits = ResponseLimits {
            max_bytes: 32,
            ..ResponseLimits::default()
        };

        let result = read_response(&mut wire, limits);
        assert!(matches!(
            result,
            Err(TransportError::ResponseTooLarge { limit: 32 })
        ));
    }

    #[test]
    fn test_long_line_within_limit_is_read_whole() {
        let body = "y".repeat(20_000);
        let wire = Cursor::new(format!("{body}\nEND_OF_RESULT\n"));
        let mut wire = BufReader::with_capacity(16, wire);

        let response = read_response(&mut wire, ResponseLimits::default()).unwrap();
        assert_eq!(response.raw_output, body);
    }

    #[test]
    fn test_timeout_kinds_map_to_timeout() {
        let err = TransportError::from_io(
            "reading the result",
            io::Error::new(io::ErrorKind::WouldBlock, "would block"),
        );
        assert!(matches!(err, TransportError::Timeout("reading the result")));
        assert_eq!(err.to_string(), "Timed out while reading the result");
    }
}
