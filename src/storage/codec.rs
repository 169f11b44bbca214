//! Line-oriented text grammar for server records
//!
//! ```text
//! last seen: <unsigned-integer>
//! expire: <unsigned-integer>
//! <client-count>
//! <name> <clan> <score>      (client-count times)
//! ```
//!
//! Names and clans are written as hexnames (see [`super::hexname`]) so a
//! client line always holds exactly three whitespace-free tokens. Fields are
//! strictly ordered; any missing, extra or reordered field aborts the decode.

use std::io::{BufRead, Write};

use super::error::{DecodeError, EncodeError};
use super::hexname;
use crate::models::{ClientRecord, GameType, ServerRecord, Timestamp};

/// Default per-record client capacity (Teeworlds servers host at most 16 players)
pub const DEFAULT_MAX_CLIENTS: usize = 16;

const LAST_SEEN: &str = "last seen";
const EXPIRE: &str = "expire";
const CLIENTS_NUMBER: &str = "clients number";
const CLIENTS: &str = "clients";
const CLIENT_FIELDS: usize = 3;

/// Encoder/decoder for the record grammar
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    capacity: usize,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLIENTS)
    }
}

impl RecordCodec {
    /// Create a codec accepting at most `capacity` clients per record
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Decode a whole record from a stream
    pub fn decode<R: BufRead>(&self, reader: R) -> Result<ServerRecord, DecodeError> {
        let mut lines = Lines::new(reader);

        let last_seen = lines.header(LAST_SEEN)?;
        let expire = lines.header(EXPIRE)?;
        let count = self.client_count(&mut lines)?;

        let mut clients = Vec::with_capacity(count);
        for index in 0..count {
            let Some(line) = lines.next_line()? else {
                return Err(DecodeError::PartialMatch {
                    field: CLIENTS,
                    matched: index,
                    expected: count,
                });
            };
            let (name, clan, score) = match split_client(&line) {
                Ok(fields) => fields,
                Err(ClientLineError::Partial(matched)) => {
                    return Err(DecodeError::MalformedClient {
                        index,
                        matched,
                        expected: CLIENT_FIELDS,
                        line,
                    })
                }
                Err(ClientLineError::Extra) => return Err(DecodeError::TrailingData { line }),
            };

            let name = hexname::decode(name).map_err(|source| DecodeError::InvalidName {
                field: "name",
                index,
                source,
            })?;
            let clan = hexname::decode(clan).map_err(|source| DecodeError::InvalidName {
                field: "clan",
                index,
                source,
            })?;
            clients.push(ClientRecord { name, clan, score });
        }

        lines.expect_end()?;

        Ok(ServerRecord {
            last_seen,
            expire,
            game_type: GameType::Ctf,
            clients,
        })
    }

    /// Encode a record to a stream
    ///
    /// The record is validated before anything is written.
    pub fn encode<W: Write>(&self, record: &ServerRecord, mut writer: W) -> Result<(), EncodeError> {
        if record.clients.len() > self.capacity {
            return Err(EncodeError::CapacityExceeded {
                count: record.clients.len(),
                capacity: self.capacity,
            });
        }

        for (index, client) in record.clients.iter().enumerate() {
            hexname::check(&client.name).map_err(|source| EncodeError::InvalidName {
                field: "name",
                index,
                source,
            })?;
            hexname::check(&client.clan).map_err(|source| EncodeError::InvalidName {
                field: "clan",
                index,
                source,
            })?;
        }

        write!(
            writer,
            "{LAST_SEEN}: {}\n{EXPIRE}: {}\n",
            record.last_seen, record.expire
        )?;
        writeln!(writer, "{}", record.clients.len())?;
        for client in &record.clients {
            writeln!(
                writer,
                "{} {} {}",
                hexname::encode(&client.name),
                hexname::encode(&client.clan),
                client.score
            )?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Cut a client list down to what [`encode`](Self::encode) accepts
    ///
    /// Clients beyond capacity are dropped; names and clans are truncated.
    /// Returns `true` if anything changed.
    pub fn fit_clients(&self, clients: &mut Vec<ClientRecord>) -> bool {
        let mut changed = clients.len() > self.capacity;
        clients.truncate(self.capacity);

        for client in clients.iter_mut() {
            for field in [&mut client.name, &mut client.clan] {
                if hexname::check(field).is_err() {
                    *field = hexname::truncate(field);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Encode a record into an in-memory buffer
    pub fn to_bytes(&self, record: &ServerRecord) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        self.encode(record, &mut buf)?;
        Ok(buf)
    }

    fn client_count<R: BufRead>(&self, lines: &mut Lines<R>) -> Result<usize, DecodeError> {
        let missing = DecodeError::MissingField {
            field: CLIENTS_NUMBER,
        };
        let Some(line) = lines.next_line()? else {
            return Err(missing);
        };
        let value = line.trim();

        let count = match value.parse::<i64>() {
            Ok(n) if n < 0 => {
                return Err(DecodeError::InvalidCount {
                    value: value.to_string(),
                })
            }
            Ok(n) => usize::try_from(n).map_err(|_| DecodeError::InvalidCount {
                value: value.to_string(),
            })?,
            Err(_) => return Err(missing),
        };

        if count > self.capacity {
            return Err(DecodeError::CapacityExceeded {
                count,
                capacity: self.capacity,
            });
        }
        Ok(count)
    }
}

enum ClientLineError {
    /// Number of leading fields that matched
    Partial(usize),
    /// All fields matched but more tokens follow
    Extra,
}

fn split_client(line: &str) -> Result<(&str, &str, i64), ClientLineError> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().ok_or(ClientLineError::Partial(0))?;
    let clan = tokens.next().ok_or(ClientLineError::Partial(1))?;
    let score = tokens
        .next()
        .and_then(|token| token.parse::<i64>().ok())
        .ok_or(ClientLineError::Partial(2))?;
    if tokens.next().is_some() {
        return Err(ClientLineError::Extra);
    }
    Ok((name, clan, score))
}

/// Line reader telling end of input apart from stream failures
struct Lines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(64),
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(DecodeError::Io)?;
        if read == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn header(&mut self, field: &'static str) -> Result<Timestamp, DecodeError> {
        let missing = DecodeError::MissingField { field };
        let line = self.next_line()?.ok_or(DecodeError::MissingField { field })?;

        line.strip_prefix(field)
            .and_then(|rest| rest.strip_prefix(": "))
            .and_then(|value| value.trim_end().parse::<Timestamp>().ok())
            .ok_or(missing)
    }

    fn expect_end(&mut self) -> Result<(), DecodeError> {
        while let Some(line) = self.next_line()? {
            if !line.trim().is_empty() {
                return Err(DecodeError::TrailingData { line });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    fn decode(text: &str) -> Result<ServerRecord, DecodeError> {
        RecordCodec::default().decode(Cursor::new(text.as_bytes()))
    }

    fn sample() -> ServerRecord {
        ServerRecord {
            last_seen: 1_700_000_010,
            expire: 1_700_003_610,
            game_type: GameType::Ctf,
            clients: vec![
                ClientRecord::new("nameless tee", "", 12),
                ClientRecord::new("brainless tee", "Clan", -3),
            ],
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encode_format() {
        let bytes = RecordCodec::default().to_bytes(&sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "last seen: 1700000010\n\
             expire: 1700003610\n\
             2\n\
             6e616d656c6573732074656500 00 12\n\
             627261696e6c6573732074656500 436c616e00 -3\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let codec = RecordCodec::default();
        let record = sample();
        let bytes = codec.to_bytes(&record).unwrap();
        let decoded = codec.decode(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_empty_record() {
        let record = decode("last seen: 42\nexpire: 0\n0\n").unwrap();
        assert_eq!(record.last_seen, 42);
        assert_eq!(record.expire, 0);
        assert!(record.clients.is_empty());
        assert_eq!(record.game_type, GameType::Ctf);
    }

    #[test]
    fn test_decode_stream_failure() {
        let err = RecordCodec::default()
            .decode(BufReader::new(FailingReader))
            .unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }

    #[test]
    fn test_decode_empty_input() {
        let err = decode("").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "last seen" }));
    }

    #[test]
    fn test_decode_missing_expire() {
        let err = decode("last seen: 10\n").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "expire" }));

        let err = decode("last seen: 10\nexpiry: 20\n0\n").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "expire" }));
    }

    #[test]
    fn test_decode_reordered_header() {
        let err = decode("expire: 20\nlast seen: 10\n0\n").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { field: "last seen" }));
    }

    #[test]
    fn test_decode_missing_client_count() {
        let err = decode("last seen: 10\nexpire: 20\n").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingField {
                field: "clients number"
            }
        ));

        let err = decode("last seen: 10\nexpire: 20\nmany\n").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingField {
                field: "clients number"
            }
        ));
    }

    #[test]
    fn test_decode_negative_client_count() {
        let err = decode("last seen: 10\nexpire: 20\n-1\n").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidCount { .. }));
    }

    #[test]
    fn test_decode_partial_clients() {
        let text = "last seen: 10\nexpire: 20\n5\n\
                    6100 00 1\n6200 00 2\n6300 00 3\n";
        let err = decode(text).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PartialMatch {
                field: "clients",
                matched: 3,
                expected: 5
            }
        ));
        assert_eq!(err.to_string(), "Only 3 over 5 clients matched");
    }

    #[test]
    fn test_decode_short_client_line() {
        let text = "last seen: 10\nexpire: 20\n2\n6100 00 1\n6200 7\n";
        let err = decode(text).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedClient {
                index: 1,
                matched: 2,
                expected: 3,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "Only 2 over 3 fields of client 1 matched: 6200 7"
        );
    }

    #[test]
    fn test_decode_blank_client_line() {
        let text = "last seen: 10\nexpire: 20\n1\n\n";
        assert!(matches!(
            decode(text).unwrap_err(),
            DecodeError::MalformedClient {
                index: 0,
                matched: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_non_numeric_score() {
        let text = "last seen: 10\nexpire: 20\n1\n6100 00 lots\n";
        assert!(matches!(
            decode(text).unwrap_err(),
            DecodeError::MalformedClient {
                index: 0,
                matched: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_extra_token() {
        let text = "last seen: 10\nexpire: 20\n1\n6100 00 1 extra\n";
        assert!(matches!(
            decode(text).unwrap_err(),
            DecodeError::TrailingData { .. }
        ));
    }

    #[test]
    fn test_decode_trailing_data() {
        let text = "last seen: 10\nexpire: 20\n1\n6100 00 1\n6200 00 2\n";
        assert!(matches!(
            decode(text).unwrap_err(),
            DecodeError::TrailingData { .. }
        ));

        assert!(decode("last seen: 10\nexpire: 20\n0\n\n").is_ok());
    }

    #[test]
    fn test_decode_invalid_hexname() {
        let text = "last seen: 10\nexpire: 20\n1\nbob 00 1\n";
        assert!(matches!(
            decode(text).unwrap_err(),
            DecodeError::InvalidName {
                field: "name",
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_capacity_exceeded() {
        let codec = RecordCodec::new(2);
        let text = "last seen: 10\nexpire: 20\n3\n6100 00 1\n6200 00 2\n6300 00 3\n";
        let err = codec.decode(Cursor::new(text)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::CapacityExceeded {
                count: 3,
                capacity: 2
            }
        ));
    }

    #[test]
    fn test_encode_capacity_exceeded() {
        let codec = RecordCodec::new(1);
        let mut buf = Vec::new();
        let err = codec.encode(&sample(), &mut buf).unwrap_err();
        assert!(matches!(err, EncodeError::CapacityExceeded { count: 2, capacity: 1 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_rejects_long_name() {
        let mut record = sample();
        record.clients[1].clan = "c".repeat(40);
        let err = RecordCodec::default().to_bytes(&record).unwrap_err();
        assert!(matches!(
            err,
            EncodeError::InvalidName {
                field: "clan",
                index: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_fit_clients() {
        let codec = RecordCodec::new(2);
        let mut clients = vec![
            ClientRecord::new("a", "", 1),
            ClientRecord::new("b".repeat(30), "clan\0", 2),
            ClientRecord::new("c", "", 3),
        ];

        assert!(codec.fit_clients(&mut clients));
        assert_eq!(
            clients,
            vec![
                ClientRecord::new("a", "", 1),
                ClientRecord::new("b".repeat(16), "clan", 2),
            ]
        );
        assert!(!codec.fit_clients(&mut clients));

        let record = ServerRecord {
            clients,
            ..ServerRecord::new(10)
        };
        assert!(codec.to_bytes(&record).is_ok());
    }

    #[test]
    fn test_encode_write_failure() {
        let err = RecordCodec::default()
            .encode(&sample(), FailingWriter)
            .unwrap_err();
        assert!(matches!(err, EncodeError::Io(_)));
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        let record = decode("last seen: 1\r\nexpire: 2\r\n1\r\n6100 00 -5\r\n").unwrap();
        assert_eq!(record.clients, vec![ClientRecord::new("a", "", -5)]);
    }
}
