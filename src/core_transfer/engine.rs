use super::listing::{format_entry, ListEntry, ListFormat};
use crate::constants::BUFFER_SIZE;
use crate::session::PendingOp;
use std::io::{self, SeekFrom};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, Interest};
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Data connection broken: {0}")]
    Connection(io::Error),

    #[error("File error: {0}")]
    File(io::Error),
}

impl TransferError {
    pub fn to_ftp_response(&self, op: PendingOp) -> &'static [u8] {
        match (self, op) {
            (TransferError::Connection(_), _) => {
                b"426 TCP connection was established but then broken!\r\n"
            }
            (TransferError::File(_), PendingOp::Store) => {
                b"552 Requested file action aborted. Exceeded storage allocation.\r\n"
            }
            (TransferError::File(_), _) => {
                b"451 Requested action aborted. Local error in processing.\r\n"
            }
        }
    }
}

/// What the last step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
}

pub struct ListCursor {
    entries: Vec<ListEntry>,
    index: usize,
    format: ListFormat,
    out: Vec<u8>,
    pos: usize,
}

pub struct FileCursor {
    file: File,
    name: String,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    total: u64,
}

/// State of a transfer between data-channel readiness events.
pub enum TransferCursor {
    List(ListCursor),
    Retrieve(FileCursor),
    Store(FileCursor),
}

impl ListCursor {
    pub fn new(entries: Vec<ListEntry>, format: ListFormat) -> Self {
        Self {
            entries,
            index: 0,
            format,
            out: Vec::with_capacity(BUFFER_SIZE),
            pos: 0,
        }
    }

    async fn step(&mut self, stream: &TcpStream) -> Result<Step, TransferError> {
        if self.pos == self.out.len() {
            self.out.clear();
            self.pos = 0;
            while self.out.len() < BUFFER_SIZE && self.index < self.entries.len() {
                let line = format_entry(&self.entries[self.index], &self.format);
                self.out.extend_from_slice(line.as_bytes());
                self.index += 1;
            }
            if self.out.is_empty() {
                return Ok(Step::Done);
            }
        }

        match stream.try_write(&self.out[self.pos..]) {
            Ok(n) => {
                self.pos += n;
                Ok(Step::Continue)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Step::Continue),
            Err(e) => Err(TransferError::Connection(e)),
        }
    }
}

impl FileCursor {
    pub fn new(file: File, name: String) -> Self {
        Self {
            file,
            name,
            buf: vec![0; BUFFER_SIZE],
            pos: 0,
            len: 0,
            total: 0,
        }
    }

    async fn send_step(&mut self, stream: &TcpStream) -> Result<Step, TransferError> {
        if self.pos == self.len {
            let n = self
                .file
                .read(&mut self.buf)
                .await
                .map_err(TransferError::File)?;
            if n == 0 {
                return Ok(Step::Done);
            }
            self.pos = 0;
            self.len = n;
        }

        match stream.try_write(&self.buf[self.pos..self.len]) {
            Ok(n) => {
                self.pos += n;
                self.total += n as u64;
                Ok(Step::Continue)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Step::Continue),
            Err(e) => Err(TransferError::Connection(e)),
        }
    }

    async fn receive_step(&mut self, stream: &TcpStream) -> Result<Step, TransferError> {
        match stream.try_read(&mut self.buf) {
            Ok(0) => {
                self.file.flush().await.map_err(TransferError::File)?;
                Ok(Step::Done)
            }
            Ok(n) => {
                self.file
                    .write_all(&self.buf[..n])
                    .await
                    .map_err(TransferError::File)?;
                self.total += n as u64;
                Ok(Step::Continue)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Step::Continue),
            Err(e) => Err(TransferError::Connection(e)),
        }
    }
}

impl TransferCursor {
    pub fn list(entries: Vec<ListEntry>, format: ListFormat) -> Self {
        TransferCursor::List(ListCursor::new(entries, format))
    }

    pub fn retrieve(file: File, name: String) -> Self {
        TransferCursor::Retrieve(FileCursor::new(file, name))
    }

    pub fn store(file: File, name: String) -> Self {
        TransferCursor::Store(FileCursor::new(file, name))
    }

    /// Readiness the data socket must report before the next step.
    pub fn interest(&self) -> Interest {
        match self {
            TransferCursor::Store(_) => Interest::READABLE,
            _ => Interest::WRITABLE,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TransferCursor::List(_) => "directory listing",
            TransferCursor::Retrieve(cursor) | TransferCursor::Store(cursor) => &cursor.name,
        }
    }

    pub fn transferred(&self) -> u64 {
        match self {
            TransferCursor::List(_) => 0,
            TransferCursor::Retrieve(cursor) | TransferCursor::Store(cursor) => cursor.total,
        }
    }

    /// Positions the file at a REST offset. Listings ignore it.
    pub async fn seek(&mut self, offset: u64) -> io::Result<()> {
        match self {
            TransferCursor::List(_) => Ok(()),
            TransferCursor::Retrieve(cursor) | TransferCursor::Store(cursor) => {
                cursor.file.seek(SeekFrom::Start(offset)).await?;
                Ok(())
            }
        }
    }

    /// Moves at most one buffer of data. Never waits on the socket.
    pub async fn step(&mut self, stream: &TcpStream) -> Result<Step, TransferError> {
        match self {
            TransferCursor::List(cursor) => cursor.step(stream).await,
            TransferCursor::Retrieve(cursor) => cursor.send_step(stream).await,
            TransferCursor::Store(cursor) => cursor.receive_step(stream).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_transfer::listing::snapshot;
    use std::fs;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    async fn drive(cursor: &mut TransferCursor, stream: &TcpStream) -> Result<(), TransferError> {
        loop {
            stream
                .ready(cursor.interest())
                .await
                .map_err(TransferError::Connection)?;
            if cursor.step(stream).await? == Step::Done {
                return Ok(());
            }
        }
    }

    #[tokio::test]
    async fn test_retrieve_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(dir.path().join("big.bin"), &content).unwrap();

        let (server, mut client) = pair().await;
        let file = File::open(dir.path().join("big.bin")).await.unwrap();
        let mut cursor = TransferCursor::retrieve(file, "big.bin".to_string());
        cursor.seek(1024).await.unwrap();

        let reader = tokio::spawn(async move {
            let mut received = Vec::new();
            client.read_to_end(&mut received).await.unwrap();
            received
        });
        drive(&mut cursor, &server).await.unwrap();
        assert_eq!(cursor.transferred(), (content.len() - 1024) as u64);
        drop(server);

        assert_eq!(reader.await.unwrap(), content[1024..].to_vec());
    }

    #[tokio::test]
    async fn test_store_until_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("up.bin");
        let (server, mut client) = pair().await;
        let file = File::create(&path).await.unwrap();
        let mut cursor = TransferCursor::store(file, "up.bin".to_string());
        assert_eq!(cursor.interest(), Interest::READABLE);

        let payload = vec![42u8; 30_000];
        let sent = payload.clone();
        tokio::spawn(async move {
            client.write_all(&sent).await.unwrap();
            client.shutdown().await.unwrap();
        });
        drive(&mut cursor, &server).await.unwrap();
        assert_eq!(fs::read(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_empty_listing_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let entries = snapshot(dir.path(), dir.path(), &ListFormat::Long).unwrap();
        let (server, mut client) = pair().await;
        let mut cursor = TransferCursor::list(entries, ListFormat::Long);

        assert_eq!(cursor.step(&server).await.unwrap(), Step::Done);
        drop(server);
        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_listing_larger_than_one_buffer() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..600 {
            fs::write(dir.path().join(format!("file-{:04}.txt", i)), b"x").unwrap();
        }
        let entries = snapshot(dir.path(), dir.path(), &ListFormat::Names).unwrap();
        let (server, mut client) = pair().await;
        let mut cursor = TransferCursor::list(entries, ListFormat::Names);

        let reader = tokio::spawn(async move {
            let mut received = String::new();
            client.read_to_string(&mut received).await.unwrap();
            received
        });
        drive(&mut cursor, &server).await.unwrap();
        drop(server);

        let received = reader.await.unwrap();
        let lines: Vec<&str> = received.split_terminator("\r\n").collect();
        assert_eq!(lines.len(), 600);
        assert_eq!(lines[0], "file-0000.txt");
        assert_eq!(lines[599], "file-0599.txt");
    }

    #[test]
    fn test_error_replies() {
        let broken = TransferError::Connection(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(broken
            .to_ftp_response(PendingOp::Retrieve)
            .starts_with(b"426 "));
        let disk = TransferError::File(io::Error::from(io::ErrorKind::Other));
        assert!(disk.to_ftp_response(PendingOp::Store).starts_with(b"552 "));
        assert!(disk.to_ftp_response(PendingOp::Retrieve).starts_with(b"451 "));
    }
}
