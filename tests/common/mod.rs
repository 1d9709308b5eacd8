//! Shared test helpers

#![allow(dead_code)]

use std::io::{self, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use securefile::protocol::{LineCodec, Transport};
use securefile::{FileStore, Session};

// =============================================================================
// Scripted Stream
// =============================================================================

/// In-memory transport: reads a fixed script, records everything written
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    fail_next_write: Arc<AtomicBool>,
}

/// Handles for inspecting a `ScriptedStream` after it was moved into a session
#[derive(Clone)]
pub struct ScriptHandle {
    output: Arc<Mutex<Vec<u8>>>,
    closed: Arc<AtomicBool>,
    fail_next_write: Arc<AtomicBool>,
}

impl ScriptHandle {
    /// Written lines, without terminators
    pub fn lines(&self) -> Vec<String> {
        let output = self.output.lock().unwrap();
        String::from_utf8(output.clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Make the next write fail with a generic I/O error
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }
}

/// Build a stream whose input is `lines`, each terminated with `\n`
pub fn scripted(lines: &[&str]) -> (ScriptedStream, ScriptHandle) {
    let mut input = String::new();
    for line in lines {
        input.push_str(line);
        input.push('\n');
    }
    scripted_raw(input.as_bytes())
}

/// Build a stream with exact input bytes
pub fn scripted_raw(input: &[u8]) -> (ScriptedStream, ScriptHandle) {
    let output = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(AtomicBool::new(false));
    let fail_next_write = Arc::new(AtomicBool::new(false));
    let stream = ScriptedStream {
        input: Cursor::new(input.to_vec()),
        output: Arc::clone(&output),
        closed: Arc::clone(&closed),
        fail_next_write: Arc::clone(&fail_next_write),
    };
    (
        stream,
        ScriptHandle {
            output,
            closed,
            fail_next_write,
        },
    )
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
        }
        self.output.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedStream {
    fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// Loopback Sessions
// =============================================================================

/// Serve one plain TCP session from `server_dir` on a background thread
///
/// Returns the session thread (yielding the number of handled command lines)
/// and the connected client stream.
pub fn spawn_session(server_dir: &Path) -> (JoinHandle<u64>, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let store = FileStore::open(server_dir).unwrap();

    let handle = thread::spawn(move || {
        let (stream, peer) = listener.accept().unwrap();
        let mut session = Session::new(stream, store, LineCodec::default(), peer.to_string());
        session.run()
    });

    let stream = TcpStream::connect(addr).unwrap();
    (handle, stream)
}

/// Write a file directly into a store directory
pub fn put_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// Read a file directly from a store directory
pub fn get_file(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap()
}
