//! Session Tests
//!
//! Drive the server state machine with scripted input and check the exact
//! response lines.

mod common;

use common::{get_file, put_file, scripted, scripted_raw, ScriptHandle, ScriptedStream};
use securefile::config::Limits;
use securefile::network::SessionState;
use securefile::protocol::{Framing, LineCodec};
use securefile::{FileStore, Session};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn session_with(
    temp_dir: &TempDir,
    lines: &[&str],
) -> (Session<ScriptedStream>, ScriptHandle) {
    let (stream, handle) = scripted(lines);
    let store = FileStore::open(temp_dir.path()).unwrap();
    let session = Session::new(stream, store, LineCodec::default(), "test-peer");
    (session, handle)
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_exit_closes_without_response() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(&temp_dir, &["EXIT", "DELETE"]);

    assert_eq!(session.step(), SessionState::Closed);
    assert!(handle.lines().is_empty());
    assert!(handle.is_closed());
}

#[test]
fn test_unrecognized_command_is_ignored() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "a.txt", "x");
    let (mut session, handle) = session_with(
        &temp_dir,
        &["FOO", "DELETE", "a.txt", "DATA_NAME_SENT"],
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert!(handle.lines().is_empty());

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(
        handle.lines(),
        vec!["FINISHED_REQUEST", "The file a.txt was deleted from the server."]
    );
}

#[test]
fn test_commands_are_case_sensitive() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(&temp_dir, &["exit", "download"]);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(session.step(), SessionState::Closed);
    assert!(handle.lines().is_empty());
    assert!(!handle.is_closed());
}

#[test]
fn test_end_of_stream_closes_session() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(&temp_dir, &[]);

    assert_eq!(session.step(), SessionState::Closed);
    assert!(handle.lines().is_empty());
}

#[test]
fn test_run_counts_handled_lines() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _handle) = session_with(
        &temp_dir,
        &["FOO", "DELETE", "a.txt", "DATA_NAME_SENT", "EXIT"],
    );

    assert_eq!(session.run(), 2);
}

#[test]
fn test_crlf_terminated_commands() {
    let temp_dir = TempDir::new().unwrap();
    let (stream, handle) = scripted_raw(b"DELETE\r\nmissing.txt\r\nDATA_NAME_SENT\r\nEXIT\r\n");
    let store = FileStore::open(temp_dir.path()).unwrap();
    let mut session = Session::new(stream, store, LineCodec::default(), "test-peer");

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(
        handle.lines(),
        vec!["ERROR", "The file missing.txt could not be found on the server."]
    );
    assert_eq!(session.step(), SessionState::Closed);
}

// =============================================================================
// Download Tests
// =============================================================================

#[test]
fn test_download_streams_lines_then_outcome() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "a.txt", "hello\nworld\n");
    let (mut session, handle) = session_with(&temp_dir, &["DOWNLOAD", "a.txt", "DATA_NAME_SENT"]);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(
        handle.lines(),
        vec![
            "hello",
            "world",
            "DATA_TEXT_SENT",
            "FINISHED_REQUEST",
            "The file a.txt was downloaded from the server."
        ]
    );
}

#[test]
fn test_download_missing_file_appends_trailing_finished() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) =
        session_with(&temp_dir, &["DOWNLOAD", "nope.txt", "DATA_NAME_SENT"]);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(
        handle.lines(),
        vec!["ERROR", "The file nope.txt can not be found.", "FINISHED_REQUEST"]
    );
}

#[test]
fn test_download_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "empty.txt", "");
    let (mut session, handle) =
        session_with(&temp_dir, &["DOWNLOAD", "empty.txt", "DATA_NAME_SENT"]);

    session.step();
    assert_eq!(
        handle.lines(),
        vec![
            "DATA_TEXT_SENT",
            "FINISHED_REQUEST",
            "The file empty.txt was downloaded from the server."
        ]
    );
}

#[test]
fn test_download_with_violating_name_section() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) =
        session_with(&temp_dir, &["DOWNLOAD", "a.txt", "FINISHED_REQUEST", "EXIT"]);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    let lines = handle.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].contains("Protocol violation"));
    assert_eq!(lines[2], "FINISHED_REQUEST");

    assert_eq!(session.step(), SessionState::Closed);
}

// =============================================================================
// Upload Tests
// =============================================================================

#[test]
fn test_upload_concatenates_lines() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(
        &temp_dir,
        &["UPLOAD", "a.txt", "DATA_NAME_SENT", "hello", "world", "DATA_TEXT_SENT"],
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(get_file(temp_dir.path(), "a.txt"), "helloworld");
    assert_eq!(
        handle.lines(),
        vec!["FINISHED_REQUEST", "The file a.txt was uploaded successfully."]
    );
}

#[test]
fn test_upload_overwrites_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "a.txt", "old content that is longer");
    let (mut session, _handle) = session_with(
        &temp_dir,
        &["UPLOAD", "a.txt", "DATA_NAME_SENT", "new", "DATA_TEXT_SENT"],
    );

    session.step();
    assert_eq!(get_file(temp_dir.path(), "a.txt"), "new");
}

#[test]
fn test_upload_uses_last_name_line() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, _handle) = session_with(
        &temp_dir,
        &[
            "UPLOAD",
            "first.txt",
            "second.txt",
            "DATA_NAME_SENT",
            "body",
            "DATA_TEXT_SENT",
        ],
    );

    session.step();
    assert!(!temp_dir.path().join("first.txt").exists());
    assert_eq!(get_file(temp_dir.path(), "second.txt"), "body");
}

#[test]
fn test_upload_with_empty_name_reports_error() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(
        &temp_dir,
        &["UPLOAD", "DATA_NAME_SENT", "body", "DATA_TEXT_SENT"],
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    let lines = handle.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "ERROR");
}

#[test]
fn test_upload_rejects_path_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let store_dir = temp_dir.path().join("store");
    let (stream, handle) = scripted(&[
        "UPLOAD",
        "../escape.txt",
        "DATA_NAME_SENT",
        "x",
        "DATA_TEXT_SENT",
    ]);
    let store = FileStore::open(&store_dir).unwrap();
    let mut session = Session::new(stream, store, LineCodec::default(), "test-peer");

    session.step();
    assert_eq!(handle.lines()[0], "ERROR");
    assert!(!temp_dir.path().join("escape.txt").exists());
}

#[test]
fn test_upload_cut_off_mid_content_closes_session() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) =
        session_with(&temp_dir, &["UPLOAD", "a.txt", "DATA_NAME_SENT", "partial"]);

    assert_eq!(session.step(), SessionState::Closed);
    assert!(!temp_dir.path().join("a.txt").exists());
    assert!(handle.lines().is_empty());
}

#[test]
fn test_upload_content_over_limit_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (stream, handle) = scripted(&[
        "UPLOAD",
        "big.txt",
        "DATA_NAME_SENT",
        "0123456789",
        "0123456789",
        "DATA_TEXT_SENT",
    ]);
    let store = FileStore::open(temp_dir.path()).unwrap();
    let limits = Limits {
        max_content_bytes: 15,
        ..Limits::default()
    };
    let mut session = Session::new(
        stream,
        store,
        LineCodec::new(Framing::Legacy, limits),
        "test-peer",
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    let lines = handle.lines();
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].contains("content exceeds 15 bytes"));
    assert!(!temp_dir.path().join("big.txt").exists());
}

// =============================================================================
// Line Limit Tests
// =============================================================================

fn session_with_line_limit(
    temp_dir: &TempDir,
    stream: ScriptedStream,
    max_line_bytes: usize,
) -> Session<ScriptedStream> {
    let store = FileStore::open(temp_dir.path()).unwrap();
    let limits = Limits {
        max_line_bytes,
        ..Limits::default()
    };
    Session::new(stream, store, LineCodec::new(Framing::Legacy, limits), "test-peer")
}

#[test]
fn test_oversized_content_line_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let long_line = "x".repeat(1000);
    let (stream, handle) = scripted(&[
        "UPLOAD",
        "a.txt",
        "DATA_NAME_SENT",
        &long_line,
        "DATA_TEXT_SENT",
        "EXIT",
    ]);
    let mut session = session_with_line_limit(&temp_dir, stream, 20);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    let lines = handle.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].contains("line exceeds 20 bytes"));
    assert!(!temp_dir.path().join("a.txt").exists());

    // Reading resumes on the line after the oversized one
    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(session.step(), SessionState::Closed);
    assert!(handle.is_closed());
}

#[test]
fn test_unterminated_oversized_command_is_discarded() {
    let temp_dir = TempDir::new().unwrap();
    let (stream, handle) = scripted_raw(&[b'x'; 1000]);
    let mut session = session_with_line_limit(&temp_dir, stream, 20);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert!(handle.lines().is_empty());
    assert_eq!(session.step(), SessionState::Closed);
}

#[test]
fn test_line_at_limit_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let (stream, _handle) = scripted_raw(
        b"UPLOAD\r\na.txt\r\nDATA_NAME_SENT\r\n01234567890123456789\r\nDATA_TEXT_SENT\r\n",
    );
    let mut session = session_with_line_limit(&temp_dir, stream, 20);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(get_file(temp_dir.path(), "a.txt"), "01234567890123456789");
}

// =============================================================================
// Failed Response Tests
// =============================================================================

#[test]
fn test_failed_download_response_keeps_trailing_line() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "a.txt", "hello\n");
    let (mut session, handle) =
        session_with(&temp_dir, &["DOWNLOAD", "a.txt", "DATA_NAME_SENT"]);

    handle.fail_next_write();
    assert_eq!(session.step(), SessionState::AwaitingCommand);

    let lines = handle.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].starts_with("The DOWNLOAD request failed"));
    assert_eq!(lines[2], "FINISHED_REQUEST");
}

#[test]
fn test_failed_upload_response_is_a_pair() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(
        &temp_dir,
        &["UPLOAD", "a.txt", "DATA_NAME_SENT", "hello", "DATA_TEXT_SENT"],
    );

    handle.fail_next_write();
    assert_eq!(session.step(), SessionState::AwaitingCommand);

    let lines = handle.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].starts_with("The UPLOAD request failed"));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_existing_file() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "a.txt", "x");
    let (mut session, handle) = session_with(&temp_dir, &["DELETE", "a.txt", "DATA_NAME_SENT"]);

    session.step();
    assert!(!temp_dir.path().join("a.txt").exists());
    assert_eq!(handle.lines()[0], "FINISHED_REQUEST");
}

#[test]
fn test_delete_missing_file_names_it() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) =
        session_with(&temp_dir, &["DELETE", "ghost.txt", "DATA_NAME_SENT"]);

    session.step();
    let lines = handle.lines();
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].contains("ghost.txt"));
}

#[test]
fn test_delete_name_section_over_limit() {
    let temp_dir = TempDir::new().unwrap();
    let (stream, handle) = scripted(&["DELETE", "a", "b", "c", "DATA_NAME_SENT"]);
    let store = FileStore::open(temp_dir.path()).unwrap();
    let limits = Limits {
        max_name_lines: 2,
        ..Limits::default()
    };
    let mut session = Session::new(
        stream,
        store,
        LineCodec::new(Framing::Legacy, limits),
        "test-peer",
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    let lines = handle.lines();
    assert_eq!(lines[0], "ERROR");
    assert!(lines[1].contains("name section exceeds 2 lines"));

    // The rest of the oversized section is read as unrecognized commands
    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(session.step(), SessionState::Closed);
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_framing_negotiation_switches_session() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(
        &temp_dir,
        &[
            "FRAMING COUNTED",
            "UPLOAD",
            "LINES 1",
            "b.txt",
            "DATA_NAME_SENT",
            "LINES 2",
            "DATA_TEXT_SENT",
            "plain",
            "DATA_TEXT_SENT",
        ],
    );

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert_eq!(session.framing(), Framing::Counted);
    assert_eq!(session.step(), SessionState::AwaitingCommand);

    assert_eq!(get_file(temp_dir.path(), "b.txt"), "DATA_TEXT_SENT\nplain\n");
    assert_eq!(
        handle.lines(),
        vec![
            "FINISHED_REQUEST",
            "Framing set to counted.",
            "FINISHED_REQUEST",
            "The file b.txt was uploaded successfully."
        ]
    );
}

#[test]
fn test_framing_command_needs_exact_mode_name() {
    let temp_dir = TempDir::new().unwrap();
    let (mut session, handle) = session_with(&temp_dir, &["FRAMING counted"]);

    assert_eq!(session.step(), SessionState::AwaitingCommand);
    assert!(handle.lines().is_empty());
    assert_eq!(session.framing(), Framing::Legacy);
}

#[test]
fn test_counted_download_frames_content() {
    let temp_dir = TempDir::new().unwrap();
    put_file(temp_dir.path(), "c.txt", "ERROR\nsecond\n");
    let (mut session, handle) = session_with(
        &temp_dir,
        &["FRAMING COUNTED", "DOWNLOAD", "LINES 1", "c.txt", "DATA_NAME_SENT"],
    );

    session.step();
    session.step();
    assert_eq!(
        handle.lines()[2..],
        [
            "LINES 2",
            "ERROR",
            "second",
            "DATA_TEXT_SENT",
            "FINISHED_REQUEST",
            "The file c.txt was downloaded from the server."
        ]
    );
}
