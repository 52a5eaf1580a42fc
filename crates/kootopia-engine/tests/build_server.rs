//! Exchanges with a real TCP build server on the loopback interface.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use kootopia_engine::compile::{
    CompileRequest, END_OF_CODE, END_OF_FILENAME, TcpTransport, Transport, TransportError,
    TransportSettings, protocol,
};
use kootopia_engine::models::FileKind;
use kootopia_engine::{
    CompileState, CompileUpdate, EditorWorkspace, FileStore, Persistence, WorkspaceSettings,
};
use pretty_assertions::assert_eq;

const WAIT: Duration = Duration::from_secs(10);

/// What the fake server saw from its one client
#[derive(Debug)]
struct Received {
    file_name: String,
    source_lines: Vec<String>,
}

/// Accept a single connection, read one framed request and answer with
/// `reply` verbatim.
fn serve_once(reply: &'static str) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let line = line.trim_end_matches('\n').to_string();
            let done = line == END_OF_CODE;
            lines.push(line);
            if done {
                break;
            }
        }

        let mut writer = stream;
        writer.write_all(reply.as_bytes()).unwrap();
        writer.flush().unwrap();

        let marker = lines.iter().position(|l| l == END_OF_FILENAME).unwrap();
        Received {
            file_name: lines[..marker].join("\n"),
            source_lines: lines[marker + 1..lines.len() - 1].to_vec(),
        }
    });

    (address, handle)
}

fn transport(address: &str) -> TcpTransport {
    TcpTransport::new(TransportSettings {
        address: address.to_string(),
        read_timeout: Duration::from_secs(5),
        ..TransportSettings::default()
    })
}

#[test]
fn python_error_is_flagged_end_to_end() {
    let (address, server) = serve_once(
        "Traceback (most recent call last):\n  File \"x.py\", line 1\n    print(\"hi)\nSyntaxError: unterminated string literal\nEND_OF_RESULT\n",
    );
    let files = tempfile::tempdir().unwrap();
    let store = FileStore::open(files.path()).unwrap();
    store.save(FileKind::Source, "x.py", "print(\"hi)").unwrap();

    let mut workspace =
        EditorWorkspace::new(store, transport(&address), WorkspaceSettings::default());
    workspace.open("x.py").unwrap();
    workspace.compile().unwrap();
    assert_eq!(workspace.compile_status(), "Compiling...");

    let updates = workspace.wait_compile(WAIT);

    let received = server.join().unwrap();
    assert_eq!(received.file_name, "x.py");
    assert_eq!(received.source_lines, vec!["print(\"hi)"]);

    assert!(matches!(
        updates.last(),
        Some(CompileUpdate::Succeeded { lines, .. }) if lines.iter().copied().eq([0])
    ));
    assert_eq!(workspace.compile_state(), CompileState::Idle);
    assert!(workspace.compile_status().ends_with("unterminated string literal"));

    let annotated = workspace.session().annotated();
    assert_eq!(annotated.lines.len(), 1);
    assert!(annotated.lines[0].flagged);
}

#[test]
fn multi_line_source_is_framed_verbatim() {
    let (address, server) = serve_once("Hello!\nEND_OF_RESULT\n");
    let source = "fun main() {\n    println(\"Hello!\")\n}";

    let request = CompileRequest::new("untitled.kt", source);
    let response = protocol::exchange(&transport(&address), &request, || {}).unwrap();

    let received = server.join().unwrap();
    assert_eq!(received.file_name, "untitled.kt");
    assert_eq!(received.source_lines.join("\n"), source);
    assert_eq!(response.raw_output, "Hello!");
}

#[test]
fn truncated_response_is_a_transport_error() {
    // Server hangs up without ever sending the sentinel
    let (address, server) = serve_once("Compiling\npartial output\n");

    let request = CompileRequest::new("a.kt", "fun main() {}");
    let result = protocol::exchange(&transport(&address), &request, || {});
    server.join().unwrap();

    assert!(matches!(result, Err(TransportError::ConnectionClosed)));
}

#[test]
fn refused_connection_reports_check_adb() {
    // Bind then drop to get a port nobody is listening on
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    assert!(transport(&address).connect().is_err());

    let files = tempfile::tempdir().unwrap();
    let store = FileStore::open(files.path()).unwrap();
    let mut workspace =
        EditorWorkspace::new(store, transport(&address), WorkspaceSettings::default());
    workspace.on_edit("fun main() {}", 0..0, Instant::now());

    workspace.compile().unwrap();
    workspace.wait_compile(WAIT);

    assert_eq!(workspace.compile_state(), CompileState::Idle);
    assert!(workspace.compile_status().starts_with("Error: "));
    assert!(workspace.compile_status().ends_with(" (Check ADB and server)"));
    assert!(workspace.session().highlighted_lines().is_empty());
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        // Hold the connection open without replying
        thread::sleep(Duration::from_millis(800));
        drop(stream);
    });

    let transport = TcpTransport::new(TransportSettings {
        address,
        read_timeout: Duration::from_millis(200),
        ..TransportSettings::default()
    });
    let request = CompileRequest::new("a.kt", "fun main() {}");
    let result = protocol::exchange(&transport, &request, || {});
    server.join().unwrap();

    assert!(matches!(result, Err(TransportError::Timeout(_))));
}

#[test]
fn trickling_server_hits_the_overall_deadline() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // Each byte arrives well inside the per-read timeout
        for _ in 0..20 {
            if stream.write_all(b"x").is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
    });

    let transport = TcpTransport::new(TransportSettings {
        address,
        read_timeout: Duration::from_millis(200),
        ..TransportSettings::default()
    });
    let request = CompileRequest::new("a.kt", "fun main() {}");
    let started = Instant::now();
    let result = protocol::exchange(&transport, &request, || {});
    let elapsed = started.elapsed();
    server.join().unwrap();

    assert!(matches!(result, Err(TransportError::Timeout("reading the result"))));
    assert!(elapsed < Duration::from_millis(1500), "took {elapsed:?}");
}
