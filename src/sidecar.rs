//! Purpose: Run the bridge over a pair of line-oriented text streams.
//! Exports: `serve`.
//! Role: Framing layer between the host process and `bridge::Dispatcher`.
//! Invariants: The ready banner is the first line written, before any input is read.
//! Invariants: Exactly one JSON response line per input line, flushed immediately.
//! Invariants: Input EOF ends the loop cleanly; only stream I/O errors are fatal.
//! Invariants: A line that is not UTF-8 is answered as invalid JSON; it never ends the loop.
use std::io::{BufRead, Write};

use serde::Serialize;

use crate::bridge::{BridgeResponse, Dispatcher};
use crate::core::error::{Error, ErrorKind};
use crate::stats::StatsProvider;

pub fn serve<S, R, W>(dispatcher: &Dispatcher<S>, mut reader: R, mut writer: W) -> Result<(), Error>
where
    S: StatsProvider,
    R: BufRead,
    W: Write,
{
    write_json_line(&mut writer, &dispatcher.ready_banner())?;
    tracing::info!(pob_available = dispatcher.pob_available(), "bridge ready");

    let mut line = Vec::new();
    let mut handled: u64 = 0;
    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read request")
                .with_source(err)
        })?;
        if read == 0 {
            tracing::info!(requests = handled, "input closed; shutting down");
            return Ok(());
        }

        let response = match std::str::from_utf8(trim_line_end(&line)) {
            Ok(message) => dispatcher.dispatch_line(message),
            Err(err) => {
                tracing::warn!(error = %err, "rejecting request line that is not UTF-8");
                BridgeResponse::failure(format!("Invalid JSON: {err}"))
            }
        };
        write_json_line(&mut writer, &response)?;
        handled += 1;
    }
}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

fn write_json_line<W: Write, T: Serialize>(writer: &mut W, payload: &T) -> Result<(), Error> {
    serde_json::to_writer(&mut *writer, payload).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode response")
            .with_source(err)
    })?;
    writer.write_all(b"\n").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write response")
            .with_source(err)
    })?;
    writer.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush response")
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PlaceholderStats;
    use serde_json::{Value, json};
    use std::io::Cursor;

    fn run(input: &str) -> Vec<Value> {
        run_bytes(input.as_bytes())
    }

    fn run_bytes(input: &[u8]) -> Vec<Value> {
        let dispatcher = Dispatcher::new(PlaceholderStats);
        let mut output = Vec::new();
        serve(&dispatcher, Cursor::new(input), &mut output).expect("serve");
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    #[test]
    fn banner_is_written_even_without_input() {
        assert_eq!(run(""), vec![json!({"ready": true, "pob_available": false})]);
    }

    #[test]
    fn bad_line_does_not_stop_the_stream() {
        let lines = run("this is not json\n{\"command\":\"ping\",\"data\":{}}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["success"], json!(false));
        assert!(lines[1]["error"].as_str().expect("error").starts_with("Invalid JSON: "));
        assert_eq!(lines[2], json!({"success": true, "pob_available": false}));
    }

    #[test]
    fn non_utf8_line_is_answered_and_the_stream_continues() {
        let lines = run_bytes(b"{\"command\":\"ping\",\"data\":{\"x\":\"\xff\"}}\n{\"command\":\"ping\"}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["success"], json!(false));
        assert!(lines[1]["error"].as_str().expect("error").starts_with("Invalid JSON: "));
        assert_eq!(lines[2], json!({"success": true, "pob_available": false}));
    }

    #[test]
    fn every_line_gets_one_response() {
        let input = "{\"command\":\"ping\"}\r\n\n{\"command\":\"frobnicate\"}";
        let lines = run(input);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1]["success"], json!(true));
        assert_eq!(lines[2]["success"], json!(false));
        assert_eq!(lines[3]["error"], json!("Unknown command: frobnicate"));
    }

    #[test]
    fn encode_decode_round_trip_over_stream() {
        let first = run("{\"command\":\"encode\",\"data\":{\"passives\":[7,7]}}\n");
        let code = first[1]["code"].as_str().expect("code");
        let second = run(&format!(
            "{{\"command\":\"decode\",\"data\":{{\"code\":\"{code}\"}}}}\n"
        ));
        let raw = second[1]["data"]["raw_xml"].as_str().expect("raw_xml");
        assert!(raw.contains("nodes=\"7,7\""));
        assert_eq!(second[1]["data"]["parsed"], json!(false));
    }
}
