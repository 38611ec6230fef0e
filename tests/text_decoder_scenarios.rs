//! End-to-end text-decoder scenarios from the testable-properties list.

use ebreader::text::escape::DiscKind;
use ebreader::text::hooks::{Hookset, Output};
use ebreader::text::{CharCode, TextContext};
use ebreader::zio::{OpenMode, ZioStream};

fn open(data: Vec<u8>) -> ZioStream {
    ZioStream::open_memory(data, OpenMode::Plain).unwrap()
}

/// Scenario d: heading read stops at `0x1f 0x0a` and produces "ABC".
#[test]
fn heading_scenario_stops_at_newline_escape() {
    let data = vec![
        0x1f, 0x02, 0x00, 0x01, b'A', b'B', b'C', 0x1f, 0x0a, 0x00, 0x00, 0x1f, 0x03, 0x00, 0x00,
    ];
    let mut stream = open(data);
    let mut ctx = TextContext::new();
    let mut hookset = Hookset::new();
    let mut out = [0u8; 64];
    let n = ctx
        .read_heading(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, &mut out)
        .unwrap();
    assert_eq!(&out[..n], b"ABC");
}

/// Scenario e: BEGIN/END_KEYWORD hooks wrap the emitted text, and the
/// STOP_CODE hook fires exactly once beforehand with the documented argv.
#[test]
fn keyword_scenario_wraps_output_and_probes_stop_code() {
    // A printable character precedes the escape so the STOP_CODE probe's
    // "printable_count > 0" gate (text.c's own precondition) is satisfied.
    let data = vec![
        b'A', 0x1f, 0x41, 0x00, 0x05, b'X', b'Y', b'Z', 0x1f, 0x61, 0x00, 0x00,
    ];
    let mut stream = open(data);
    let mut ctx = TextContext::new();
    let mut hookset = Hookset::new();

    use ebreader::text::escape::HookCode;
    use std::sync::{Arc, Mutex};

    let stop_calls: Arc<Mutex<Vec<Vec<u32>>>> = Arc::new(Mutex::new(Vec::new()));
    let stop_calls_clone = Arc::clone(&stop_calls);
    hookset.set_hook(HookCode::StopCode, move |_out: &mut Output, argv: &[u32]| {
        stop_calls_clone.lock().unwrap().push(argv.to_vec());
        Ok(())
    });
    hookset.set_hook(HookCode::BeginKeyword, |out: &mut Output, _argv: &[u32]| {
        out.write_byte1(b'[');
        Ok(())
    });
    hookset.set_hook(HookCode::EndKeyword, |out: &mut Output, _argv: &[u32]| {
        out.write_byte1(b']');
        Ok(())
    });

    let mut out = [0u8; 64];
    // Article never explicitly ends (no 0x1f 0x03); a TEXT-mode read still
    // decodes the whole escape sequence given a large enough buffer.
    let n = ctx
        .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, None, None, &mut out)
        .unwrap();
    assert_eq!(&out[..n], b"A[XYZ]");

    let calls = stop_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], vec![0x1f41, 0x0005]);
}

/// Property 4: resumable reads across arbitrary buffer-size splits match a
/// single full-size read, even for single-byte buffers.
#[test]
fn resumable_reads_match_single_call_across_splits() {
    let mut data = vec![0x1f, 0x02, 0x00, 0x01];
    data.extend_from_slice(b"hello world this is some text");
    data.extend_from_slice(&[0x1f, 0x03, 0x00, 0x00]);

    let full = {
        let mut stream = open(data.clone());
        let mut ctx = TextContext::new();
        let mut hookset = Hookset::new();
        let mut out = [0u8; 256];
        let n = ctx
            .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, None, None, &mut out)
            .unwrap();
        out[..n].to_vec()
    };

    let mut stream = open(data);
    let mut ctx = TextContext::new();
    let mut hookset = Hookset::new();
    let mut collected = Vec::new();
    while !ctx.is_stopped() {
        let mut byte = [0u8; 1];
        let n = ctx
            .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, None, None, &mut byte)
            .unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&byte[..n]);
    }
    assert_eq!(collected, full);
}

/// Property 5: once stopped, further reads without a seek yield zero bytes
/// and stay in TEXT mode.
#[test]
fn stop_code_idempotence_after_article_end() {
    let data = vec![0x1f, 0x02, 0x00, 0x01, b'x', 0x1f, 0x03, 0x00, 0x00];
    let mut stream = open(data);
    let mut ctx = TextContext::new();
    let mut hookset = Hookset::new();
    let mut out = [0u8; 64];
    ctx.read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, None, None, &mut out)
        .unwrap();
    assert!(ctx.is_stopped());
    let n = ctx
        .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Eb, &mut hookset, None, None, &mut out)
        .unwrap();
    assert_eq!(n, 0);
}
