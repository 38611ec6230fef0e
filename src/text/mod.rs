//! The paged text decoder: a state machine over the uncompressed text
//! stream that interleaves characters with `0x1f xx …` escapes, dispatches
//! hooks, and supports resumable partial reads.
//!
//! This is the largest single component of the reader: see [`escape`] for
//! the opcode table, [`hooks`] for the hook registry and output handle, and
//! [`bcd`] for the packed-decimal fields a few graphic/sound opcodes carry.

pub mod bcd;
pub mod escape;
pub mod hooks;

use crate::error::{Error, Result};
use crate::zio::{Whence, ZioStream};
use escape::{DiscKind, HookCode};
use hooks::{Hookset, Output};

pub use escape::DiscKind as Disc;

/// The document character code governing how non-escape bytes are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharCode {
    Iso8859_1,
    /// JIS X 0208, with GB 2312 recognised alongside it where the second
    /// byte falls in the GB range.
    Jis,
}

/// What kind of content a `seek_text` position is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    None,
    Text,
    Heading,
    Raw,
    OptionalText,
    Invalid,
}

/// An inclusive-exclusive byte range used to detect menu/copyright content
/// so `read_text` can reclassify it as [`ContentMode::OptionalText`].
pub type ByteRange = (u64, u64);

fn in_range(pos: u64, range: Option<ByteRange>) -> bool {
    matches!(range, Some((start, end)) if pos >= start && pos < end)
}

/// Caller-visible cursor and decode state for one text stream.
pub struct TextContext {
    position: u64,
    mode: ContentMode,
    unprocessed: Vec<u8>,
    narrow: bool,
    printable_count: u32,
    end_of_file: bool,
    end_of_article: bool,
    skip_code: Option<u8>,
    auto_stop_code: Option<u32>,
    in_candidate: bool,
    candidate: Vec<u8>,
}

impl Default for TextContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TextContext {
    pub fn new() -> Self {
        Self {
            position: 0,
            mode: ContentMode::None,
            unprocessed: Vec::new(),
            narrow: false,
            printable_count: 0,
            end_of_file: false,
            end_of_article: false,
            skip_code: None,
            auto_stop_code: None,
            in_candidate: false,
            candidate: Vec::new(),
        }
    }

    pub fn tell_text(&self) -> u64 {
        self.position
    }

    /// Reposition the cursor, clearing all per-article state back to a
    /// fresh [`ContentMode::None`].
    pub fn seek_text(&mut self, position: u64) {
        self.position = position;
        self.mode = ContentMode::None;
        self.unprocessed.clear();
        self.narrow = false;
        self.printable_count = 0;
        self.end_of_file = false;
        self.end_of_article = false;
        self.skip_code = None;
        self.auto_stop_code = None;
        self.in_candidate = false;
        self.candidate.clear();
    }

    pub fn current_candidate(&self) -> &[u8] {
        &self.candidate
    }

    pub fn is_stopped(&self) -> bool {
        self.end_of_article
    }

    pub fn read_text(
        &mut self,
        stream: &mut ZioStream,
        code: CharCode,
        disc: DiscKind,
        hookset: &mut Hookset,
        menu_range: Option<ByteRange>,
        copyright_range: Option<ByteRange>,
        out: &mut [u8],
    ) -> Result<usize> {
        let optional = in_range(self.position, menu_range) || in_range(self.position, copyright_range);
        let effective = if optional { ContentMode::OptionalText } else { ContentMode::Text };
        self.read_content(stream, effective, code, disc, hookset, out)
    }

    pub fn read_heading(
        &mut self,
        stream: &mut ZioStream,
        code: CharCode,
        disc: DiscKind,
        hookset: &mut Hookset,
        out: &mut [u8],
    ) -> Result<usize> {
        self.read_content(stream, ContentMode::Heading, code, disc, hookset, out)
    }

    /// Raw content: no escape interpretation, no hooks — a literal byte copy.
    pub fn read_rawtext(&mut self, stream: &mut ZioStream, out: &mut [u8]) -> Result<usize> {
        if self.mode == ContentMode::None {
            self.mode = ContentMode::Raw;
        } else if self.mode != ContentMode::Raw {
            return Err(Error::WrongContentMode);
        }
        stream.lseek(self.position as i64, Whence::Start)?;
        let n = stream.read(out)?;
        self.position += n as u64;
        if n == 0 {
            self.end_of_file = true;
        }
        Ok(n)
    }

    pub fn forward_text(
        &mut self,
        stream: &mut ZioStream,
        code: CharCode,
        disc: DiscKind,
        hookset: &mut Hookset,
        menu_range: Option<ByteRange>,
        copyright_range: Option<ByteRange>,
    ) -> Result<()> {
        let mut scratch = [0u8; 2048];
        while !self.end_of_article && !self.end_of_file {
            self.read_text(stream, code, disc, hookset, menu_range, copyright_range, &mut scratch)?;
        }
        self.end_of_article = false;
        Ok(())
    }

    pub fn forward_heading(
        &mut self,
        stream: &mut ZioStream,
        code: CharCode,
        disc: DiscKind,
        hookset: &mut Hookset,
    ) -> Result<()> {
        let mut scratch = [0u8; 2048];
        while !self.end_of_article && !self.end_of_file {
            self.read_heading(stream, code, disc, hookset, &mut scratch)?;
        }
        self.end_of_article = false;
        Ok(())
    }

    fn read_content(
        &mut self,
        stream: &mut ZioStream,
        requested: ContentMode,
        code: CharCode,
        disc: DiscKind,
        hookset: &mut Hookset,
        out: &mut [u8],
    ) -> Result<usize> {
        if self.mode == ContentMode::Invalid {
            return Err(Error::WrongContentMode);
        }
        if self.mode == ContentMode::None {
            self.mode = requested;
        } else if self.mode != requested {
            return Err(Error::WrongContentMode);
        }

        let take = self.unprocessed.len().min(out.len());
        out[..take].copy_from_slice(&self.unprocessed[..take]);
        self.unprocessed.drain(..take);

        if take == out.len() || self.end_of_article {
            return Ok(take);
        }

        let mode = self.mode;
        let TextContext {
            position,
            narrow,
            printable_count,
            end_of_article,
            skip_code,
            auto_stop_code,
            in_candidate,
            candidate,
            unprocessed,
            ..
        } = self;

        let result = decode_loop(
            position,
            narrow,
            printable_count,
            end_of_article,
            skip_code,
            auto_stop_code,
            in_candidate,
            candidate,
            unprocessed,
            stream,
            code,
            disc,
            mode,
            hookset,
            &mut out[take..],
        );

        match result {
            Ok(n) => Ok(take + n),
            Err(e) => {
                self.mode = ContentMode::Invalid;
                Err(e)
            }
        }
    }
}

fn read_at(stream: &mut ZioStream, at: u64, buf: &mut [u8]) -> Result<usize> {
    stream.lseek(at as i64, Whence::Start)?;
    stream.read(buf)
}

fn be16(b: &[u8]) -> u16 {
    u16::from_be_bytes([b[0], b.get(1).copied().unwrap_or(0)])
}

fn be32(b: &[u8]) -> u32 {
    let mut a = [0u8; 4];
    for (i, slot) in a.iter_mut().enumerate() {
        *slot = b.get(i).copied().unwrap_or(0);
    }
    u32::from_be_bytes(a)
}

#[allow(clippy::too_many_arguments)]
fn decode_loop(
    position: &mut u64,
    narrow: &mut bool,
    printable_count: &mut u32,
    end_of_article: &mut bool,
    skip_code: &mut Option<u8>,
    auto_stop_code: &mut Option<u32>,
    in_candidate: &mut bool,
    candidate: &mut Vec<u8>,
    unprocessed: &mut Vec<u8>,
    stream: &mut ZioStream,
    code: CharCode,
    disc: DiscKind,
    mode: ContentMode,
    hookset: &mut Hookset,
    out: &mut [u8],
) -> Result<usize> {
    let mut output = Output::new(out, unprocessed);

    while !output.is_full() {
        if *end_of_article {
            break;
        }

        let mut b0 = [0u8; 1];
        if read_at(stream, *position, &mut b0)? == 0 {
            break;
        }

        if b0[0] == 0x1f {
            let stepped = step_escape(
                position,
                narrow,
                printable_count,
                end_of_article,
                skip_code,
                auto_stop_code,
                in_candidate,
                candidate,
                stream,
                disc,
                mode,
                hookset,
                &mut output,
            )?;
            if !stepped {
                break;
            }
        } else {
            step_character(position, narrow, printable_count, skip_code, in_candidate, candidate, stream, code, hookset, &mut output)?;
        }
    }

    Ok(output.written())
}

#[allow(clippy::too_many_arguments)]
fn step_escape(
    position: &mut u64,
    narrow: &mut bool,
    printable_count: &mut u32,
    end_of_article: &mut bool,
    skip_code: &mut Option<u8>,
    auto_stop_code: &mut Option<u32>,
    in_candidate: &mut bool,
    candidate: &mut Vec<u8>,
    stream: &mut ZioStream,
    disc: DiscKind,
    mode: ContentMode,
    hookset: &mut Hookset,
    output: &mut Output,
) -> Result<bool> {
    let mut opbuf = [0u8; 1];
    if read_at(stream, *position + 1, &mut opbuf)? == 0 {
        return Ok(false);
    }
    let op = opbuf[0];

    let mut peekbuf = [0u8; 1];
    let peek = if read_at(stream, *position + 2, &mut peekbuf)? == 1 {
        Some(peekbuf[0])
    } else {
        None
    };

    let info = escape::lookup(op, disc, peek);
    let mut escbuf = vec![0u8; info.step];
    let n = read_at(stream, *position, &mut escbuf)?;
    if n < info.step {
        return Err(Error::UnexpectedFormat("truncated escape sequence".into()));
    }

    let skipping = skip_code.is_some();

    // Article/heading terminators take priority over everything else.
    if op == 0x03 {
        *end_of_article = true;
        *position += info.step as u64;
        return Ok(true);
    }
    if op == 0x0a && mode == ContentMode::Heading {
        *end_of_article = true;
        *position += info.step as u64;
        return Ok(true);
    }

    // Closing a skip-region takes priority over dispatch, but the escape's
    // own step must still be consumed normally either way.
    if let Some(end) = *skip_code {
        if op == end {
            *skip_code = None;
        }
    }

    if !skipping {
        match op {
            0x04 => *narrow = true,
            0x05 => *narrow = false,
            _ if info.skip_end.is_some() => *skip_code = skip_code.or(info.skip_end),
            0x09 | 0x41 => {
                let arg = be16(&escbuf[2..4]) as u32;
                if *printable_count > 0 && mode == ContentMode::Text && hookset.has_hook(HookCode::StopCode) {
                    let argv = [0x1f00 | op as u32, arg];
                    let mut probe_result = Ok(());
                    if let Err(e) = hookset.dispatch(HookCode::StopCode, output, &argv) {
                        if matches!(e, Error::StopCodeEncountered) {
                            *end_of_article = true;
                            *position += info.step as u64;
                            return Ok(true);
                        }
                        probe_result = Err(e);
                    }
                    probe_result?;
                }
                if op == 0x41 && auto_stop_code.is_none() {
                    *auto_stop_code = Some(arg);
                }
                let hook_code = if op == 0x09 { HookCode::SetIndent } else { HookCode::BeginKeyword };
                dispatch_or_passthrough(hookset, hook_code, output, &[arg], &escbuf)?;
            }
            0x43 => {
                candidate.clear();
                *in_candidate = true;
                dispatch_or_passthrough(hookset, HookCode::BeginCandidate, output, &[], &escbuf)?;
            }
            0x63 => {
                let a1 = bcd::bcd4(&escbuf[2..6]);
                let a2 = bcd::bcd2(&escbuf[6..8]);
                *in_candidate = false;
                let hook_code = if a1 == 0 && a2 == 0 { HookCode::EndCandidateLeaf } else { HookCode::EndCandidateGroup };
                dispatch_or_passthrough(hookset, hook_code, output, &[a1, a2], &escbuf)?;
            }
            0x64 => {
                // Unrelated to candidates despite sharing the 0x63 argument
                // layout: a second, conditional end-of-monochrome-graphic.
                let a1 = bcd::bcd4(&escbuf[2..6]);
                let a2 = bcd::bcd2(&escbuf[6..8]);
                if a1 > 0 && a2 > 0 {
                    dispatch_or_passthrough(hookset, HookCode::EndMonoGraphic, output, &[a1, a2], &escbuf)?;
                }
            }
            0x44 => {
                let a1 = be16(&escbuf[2..4]) as u32;
                let a2 = bcd::bcd4(&escbuf[4..8]);
                let a3 = bcd::bcd4(&escbuf[8..12]);
                if a2 > 0 && a3 > 0 {
                    dispatch_or_passthrough(hookset, HookCode::BeginMonoGraphic, output, &[a1, a2, a3], &escbuf)?;
                }
            }
            0x4d => {
                let a1 = be16(&escbuf[2..4]) as u32;
                let a2 = bcd::bcd4(&escbuf[14..18]);
                let a3 = bcd::bcd2(&escbuf[18..20]);
                let hook_code = if a1 >> 8 == 0 { HookCode::BeginColorBmp } else { HookCode::BeginColorJpeg };
                dispatch_or_passthrough(hookset, hook_code, output, &[a1, a2, a3], &escbuf)?;
            }
            0x52 | 0x62 => {
                let a1 = bcd::bcd4(&escbuf[2..6]);
                let a2 = bcd::bcd2(&escbuf[6..8]);
                let hook_code = if op == 0x52 { HookCode::EndMonoGraphic } else { HookCode::EndReference };
                dispatch_or_passthrough(hookset, hook_code, output, &[a1, a2], &escbuf)?;
            }
            0x39 => {
                let argv = [be32(&escbuf[2..6]), be32(&escbuf[22..26]), be32(&escbuf[26..30]), be32(&escbuf[30..34]), be32(&escbuf[34..38])];
                dispatch_or_passthrough(hookset, HookCode::BeginMpeg, output, &argv, &escbuf)?;
            }
            0x4a => {
                let argv = [be32(&escbuf[2..6]), bcd::bcd4(&escbuf[6..10]), bcd::bcd2(&escbuf[10..12]), bcd::bcd4(&escbuf[12..16]), bcd::bcd2(&escbuf[16..18])];
                dispatch_or_passthrough(hookset, HookCode::BeginWave, output, &argv, &escbuf)?;
            }
            0x32 => {
                dispatch_or_passthrough(hookset, HookCode::BeginMonoGraphic, output, &[0, 0, 0], &escbuf)?;
            }
            _ => {
                if let Some(hook_code) = info.hook {
                    dispatch_or_passthrough(hookset, hook_code, output, &[], &escbuf)?;
                }
            }
        }
    }

    *position += info.step as u64;
    Ok(true)
}

fn dispatch_or_passthrough(
    hookset: &mut Hookset,
    code: HookCode,
    output: &mut Output,
    argv: &[u32],
    raw_source: &[u8],
) -> Result<()> {
    if !hookset.dispatch(code, output, argv)? {
        output.write_bytes(raw_source);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn step_character(
    position: &mut u64,
    narrow: &mut bool,
    printable_count: &mut u32,
    skip_code: &mut Option<u8>,
    in_candidate: &mut bool,
    candidate: &mut Vec<u8>,
    stream: &mut ZioStream,
    code: CharCode,
    hookset: &mut Hookset,
    output: &mut Output,
) -> Result<()> {
    let skipping = skip_code.is_some();

    let (hook_code, emit, consumed): (HookCode, Vec<u8>, usize) = match code {
        CharCode::Iso8859_1 => {
            let mut b = [0u8; 1];
            read_at(stream, *position, &mut b)?;
            let c = b[0];
            if (0x20..=0x7e).contains(&c) || (0xa0..=0xff).contains(&c) {
                (HookCode::Iso8859_1, vec![c], 1)
            } else {
                let mut b2 = [0u8; 1];
                read_at(stream, *position + 1, &mut b2)?;
                (HookCode::NarrowFont, vec![c, b2[0]], 2)
            }
        }
        CharCode::Jis => {
            let mut b = [0u8; 2];
            read_at(stream, *position, &mut b)?;
            let (c1, c2) = (b[0], b[1]);
            if (0x21..=0x7e).contains(&c1) && (0x21..=0x7e).contains(&c2) {
                let value = (((c1 as u16) << 8) | c2 as u16) | 0x8080;
                let hook = if *narrow { HookCode::NarrowJisX0208 } else { HookCode::WideJisX0208 };
                (hook, value.to_be_bytes().to_vec(), 2)
            } else if (0x21..=0x7e).contains(&c1) && (0xa1..=0xfe).contains(&c2) {
                let value = (((c1 as u16) << 8) | c2 as u16) | 0x0080;
                (HookCode::Gb2312, value.to_be_bytes().to_vec(), 2)
            } else {
                let hook = if *narrow { HookCode::NarrowFont } else { HookCode::WideFont };
                (hook, vec![c1, c2], 2)
            }
        }
    };

    if !skipping {
        *printable_count += 1;
        if *in_candidate && candidate.len() < 255 {
            for &b in &emit {
                if candidate.len() >= 255 {
                    break;
                }
                candidate.push(b | 0x80);
            }
        }
        if !hookset.dispatch(hook_code, output, &[be16_from(&emit) as u32])? {
            output.write_bytes(&emit);
        }
    }

    *position += consumed as u64;
    Ok(())
}

fn be16_from(bytes: &[u8]) -> u16 {
    if bytes.len() >= 2 {
        u16::from_be_bytes([bytes[0], bytes[1]])
    } else {
        bytes.first().copied().unwrap_or(0) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zio::OpenMode;

    fn make_stream(bytes: &[u8]) -> ZioStream {
        ZioStream::open_memory(bytes.to_vec(), OpenMode::Plain).unwrap()
    }

    #[test]
    fn heading_ends_at_newline_escape() {
        // 1F 02 00 01 41 42 43 1F 0A 00 00 1F 03 00 00
        let bytes = [
            0x1f, 0x02, 0x00, 0x01, b'A', b'B', b'C', 0x1f, 0x0a, 0x00, 0x00, 0x1f, 0x03, 0x00, 0x00,
        ];
        let mut stream = make_stream(&bytes);
        let mut ctx = TextContext::new();
        ctx.seek_text(0);
        let mut hookset = Hookset::new();
        let mut out = [0u8; 64];
        let n = ctx
            .read_heading(&mut stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset, &mut out)
            .unwrap();
        assert_eq!(&out[..n], b"ABC");
        assert!(ctx.is_stopped());
    }

    #[test]
    fn stop_code_idempotence_after_end_of_article() {
        let bytes = [b'a', 0x1f, 0x03, 0x00, 0x00];
        let mut stream = make_stream(&bytes);
        let mut ctx = TextContext::new();
        ctx.seek_text(0);
        let mut hookset = Hookset::new();
        let mut out = [0u8; 64];
        let n1 = ctx
            .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset, None, None, &mut out)
            .unwrap();
        assert_eq!(&out[..n1], b"a");
        assert!(ctx.is_stopped());
        let n2 = ctx
            .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset, None, None, &mut out)
            .unwrap();
        assert_eq!(n2, 0);
    }

    #[test]
    fn resumable_reads_match_single_call() {
        let bytes = [b'h', b'e', b'l', b'l', b'o', 0x1f, 0x03, 0x00, 0x00];

        let mut full_stream = make_stream(&bytes);
        let mut full_ctx = TextContext::new();
        full_ctx.seek_text(0);
        let mut hookset = Hookset::new();
        let mut full_out = [0u8; 16];
        let n = full_ctx
            .read_text(&mut full_stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset, None, None, &mut full_out)
            .unwrap();
        let full_result = full_out[..n].to_vec();

        let mut piecewise_stream = make_stream(&bytes);
        let mut piecewise_ctx = TextContext::new();
        piecewise_ctx.seek_text(0);
        let mut hookset2 = Hookset::new();
        let mut result = Vec::new();
        for _ in 0..10 {
            let mut one = [0u8; 1];
            let n = piecewise_ctx
                .read_text(&mut piecewise_stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset2, None, None, &mut one)
                .unwrap();
            result.extend_from_slice(&one[..n]);
            if piecewise_ctx.is_stopped() {
                break;
            }
        }

        assert_eq!(result, full_result);
    }

    #[test]
    fn begin_end_keyword_hooks_fire_with_stop_code_probe() {
        let bytes = [0x1f, 0x41, 0x00, 0x05, b'X', b'Y', b'Z', 0x1f, 0x61, 0x00, 0x00];
        let mut stream = make_stream(&bytes);
        let mut ctx = TextContext::new();
        ctx.seek_text(0);
        ctx.printable_count = 1; // simulate "already printed something" precondition

        let mut hookset = Hookset::new();
        let stop_calls = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let stop_calls_clone = stop_calls.clone();
        hookset.set_hook(HookCode::StopCode, move |_out, argv| {
            stop_calls_clone.lock().unwrap().push(argv.to_vec());
            Ok(())
        });
        hookset.set_hook(HookCode::BeginKeyword, |out, _argv| {
            out.write_byte1(b'[');
            Ok(())
        });
        hookset.set_hook(HookCode::EndKeyword, |out, _argv| {
            out.write_byte1(b']');
            Ok(())
        });

        let mut out = [0u8; 16];
        let n = ctx
            .read_text(&mut stream, CharCode::Iso8859_1, DiscKind::Epwing, &mut hookset, None, None, &mut out)
            .unwrap();
        assert_eq!(&out[..n], b"[XYZ]");
        assert_eq!(*stop_calls.lock().unwrap(), vec![vec![0x1f41, 0x0005]]);
    }
}
