//! The `0x1f xx …` escape opcode table: step/argc geometry and classification
//! of skip-region-opening opcodes.

/// What an escape opcode does to stream position and hook dispatch.
#[derive(Debug, Clone, Copy)]
pub struct EscapeInfo {
    /// Total bytes consumed, including the `0x1f` and opcode byte.
    pub step: usize,
    /// Number of big-endian arguments following the opcode byte.
    pub argc: usize,
    /// Hook code to dispatch, if any.
    pub hook: Option<HookCode>,
    /// Whether this opcode opens a skip-region, and if so its end byte.
    pub skip_end: Option<u8>,
}

/// Hook codes, matching the well-known reference opcode numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HookCode {
    BeginNarrow = 1,
    EndNarrow = 2,
    BeginSubscript = 3,
    EndSubscript = 4,
    SetIndent = 5,
    Newline = 6,
    BeginSuperscript = 7,
    EndSuperscript = 8,
    BeginNoNewline = 9,
    EndNoNewline = 10,
    BeginEmphasis = 11,
    EndEmphasis = 12,
    BeginCandidate = 13,
    EndCandidateGroup = 14,
    EndCandidateLeaf = 15,
    BeginReference = 16,
    EndReference = 17,
    BeginKeyword = 18,
    EndKeyword = 19,
    NarrowFont = 20,
    WideFont = 21,
    Iso8859_1 = 22,
    NarrowJisX0208 = 23,
    WideJisX0208 = 24,
    Gb2312 = 25,
    BeginMonoGraphic = 26,
    EndMonoGraphic = 27,
    BeginGrayGraphic = 28,
    EndGrayGraphic = 29,
    BeginColorBmp = 30,
    BeginColorJpeg = 31,
    EndColorGraphic = 32,
    EndInColorGraphic = 33,
    BeginWave = 34,
    EndWave = 35,
    BeginMpeg = 36,
    EndMpeg = 37,
    BeginGraphicReference = 38,
    EndGraphicReference = 39,
    GraphicReference = 40,
    BeginDecoration = 41,
    EndDecoration = 42,
    /// Internal hook-to-core signal probed before `SET_INDENT`/`BEGIN_KEYWORD`.
    StopCode = 100,
}

/// Whether the disc is an EB-family disc (affects the decoration opcode's
/// step) or an EPWING-family one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscKind {
    Eb,
    Epwing,
}

/// Look up the geometry of the escape opcode `op` (the byte following
/// `0x1f`). `next_byte` is the byte that would follow the opcode (needed to
/// resolve a couple of variable-step opcodes); it may be absent at the very
/// end of a buffer, in which case the non-extended step is assumed.
pub fn lookup(op: u8, disc: DiscKind, next_byte: Option<u8>) -> EscapeInfo {
    use HookCode::*;

    match op {
        0x02 => EscapeInfo { step: 2, argc: 1, hook: None, skip_end: None },
        0x03 => EscapeInfo { step: 2, argc: 1, hook: None, skip_end: None },
        0x04 => EscapeInfo { step: 2, argc: 1, hook: Some(BeginNarrow), skip_end: None },
        0x05 => EscapeInfo { step: 2, argc: 1, hook: Some(EndNarrow), skip_end: None },
        0x06 => EscapeInfo { step: 2, argc: 1, hook: Some(BeginSubscript), skip_end: None },
        0x07 => EscapeInfo { step: 2, argc: 1, hook: Some(EndSubscript), skip_end: None },
        0x09 => EscapeInfo { step: 4, argc: 2, hook: Some(SetIndent), skip_end: None },
        0x0A => EscapeInfo { step: 2, argc: 1, hook: Some(Newline), skip_end: None },
        0x0E => EscapeInfo { step: 2, argc: 1, hook: Some(BeginSuperscript), skip_end: None },
        0x0F => EscapeInfo { step: 2, argc: 1, hook: Some(EndSuperscript), skip_end: None },
        0x10 => EscapeInfo { step: 2, argc: 1, hook: Some(BeginNoNewline), skip_end: None },
        0x11 => EscapeInfo { step: 2, argc: 1, hook: Some(EndNoNewline), skip_end: None },
        0x12 => EscapeInfo { step: 2, argc: 1, hook: Some(BeginEmphasis), skip_end: None },
        0x13 => EscapeInfo { step: 2, argc: 1, hook: Some(EndEmphasis), skip_end: None },
        0x14 => EscapeInfo { step: 4, argc: 1, hook: None, skip_end: Some(0x15) },
        0x1A | 0x1B | 0x1C | 0x1D | 0x1E | 0x1F | 0xE0 => {
            // Some old EB (not EPWING) books omit the argument byte entirely.
            let no_argument = disc == DiscKind::Eb && matches!(next_byte, Some(b) if b >= 0x1F);
            EscapeInfo {
                step: if no_argument { 2 } else { 4 },
                argc: 1,
                hook: Some(BeginDecoration),
                skip_end: None,
            }
        }
        0x32 => EscapeInfo { step: 2, argc: 4, hook: Some(BeginMonoGraphic), skip_end: None },
        0x39 => EscapeInfo { step: 46, argc: 6, hook: Some(BeginMpeg), skip_end: None },
        0x41 => EscapeInfo { step: 4, argc: 2, hook: Some(BeginKeyword), skip_end: None },
        0x42 => {
            let second_is_zero = matches!(next_byte, Some(0x00) | None);
            EscapeInfo {
                step: if second_is_zero { 4 } else { 2 },
                argc: 1,
                hook: Some(BeginReference),
                skip_end: None,
            }
        }
        0x43 => EscapeInfo { step: 2, argc: 1, hook: Some(BeginCandidate), skip_end: None },
        0x44 => EscapeInfo { step: 12, argc: 4, hook: Some(BeginMonoGraphic), skip_end: None },
        0x45 => {
            let has_bcd_argument = !matches!(next_byte, Some(0x1f));
            EscapeInfo {
                step: 4,
                argc: if has_bcd_argument { 2 } else { 1 },
                hook: None,
                skip_end: None,
            }
        }
        0x4A => EscapeInfo { step: 18, argc: 6, hook: Some(BeginWave), skip_end: None },
        0x4D => EscapeInfo { step: 20, argc: 4, hook: Some(BeginColorBmp), skip_end: None },
        0x52 => EscapeInfo { step: 8, argc: 3, hook: Some(EndMonoGraphic), skip_end: None },
        0x59 => EscapeInfo { step: 2, argc: 1, hook: Some(EndMpeg), skip_end: None },
        0x61 => EscapeInfo { step: 2, argc: 1, hook: Some(EndKeyword), skip_end: None },
        0x62 => EscapeInfo { step: 8, argc: 3, hook: Some(EndReference), skip_end: None },
        // Decoded argument values, not just the opcode, pick the hook code and
        // (for 0x64) whether a hook fires at all; see step_escape.
        0x63 => EscapeInfo { step: 8, argc: 3, hook: Some(EndCandidateLeaf), skip_end: None },
        0x64 => EscapeInfo { step: 8, argc: 3, hook: Some(EndMonoGraphic), skip_end: None },
        0x6A => EscapeInfo { step: 2, argc: 1, hook: Some(EndWave), skip_end: None },
        0x6D => EscapeInfo { step: 2, argc: 1, hook: Some(EndColorGraphic), skip_end: None },
        0xE1 => EscapeInfo { step: 2, argc: 1, hook: None, skip_end: None },
        0x35..=0x3F | 0x49 | 0x4B | 0x4C | 0x4E | 0x4F | 0x70..=0x8F => EscapeInfo {
            step: 2,
            argc: 1,
            hook: None,
            skip_end: Some(op.wrapping_add(0x20)),
        },
        0xE4..=0xFE if op % 2 == 0 => {
            EscapeInfo { step: 2, argc: 1, hook: None, skip_end: Some(0x01) }
        }
        _ => EscapeInfo { step: 2, argc: 1, hook: None, skip_end: None },
    }
}
