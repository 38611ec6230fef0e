//! Static Huffman tree construction and bit-serial decoding for the EPWING
//! compression codecs.
//!
//! The tree is built once at `zio::open` time from a frequency table (see
//! [`build`]) and then reused for every page decoded through that stream.

use crate::error::{Error, Result};
use crate::position::PAGE_SIZE;

/// The value carried by a leaf node, with its natural byte width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf {
    Byte(u8),
    Word(u16),
    DWord(u32),
    /// Synthetic end-of-page marker. Always present, frequency 1.
    Eof,
}

impl Leaf {
    /// Big-endian bytes this leaf emits on decode, and how many of them.
    fn emit(&self) -> ([u8; 4], usize) {
        match *self {
            Leaf::Byte(v) => ([v, 0, 0, 0], 1),
            Leaf::Word(v) => {
                let b = v.to_be_bytes();
                ([b[0], b[1], 0, 0], 2)
            }
            Leaf::DWord(v) => (v.to_be_bytes(), 4),
            Leaf::Eof => ([0; 4], 0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Intermediate { left: u32, right: u32 },
    Leaf(Leaf),
}

#[derive(Debug, Clone, Copy)]
struct Node {
    kind: NodeKind,
    freq: u32,
}

/// An owned static Huffman tree: an array of nodes plus a cached root index.
#[derive(Debug)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    root: u32,
}

/// Build a canonical static tree from leaves in the order they were read off
/// disk (the frequency-table order, not yet sorted).
///
/// Algorithm (matches the original EPWING decoder):
/// 1. Sort leaves by descending frequency.
/// 2. Repeatedly form an intermediate node from the two currently-least-
///    frequent remaining nodes (a leaf or a previously formed intermediate),
///    zeroing their frequency so they drop out of consideration, and pushing
///    the new intermediate with `freq = left.freq + right.freq`.
/// 3. The last intermediate formed is the root.
///
/// Leaves with frequency zero participate in the initial sort but are never
/// chosen as a "least" candidate in step 2 — this collapses unused codes.
pub fn build(leaves: Vec<(Leaf, u32)>) -> Result<HuffmanTree> {
    let leaf_count = leaves.len();
    if leaf_count < 2 {
        return Err(Error::UnexpectedFormat(
            "huffman table needs at least two leaves".into(),
        ));
    }

    let mut sorted = leaves;
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    let mut nodes: Vec<Node> = sorted
        .into_iter()
        .map(|(leaf, freq)| Node {
            kind: NodeKind::Leaf(leaf),
            freq,
        })
        .collect();

    let mut root = 0u32;
    for _ in 1..leaf_count {
        let left = pick_least(&nodes).ok_or_else(|| {
            Error::UnexpectedFormat("huffman tree construction ran out of candidates".into())
        })?;
        let left_freq = nodes[left as usize].freq;
        nodes[left as usize].freq = 0;

        let right = pick_least(&nodes).ok_or_else(|| {
            Error::UnexpectedFormat("huffman tree construction ran out of candidates".into())
        })?;
        let right_freq = nodes[right as usize].freq;
        nodes[right as usize].freq = 0;

        nodes.push(Node {
            kind: NodeKind::Intermediate { left, right },
            freq: left_freq + right_freq,
        });
        root = (nodes.len() - 1) as u32;
    }

    Ok(HuffmanTree { nodes, root })
}

/// Scan all nodes whose frequency is still nonzero and return the one with
/// the smallest frequency (ties broken by first-seen, matching the source's
/// linear scan with a `<=` comparison).
fn pick_least(nodes: &[Node]) -> Option<u32> {
    let mut best: Option<(u32, u32)> = None;
    for (i, n) in nodes.iter().enumerate() {
        if n.freq == 0 {
            continue;
        }
        match best {
            None => best = Some((i as u32, n.freq)),
            Some((_, bf)) if n.freq <= bf => best = Some((i as u32, n.freq)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

/// Reads bits MSB-first out of a byte buffer, refilling from `refill` (a
/// source of more compressed bytes) when exhausted. Owns its buffer so the
/// refill closure can hand back freshly read, owned chunks with no lifetime
/// games.
struct BitReader<F: FnMut() -> Result<Vec<u8>>> {
    buf: Vec<u8>,
    byte_pos: usize,
    bit_index: i8, // 7 downto 0
    refill: F,
}

impl<F: FnMut() -> Result<Vec<u8>>> BitReader<F> {
    fn new(initial: Vec<u8>, refill: F) -> Self {
        Self {
            buf: initial,
            byte_pos: 0,
            bit_index: 7,
            refill,
        }
    }

    fn next_bit(&mut self) -> Result<u8> {
        if self.byte_pos >= self.buf.len() {
            self.buf = (self.refill)()?;
            self.byte_pos = 0;
            if self.buf.is_empty() {
                return Err(Error::UnexpectedFormat(
                    "huffman stream ran out of bits before EOF leaf".into(),
                ));
            }
        }
        let bit = (self.buf[self.byte_pos] >> self.bit_index) & 0x01;
        if self.bit_index > 0 {
            self.bit_index -= 1;
        } else {
            self.bit_index = 7;
            self.byte_pos += 1;
        }
        Ok(bit)
    }
}

/// Decode one 2048-byte page from `input`, refilling with `refill` when more
/// compressed bytes are needed. A `1` bit steps left, `0` steps right,
/// reaching the EOF leaf zero-fills the remainder of the page. A leaf16/
/// leaf32 whose emission would straddle the page boundary is truncated to
/// however many bytes still fit; this is normal, not an error.
pub fn decode_page(
    tree: &HuffmanTree,
    input: Vec<u8>,
    refill: impl FnMut() -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(PAGE_SIZE as usize);
    let mut reader = BitReader::new(input, refill);

    'decode: loop {
        let mut idx = tree.root;
        loop {
            match tree.nodes[idx as usize].kind {
                NodeKind::Intermediate { left, right } => {
                    let bit = reader.next_bit()?;
                    idx = if bit == 1 { left } else { right };
                }
                NodeKind::Leaf(Leaf::Eof) => {
                    out.resize(PAGE_SIZE as usize, 0);
                    break 'decode;
                }
                NodeKind::Leaf(leaf) => {
                    let (bytes, len) = leaf.emit();
                    for &b in &bytes[..len] {
                        if out.len() >= PAGE_SIZE as usize {
                            break;
                        }
                        out.push(b);
                    }
                    break;
                }
            }
        }
        if out.len() >= PAGE_SIZE as usize {
            break;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a tiny tree over 4 symbols with distinct frequencies and check
    /// that decoding recovers a known sequence encoded by hand.
    #[test]
    fn build_and_decode_roundtrip() {
        // four byte leaves + EOF; frequencies chosen so the shape is
        // deterministic: a(8) b(4) c(2) d(1) eof(1)
        let leaves = vec![
            (Leaf::Byte(b'a'), 8),
            (Leaf::Byte(b'b'), 4),
            (Leaf::Byte(b'c'), 2),
            (Leaf::Byte(b'd'), 1),
            (Leaf::Eof, 1),
        ];
        let tree = build(leaves).unwrap();

        // Walk the tree to discover the actual code assigned to 'a', then
        // verify decode_page reproduces the symbol from that bit pattern
        // followed by the EOF code.
        let code_a = code_for(&tree, Leaf::Byte(b'a'));
        let code_eof = code_for(&tree, Leaf::Eof);

        let mut bits = code_a.clone();
        bits.extend(code_eof.clone());
        let bytes = pack_bits(&bits);

        let decoded = decode_page(&tree, bytes, || Ok(Vec::new())).unwrap();
        assert_eq!(decoded[0], b'a');
        assert!(decoded[1..].iter().all(|&b| b == 0));
        assert_eq!(decoded.len(), PAGE_SIZE as usize);
    }

    /// A leaf16 whose two-byte emission straddles the 2048-byte page
    /// boundary is truncated to the one byte that still fits, not an error.
    #[test]
    fn straddling_multi_byte_leaf_truncates_at_page_boundary() {
        let leaves = vec![(Leaf::Byte(b'a'), 100), (Leaf::Word(0xabcd), 1), (Leaf::Eof, 1)];
        let tree = build(leaves).unwrap();

        let code_a = code_for(&tree, Leaf::Byte(b'a'));
        let code_word = code_for(&tree, Leaf::Word(0xabcd));

        let mut bits = Vec::new();
        for _ in 0..(PAGE_SIZE as usize - 1) {
            bits.extend(code_a.clone());
        }
        bits.extend(code_word);
        let bytes = pack_bits(&bits);

        let decoded = decode_page(&tree, bytes, || Ok(Vec::new())).unwrap();
        assert_eq!(decoded.len(), PAGE_SIZE as usize);
        assert!(decoded[..PAGE_SIZE as usize - 1].iter().all(|&b| b == b'a'));
        assert_eq!(decoded[PAGE_SIZE as usize - 1], 0xab);
    }

    fn code_for(tree: &HuffmanTree, target: Leaf) -> Vec<u8> {
        fn walk(tree: &HuffmanTree, idx: u32, target: Leaf, path: &mut Vec<u8>) -> bool {
            match tree.nodes[idx as usize].kind {
                NodeKind::Leaf(l) => l == target,
                NodeKind::Intermediate { left, right } => {
                    path.push(1);
                    if walk(tree, left, target, path) {
                        return true;
                    }
                    path.pop();
                    path.push(0);
                    if walk(tree, right, target, path) {
                        return true;
                    }
                    path.pop();
                    false
                }
            }
        }
        let mut path = Vec::new();
        assert!(walk(tree, tree.root, target, &mut path), "symbol not found in tree");
        path
    }

    fn pack_bits(bits: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; bits.len().div_ceil(8).max(1)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit == 1 {
                out[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        out
    }

    #[test]
    fn fewer_than_two_leaves_is_an_error() {
        assert!(build(vec![(Leaf::Eof, 1)]).is_err());
    }
}
