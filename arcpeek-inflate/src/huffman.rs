//! Canonical Huffman decoding for DEFLATE.
//!
//! DEFLATE transmits Huffman codes as a bit length per symbol. The codes are
//! canonical (RFC 1951 Section 3.2.2): shorter codes come first, and codes of
//! the same length are assigned consecutive values in increasing symbol
//! order. From that length table this module builds an explicit binary
//! decode tree and decodes one symbol at a time by walking it bit by bit.
//!
//! The tree lives in an arena: nodes are stored in a `Vec` and refer to their
//! children by index. Node 0 is always the root.
//!
//! # Alphabets
//!
//! DEFLATE uses three Huffman alphabets:
//! - **Literal/Length**: 0-287 (0-255 literals, 256 EOB, 257-285 lengths)
//! - **Distance**: 0-31 (0-29 used)
//! - **Code Length**: 0-18 (for encoding dynamic Huffman trees)

use arcpeek_core::BitReader;
use arcpeek_core::error::{ArcPeekError, Result};

/// Maximum code length in DEFLATE (15 bits).
pub const MAX_CODE_LENGTH: usize = 15;

/// Size of the literal/length alphabet, including the two reserved symbols.
pub const LITLEN_ALPHABET_SIZE: usize = 288;

/// Size of the distance alphabet, including the two reserved symbols.
pub const DISTANCE_ALPHABET_SIZE: usize = 32;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Index of a node inside a [`HuffmanTree`] arena.
pub type NodeId = u32;

/// A node of the decode tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanNode {
    /// Interior node; a missing child is an unassigned code prefix.
    Internal {
        /// Child reached by a 0 bit.
        zero: Option<NodeId>,
        /// Child reached by a 1 bit.
        one: Option<NodeId>,
    },
    /// Leaf carrying a decoded symbol.
    Leaf(u16),
}

impl HuffmanNode {
    const EMPTY: Self = Self::Internal {
        zero: None,
        one: None,
    };
}

/// One assigned code, as produced by [`HuffmanTree::codes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanCode {
    /// Symbol the code decodes to.
    pub symbol: u16,
    /// Code bits, most significant bit first (the order they are read).
    pub code: u16,
    /// Number of bits in the code.
    pub length: u8,
}

/// A Huffman decode tree built from canonical code lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    /// Node arena; index 0 is the root.
    nodes: Vec<HuffmanNode>,
    /// Number of symbols with a non-zero code length.
    symbol_count: usize,
    /// Longest code length in use.
    max_code_length: u8,
}

impl HuffmanTree {
    /// Build a decode tree from code lengths.
    ///
    /// `code_lengths[i]` is the bit length of symbol `i`; zero means the
    /// symbol is unused. An all-zero table yields an empty tree that fails on
    /// every decode. Incomplete codes are accepted, over-subscribed ones are
    /// rejected.
    pub fn from_code_lengths(code_lengths: &[u8]) -> Result<Self> {
        let mut bl_count = [0u32; MAX_CODE_LENGTH + 1];
        let mut max_length = 0u8;

        for &len in code_lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(ArcPeekError::malformed_huffman(
                    0,
                    format!("code length {} exceeds maximum {}", len, MAX_CODE_LENGTH),
                ));
            }
            if len > 0 {
                bl_count[len as usize] += 1;
                max_length = max_length.max(len);
            }
        }

        // First code of each length (RFC 1951 algorithm)
        let mut next_code = [0u32; MAX_CODE_LENGTH + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_CODE_LENGTH {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let mut tree = Self {
            nodes: vec![HuffmanNode::EMPTY],
            symbol_count: 0,
            max_code_length: max_length,
        };

        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = next_code[len as usize];
            next_code[len as usize] += 1;

            if code >= 1 << len {
                return Err(ArcPeekError::malformed_huffman(
                    0,
                    format!("over-subscribed code lengths at {}-bit codes", len),
                ));
            }
            tree.insert(code as u16, len, symbol as u16)?;
        }

        Ok(tree)
    }

    /// Place `symbol` at the leaf addressed by `code` (MSB-first, `len` bits).
    fn insert(&mut self, code: u16, len: u8, symbol: u16) -> Result<()> {
        let mut node: NodeId = 0;

        for i in (0..len).rev() {
            let bit = ((code >> i) & 1) as u8;
            let last = i == 0;

            match self.child(node, bit)? {
                Some(child) if !last => node = child,
                Some(_) => {
                    return Err(ArcPeekError::malformed_huffman(
                        0,
                        format!("code for symbol {} collides with an existing code", symbol),
                    ));
                }
                None => {
                    let id = self.nodes.len() as NodeId;
                    self.nodes.push(if last {
                        HuffmanNode::Leaf(symbol)
                    } else {
                        HuffmanNode::EMPTY
                    });
                    self.set_child(node, bit, id);
                    node = id;
                }
            }
        }

        self.symbol_count += 1;
        Ok(())
    }

    /// Child of an internal node; passing through a leaf means a prefix clash.
    fn child(&self, node: NodeId, bit: u8) -> Result<Option<NodeId>> {
        match self.nodes[node as usize] {
            HuffmanNode::Internal { zero, one } => Ok(if bit == 0 { zero } else { one }),
            HuffmanNode::Leaf(symbol) => Err(ArcPeekError::malformed_huffman(
                0,
                format!("code prefix passes through leaf {}", symbol),
            )),
        }
    }

    fn set_child(&mut self, node: NodeId, bit: u8, id: NodeId) {
        if let HuffmanNode::Internal { zero, one } = &mut self.nodes[node as usize] {
            if bit == 0 {
                *zero = Some(id);
            } else {
                *one = Some(id);
            }
        }
    }

    /// Decode one symbol by walking the tree from the root.
    ///
    /// Following a missing child fails with `MalformedHuffmanCode`; a tree
    /// built from a complete code never does.
    #[inline]
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<u16> {
        let mut node: NodeId = 0;

        loop {
            let bit = reader.next_bit()?;
            let next = match self.nodes[node as usize] {
                HuffmanNode::Internal { zero, one } => {
                    if bit == 0 {
                        zero
                    } else {
                        one
                    }
                }
                HuffmanNode::Leaf(symbol) => return Ok(symbol),
            };

            match next {
                Some(id) => {
                    if let HuffmanNode::Leaf(symbol) = self.nodes[id as usize] {
                        return Ok(symbol);
                    }
                    node = id;
                }
                None => {
                    return Err(ArcPeekError::malformed_huffman(
                        reader.bit_position(),
                        "bit sequence does not match any code",
                    ));
                }
            }
        }
    }

    /// All assigned codes in increasing code order (depth-first, 0 before 1).
    pub fn codes(&self) -> Vec<HuffmanCode> {
        let mut codes = Vec::with_capacity(self.symbol_count);
        let mut stack = vec![(0 as NodeId, 0u16, 0u8)];

        while let Some((id, code, length)) = stack.pop() {
            match self.nodes[id as usize] {
                HuffmanNode::Leaf(symbol) => codes.push(HuffmanCode {
                    symbol,
                    code,
                    length,
                }),
                HuffmanNode::Internal { zero, one } => {
                    if let Some(one) = one {
                        stack.push((one, (code << 1) | 1, length + 1));
                    }
                    if let Some(zero) = zero {
                        stack.push((zero, code << 1, length + 1));
                    }
                }
            }
        }

        codes
    }

    /// The node arena (index 0 is the root).
    pub fn nodes(&self) -> &[HuffmanNode] {
        &self.nodes
    }

    /// Number of symbols with an assigned code.
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Longest code length in use (0 for an empty tree).
    pub fn max_code_length(&self) -> u8 {
        self.max_code_length
    }

    /// True when no symbol has a code.
    pub fn is_empty(&self) -> bool {
        self.symbol_count == 0
    }
}
