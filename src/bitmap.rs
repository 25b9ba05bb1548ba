//! Sparse block bitmap and file-size sizer.
//!
//! Ported from gPXE's `struct bitmap` / `bitmap_resize` / `bitmap_set` /
//! `bitmap_first_gap` / `bitmap_full` (`tftp.c`). Bits are indexed from 0
//! and correspond to block numbers `index + 1` (spec §4.3: "block 0 does
//! not exist; bit i corresponds to block i+1").

const WORD_BITS: usize = u64::BITS as usize;

/// A growable, monotonic bitset: once a bit is set it is never cleared
/// (spec §3 invariant), except by [`BlockBitmap::discard`] which resets
/// the whole map (used only on MTFTP fallback, where `blksize` may
/// change).
#[derive(Debug, Clone, Default)]
pub struct BlockBitmap {
	words: Vec<u64>,
	/// Number of blocks the map currently tracks (may exceed `words.len()
	/// * 64` only by less than one word).
	len: usize,
}

impl BlockBitmap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of blocks currently tracked.
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// True if no bit has ever been set. Used by the debug-time tripwire
	/// around MTFTP fallback (spec §9 Open Question).
	pub fn none_set(&self) -> bool {
		self.words.iter().all(|w| *w == 0)
	}

	/// Grow the map to at least `blocks` bits. Bits already set remain
	/// set; never shrinks.
	pub fn resize(&mut self, blocks: usize) {
		if blocks <= self.len {
			return;
		}
		let words_needed = blocks.div_ceil(WORD_BITS);
		if words_needed > self.words.len() {
			self.words.resize(words_needed, 0);
		}
		self.len = blocks;
	}

	/// Discard all state; used only on MTFTP fallback (blksize may
	/// change, invalidating any previously-received block's position).
	pub fn discard(&mut self) {
		self.words.clear();
		self.len = 0;
	}

	/// Mark block index `index` (0-based) as received. No-ops if `index`
	/// falls outside the tracked range (caller is expected to `resize`
	/// first via `presize`).
	pub fn set(&mut self, index: usize) {
		if index >= self.len {
			return;
		}
		let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
		self.words[word] |= 1u64 << bit;
	}

	pub fn is_set(&self, index: usize) -> bool {
		if index >= self.len {
			return false;
		}
		let (word, bit) = (index / WORD_BITS, index % WORD_BITS);
		(self.words[word] >> bit) & 1 != 0
	}

	/// Index of the first clear bit (the next block index this request
	/// still needs). 0 if nothing has been received yet. Equal to `len`
	/// if every tracked block is set but the map hasn't been resized
	/// past the last known block yet.
	pub fn first_gap(&self) -> usize {
		for (w, word) in self.words.iter().enumerate() {
			if *word != u64::MAX {
				let bit = (!*word).trailing_zeros() as usize;
				let idx = w * WORD_BITS + bit;
				if idx < self.len {
					return idx;
				}
			}
		}
		self.len
	}

	/// True once every tracked block has been received.
	pub fn full(&self) -> bool {
		self.len > 0 && self.first_gap() == self.len
	}
}
