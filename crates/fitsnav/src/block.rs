//! Fixed record sizes of the FITS container and offset arithmetic over them.

/// Size of one logical record; headers and data segments are padded to it.
pub const BLOCK_SIZE: usize = 2880;

/// Size of one header card.
pub const CARD_SIZE: usize = 80;

/// Cards per block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Bytes at the start of every FITS file.
pub const MAGIC: &[u8; 9] = b"SIMPLE  =";

const BLOCK: u64 = BLOCK_SIZE as u64;

/// Returns how many whole blocks `num_bytes` occupies (ceiling division).
pub const fn blocks_needed(num_bytes: u64) -> u64 {
    num_bytes.div_ceil(BLOCK)
}

/// Returns `num_bytes` rounded up to a whole number of blocks.
pub const fn padded_byte_len(num_bytes: u64) -> u64 {
    blocks_needed(num_bytes) * BLOCK
}

/// Padded on-disk length of a header of `card_count` cards.
pub const fn header_padded_len(card_count: usize) -> u64 {
    padded_byte_len(card_count as u64 * CARD_SIZE as u64)
}

/// Returns `true` if `offset` sits on a block boundary.
pub const fn is_block_aligned(offset: u64) -> bool {
    offset % BLOCK == 0
}
