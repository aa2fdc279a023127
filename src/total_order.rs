/// Code stored in padding slots. It compares greater than the code of every key.
pub const PADDING: u64 = u64::MAX;

// NaNs are placed above every ordered value, keeping their payload in the low bits.
const NAN_TAG: u64 = 1 << 32;

/// Maps a key to an integer code whose natural order is the sort order of the keys.
pub trait TotalOrder: Copy + 'static {
    fn to_total_order(&self) -> u64;
}

/// Inverse of [`TotalOrder`].
pub trait FromTotalOrder {
    fn from_total_order(value: u64) -> Self;
}

impl TotalOrder for f32 {
    #[inline(always)]
    fn to_total_order(&self) -> u64 {
        let bits = self.to_bits();
        if self.is_nan() {
            return NAN_TAG | bits as u64;
        }
        // see f32::total_cmp
        ((bits ^ ((bits as i32 >> 31) as u32 >> 1)) ^ (1 << 31)) as u64
    }
}

impl FromTotalOrder for f32 {
    #[inline(always)]
    fn from_total_order(value: u64) -> Self {
        debug_assert_ne!(value, PADDING);
        if value & NAN_TAG != 0 {
            return f32::from_bits(value as u32);
        }
        let value = value as u32;
        // positive values only had the sign bit flipped, negative ones were fully inverted
        let bits = if value >> 31 == 1 { value ^ (1 << 31) } else { !value };
        f32::from_bits(bits)
    }
}

/// Returns true for codes that belong to padding slots rather than keys.
#[inline(always)]
pub fn is_padding(code: u64) -> bool {
    code == PADDING
}
