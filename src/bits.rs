//! A growable vector of per-index flags

const WORD_BITS: u64 = 64;

fn words_for(len: u64) -> usize {
    len.div_ceil(WORD_BITS) as usize
}

/// Packed flags for indices `0..len`. Reads beyond the length are `false`.
#[derive(Clone, Default, PartialEq, Eq)]
pub(crate) struct BitVector {
    words: Vec<u64>,
    len: u64,
}

impl BitVector {
    /// Creates a vector of `len` cleared flags.
    pub fn new(len: u64) -> Self {
        Self {
            words: vec![0; words_for(len)],
            len,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_set(&self, index: u64) -> bool {
        if index >= self.len {
            return false;
        }
        let word = self.words[(index / WORD_BITS) as usize];
        word & (1 << (index % WORD_BITS)) != 0
    }

    /// Sets the flag at `index`, growing the vector if necessary.
    pub fn set(&mut self, index: u64) {
        if index >= self.len {
            self.resize(index + 1);
        }
        self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
    }

    pub fn clear(&mut self, index: u64) {
        if index < self.len {
            self.words[(index / WORD_BITS) as usize] &= !(1 << (index % WORD_BITS));
        }
    }

    /// Sets every flag in `from..to`.
    pub fn set_range(&mut self, from: u64, to: u64) {
        if from >= to {
            return;
        }
        if to > self.len {
            self.resize(to);
        }
        for index in from..to {
            self.words[(index / WORD_BITS) as usize] |= 1 << (index % WORD_BITS);
        }
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Changes the length. Flags past a shrunk length are discarded, new flags
    /// are cleared.
    pub fn resize(&mut self, len: u64) {
        self.words.resize(words_for(len), 0);
        self.len = len;
        self.mask_tail();
    }

    /// Moves every flag `by` positions toward zero. Flags below `by` are
    /// dropped and the length shrinks accordingly.
    pub fn shift_left(&mut self, by: u64) {
        if by == 0 {
            return;
        }
        if by >= self.len {
            self.words.clear();
            self.len = 0;
            return;
        }
        let word_shift = (by / WORD_BITS) as usize;
        let bit_shift = by % WORD_BITS;
        let n = self.words.len();
        for i in 0..n {
            let src = i + word_shift;
            let lo = self.words.get(src).map_or(0, |w| w >> bit_shift);
            let hi = if bit_shift > 0 {
                self.words
                    .get(src + 1)
                    .map_or(0, |w| w << (WORD_BITS - bit_shift))
            } else {
                0
            };
            self.words[i] = lo | hi;
        }
        self.resize(self.len - by);
    }

    /// Moves every flag `by` positions away from zero, opening cleared flags
    /// at the start. The length grows accordingly.
    pub fn shift_right(&mut self, by: u64) {
        if by == 0 {
            return;
        }
        self.resize(self.len + by);
        let word_shift = (by / WORD_BITS) as usize;
        let bit_shift = by % WORD_BITS;
        for i in (0..self.words.len()).rev() {
            let value = if i < word_shift {
                0
            } else {
                let src = i - word_shift;
                let hi = self.words[src] << bit_shift;
                let lo = if bit_shift > 0 && src > 0 {
                    self.words[src - 1] >> (WORD_BITS - bit_shift)
                } else {
                    0
                };
                hi | lo
            };
            self.words[i] = value;
        }
        self.mask_tail();
    }

    /// Copies the flags in `from..to` into a new vector starting at zero.
    pub fn slice(&self, from: u64, to: u64) -> Self {
        let to = to.min(self.len);
        let mut result = Self::new(to.saturating_sub(from));
        for i in from..to {
            if self.is_set(i) {
                result.set(i - from);
            }
        }
        result
    }

    fn mask_tail(&mut self) {
        let used = self.len % WORD_BITS;
        if used != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1 << used) - 1;
            }
        }
    }
}

impl std::fmt::Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries((0..self.len).filter(|&i| self.is_set(i)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ones(bits: &BitVector) -> Vec<u64> {
        (0..bits.len()).filter(|&i| bits.is_set(i)).collect()
    }

    #[test]
    fn can_set_and_clear() {
        let mut bits = BitVector::new(10);
        assert!(!bits.any());
        bits.set(3);
        bits.set(70);
        assert_eq!(bits.len(), 71);
        assert_eq!(ones(&bits), vec![3, 70]);
        bits.clear(3);
        assert_eq!(ones(&bits), vec![70]);
        assert!(!bits.is_set(1000));
        bits.set_range(5, 8);
        assert_eq!(ones(&bits), vec![5, 6, 7, 70]);
        bits.clear(70);
        bits.set_range(8, 8);
        assert_eq!(ones(&bits), vec![5, 6, 7]);
    }

    #[test]
    fn can_shift() {
        let mut bits = BitVector::new(200);
        for i in [0, 1, 63, 64, 130, 199] {
            bits.set(i);
        }
        bits.shift_left(1);
        assert_eq!(bits.len(), 199);
        assert_eq!(ones(&bits), vec![0, 62, 63, 129, 198]);
        bits.shift_left(64);
        assert_eq!(ones(&bits), vec![65, 134]);
        bits.shift_right(65);
        assert_eq!(bits.len(), 200);
        assert_eq!(ones(&bits), vec![130, 199]);
        bits.shift_right(3);
        assert_eq!(ones(&bits), vec![133, 202]);
        bits.shift_left(500);
        assert_eq!(bits.len(), 0);
    }

    #[test]
    fn can_resize_and_slice() {
        let mut bits = BitVector::new(100);
        bits.set_range(10, 90);
        bits.resize(20);
        assert_eq!(ones(&bits).len(), 10);
        bits.resize(100);
        assert_eq!(ones(&bits), (10..20).collect::<Vec<_>>());
        let sliced = bits.slice(15, 50);
        assert_eq!(sliced.len(), 35);
        assert_eq!(ones(&sliced), vec![0, 1, 2, 3, 4]);
    }
}
