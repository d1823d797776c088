/// Cache of newline offsets in an input, converting byte offsets to 1-based line numbers. Input
/// can be fed incrementally: each call to [`NewlineCache::feed`] is treated as concatenated to the
/// previous ones.
#[derive(Clone, Debug)]
pub struct NewlineCache {
    /// Byte offset of the first byte of every line. The first line always starts at 0.
    line_starts: Vec<usize>,
    trailing_bytes: usize,
}

impl Default for NewlineCache {
    fn default() -> NewlineCache {
        NewlineCache {
            line_starts: vec![0],
            trailing_bytes: 0,
        }
    }
}

impl NewlineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache and feed it `src` in one go.
    pub fn from_source(src: &str) -> Self {
        let mut nlc = Self::default();
        nlc.feed(src);
        nlc
    }

    /// Feed more input into the cache, calculating newlines data from it.
    pub fn feed(&mut self, src: &str) {
        let start_pos = self.input_length();
        for (offset, b) in src.bytes().enumerate() {
            if b == b'\n' {
                self.line_starts.push(start_pos + offset + 1);
            }
        }
        let last = self.line_starts[self.line_starts.len() - 1];
        self.trailing_bytes = start_pos + src.len() - last;
    }

    /// Number of lines seen so far. An empty input has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Total known input length.
    pub fn input_length(&self) -> usize {
        self.line_starts[self.line_starts.len() - 1] + self.trailing_bytes
    }

    /// Convert a byte offset in the input to a logical line number (starting from 1). An offset
    /// equal to the input length is valid and refers to the end of the last line. Returns `None`
    /// if the byte offset exceeds the known input length.
    pub fn byte_to_line_num(&self, byte: usize) -> Option<usize> {
        if byte > self.input_length() {
            return None;
        }
        Some(self.line_starts.partition_point(|&off| off <= byte))
    }
}

#[cfg(test)]
mod test {
    use super::NewlineCache;

    fn newline_test_helper(feed: &[&str], tests: &[usize]) {
        let mut cache = NewlineCache::default();
        let mut full_string = String::new();
        for f in feed {
            cache.feed(f);
            full_string.push_str(f);
        }

        let result = full_string
            .char_indices()
            .map(|(offset, _)| cache.byte_to_line_num(offset).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(result, tests)
    }

    #[test]
    fn newline_cache_various() {
        newline_test_helper(&["a", "b", "c"], &[1, 1, 1]);
        newline_test_helper(&["abc"], &[1, 1, 1]);
        newline_test_helper(&["ab", "c"], &[1, 1, 1]);

        newline_test_helper(&["a\n", "b"], &[1, 1, 2]);
        newline_test_helper(&["a", "\nb"], &[1, 1, 2]);

        let suits_nl = &[1, 1, 1, 2, 2];
        newline_test_helper(&["", "♠♥\n♦♣"], suits_nl);
        newline_test_helper(&["♠♥\n", "♦♣"], suits_nl);
        newline_test_helper(&["♠♥\n♦", "♣"], suits_nl);

        newline_test_helper(&["", "", ""], &[]);
        newline_test_helper(&["", "a"], &[1]);
    }

    #[test]
    fn newline_cache_line_nums() {
        let nlc = NewlineCache::from_source("ab\ncd\n\nef");
        assert_eq!(nlc.line_count(), 4);
        assert_eq!(nlc.input_length(), 9);
        assert_eq!(nlc.byte_to_line_num(0), Some(1));
        assert_eq!(nlc.byte_to_line_num(2), Some(1));
        assert_eq!(nlc.byte_to_line_num(3), Some(2));
        assert_eq!(nlc.byte_to_line_num(6), Some(3));
        assert_eq!(nlc.byte_to_line_num(7), Some(4));
        assert_eq!(nlc.byte_to_line_num(9), Some(4));
    }

    #[test]
    fn newline_cache_negative() {
        let mut cache = NewlineCache::default();

        // Byte exceeds input length
        cache.feed("1");
        assert_eq!(None, cache.byte_to_line_num(2));
        cache.feed("\n23");
        assert_eq!(None, cache.byte_to_line_num(5));
        assert_eq!(Some(2), cache.byte_to_line_num(4));
    }
}
