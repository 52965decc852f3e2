use crate::constants::{DEFAULT_INDENT, DEFAULT_MAX_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_depth: usize,
    pub allow_comments: bool,
    pub hash_threshold: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_comments(mut self, allow_comments: bool) -> Self {
        self.allow_comments = allow_comments;
        self
    }

    /// Objects with more members than `threshold` are switched to hash mode
    /// once they are complete.
    pub fn with_hash_threshold(mut self, threshold: Option<usize>) -> Self {
        self.hash_threshold = threshold;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_comments: false,
            hash_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent: usize,
    pub write_opaque: bool,
    pub trailing_newline: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_write_opaque(mut self, write_opaque: bool) -> Self {
        self.write_opaque = write_opaque;
        self
    }

    pub fn with_trailing_newline(mut self, trailing_newline: bool) -> Self {
        self.trailing_newline = trailing_newline;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            write_opaque: false,
            trailing_newline: false,
        }
    }
}
