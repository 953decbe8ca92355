//! Delimited fragment extraction
//!
//! Splits raw file text into pass-through text and fragments. Fragments do
//! not nest: the first closing marker after an opening marker ends it. An
//! opening marker with no closing marker runs to end of input.

/// A delimited span of embedded source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Text between the markers
    pub inner: &'a str,

    /// False when the input ended before a closing marker
    pub closed: bool,
}

/// One piece of a scanned file, in order of appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Fragment(Fragment<'a>),
}

/// Iterator over the segments of a raw text
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    raw: &'a str,
    pos: usize,
    open: &'a str,
    close: &'a str,
    pending: Option<Fragment<'a>>,
}

impl<'a> Segments<'a> {
    pub fn new(raw: &'a str, open: &'a str, close: &'a str) -> Self {
        Self {
            raw,
            pos: 0,
            open,
            close,
            pending: None,
        }
    }

    fn scan_fragment(&mut self, start: usize) -> Fragment<'a> {
        let inner_start = start + self.open.len();
        let rest = &self.raw[inner_start..];

        match rest.find(self.close) {
            Some(end) => {
                self.pos = inner_start + end + self.close.len();
                Fragment {
                    inner: &rest[..end],
                    closed: true,
                }
            }
            None => {
                self.pos = self.raw.len();
                Fragment {
                    inner: rest,
                    closed: false,
                }
            }
        }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(fragment) = self.pending.take() {
            return Some(Segment::Fragment(fragment));
        }
        if self.pos >= self.raw.len() {
            return None;
        }

        let rest = &self.raw[self.pos..];
        let found = if self.open.is_empty() {
            None
        } else {
            rest.find(self.open)
        };

        match found {
            None => {
                self.pos = self.raw.len();
                Some(Segment::Text(rest))
            }
            Some(0) => {
                let fragment = self.scan_fragment(self.pos);
                Some(Segment::Fragment(fragment))
            }
            Some(offset) => {
                let text = &rest[..offset];
                let fragment = self.scan_fragment(self.pos + offset);
                self.pending = Some(fragment);
                Some(Segment::Text(text))
            }
        }
    }
}

/// Collect the segments of `raw`
pub fn segments<'a>(raw: &'a str, open: &'a str, close: &'a str) -> Vec<Segment<'a>> {
    Segments::new(raw, open, close).collect()
}

/// Only the fragments of `raw`
pub fn fragments<'a>(raw: &'a str, open: &'a str, close: &'a str) -> Vec<Fragment<'a>> {
    Segments::new(raw, open, close)
        .filter_map(|s| match s {
            Segment::Fragment(f) => Some(f),
            Segment::Text(_) => None,
        })
        .collect()
}
