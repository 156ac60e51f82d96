#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

pub fn unsatisfied_range(size: u64) -> String {
    format!("bytes */{}", size)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    Invalid,
    Unsatisfiable,
}

/// Single `bytes=` ranges only. `Invalid` headers are ignored by callers and
/// the whole body is served instead.
pub fn parse_range_header(value: &str, size: u64) -> Result<ByteRange, RangeError> {
    let spec = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or(RangeError::Invalid)?;
    if spec.contains(',') {
        return Err(RangeError::Invalid);
    }
    let (first, last) = spec.split_once('-').ok_or(RangeError::Invalid)?;
    let first = parse_offset(first)?;
    let last = parse_offset(last)?;
    if size == 0 {
        return Err(RangeError::Unsatisfiable);
    }
    let max = size - 1;

    match (first, last) {
        (None, None) => Err(RangeError::Invalid),
        // `-N`: the final N bytes.
        (None, Some(0)) => Err(RangeError::Unsatisfiable),
        (None, Some(suffix)) => Ok(ByteRange {
            start: size.saturating_sub(suffix),
            end: max,
        }),
        (Some(start), _) if start > max => Err(RangeError::Unsatisfiable),
        (Some(start), None) => Ok(ByteRange { start, end: max }),
        (Some(start), Some(end)) if end < start => Err(RangeError::Invalid),
        (Some(start), Some(end)) => Ok(ByteRange {
            start,
            end: end.min(max),
        }),
    }
}

fn parse_offset(text: &str) -> Result<Option<u64>, RangeError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some).map_err(|_| RangeError::Invalid)
}
