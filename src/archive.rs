use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::CurateError;

pub const BLOCK_SIZE: usize = 512;
const NAME_RANGE: std::ops::Range<usize> = 0..100;
const SIZE_RANGE: std::ops::Range<usize> = 124..136;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    pub offset: usize,
    pub size: usize,
}

pub fn next_entry(data: &[u8], cursor: usize) -> Result<Option<(EntryHeader, usize)>, CurateError> {
    let Some(header) = cursor
        .checked_add(BLOCK_SIZE)
        .and_then(|end| data.get(cursor..end))
    else {
        return Ok(None);
    };

    let name = field_text(&header[NAME_RANGE]);
    if name.is_empty() {
        return Ok(None);
    }
    let size = parse_size(&header[SIZE_RANGE])
        .ok_or_else(|| CurateError::MalformedArchive(format!("invalid size field for {name}")))?;

    let offset = cursor + BLOCK_SIZE;
    let next = size
        .div_ceil(BLOCK_SIZE)
        .checked_mul(BLOCK_SIZE)
        .and_then(|padded| offset.checked_add(padded))
        .ok_or_else(|| CurateError::MalformedArchive(format!("size overflow for {name}")))?;

    Ok(Some((EntryHeader { name, offset, size }, next)))
}

pub struct Entries<'a> {
    data: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Entries<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            done: false,
        }
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<EntryHeader, CurateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match next_entry(self.data, self.cursor) {
            Ok(Some((entry, next))) => {
                self.cursor = next;
                Some(Ok(entry))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveMember {
    pub fn into_text(self) -> Result<String, CurateError> {
        String::from_utf8(self.data)
            .map_err(|err| CurateError::MalformedArchive(format!("{} is not UTF-8: {err}", self.name)))
    }
}

pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>, CurateError> {
    let mut decoder = GzDecoder::new(compressed);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| CurateError::MalformedArchive(format!("gzip: {err}")))?;
    Ok(out)
}

pub fn find_member(data: &[u8], suffix: &str) -> Result<ArchiveMember, CurateError> {
    for entry in Entries::new(data) {
        let entry = entry?;
        if !entry.name.ends_with(suffix) {
            continue;
        }
        let payload = entry
            .offset
            .checked_add(entry.size)
            .and_then(|end| data.get(entry.offset..end))
            .ok_or_else(|| CurateError::MalformedArchive(format!("{} is truncated", entry.name)))?;
        tracing::debug!(member = %entry.name, size = entry.size, "matched archive member");
        return Ok(ArchiveMember {
            name: entry.name,
            data: payload.to_vec(),
        });
    }
    Err(CurateError::ArchiveMemberNotFound {
        suffix: suffix.to_string(),
    })
}

pub fn extract_text(compressed: &[u8], suffix: &str) -> Result<String, CurateError> {
    let data = gunzip(compressed)?;
    find_member(&data, suffix)?.into_text()
}

fn field_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}

/// Octal ASCII, NUL or space terminated, or GNU base-256 when the high bit
/// of the first byte is set. An all-blank field reads as zero.
fn parse_size(raw: &[u8]) -> Option<usize> {
    if raw.first().is_some_and(|byte| byte & 0x80 != 0) {
        let mut value: usize = (raw[0] & 0x7f) as usize;
        for byte in &raw[1..] {
            value = value.checked_mul(256)?.checked_add(*byte as usize)?;
        }
        return Some(value);
    }
    let text = field_text(raw);
    if text.is_empty() {
        return Some(0);
    }
    usize::from_str_radix(&text, 8).ok()
}
