use bstr::BString;

#[must_use]
const fn build_lookup_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < table.len() {
        #[allow(clippy::cast_possible_truncation)]
        {
            table[i] = i as u8;
        }
        i += 1;
    }

    table[b'/' as usize] = b'\\';

    let mut c = b'A';
    while c <= b'Z' {
        table[c as usize] = c.to_ascii_lowercase();
        c += 1;
    }

    table
}

/// Lowercases ASCII letters and turns forward slashes into backslashes.
#[must_use]
pub(crate) fn map_byte(b: u8) -> u8 {
    const LUT: [u8; 256] = build_lookup_table();
    LUT[b as usize]
}

/// Builds the key archives are indexed by: `"<folder>\<file>"`, lowercased.
#[must_use]
pub(crate) fn lookup_key(path: &[u8]) -> BString {
    path.iter().copied().map(map_byte).collect::<Vec<_>>().into()
}

/// Normalizes a path the way the archive name hash expects it: mapped bytes, no leading or
/// trailing separators, and `.` for an empty (or overlong) path.
pub(crate) fn normalize_path(path: &[u8]) -> BString {
    let mut path = lookup_key(path);

    while path.last() == Some(&b'\\') {
        path.pop();
    }

    let leading = path.iter().take_while(|&&x| x == b'\\').count();
    path.drain(..leading);

    if path.is_empty() || path.len() >= 260 {
        path.clear();
        path.push(b'.');
    }

    path
}
