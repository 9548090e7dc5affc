use crate::hashing;
use core::cmp::Ordering;

/// The 64-bit name hash archives store for every folder and file.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct Hash {
    pub last: u8,
    pub last2: u8,
    pub length: u8,
    pub first: u8,
    pub crc: u32,
}

impl Hash {
    #[allow(clippy::identity_op, clippy::erasing_op)]
    #[must_use]
    pub fn numeric(&self) -> u64 {
        (u64::from(self.last) << (0 * 8))
            | (u64::from(self.last2) << (1 * 8))
            | (u64::from(self.length) << (2 * 8))
            | (u64::from(self.first) << (3 * 8))
            | (u64::from(self.crc) << (4 * 8))
    }
}

impl PartialEq for Hash {
    fn eq(&self, other: &Self) -> bool {
        self.numeric() == other.numeric()
    }
}

impl Eq for Hash {}

impl PartialOrd for Hash {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hash {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric().cmp(&other.numeric())
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |crc, &b| u32::from(b).wrapping_add(crc.wrapping_mul(0x1003F)))
}

fn hash_normalized(path: &[u8]) -> Hash {
    let len = path.len();
    let mut h = Hash::default();
    if len >= 3 {
        h.last2 = path[len - 2];
    }
    if len >= 1 {
        h.last = path[len - 1];
        h.first = path[0];
    }

    // truncation is how the game does it
    #[allow(clippy::cast_possible_truncation)]
    {
        h.length = len as u8;
    }

    if h.length > 3 {
        // the first and the last two characters are already part of the hash
        h.crc = crc32(&path[1..len - 2]);
    }

    h
}

/// Hashes a folder path, e.g. `meshes\armor\iron`.
#[must_use]
pub fn hash_folder(path: &[u8]) -> Hash {
    hash_normalized(&hashing::normalize_path(path))
}

/// Packs up to the first four bytes of an extension, little-endian.
fn extension_code(extension: &[u8]) -> u32 {
    let mut buffer = [0u8; 4];
    for (dst, src) in buffer.iter_mut().zip(extension) {
        *dst = *src;
    }
    u32::from_le_bytes(buffer)
}

/// Hashes a file name. Any parent folders in `path` are ignored.
#[must_use]
pub fn hash_file(path: &[u8]) -> Hash {
    const EXTENSIONS: [&[u8]; 6] = [b"", b".nif", b".kf", b".dds", b".wav", b".adp"];

    let mut path = hashing::normalize_path(path);
    if let Some(pos) = path.iter().rposition(|&x| x == b'\\') {
        path.drain(..=pos);
    }

    let (stem, extension) = match path.iter().rposition(|&x| x == b'.') {
        Some(split_at) => path.split_at(split_at),
        None => (&path[..], &b""[..]),
    };

    if stem.is_empty() || stem.len() >= 260 || extension.len() >= 16 {
        return Hash::default();
    }

    let mut h = hash_normalized(&hashing::normalize_path(stem));
    h.crc = h.crc.wrapping_add(crc32(extension));

    let code = extension_code(extension);
    // truncations are on purpose
    #[allow(clippy::cast_possible_truncation)]
    if let Some(i) = EXTENSIONS.iter().position(|&x| extension_code(x) == code) {
        let i = i as u8;
        h.first = u32::from(h.first).wrapping_add(32 * u32::from(i & 0xFC)) as u8;
        h.last = u32::from(h.last).wrapping_add(u32::from(i & 0xFE) << 6) as u8;
        h.last2 = u32::from(h.last2).wrapping_add(u32::from(i.wrapping_shl(7))) as u8;
    }

    h
}

#[cfg(test)]
mod tests {
    use crate::bsa::{hash_file, hash_folder};

    #[test]
    fn known_folder_hashes() {
        let h = |path: &[u8]| hash_folder(path).numeric();
        assert_eq!(
            h(b"textures/armor/amuletsandrings/elder council"),
            0x04BC_422C_742C_696C
        );
        assert_eq!(h(b"textures/architecture/windhelm"), 0xC1D9_7EBE_741E_6C6D);
    }

    #[test]
    fn known_file_hashes() {
        let h = |path: &[u8]| hash_file(path).numeric();
        assert_eq!(h(b"elder_council_amulet_n.dds"), 0xDC53_1E2F_6516_DFEE);
        assert_eq!(
            h(b"testtoddquest_testtoddhappy_00027fa2_1.mp3"),
            0xDE03_01EE_7426_5F31
        );
    }

    #[test]
    fn case_and_separators_do_not_matter() {
        assert_eq!(hash_folder(b"Meshes/Clutter"), hash_folder(b"meshes\\clutter\\"));
        assert_eq!(hash_file(b"Meshes\\Clutter\\Bowl01.NIF"), hash_file(b"bowl01.nif"));
    }

    #[test]
    fn nameless_files_hash_to_zero() {
        assert_eq!(hash_file(b".gitignore").numeric(), 0);
        assert_eq!(hash_file(b"test.123456789ABCDEF").numeric(), 0);
        assert_ne!(hash_file(b"test.123456789ABCDE").numeric(), 0);
    }
}
