//! Minimal OLE2 compound file writer (version 3, 512-byte sectors).
//!
//! Streams are stored in regular sectors only: each stream is padded to the
//! mini stream cutoff, so no MiniFAT or mini stream is emitted.

const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
const N_SECTOR_SIZE: usize = 512;
const N_DIRENTRY_SIZE: usize = 128;
const N_MINI_STREAM_CUTOFF: usize = 4096;
const N_HEADER_FAT_SLOTS: usize = 109;
const N_IDS_PER_SECTOR: usize = N_SECTOR_SIZE / 4;

const DIFSECT: u32 = 0xFFFF_FFFC;
const FATSECT: u32 = 0xFFFF_FFFD;
const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FREESECT: u32 = 0xFFFF_FFFF;
const NOSTREAM: u32 = 0xFFFF_FFFF;

const STGTY_STREAM: u8 = 2;
const STGTY_ROOT: u8 = 5;

/// Sector counts of one compound file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpecSectorCounts {
    n_data: usize,
    n_dir: usize,
    n_fat: usize,
    n_difat: usize,
}

impl SpecSectorCounts {
    fn total(&self) -> usize {
        self.n_data + self.n_dir + self.n_fat + self.n_difat
    }
}

/// Solve FAT and DIFAT sector counts; both grow with the sectors they index.
fn derive_sector_counts(n_data: usize, n_dir: usize) -> SpecSectorCounts {
    let mut counts = SpecSectorCounts {
        n_data,
        n_dir,
        n_fat: 0,
        n_difat: 0,
    };
    loop {
        let n_fat = counts.total().div_ceil(N_IDS_PER_SECTOR);
        let n_difat = n_fat
            .saturating_sub(N_HEADER_FAT_SLOTS)
            .div_ceil(N_IDS_PER_SECTOR - 1);
        if n_fat == counts.n_fat && n_difat == counts.n_difat {
            return counts;
        }
        counts.n_fat = n_fat;
        counts.n_difat = n_difat;
    }
}

fn padded_len(n_len: usize) -> usize {
    usize::max(n_len, N_MINI_STREAM_CUTOFF).div_ceil(N_SECTOR_SIZE) * N_SECTOR_SIZE
}

struct SpecDirEntry<'a> {
    name: &'a str,
    entry_type: u8,
    start_sector: u32,
    size: u64,
    sid_left: u32,
    sid_right: u32,
    sid_child: u32,
}

impl SpecDirEntry<'_> {
    fn write_to(&self, out: &mut [u8]) {
        let l_units: Vec<u16> = self.name.encode_utf16().take(31).collect();
        for (n_idx, n_unit) in l_units.iter().enumerate() {
            out[n_idx * 2..n_idx * 2 + 2].copy_from_slice(&n_unit.to_le_bytes());
        }
        out[64..66].copy_from_slice(&(((l_units.len() + 1) * 2) as u16).to_le_bytes());
        out[66] = self.entry_type;
        out[67] = 1;
        out[68..72].copy_from_slice(&self.sid_left.to_le_bytes());
        out[72..76].copy_from_slice(&self.sid_right.to_le_bytes());
        out[76..80].copy_from_slice(&self.sid_child.to_le_bytes());
        out[116..120].copy_from_slice(&self.start_sector.to_le_bytes());
        out[120..128].copy_from_slice(&self.size.to_le_bytes());
    }
}

/// Compound file ordering: shorter names first, then case-insensitive.
fn compare_entry_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16()
        .count()
        .cmp(&b.encode_utf16().count())
        .then_with(|| a.to_uppercase().cmp(&b.to_uppercase()))
}

/// Link sorted sibling SIDs into a balanced binary tree; returns the root SID.
fn link_siblings(entries: &mut [SpecDirEntry<'_>], l_sids: &[u32]) -> u32 {
    if l_sids.is_empty() {
        return NOSTREAM;
    }
    let n_mid = l_sids.len() / 2;
    let n_sid = l_sids[n_mid];
    let n_left = link_siblings(entries, &l_sids[..n_mid]);
    let n_right = link_siblings(entries, &l_sids[n_mid + 1..]);
    let entry = &mut entries[n_sid as usize];
    entry.sid_left = n_left;
    entry.sid_right = n_right;
    n_sid
}

/// Build a compound file holding `streams` under the root storage.
///
/// Stream names must be unique and at most 31 characters.
pub fn derive_compound_file(streams: &[(&str, &[u8])]) -> Vec<u8> {
    let l_padded: Vec<usize> = streams.iter().map(|(_, data)| padded_len(data.len())).collect();
    let n_data: usize = l_padded.iter().map(|n| n / N_SECTOR_SIZE).sum();
    let n_entries = streams.len() + 1;
    let n_dir = (n_entries * N_DIRENTRY_SIZE).div_ceil(N_SECTOR_SIZE);
    let counts = derive_sector_counts(n_data, n_dir);

    let n_first_dir = n_data;
    let n_first_fat = n_first_dir + counts.n_dir;
    let n_first_difat = n_first_fat + counts.n_fat;

    // FAT
    let mut l_fat: Vec<u32> = vec![FREESECT; counts.n_fat * N_IDS_PER_SECTOR];
    let mut l_starts: Vec<u32> = Vec::with_capacity(streams.len());
    let mut n_cursor = 0usize;
    for &n_len in &l_padded {
        let n_sectors = n_len / N_SECTOR_SIZE;
        l_starts.push(n_cursor as u32);
        link_chain(&mut l_fat, n_cursor, n_sectors);
        n_cursor += n_sectors;
    }
    link_chain(&mut l_fat, n_first_dir, counts.n_dir);
    for n_sid in n_first_fat..n_first_difat {
        l_fat[n_sid] = FATSECT;
    }
    for n_sid in n_first_difat..n_first_difat + counts.n_difat {
        l_fat[n_sid] = DIFSECT;
    }

    // Directory
    let mut l_dir: Vec<SpecDirEntry<'_>> = Vec::with_capacity(n_entries);
    l_dir.push(SpecDirEntry {
        name: "Root Entry",
        entry_type: STGTY_ROOT,
        start_sector: ENDOFCHAIN,
        size: 0,
        sid_left: NOSTREAM,
        sid_right: NOSTREAM,
        sid_child: NOSTREAM,
    });
    for (n_idx, (c_name, _)) in streams.iter().enumerate() {
        l_dir.push(SpecDirEntry {
            name: c_name,
            entry_type: STGTY_STREAM,
            start_sector: l_starts[n_idx],
            size: l_padded[n_idx] as u64,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
        });
    }
    let mut l_sids: Vec<u32> = (1..n_entries as u32).collect();
    l_sids.sort_by(|&a, &b| compare_entry_names(l_dir[a as usize].name, l_dir[b as usize].name));
    let n_sid_child = link_siblings(&mut l_dir, &l_sids);
    l_dir[0].sid_child = n_sid_child;

    // Header
    let l_fat_sids: Vec<u32> = (n_first_fat..n_first_difat).map(|n| n as u32).collect();
    let mut out = vec![0u8; N_SECTOR_SIZE * (1 + counts.total())];
    {
        let header = &mut out[..N_SECTOR_SIZE];
        header[0..8].copy_from_slice(MAGIC);
        header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
        header[26..28].copy_from_slice(&3u16.to_le_bytes());
        header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
        header[30..32].copy_from_slice(&9u16.to_le_bytes());
        header[32..34].copy_from_slice(&6u16.to_le_bytes());
        header[44..48].copy_from_slice(&(counts.n_fat as u32).to_le_bytes());
        header[48..52].copy_from_slice(&(n_first_dir as u32).to_le_bytes());
        header[56..60].copy_from_slice(&(N_MINI_STREAM_CUTOFF as u32).to_le_bytes());
        header[60..64].copy_from_slice(&ENDOFCHAIN.to_le_bytes());
        let n_first_difat_id = if counts.n_difat == 0 {
            ENDOFCHAIN
        } else {
            n_first_difat as u32
        };
        header[68..72].copy_from_slice(&n_first_difat_id.to_le_bytes());
        header[72..76].copy_from_slice(&(counts.n_difat as u32).to_le_bytes());
        for n_slot in 0..N_HEADER_FAT_SLOTS {
            let n_id = l_fat_sids.get(n_slot).copied().unwrap_or(FREESECT);
            header[76 + n_slot * 4..80 + n_slot * 4].copy_from_slice(&n_id.to_le_bytes());
        }
    }

    let sector = |n_sid: usize| (1 + n_sid) * N_SECTOR_SIZE;

    // Stream data; padding stays zero.
    for (n_idx, (_, data)) in streams.iter().enumerate() {
        let n_off = sector(l_starts[n_idx] as usize);
        out[n_off..n_off + data.len()].copy_from_slice(data);
    }

    // Directory sectors; unused slots are empty entries.
    let n_dir_off = sector(n_first_dir);
    for n_slot in 0..counts.n_dir * (N_SECTOR_SIZE / N_DIRENTRY_SIZE) {
        let n_off = n_dir_off + n_slot * N_DIRENTRY_SIZE;
        let slot = &mut out[n_off..n_off + N_DIRENTRY_SIZE];
        match l_dir.get(n_slot) {
            Some(entry) => entry.write_to(slot),
            None => {
                slot[68..80].fill(0xFF);
            }
        }
    }

    // FAT sectors
    let n_fat_off = sector(n_first_fat);
    for (n_idx, n_id) in l_fat.iter().enumerate() {
        out[n_fat_off + n_idx * 4..n_fat_off + n_idx * 4 + 4].copy_from_slice(&n_id.to_le_bytes());
    }

    // DIFAT sectors: 127 FAT sector ids, then the next DIFAT sector.
    let l_overflow = l_fat_sids.get(N_HEADER_FAT_SLOTS..).unwrap_or(&[]);
    for n_difat in 0..counts.n_difat {
        let n_off = sector(n_first_difat + n_difat);
        for n_slot in 0..N_IDS_PER_SECTOR - 1 {
            let n_id = l_overflow
                .get(n_difat * (N_IDS_PER_SECTOR - 1) + n_slot)
                .copied()
                .unwrap_or(FREESECT);
            out[n_off + n_slot * 4..n_off + n_slot * 4 + 4].copy_from_slice(&n_id.to_le_bytes());
        }
        let n_next = if n_difat + 1 < counts.n_difat {
            (n_first_difat + n_difat + 1) as u32
        } else {
            ENDOFCHAIN
        };
        out[n_off + N_SECTOR_SIZE - 4..n_off + N_SECTOR_SIZE].copy_from_slice(&n_next.to_le_bytes());
    }

    out
}

fn link_chain(l_fat: &mut [u32], n_start: usize, n_len: usize) {
    for n_sid in n_start..n_start + n_len {
        l_fat[n_sid] = if n_sid + 1 < n_start + n_len {
            (n_sid + 1) as u32
        } else {
            ENDOFCHAIN
        };
    }
}
