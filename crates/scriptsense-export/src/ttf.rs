//! Just enough TrueType parsing to embed a font in a PDF: metrics from
//! `head`/`hhea`, advance widths from `hmtx`, and the Unicode `cmap`.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TtfError {
    #[error("not a TrueType font")]
    BadMagic,
    #[error("missing '{0}' table")]
    MissingTable(&'static str),
    #[error("truncated '{0}' table")]
    Truncated(&'static str),
    #[error("no Unicode cmap subtable (format 4 or 12)")]
    NoUnicodeCmap,
}

/// A parsed TrueType font and its raw bytes.
#[derive(Debug, Clone)]
pub struct TrueTypeFont {
    data: Vec<u8>,
    pub units_per_em: u16,
    /// xMin, yMin, xMax, yMax in font units.
    pub bbox: [i16; 4],
    pub ascender: i16,
    pub descender: i16,
    advances: Vec<u16>,
    cmap: HashMap<u32, u16>,
}

impl TrueTypeFont {
    pub fn parse(data: Vec<u8>) -> Result<Self, TtfError> {
        let tables = TableDirectory::read(&data)?;

        let head = tables.get(&data, "head")?;
        let units_per_em = match read_u16(head, 18, "head")? {
            0 => 1000,
            n => n,
        };
        let bbox = [
            read_i16(head, 36, "head")?,
            read_i16(head, 38, "head")?,
            read_i16(head, 40, "head")?,
            read_i16(head, 42, "head")?,
        ];

        let hhea = tables.get(&data, "hhea")?;
        let ascender = read_i16(hhea, 4, "hhea")?;
        let descender = read_i16(hhea, 6, "hhea")?;
        let metric_count = read_u16(hhea, 34, "hhea")? as usize;

        let hmtx = tables.get(&data, "hmtx")?;
        let advances = (0..metric_count)
            .map(|i| read_u16(hmtx, i * 4, "hmtx"))
            .collect::<Result<Vec<_>, _>>()?;

        let cmap = parse_cmap(tables.get(&data, "cmap")?)?;

        Ok(Self {
            data,
            units_per_em,
            bbox,
            ascender,
            descender,
            advances,
            cmap,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Glyph for `c`, or 0 (`.notdef`) when the font has none.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.cmap.get(&(c as u32)).copied().unwrap_or(0)
    }

    /// Advance width of `gid` in font units. Glyphs past the last long metric
    /// share its advance.
    pub fn advance(&self, gid: u16) -> u16 {
        self.advances
            .get(gid as usize)
            .or_else(|| self.advances.last())
            .copied()
            .unwrap_or(0)
    }

    /// Scale a value in font units to PDF glyph space (1000 per em).
    pub fn to_pdf_units(&self, value: i32) -> i64 {
        i64::from(value) * 1000 / i64::from(self.units_per_em)
    }
}

struct TableDirectory {
    records: Vec<([u8; 4], usize, usize)>,
}

impl TableDirectory {
    fn read(data: &[u8]) -> Result<Self, TtfError> {
        let version = data
            .get(0..4)
            .ok_or(TtfError::BadMagic)?;
        if version != [0, 1, 0, 0] && version != b"true" {
            return Err(TtfError::BadMagic);
        }
        let count = read_u16(data, 4, "directory")? as usize;
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let base = 12 + i * 16;
            let tag: [u8; 4] = data
                .get(base..base + 4)
                .and_then(|t| t.try_into().ok())
                .ok_or(TtfError::Truncated("directory"))?;
            let offset = read_u32(data, base + 8, "directory")? as usize;
            let length = read_u32(data, base + 12, "directory")? as usize;
            records.push((tag, offset, length));
        }
        Ok(Self { records })
    }

    fn get<'a>(&self, data: &'a [u8], tag: &'static str) -> Result<&'a [u8], TtfError> {
        let (_, offset, length) = self
            .records
            .iter()
            .find(|(t, _, _)| t == tag.as_bytes())
            .ok_or(TtfError::MissingTable(tag))?;
        data.get(*offset..offset + length)
            .ok_or(TtfError::Truncated(tag))
    }
}

/// Build the code point to glyph map from the best Unicode subtable.
fn parse_cmap(cmap: &[u8]) -> Result<HashMap<u32, u16>, TtfError> {
    let count = read_u16(cmap, 2, "cmap")? as usize;
    let mut format4 = None;
    let mut format12 = None;

    for i in 0..count {
        let base = 4 + i * 8;
        let platform = read_u16(cmap, base, "cmap")?;
        let encoding = read_u16(cmap, base + 2, "cmap")?;
        let offset = read_u32(cmap, base + 4, "cmap")? as usize;
        let unicode = platform == 0 || (platform == 3 && matches!(encoding, 1 | 10));
        if !unicode {
            continue;
        }
        let sub = cmap.get(offset..).ok_or(TtfError::Truncated("cmap"))?;
        match read_u16(sub, 0, "cmap")? {
            4 if format4.is_none() => format4 = Some(sub),
            12 if format12.is_none() => format12 = Some(sub),
            _ => {}
        }
    }

    match (format12, format4) {
        (Some(sub), _) => parse_format12(sub),
        (None, Some(sub)) => parse_format4(sub),
        (None, None) => Err(TtfError::NoUnicodeCmap),
    }
}

fn parse_format4(sub: &[u8]) -> Result<HashMap<u32, u16>, TtfError> {
    let seg_count = read_u16(sub, 6, "cmap")? as usize / 2;
    let ends = 14;
    let starts = ends + seg_count * 2 + 2;
    let deltas = starts + seg_count * 2;
    let range_offsets = deltas + seg_count * 2;

    let mut map = HashMap::new();
    for seg in 0..seg_count {
        let end = read_u16(sub, ends + seg * 2, "cmap")?;
        let start = read_u16(sub, starts + seg * 2, "cmap")?;
        let delta = read_u16(sub, deltas + seg * 2, "cmap")?;
        let range_pos = range_offsets + seg * 2;
        let range_offset = read_u16(sub, range_pos, "cmap")? as usize;

        for code in start..=end {
            if code == 0xFFFF {
                break;
            }
            let gid = if range_offset == 0 {
                code.wrapping_add(delta)
            } else {
                let at = range_pos + range_offset + (code - start) as usize * 2;
                match read_u16(sub, at, "cmap")? {
                    0 => 0,
                    g => g.wrapping_add(delta),
                }
            };
            if gid != 0 {
                map.insert(u32::from(code), gid);
            }
        }
    }
    Ok(map)
}

fn parse_format12(sub: &[u8]) -> Result<HashMap<u32, u16>, TtfError> {
    let groups = read_u32(sub, 12, "cmap")? as usize;
    let mut map = HashMap::new();
    for g in 0..groups {
        let base = 16 + g * 12;
        let start = read_u32(sub, base, "cmap")?;
        let end = read_u32(sub, base + 4, "cmap")?;
        let first_glyph = read_u32(sub, base + 8, "cmap")?;
        for code in start..=end.min(0x10FFFF) {
            let gid = first_glyph.saturating_add(code - start);
            if let Ok(gid) = u16::try_from(gid) {
                if gid != 0 {
                    map.insert(code, gid);
                }
            }
        }
    }
    Ok(map)
}

fn read_u16(data: &[u8], at: usize, table: &'static str) -> Result<u16, TtfError> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(TtfError::Truncated(table))
}

fn read_i16(data: &[u8], at: usize, table: &'static str) -> Result<i16, TtfError> {
    read_u16(data, at, table).map(|v| v as i16)
}

fn read_u32(data: &[u8], at: usize, table: &'static str) -> Result<u32, TtfError> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(TtfError::Truncated(table))
}

/// Builds minimal fonts for tests: just the tables the parser reads.
#[cfg(test)]
pub(crate) mod testfont {
    /// `mappings` pairs characters with glyph ids; `advances[gid]` is the
    /// advance width of each glyph at 1000 units per em.
    pub fn build(mappings: &[(char, u16)], advances: &[u16]) -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&[0, 1, 0, 0]);
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());
        head[36..38].copy_from_slice(&(-100i16).to_be_bytes());
        head[38..40].copy_from_slice(&(-250i16).to_be_bytes());
        head[40..42].copy_from_slice(&1100i16.to_be_bytes());
        head[42..44].copy_from_slice(&900i16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&[0, 1, 0, 0]);
        hhea[4..6].copy_from_slice(&800i16.to_be_bytes());
        hhea[6..8].copy_from_slice(&(-200i16).to_be_bytes());
        hhea[34..36].copy_from_slice(&(advances.len() as u16).to_be_bytes());

        let mut maxp = vec![0u8; 6];
        maxp[0..4].copy_from_slice(&0x0000_5000u32.to_be_bytes());
        maxp[4..6].copy_from_slice(&(advances.len() as u16).to_be_bytes());

        let hmtx: Vec<u8> = advances
            .iter()
            .flat_map(|a| [a.to_be_bytes(), 0i16.to_be_bytes()].concat())
            .collect();

        let tables: [(&[u8; 4], Vec<u8>); 5] = [
            (b"cmap", cmap_format4(mappings)),
            (b"head", head),
            (b"hhea", hhea),
            (b"hmtx", hmtx),
            (b"maxp", maxp),
        ];

        let mut out = Vec::new();
        out.extend_from_slice(&[0, 1, 0, 0]);
        out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0; 6]);
        let mut offset = 12 + tables.len() * 16;
        for (tag, body) in &tables {
            out.extend_from_slice(*tag);
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            offset += body.len();
        }
        for (_, body) in &tables {
            out.extend_from_slice(body);
        }
        out
    }

    fn cmap_format4(mappings: &[(char, u16)]) -> Vec<u8> {
        let mut segs: Vec<(u16, u16)> = mappings.iter().map(|&(c, g)| (c as u16, g)).collect();
        segs.sort();
        let seg_count = segs.len() + 1;

        let mut sub = Vec::new();
        for v in [4u16, (16 + seg_count * 8) as u16, 0, (seg_count * 2) as u16, 0, 0, 0] {
            sub.extend_from_slice(&v.to_be_bytes());
        }
        for &(code, _) in &segs {
            sub.extend_from_slice(&code.to_be_bytes());
        }
        sub.extend_from_slice(&0xFFFFu16.to_be_bytes());
        sub.extend_from_slice(&0u16.to_be_bytes());
        for &(code, _) in &segs {
            sub.extend_from_slice(&code.to_be_bytes());
        }
        sub.extend_from_slice(&0xFFFFu16.to_be_bytes());
        for &(code, gid) in &segs {
            sub.extend_from_slice(&gid.wrapping_sub(code).to_be_bytes());
        }
        sub.extend_from_slice(&1u16.to_be_bytes());
        for _ in 0..seg_count {
            sub.extend_from_slice(&0u16.to_be_bytes());
        }

        let mut cmap = Vec::new();
        for v in [0u16, 1, 3, 1] {
            cmap.extend_from_slice(&v.to_be_bytes());
        }
        cmap.extend_from_slice(&12u32.to_be_bytes());
        cmap.extend_from_slice(&sub);
        cmap
    }
}
