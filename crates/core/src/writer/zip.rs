//! STORE-only ZIP archive writer.

use byteorder::{LittleEndian, WriteBytesExt};
use rustc_hash::FxHashSet;

use crate::codec::checksum::crc32;
use crate::error::{PdfError, Result};
use crate::utils::sanitize_filename;

const LOCAL_HEADER: u32 = 0x0403_4b50;
const CENTRAL_HEADER: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
const VERSION: u16 = 20;
/// General purpose flag bit 11: names are UTF-8.
const FLAG_UTF8: u16 = 1 << 11;
/// 1980-01-01 in DOS date format; time is midnight.
const DOS_DATE: u16 = (1 << 5) | 1;
const DOS_TIME: u16 = 0;

/// Hands out unique archive names: `a.txt`, `a (2).txt`, `a (3).txt`, ...
///
/// Directory components are stripped first, so every entry lands at the
/// archive root.
#[derive(Debug, Default)]
pub struct NameDisambiguator {
    used: FxHashSet<String>,
}

impl NameDisambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> String {
        let name = sanitize_filename(name);
        if self.used.insert(name.clone()) {
            return name;
        }
        let (stem, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => name.split_at(dot),
            _ => (name.as_str(), ""),
        };
        let mut n = 2usize;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// One written entry, as recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: String,
    pub crc32: u32,
    pub size: u32,
    offset: u32,
}

/// Builds an archive in memory. Entries are stored uncompressed.
#[derive(Debug, Default)]
pub struct ZipWriter {
    out: Vec<u8>,
    entries: Vec<ZipEntry>,
    names: NameDisambiguator,
}

fn too_large(what: &str) -> PdfError {
    PdfError::InvalidArgument(format!("{what} exceeds the ZIP limit"))
}

impl ZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Add a file and return the name it was stored under.
    pub fn add(&mut self, name: &str, data: &[u8]) -> Result<String> {
        if self.entries.len() >= usize::from(u16::MAX) {
            return Err(too_large("entry count"));
        }
        let size = u32::try_from(data.len()).map_err(|_| too_large("entry size"))?;
        let offset = u32::try_from(self.out.len()).map_err(|_| too_large("archive size"))?;
        let name = self.names.claim(name);
        let name_len = u16::try_from(name.len()).map_err(|_| too_large("entry name"))?;
        let crc = crc32(data);

        let out = &mut self.out;
        out.write_u32::<LittleEndian>(LOCAL_HEADER)?;
        out.write_u16::<LittleEndian>(VERSION)?;
        out.write_u16::<LittleEndian>(FLAG_UTF8)?;
        out.write_u16::<LittleEndian>(0)?; // STORE
        out.write_u16::<LittleEndian>(DOS_TIME)?;
        out.write_u16::<LittleEndian>(DOS_DATE)?;
        out.write_u32::<LittleEndian>(crc)?;
        out.write_u32::<LittleEndian>(size)?;
        out.write_u32::<LittleEndian>(size)?;
        out.write_u16::<LittleEndian>(name_len)?;
        out.write_u16::<LittleEndian>(0)?;
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        self.entries.push(ZipEntry {
            name: name.clone(),
            crc32: crc,
            size,
            offset,
        });
        Ok(name)
    }

    /// Write the central directory and return the archive bytes.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let dir_offset = u32::try_from(self.out.len()).map_err(|_| too_large("archive size"))?;
        let out = &mut self.out;
        for entry in &self.entries {
            out.write_u32::<LittleEndian>(CENTRAL_HEADER)?;
            out.write_u16::<LittleEndian>(VERSION)?; // made by
            out.write_u16::<LittleEndian>(VERSION)?; // needed
            out.write_u16::<LittleEndian>(FLAG_UTF8)?;
            out.write_u16::<LittleEndian>(0)?;
            out.write_u16::<LittleEndian>(DOS_TIME)?;
            out.write_u16::<LittleEndian>(DOS_DATE)?;
            out.write_u32::<LittleEndian>(entry.crc32)?;
            out.write_u32::<LittleEndian>(entry.size)?;
            out.write_u32::<LittleEndian>(entry.size)?;
            out.write_u16::<LittleEndian>(entry.name.len() as u16)?;
            out.write_u16::<LittleEndian>(0)?; // extra
            out.write_u16::<LittleEndian>(0)?; // comment
            out.write_u16::<LittleEndian>(0)?; // disk
            out.write_u16::<LittleEndian>(0)?; // internal attributes
            out.write_u32::<LittleEndian>(0)?; // external attributes
            out.write_u32::<LittleEndian>(entry.offset)?;
            out.extend_from_slice(entry.name.as_bytes());
        }
        let dir_size = u32::try_from(out.len())
            .map_err(|_| too_large("archive size"))?
            - dir_offset;
        let count = self.entries.len() as u16;

        out.write_u32::<LittleEndian>(END_OF_CENTRAL_DIR)?;
        out.write_u16::<LittleEndian>(0)?;
        out.write_u16::<LittleEndian>(0)?;
        out.write_u16::<LittleEndian>(count)?;
        out.write_u16::<LittleEndian>(count)?;
        out.write_u32::<LittleEndian>(dir_size)?;
        out.write_u32::<LittleEndian>(dir_offset)?;
        out.write_u16::<LittleEndian>(0)?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disambiguator() {
        let mut names = NameDisambiguator::new();
        assert_eq!(names.claim("report.pdf"), "report.pdf");
        assert_eq!(names.claim("report.pdf"), "report (2).pdf");
        assert_eq!(names.claim("dir/report.pdf"), "report (3).pdf");
        assert_eq!(names.claim("README"), "README");
        assert_eq!(names.claim("README"), "README (2)");
        assert_eq!(names.claim("../.profile"), "profile");
        assert_eq!(names.claim("a/b/.profile"), "profile (2)");
    }

    #[test]
    fn test_empty_archive_is_just_the_end_record() {
        let zip = ZipWriter::new().finish().unwrap();
        assert_eq!(zip.len(), 22);
        assert_eq!(&zip[..4], b"PK\x05\x06");
    }

    #[test]
    fn test_local_header_fields() {
        let mut writer = ZipWriter::new();
        assert_eq!(writer.add("a.txt", b"hello").unwrap(), "a.txt");
        let zip = writer.finish().unwrap();
        assert_eq!(&zip[..4], b"PK\x03\x04");
        assert_eq!(u16::from_le_bytes([zip[6], zip[7]]), FLAG_UTF8);
        assert_eq!(u16::from_le_bytes([zip[8], zip[9]]), 0);
        assert_eq!(u16::from_le_bytes([zip[12], zip[13]]), 0x0021);
        assert_eq!(u32::from_le_bytes(zip[14..18].try_into().unwrap()), crc32(b"hello"));
        assert_eq!(&zip[30..35], b"a.txt");
        assert_eq!(&zip[35..40], b"hello");
    }
}
