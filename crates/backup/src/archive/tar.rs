use crate::cursor::{EntryCursor, ReadSeek, RecordEntry, check_entry_name};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Read, Seek, SeekFrom};
use time::OffsetDateTime;

struct Indexed {
    entry: RecordEntry,
    offset: u64,
    size: u64,
}

/// Tar archives are only ever read.
///
/// The archive is indexed once up front; every entry is then opened by
/// seeking straight to its data.
pub struct TarCursor {
    source: Box<dyn ReadSeek>,
    index: Vec<Indexed>,
    position: usize,
}

impl TarCursor {
    pub fn new(mut source: Box<dyn ReadSeek>) -> Result<Self> {
        let mut index = Vec::new();
        let mut archive = tar::Archive::new(&mut source);
        for entry in archive.entries_with_seek().or_raise(|| ErrorKind::invalid_header())? {
            let entry = entry.or_raise(|| ErrorKind::invalid_header())?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path().or_raise(|| ErrorKind::invalid_header())?.to_string_lossy().into_owned();
            check_entry_name(&name)?;
            let modified = entry
                .header()
                .mtime()
                .ok()
                .and_then(|mtime| i64::try_from(mtime).ok())
                .and_then(|mtime| OffsetDateTime::from_unix_timestamp(mtime).ok());
            let size = entry.size();
            let offset = entry.raw_file_position();
            index.push(Indexed { entry: RecordEntry::new(name, modified, Some(size)), offset, size });
        }
        drop(archive);
        tracing::debug!(entries = index.len(), "tar archive indexed");
        Ok(Self { source, index, position: 0 })
    }
}

impl EntryCursor for TarCursor {
    fn next_entry(&mut self) -> Result<Option<RecordEntry>> {
        let entry = self.index.get(self.position).map(|indexed| indexed.entry.clone());
        self.position = (self.position + 1).min(self.index.len() + 1);
        Ok(entry)
    }

    fn open_entry(&mut self) -> Result<Box<dyn Read + '_>> {
        let indexed = self.position.checked_sub(1).and_then(|current| self.index.get(current));
        let Some(&Indexed { offset, size, .. }) = indexed else {
            exn::bail!(ErrorKind::Io);
        };
        self.source.seek(SeekFrom::Start(offset)).or_raise(|| ErrorKind::Io)?;
        Ok(Box::new((&mut self.source).take(size)))
    }

    fn restart(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_record::RecordType;
    use std::io::Cursor;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, body) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(1_700_000_000);
            builder.append_data(&mut header, name, *body).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_entries_opened_in_any_order() {
        let data = archive(&[("styles.xml", b"<styles/>"), ("books.csv", b"title\nDune\n")]);
        let mut cursor = TarCursor::new(Box::new(Cursor::new(data))).unwrap();

        let books = cursor.seek(&|e| e.record_type == RecordType::Books).unwrap().unwrap();
        assert_eq!(books.modified.map(OffsetDateTime::unix_timestamp), Some(1_700_000_000));
        let mut body = String::new();
        cursor.open_entry().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "title\nDune\n");

        cursor.restart().unwrap();
        cursor.next_entry().unwrap();
        let mut body = String::new();
        cursor.open_entry().unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "<styles/>");
        assert!(cursor.next_entry().unwrap().is_some());
        assert!(cursor.next_entry().unwrap().is_none());
        assert!(cursor.open_entry().is_err());
    }
}
