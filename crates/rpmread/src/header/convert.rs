//! In-memory retrofits that upgrade legacy header encodings to the modern
//! form without touching the disk.

use crate::tags::{
    ENTRY_INFO_SIZE, HEADER_IMMUTABLE, REGION_TAG_COUNT, TagType, TAG_BASENAMES, TAG_DIRINDEXES,
    TAG_DIRNAMES, TAG_OLDFILENAMES,
};

use super::{Header, Region, Value};

/// Retrofit a truly ancient header that predates immutable regions: seal
/// the current entries under a synthesized region so downstream consumers
/// see the modern shape. No-op when a region already exists.
pub fn retrofit_v3(h: &mut Header) {
    if h.region_tag().is_some() {
        return;
    }

    // Serialize the entries into a fresh entry index and data segment,
    // with the region entry in front and its trailer at the end of data.
    let il = h.len() as u32 + 1;
    let mut pe = Vec::with_capacity(ENTRY_INFO_SIZE * il as usize);
    let mut data = Vec::new();
    let mut records = Vec::with_capacity(h.len());

    for entry in h.entries() {
        let ty = entry.value.tag_type();
        let align = ty.alignment() as usize;
        while data.len() % align != 0 {
            data.push(0);
        }
        let offset = data.len() as u32;
        encode_value(&mut data, &entry.value);
        records.push((entry.tag, ty as u32, offset, entry.value.count()));
    }

    let trailer_offset = data.len() as u32;
    data.extend_from_slice(&HEADER_IMMUTABLE.to_be_bytes());
    data.extend_from_slice(&(TagType::Bin as u32).to_be_bytes());
    data.extend_from_slice(&(-(ENTRY_INFO_SIZE as i32 * il as i32)).to_be_bytes());
    data.extend_from_slice(&REGION_TAG_COUNT.to_be_bytes());
    let rdl = data.len() as u32;

    push_record(
        &mut pe,
        HEADER_IMMUTABLE,
        TagType::Bin as u32,
        trailer_offset,
        REGION_TAG_COUNT,
    );
    for (tag, ty, offset, count) in records {
        push_record(&mut pe, tag, ty, offset, count);
    }

    let mut image = Vec::with_capacity(8 + pe.len() + data.len());
    image.extend_from_slice(&il.to_be_bytes());
    image.extend_from_slice(&rdl.to_be_bytes());
    image.extend_from_slice(&pe);
    image.extend_from_slice(&data);

    h.set_region(Region {
        tag: HEADER_IMMUTABLE,
        image,
    });
}

/// Replace a plain filename list with the compressed form: unique
/// directory names (order of first occurrence), base names, and per-file
/// directory indexes. No-op when the header has no plain list.
pub fn compress_filelist(h: &mut Header) {
    let Some(entry) = h.get(TAG_OLDFILENAMES) else {
        return;
    };
    let Value::StringArray(paths) = &entry.value else {
        return;
    };
    let paths = paths.clone();

    let mut dirnames: Vec<Vec<u8>> = Vec::new();
    let mut basenames: Vec<Vec<u8>> = Vec::new();
    let mut dirindexes: Vec<u32> = Vec::new();

    for path in &paths {
        // Directory part keeps its trailing slash; a bare name gets the
        // empty directory.
        let split = path
            .iter()
            .rposition(|&b| b == b'/')
            .map(|i| i + 1)
            .unwrap_or(0);
        let (dir, base) = path.split_at(split);
        let idx = match dirnames.iter().position(|d| d == dir) {
            Some(i) => i,
            None => {
                dirnames.push(dir.to_vec());
                dirnames.len() - 1
            }
        };
        dirindexes.push(idx as u32);
        basenames.push(base.to_vec());
    }

    h.put(TAG_BASENAMES, Value::StringArray(basenames));
    h.put(TAG_DIRNAMES, Value::StringArray(dirnames));
    h.put(TAG_DIRINDEXES, Value::Int32(dirindexes));
    h.remove(TAG_OLDFILENAMES);
}

fn push_record(pe: &mut Vec<u8>, tag: u32, ty: u32, offset: u32, count: u32) {
    pe.extend_from_slice(&tag.to_be_bytes());
    pe.extend_from_slice(&ty.to_be_bytes());
    pe.extend_from_slice(&offset.to_be_bytes());
    pe.extend_from_slice(&count.to_be_bytes());
}

fn encode_value(data: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Char(v) | Value::Int8(v) | Value::Bin(v) => data.extend_from_slice(v),
        Value::Int16(v) => {
            for x in v {
                data.extend_from_slice(&x.to_be_bytes());
            }
        }
        Value::Int32(v) => {
            for x in v {
                data.extend_from_slice(&x.to_be_bytes());
            }
        }
        Value::Int64(v) => {
            for x in v {
                data.extend_from_slice(&x.to_be_bytes());
            }
        }
        Value::String(s) => {
            data.extend_from_slice(s);
            data.push(0);
        }
        Value::StringArray(v) | Value::I18nString(v) => {
            for s in v {
                data.extend_from_slice(s);
                data.push(0);
            }
        }
    }
}
