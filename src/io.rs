use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{DatError, Result};
use crate::field::{Field, FieldType, FieldValue};
use crate::record::Record;
use crate::schema::{HEADER_SIZE, RecordKind};

/// Options for reading/writing avatar DAT files
#[derive(Debug, Clone, Default)]
pub struct IoOptions {
    /// Text encoding of the name and description slots
    pub encoding: Encoding,
}

/// String encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// UTF-8, falling back to Windows-1252 for bytes that are not valid UTF-8
    #[default]
    Utf8,
    /// EUC-KR, as used by Korean builds of the client
    EucKr,
    /// Windows-1252 (Latin-1 superset)
    Windows1252,
}

impl Encoding {
    /// All encodings, in menu order
    pub const ALL: [Encoding; 3] = [Encoding::Utf8, Encoding::EucKr, Encoding::Windows1252];

    /// Human readable name
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::EucKr => "EUC-KR",
            Encoding::Windows1252 => "Windows-1252",
        }
    }
}

impl IoOptions {
    /// Options for Korean client files
    pub fn korean() -> Self {
        Self {
            encoding: Encoding::EucKr,
        }
    }
}

/// The decoded contents of one avatar DAT file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatFile {
    /// Kind of records held by the file
    pub kind: RecordKind,
    /// File header, kept verbatim
    pub header: [u8; HEADER_SIZE],
    /// Records in file order
    pub records: Vec<Record>,
}

impl DatFile {
    /// Create a file of the given kind with a zeroed header
    pub fn new(kind: RecordKind, records: Vec<Record>) -> Self {
        Self {
            kind,
            header: [0; HEADER_SIZE],
            records,
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the file holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size in bytes of the encoded file
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.records.len() * self.kind.record_size()
    }
}

/// Decode an avatar DAT file from a byte buffer
///
/// # Arguments
/// - `data` - The byte buffer containing the whole file
/// - `kind` - The record kind the file holds
/// - `options` - Options for string encoding
///
/// # Errors
/// - `DatError::BufferTooSmall` if the buffer cannot hold the header
/// - `DatError::TruncatedRecord` if the payload is not a whole number of records
///
/// # Returns
/// A `DatFile` with one record per block, in file order
pub fn from_buffer(data: &[u8], kind: RecordKind, options: &IoOptions) -> Result<DatFile> {
    if data.len() < HEADER_SIZE {
        return Err(DatError::BufferTooSmall {
            expected: HEADER_SIZE,
            got: data.len(),
        });
    }

    let layout = kind.layout();
    let payload = data.len() - HEADER_SIZE;
    let remainder = payload % layout.record_size;

    if remainder != 0 {
        return Err(DatError::TruncatedRecord {
            kind,
            record_size: layout.record_size,
            payload,
            remainder,
        });
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&data[..HEADER_SIZE]);

    let records = data[HEADER_SIZE..]
        .chunks_exact(layout.record_size)
        .map(|block| read_record(block, kind, options))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        %kind,
        records = records.len(),
        record_size = layout.record_size,
        "decoded DAT buffer"
    );

    Ok(DatFile {
        kind,
        header,
        records,
    })
}

/// Read an avatar DAT file from disk
///
/// # Arguments
/// - `path` - The path to the DAT file to read
/// - `kind` - The record kind the file holds
/// - `options` - Options for string encoding
///
/// # Returns
/// The decoded `DatFile`, or an error if the file cannot be read or parsed
pub fn from_file<P: AsRef<Path>>(path: P, kind: RecordKind, options: &IoOptions) -> Result<DatFile> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    from_buffer(&data, kind, options)
}

/// Encode an avatar DAT file into a byte buffer
///
/// Each record is written over a copy of the block it was decoded from, so
/// bytes outside the mapped fields are preserved. A field whose value still
/// decodes to the same thing from the original bytes is left untouched.
///
/// # Arguments
/// - `file` - The file contents to encode
/// - `options` - Options for string encoding
///
/// # Errors
/// - `DatError::ValueOutOfRange` / `DatError::StringTooLong` if a value does not fit its slot
/// - `DatError::TypeMismatch` if a value has the wrong kind for its field
/// - `DatError::EncodingError` if text cannot be represented in the chosen encoding
pub fn to_buffer(file: &DatFile, options: &IoOptions) -> Result<Vec<u8>> {
    let layout = file.kind.layout();
    let mut buffer = Vec::with_capacity(file.encoded_len());
    buffer.extend_from_slice(&file.header);

    for record in &file.records {
        let mut block = record.raw().to_vec();
        block.resize(layout.record_size, 0);

        for field in layout.fields {
            if let Some(value) = record.get(field.id) {
                write_field_value(&mut block, field, value, options)?;
            }
        }

        buffer.extend_from_slice(&block);
    }

    debug!(kind = %file.kind, records = file.records.len(), bytes = buffer.len(), "encoded DAT buffer");

    Ok(buffer)
}

/// Write an avatar DAT file to disk
///
/// The whole buffer is encoded before the file is created, so an encoding
/// failure never leaves a half-written file behind.
pub fn to_file<P: AsRef<Path>>(file: &DatFile, path: P, options: &IoOptions) -> Result<()> {
    let buffer = to_buffer(file, options)?;
    let mut out = File::create(path)?;
    out.write_all(&buffer)?;
    out.flush()?;
    Ok(())
}

/// Decode every mapped field of one record block
fn read_record(block: &[u8], kind: RecordKind, options: &IoOptions) -> Result<Record> {
    let layout = kind.layout();
    let mut values = IndexMap::with_capacity(layout.fields.len());

    for field in layout.fields {
        let value = read_field_value(block, field, options.encoding)?;
        values.insert(field.id, value);
    }

    Ok(Record::from_parts(kind, values, block.to_vec()))
}

fn read_field_value(block: &[u8], field: &Field, encoding: Encoding) -> Result<FieldValue> {
    let bytes = &block[field.span()];

    let value = match field.field_type {
        FieldType::U8 => FieldValue::Int(bytes[0] as i64),
        FieldType::Flag => FieldValue::Int((bytes[0] != 0) as i64),
        FieldType::U32 => FieldValue::Int(LittleEndian::read_u32(bytes) as i64),
        FieldType::I32 => FieldValue::Int(LittleEndian::read_i32(bytes) as i64),
        FieldType::Str(_) => FieldValue::Text(read_text(bytes, encoding, field.name())),
    };

    Ok(value)
}

/// Decode a NUL-padded text slot
fn read_text(slot: &[u8], encoding: Encoding, field: &str) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    decode_string(&slot[..end], encoding, field)
}

/// Re-read the untouched text of a decoded file in another encoding
///
/// A text value that still equals its slot decoded with `from` has not been
/// edited, so it is replaced by the slot decoded with `to`. Edited text is
/// kept as entered. Saving with `to` afterwards leaves untouched slots
/// byte-for-byte as they were read.
///
/// # Returns
/// The number of values that were re-read
pub fn redecode_text(file: &mut DatFile, from: Encoding, to: Encoding) -> usize {
    if from == to {
        return 0;
    }

    let layout = file.kind.layout();
    let mut redecoded = 0;

    for record in &mut file.records {
        for field in layout.fields {
            if !matches!(field.field_type, FieldType::Str(_)) {
                continue;
            }
            let Some(slot) = record.raw().get(field.span()) else {
                continue;
            };

            let before = read_text(slot, from, field.name());
            if record.get_str(field.id) != Some(before.as_str()) {
                continue;
            }

            let after = read_text(slot, to, field.name());
            if after != before {
                record.set(field.id, FieldValue::Text(after));
                redecoded += 1;
            }
        }
    }

    debug!(kind = %file.kind, from = from.label(), to = to.label(), redecoded, "re-read text slots");
    redecoded
}

/// Write one field value into a record block
///
/// # Arguments
/// - `block` - The record block to update
/// - `field` - The field descriptor giving offset and type
/// - `value` - The value to store
/// - `options` - Options for string encoding
///
/// # Returns
/// Ok(()) when the value was stored (or already matched), or a format error when it does not fit
fn write_field_value(
    block: &mut [u8],
    field: &Field,
    value: &FieldValue,
    options: &IoOptions,
) -> Result<()> {
    if !value.is_compatible_with(field.field_type) {
        return Err(DatError::TypeMismatch {
            field: field.name(),
            expected: field.field_type.type_name(),
            got: value.type_name(),
        });
    }

    // The slot already holds this value, even if it would not re-encode to the same bytes
    if read_field_value(block, field, options.encoding)? == *value {
        return Ok(());
    }

    let encoded = encode_value(field, value, options.encoding)?;

    let slot = &mut block[field.span()];
    slot.fill(0);
    slot[..encoded.len()].copy_from_slice(&encoded);

    Ok(())
}

fn encode_value(field: &Field, value: &FieldValue, encoding: Encoding) -> Result<Vec<u8>> {
    match (field.field_type, value) {
        (FieldType::Str(width), FieldValue::Text(s)) => {
            let bytes = encode_string(s, encoding)?;
            if bytes.len() > width {
                return Err(DatError::StringTooLong {
                    field: field.name(),
                    len: bytes.len(),
                    width,
                });
            }
            Ok(bytes)
        }
        (field_type, FieldValue::Int(v)) => {
            let (min, max) = field_type.range().unwrap_or((0, 0));
            if *v < min || *v > max {
                return Err(DatError::ValueOutOfRange {
                    field: field.name(),
                    value: *v,
                    min,
                    max,
                });
            }

            let mut bytes = vec![0u8; field_type.size()];
            match field_type {
                FieldType::U32 => LittleEndian::write_u32(&mut bytes, *v as u32),
                FieldType::I32 => LittleEndian::write_i32(&mut bytes, *v as i32),
                _ => bytes[0] = *v as u8,
            }
            Ok(bytes)
        }
        _ => Err(DatError::TypeMismatch {
            field: field.name(),
            expected: field.field_type.type_name(),
            got: value.type_name(),
        }),
    }
}

/// Decode slot bytes (already cut at the first NUL) into a string
///
/// Decoding never fails: undecodable bytes are replaced and a warning is logged.
fn decode_string(bytes: &[u8], encoding: Encoding, field: &str) -> String {
    match encoding {
        Encoding::Utf8 => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                warn!(field, "invalid UTF-8 in text slot, reading as Windows-1252");
                let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
                decoded.into_owned()
            }
        },
        Encoding::EucKr => {
            let (decoded, had_errors) = encoding_rs::EUC_KR.decode_without_bom_handling(bytes);
            if had_errors {
                warn!(field, "malformed EUC-KR sequence in text slot");
            }
            decoded.into_owned()
        }
        Encoding::Windows1252 => {
            let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded.into_owned()
        }
    }
}

/// Encode a string into bytes using the specified encoding
///
/// # Errors
/// - `DatError::EncodingError` if the string has characters the encoding cannot represent
pub fn encode_string(s: &str, encoding: Encoding) -> Result<Vec<u8>> {
    let codec = match encoding {
        Encoding::Utf8 => return Ok(s.as_bytes().to_vec()),
        Encoding::EucKr => encoding_rs::EUC_KR,
        Encoding::Windows1252 => encoding_rs::WINDOWS_1252,
    };

    let (encoded, _, had_errors) = codec.encode(s);
    if had_errors {
        return Err(DatError::EncodingError(format!(
            "{:?} cannot be represented in {}",
            s,
            encoding.label()
        )));
    }

    Ok(encoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldId;
    use crate::schema::{EXITEM_RECORD_SIZE, NORMAL_RECORD_SIZE};
    use proptest::prelude::*;

    fn sample_body() -> DatFile {
        let mut first = Record::new(RecordKind::Body);
        first.set(FieldId::AvatarCode, 1001u32.into());
        first.set(FieldId::Name, "Red Cap".into());
        first.set(FieldId::ShowInShop, 1i64.into());
        first.set(FieldId::PriceEternalGold, 12_500u32.into());
        first.set(FieldId::Attack, (-3i32).into());

        let mut second = Record::new(RecordKind::Body);
        second.set(FieldId::AvatarCode, 1002u32.into());
        second.set(FieldId::Description, "A plain shirt".into());

        DatFile::new(RecordKind::Body, vec![first, second])
    }

    #[test]
    fn test_field_offsets_on_disk() {
        let data = to_buffer(&sample_body(), &IoOptions::default()).unwrap();
        assert_eq!(data.len(), HEADER_SIZE + 2 * NORMAL_RECORD_SIZE);

        let rec = &data[HEADER_SIZE..HEADER_SIZE + NORMAL_RECORD_SIZE];
        assert_eq!(LittleEndian::read_u32(&rec[0..4]), 1001);
        assert_eq!(&rec[12..19], b"Red Cap");
        assert_eq!(rec[19], 0);
        assert_eq!(rec[35], 1);
        assert_eq!(LittleEndian::read_u32(&rec[88..92]), 12_500);
        assert_eq!(LittleEndian::read_i32(&rec[108..112]), -3);
    }

    #[test]
    fn test_round_trip_preserves_unmapped_bytes() {
        let mut data = vec![0xAB, 0xCD, 0x02, 0x00];
        let mut block = vec![0u8; EXITEM_RECORD_SIZE];
        block[0..4].copy_from_slice(&77u32.to_le_bytes());
        block[20..25].copy_from_slice(b"Wings");
        block[43] = 0x05; // non-canonical "true"
        block[200] = 0xEE;
        block[683] = 0x11;
        data.extend_from_slice(&block);
        data.extend_from_slice(&block);

        let options = IoOptions::default();
        let file = from_buffer(&data, RecordKind::ExItem, &options).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.header, [0xAB, 0xCD, 0x02, 0x00]);
        assert_eq!(file.records[0].get_str(FieldId::Name), Some("Wings"));
        assert_eq!(file.records[0].get_int(FieldId::ShowInShop), Some(1));

        assert_eq!(to_buffer(&file, &options).unwrap(), data);
    }

    #[test]
    fn test_changed_string_clears_slot() {
        let mut data = vec![0u8; HEADER_SIZE];
        let mut block = vec![0u8; NORMAL_RECORD_SIZE];
        block[12..31].copy_from_slice(b"Sixteen Characters!");
        data.extend_from_slice(&block);

        let options = IoOptions::default();
        let mut file = from_buffer(&data, RecordKind::Head, &options).unwrap();
        file.records[0].set(FieldId::Name, "Hat".into());

        let out = to_buffer(&file, &options).unwrap();
        let rec = &out[HEADER_SIZE..];
        assert_eq!(&rec[12..15], b"Hat");
        assert!(rec[15..31].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let data = vec![0u8; HEADER_SIZE + NORMAL_RECORD_SIZE + 10];
        let err = from_buffer(&data, RecordKind::Body, &IoOptions::default()).unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(
            err,
            DatError::TruncatedRecord {
                record_size: NORMAL_RECORD_SIZE,
                remainder: 10,
                ..
            }
        ));

        let err = from_buffer(&[0, 0], RecordKind::Body, &IoOptions::default()).unwrap_err();
        assert!(matches!(err, DatError::BufferTooSmall { expected: 4, got: 2 }));
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = from_buffer(&[1, 0, 0, 0], RecordKind::Flag, &IoOptions::default()).unwrap();
        assert!(file.is_empty());
        assert_eq!(to_buffer(&file, &IoOptions::default()).unwrap(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_encode_rejects_values_that_do_not_fit() {
        let options = IoOptions::default();

        let mut file = sample_body();
        file.records[1].set(FieldId::Name, "This name is far too long".into());
        let err = to_buffer(&file, &options).unwrap_err();
        assert!(matches!(err, DatError::StringTooLong { width: 19, len: 25, .. }));

        let mut file = sample_body();
        file.records[0].set(FieldId::SellWeekly, 256i64.into());
        assert!(matches!(
            to_buffer(&file, &options).unwrap_err(),
            DatError::ValueOutOfRange { value: 256, max: 255, .. }
        ));

        let mut file = sample_body();
        file.records[0].set(FieldId::PriceWeeklyCash, (-1i64).into());
        assert!(to_buffer(&file, &options).unwrap_err().is_format_error());

        let mut file = sample_body();
        file.records[0].set(FieldId::Attack, "strong".into());
        assert!(matches!(
            to_buffer(&file, &options).unwrap_err(),
            DatError::TypeMismatch { field: "attack", .. }
        ));
    }

    #[test]
    fn test_euc_kr_names() {
        let options = IoOptions::korean();
        let mut record = Record::new(RecordKind::Glass);
        record.set(FieldId::Name, "선글라스".into());
        let file = DatFile::new(RecordKind::Glass, vec![record]);

        let data = to_buffer(&file, &options).unwrap();
        // four Hangul syllables, two bytes each
        assert_eq!(data[HEADER_SIZE + 12 + 8], 0);

        let decoded = from_buffer(&data, RecordKind::Glass, &options).unwrap();
        assert_eq!(decoded, file);

        assert!(matches!(
            encode_string("日本語 ☃", Encoding::Windows1252),
            Err(DatError::EncodingError(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_falls_back() {
        let mut data = vec![0u8; HEADER_SIZE];
        let mut block = vec![0u8; NORMAL_RECORD_SIZE];
        block[12..16].copy_from_slice(&[b'C', 0xE9, b'p', b'e']);
        data.extend_from_slice(&block);

        let file = from_buffer(&data, RecordKind::Body, &IoOptions::default()).unwrap();
        assert_eq!(file.records[0].get_str(FieldId::Name), Some("Cépe"));
        assert_eq!(to_buffer(&file, &IoOptions::default()).unwrap(), data);

        // a full slot of Latin-1 text is wider than 19 bytes once in UTF-8
        block[12..31].fill(0xE9);
        data.truncate(HEADER_SIZE);
        data.extend_from_slice(&block);
        let file = from_buffer(&data, RecordKind::Body, &IoOptions::default()).unwrap();
        assert_eq!(file.records[0].get_str(FieldId::Name), Some("é".repeat(19).as_str()));
        assert_eq!(to_buffer(&file, &IoOptions::default()).unwrap(), data);
    }

    #[test]
    fn test_redecode_text_only_touches_unedited_slots() {
        let korean = IoOptions::korean();
        let mut first = Record::new(RecordKind::Head);
        first.set(FieldId::Name, "모자".into());
        let mut second = Record::new(RecordKind::Head);
        second.set(FieldId::Name, "왕관".into());
        let data = to_buffer(&DatFile::new(RecordKind::Head, vec![first, second]), &korean).unwrap();

        let mut file = from_buffer(&data, RecordKind::Head, &korean).unwrap();
        file.records[1].set(FieldId::Name, "Crown".into());

        assert_eq!(redecode_text(&mut file, Encoding::EucKr, Encoding::Windows1252), 1);
        assert_ne!(file.records[0].get_str(FieldId::Name), Some("모자"));
        assert_eq!(file.records[1].get_str(FieldId::Name), Some("Crown"));

        let out = to_buffer(&file, &IoOptions { encoding: Encoding::Windows1252 }).unwrap();
        let name = HEADER_SIZE + 12..HEADER_SIZE + 31;
        assert_eq!(out[name.clone()], data[name]);

        assert_eq!(redecode_text(&mut file, Encoding::Windows1252, Encoding::EucKr), 1);
        assert_eq!(file.records[0].get_str(FieldId::Name), Some("모자"));
        assert_eq!(redecode_text(&mut file, Encoding::EucKr, Encoding::EucKr), 0);
    }

    fn arb_record(kind: RecordKind) -> impl Strategy<Value = Record> {
        let fields = kind.layout().fields;
        let values: Vec<BoxedStrategy<FieldValue>> = fields
            .iter()
            .map(|f| match f.field_type {
                FieldType::Str(width) => {
                    prop::string::string_regex(&format!("[a-zA-Z0-9 ]{{0,{}}}", width))
                        .unwrap()
                        .prop_map(FieldValue::Text)
                        .boxed()
                }
                other => {
                    let (min, max) = other.range().unwrap();
                    (min..=max).prop_map(FieldValue::Int).boxed()
                }
            })
            .collect();

        values.prop_map(move |values| {
            let mut record = Record::new(kind);
            for (field, value) in fields.iter().zip(values) {
                record.set(field.id, value);
            }
            record
        })
    }

    fn arb_file() -> impl Strategy<Value = DatFile> {
        prop::sample::select(RecordKind::ALL.to_vec()).prop_flat_map(|kind| {
            prop::collection::vec(arb_record(kind), 0..6)
                .prop_map(move |records| DatFile::new(kind, records))
        })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(file in arb_file()) {
            let options = IoOptions::default();
            let data = to_buffer(&file, &options).unwrap();
            prop_assert_eq!(data.len(), file.encoded_len());

            let decoded = from_buffer(&data, file.kind, &options).unwrap();
            prop_assert_eq!(&decoded, &file);
            prop_assert_eq!(to_buffer(&decoded, &options).unwrap(), data);
        }
    }
}
