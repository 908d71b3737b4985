//! Body decoding: turning on-disk rows of one element into the packed row
//! block, for all three encodings.
//!
//! All three paths fill the same layout: scalars land native-endian at
//! their aligned slot, a variable-length list occupies an 8 byte slot
//! `(count: u32, byte offset: u32)` pointing into a side payload arena,
//! and a list converted to fixed size `n` lands as `n` inline items (the
//! on-disk count is validated and discarded). The two binary entry points
//! (little/big endian) select between a native and a byte-swapping decode
//! depending on the host endianness.

use std::convert::TryFrom;
use std::io::Read;

use byteorder::{ByteOrder, NativeEndian};

use crate::{
    Encoding,
    error::Error,
    parse::{Buffer, MAX_BUFFER_SIZE},
    schema::{ElementDef, PropertyDef, PropertyType, RowLayout},
};


/// The fully decoded rows of one loaded element.
#[derive(Debug, Clone)]
pub(crate) struct RowBlock {
    /// `count` packed rows of `layout.stride` bytes each, native endian.
    pub rows: Vec<u8>,

    /// Concatenated list payloads in decode order, native endian.
    pub list_data: Vec<u8>,

    pub layout: RowLayout,

    /// Number of rows (equals the element's declared count).
    pub count: usize,
}

impl RowBlock {
    pub(crate) fn row(&self, r: usize) -> &[u8] {
        &self.rows[r * self.layout.stride..(r + 1) * self.layout.stride]
    }

    /// Reads the `(count, byte offset)` pair of a list slot.
    pub(crate) fn list_entry(&self, r: usize, slot_offset: usize) -> (u32, u32) {
        let slot = &self.row(r)[slot_offset..slot_offset + 8];
        (NativeEndian::read_u32(&slot[..4]), NativeEndian::read_u32(&slot[4..]))
    }
}

/// Decodes all rows of `def` from the stream into a new `RowBlock`.
pub(crate) fn load_block<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    encoding: Encoding,
) -> Result<RowBlock, Error> {
    let layout = def.layout();

    let count = usize::try_from(def.count)
        .ok()
        .filter(|c| c.checked_mul(layout.stride).is_some())
        .ok_or_else(|| Error::MalformedHeader {
            msg: format!("element '{}' is too large to load", def.name),
            offset: 0,
        })?;

    let mut block = RowBlock {
        rows: vec![0; count * layout.stride],
        list_data: Vec::new(),
        layout,
        count,
    };

    if encoding != Encoding::Ascii && block.layout.verbatim {
        // Fixed rows of plain scalars: bulk-copy each on-disk row and fix
        // the endianness in place if it differs from the host's.
        load_block_verbatim(buf, def, encoding, &mut block)?;
        return Ok(block);
    }

    let decode_row = match encoding {
        Encoding::Ascii => decode_row_ascii::<R>,
        Encoding::BinaryLittleEndian => decode_row_ble::<R>,
        Encoding::BinaryBigEndian => decode_row_bbe::<R>,
    };

    let stride = block.layout.stride;
    for r in 0..count {
        let row = &mut block.rows[r * stride..(r + 1) * stride];
        decode_row(buf, def, &block.layout.offsets, row, &mut block.list_data)?;
    }

    Ok(block)
}

fn load_block_verbatim<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    encoding: Encoding,
    block: &mut RowBlock,
) -> Result<(), Error> {
    let stride = block.layout.stride;

    // Ranges of multi-byte scalars that need their bytes reversed when the
    // file endianness differs from the host's.
    let mut swaps = Vec::new();
    if encoding != Encoding::binary_native() {
        for (prop, &offset) in def.property_defs.iter().zip(&block.layout.offsets) {
            let size = prop.ty.scalar_type().size();
            if size > 1 {
                swaps.push((offset, size));
            }
        }
    }

    for r in 0..block.count {
        buf.prepare(stride)?;
        let row = &mut block.rows[r * stride..(r + 1) * stride];
        row.copy_from_slice(&buf.raw_buf()[..stride]);
        buf.consume(stride);

        for &(offset, size) in &swaps {
            row[offset..offset + size].reverse();
        }
    }

    Ok(())
}

/// Advances the stream past all rows of `def` without materializing them.
///
/// A fixed element in a binary body is skipped in one step; everything
/// else is scanned row by row (list counts still have to be read to know
/// where each row ends, and ASCII rows have no fixed byte size at all).
pub(crate) fn skip_element<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    encoding: Encoding,
) -> Result<(), Error> {
    if encoding != Encoding::Ascii {
        // Converted lists still store a per-row count on disk that may
        // deviate from the declared size, so only all-scalar elements can
        // be skipped by stride.
        if let Some(disk_len) = def.layout().disk_len {
            if def.property_defs.iter().all(|p| matches!(p.ty, PropertyType::Scalar(_))) {
                let total = def.count.checked_mul(disk_len).ok_or(Error::UnexpectedEof)?;
                return buf.skip(total);
            }
        }
    }

    for _ in 0..def.count {
        skip_row(buf, def, encoding)?;
    }

    Ok(())
}

fn skip_row<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    encoding: Encoding,
) -> Result<(), Error> {
    let swap = encoding != Encoding::binary_native();

    for prop in def.property_defs.iter() {
        match prop.ty {
            PropertyType::Scalar(ty) => {
                if encoding == Encoding::Ascii {
                    buf.read_token(|_, _| Ok(()))?;
                } else {
                    buf.skip(ty.size() as u64)?;
                }
            }
            PropertyType::List { len_type, item_type } => {
                // Even for a converted list the stored count is what
                // determines the row's extent on disk.
                let count = if encoding == Encoding::Ascii {
                    read_ascii_len(buf, len_type)?
                } else {
                    read_binary_len(buf, len_type, swap)?
                };
                check_list_len(count, item_type.size(), prop)?;

                if encoding == Encoding::Ascii {
                    for _ in 0..count {
                        buf.read_token(|_, _| Ok(()))?;
                    }
                } else {
                    buf.skip(count * item_type.size() as u64)?;
                }
            }
        }
    }

    Ok(())
}


// ===========================================================================
// ===== Binary row decoding
// ===========================================================================

fn decode_row_bbe<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    offsets: &[usize],
    row: &mut [u8],
    list_data: &mut Vec<u8>,
) -> Result<(), Error> {
    #[cfg(target_endian = "big")]
    {
        decode_row_binary(buf, def, offsets, row, list_data, false)
    }

    #[cfg(target_endian = "little")]
    {
        decode_row_binary(buf, def, offsets, row, list_data, true)
    }
}

fn decode_row_ble<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    offsets: &[usize],
    row: &mut [u8],
    list_data: &mut Vec<u8>,
) -> Result<(), Error> {
    #[cfg(target_endian = "big")]
    {
        decode_row_binary(buf, def, offsets, row, list_data, true)
    }

    #[cfg(target_endian = "little")]
    {
        decode_row_binary(buf, def, offsets, row, list_data, false)
    }
}

fn decode_row_binary<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    offsets: &[usize],
    row: &mut [u8],
    list_data: &mut Vec<u8>,
    swap: bool,
) -> Result<(), Error> {
    for (prop, &offset) in def.property_defs.iter().zip(offsets) {
        match prop.ty {
            PropertyType::Scalar(ty) => {
                let size = ty.size();
                read_scalar_bytes(buf, &mut row[offset..offset + size], swap)?;
            }
            PropertyType::List { len_type, item_type } => {
                let count = read_binary_len(buf, len_type, swap)?;
                let item_size = item_type.size();
                check_list_len(count, item_size, prop)?;

                match prop.fixed_len {
                    Some(n) => {
                        if count != n as u64 {
                            return Err(bad_fixed_len(prop, count, n));
                        }

                        for i in 0..n as usize {
                            let start = offset + i * item_size;
                            read_scalar_bytes(buf, &mut row[start..start + item_size], swap)?;
                        }
                    }
                    None => {
                        let payload_len = count as usize * item_size;
                        store_list_entry(row, offset, count as u32, list_data.len(), prop)?;

                        let start = list_data.len();
                        buf.with_bytes(payload_len, |b| {
                            list_data.extend_from_slice(b);
                            Ok(())
                        })?;

                        if swap && item_size > 1 {
                            for item in list_data[start..].chunks_exact_mut(item_size) {
                                item.reverse();
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Reads `out.len()` bytes into `out`, reversing them if `swap`.
fn read_scalar_bytes<R: Read>(
    buf: &mut Buffer<R>,
    out: &mut [u8],
    swap: bool,
) -> Result<(), Error> {
    let size = out.len();
    buf.prepare(size)?;
    out.copy_from_slice(&buf.raw_buf()[..size]);
    buf.consume(size);

    if swap {
        out.reverse();
    }

    Ok(())
}

/// Reads a list length of type `ty`, returned widened to `u64`.
fn read_binary_len<R: Read>(
    buf: &mut Buffer<R>,
    ty: crate::schema::ListLenType,
    swap: bool,
) -> Result<u64, Error> {
    use crate::schema::ListLenType;

    let mut raw = [0u8; 4];
    let size = ty.size();
    read_scalar_bytes(buf, &mut raw[..size], swap)?;

    Ok(match ty {
        ListLenType::UChar => raw[0] as u64,
        ListLenType::UShort => NativeEndian::read_u16(&raw[..2]) as u64,
        ListLenType::UInt => NativeEndian::read_u32(&raw) as u64,
    })
}


// ===========================================================================
// ===== ASCII row decoding
// ===========================================================================

// Reads the next token and parses it as `$ty`.
macro_rules! ascii_parser {
    ($buf:ident, $ty:ident) => {
        $buf.read_token(|tok, offset| {
            tok.parse::<$ty>().map_err(|e| Error::NumericParse {
                msg: format!(
                    concat!("invalid '", stringify!($ty), "' literal '{}': {}"),
                    tok, e,
                ),
                offset,
            })
        })
    };
}

fn decode_row_ascii<R: Read>(
    buf: &mut Buffer<R>,
    def: &ElementDef,
    offsets: &[usize],
    row: &mut [u8],
    list_data: &mut Vec<u8>,
) -> Result<(), Error> {
    for (prop, &offset) in def.property_defs.iter().zip(offsets) {
        match prop.ty {
            PropertyType::Scalar(ty) => {
                let size = ty.size();
                read_ascii_value(buf, ty, &mut row[offset..offset + size])?;
            }
            PropertyType::List { len_type, item_type } => {
                let count = read_ascii_len(buf, len_type)?;
                let item_size = item_type.size();
                check_list_len(count, item_size, prop)?;

                match prop.fixed_len {
                    Some(n) => {
                        if count != n as u64 {
                            return Err(bad_fixed_len(prop, count, n));
                        }

                        for i in 0..n as usize {
                            let start = offset + i * item_size;
                            read_ascii_value(buf, item_type, &mut row[start..start + item_size])?;
                        }
                    }
                    None => {
                        store_list_entry(row, offset, count as u32, list_data.len(), prop)?;

                        let mut item = [0u8; 8];
                        for _ in 0..count {
                            read_ascii_value(buf, item_type, &mut item[..item_size])?;
                            list_data.extend_from_slice(&item[..item_size]);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Parses the next token as a value of type `ty` and writes its
/// native-endian bytes into `out` (which has exactly `ty.size()` bytes).
fn read_ascii_value<R: Read>(
    buf: &mut Buffer<R>,
    ty: crate::schema::ScalarType,
    out: &mut [u8],
) -> Result<(), Error> {
    use crate::schema::ScalarType;

    match ty {
        ScalarType::Char => out[0] = ascii_parser!(buf, i8)? as u8,
        ScalarType::UChar => out[0] = ascii_parser!(buf, u8)?,
        ScalarType::Short => NativeEndian::write_i16(out, ascii_parser!(buf, i16)?),
        ScalarType::UShort => NativeEndian::write_u16(out, ascii_parser!(buf, u16)?),
        ScalarType::Int => NativeEndian::write_i32(out, ascii_parser!(buf, i32)?),
        ScalarType::UInt => NativeEndian::write_u32(out, ascii_parser!(buf, u32)?),
        ScalarType::Float => NativeEndian::write_f32(out, ascii_parser!(buf, f32)?),
        ScalarType::Double => NativeEndian::write_f64(out, ascii_parser!(buf, f64)?),
    }

    Ok(())
}

fn read_ascii_len<R: Read>(
    buf: &mut Buffer<R>,
    ty: crate::schema::ListLenType,
) -> Result<u64, Error> {
    use crate::schema::ListLenType;

    Ok(match ty {
        ListLenType::UChar => ascii_parser!(buf, u8)? as u64,
        ListLenType::UShort => ascii_parser!(buf, u16)? as u64,
        ListLenType::UInt => ascii_parser!(buf, u32)? as u64,
    })
}


// ===========================================================================
// ===== Shared helpers
// ===========================================================================

/// Refuses list counts whose payload would exceed the look-ahead cap. A
/// count like that is a corrupt length field, not real data.
fn check_list_len(count: u64, item_size: usize, prop: &PropertyDef) -> Result<(), Error> {
    if count.checked_mul(item_size as u64).map_or(true, |len| len >= MAX_BUFFER_SIZE as u64) {
        return Err(Error::BadListLength {
            property: prop.name.clone(),
            len: count,
            expected: None,
        });
    }

    Ok(())
}

fn bad_fixed_len(prop: &PropertyDef, len: u64, expected: u32) -> Error {
    Error::BadListLength {
        property: prop.name.clone(),
        len,
        expected: Some(expected),
    }
}

/// Writes the `(count, byte offset)` pair of a list slot, with the offset
/// pointing at the end of `list_data` (where the payload is about to be
/// appended).
fn store_list_entry(
    row: &mut [u8],
    offset: usize,
    count: u32,
    data_len: usize,
    prop: &PropertyDef,
) -> Result<(), Error> {
    let data_offset = u32::try_from(data_len).map_err(|_| Error::BadListLength {
        property: prop.name.clone(),
        len: count as u64,
        expected: None,
    })?;

    NativeEndian::write_u32(&mut row[offset..offset + 4], count);
    NativeEndian::write_u32(&mut row[offset + 4..offset + 8], data_offset);

    Ok(())
}
