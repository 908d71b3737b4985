//! The extraction engine: copying selected properties out of a loaded row
//! block into caller-supplied typed buffers, plus list concatenation and
//! polygon fan triangulation.
//!
//! Type conversion is driven by a small dispatch: for each (source scalar
//! kind, destination type) pair a function pointer is picked once before
//! the row loop, so the inner loops stay monomorphic. Integer sources pass
//! through `i64`, float sources through `f64`; with PLY's 32 bit integers
//! both intermediates are exact.

use byteorder::{ByteOrder, NativeEndian};
use cgmath::{InnerSpace, Point3};
use smallvec::SmallVec;

use crate::{
    decode::RowBlock,
    error::Error,
    schema::{ElementDef, PropIndex, PropertyType, ScalarType},
};


/// A Rust type that PLY property values can be extracted into. Implemented
/// for the eight types corresponding to the PLY scalar types (and for
/// `i64`, which the crate itself uses to widen polygon indices).
pub trait Scalar: Copy {
    /// Converts from an integer-typed property value. Narrowing truncates
    /// (two's-complement), like an `as` cast.
    fn from_i64(v: i64) -> Self;

    /// Converts from a float-typed property value. Conversion to an
    /// integer type truncates toward zero and saturates at the type's
    /// bounds, like an `as` cast.
    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ident),*) => {
        $(
            impl Scalar for $ty {
                #[inline(always)]
                fn from_i64(v: i64) -> Self {
                    v as $ty
                }

                #[inline(always)]
                fn from_f64(v: f64) -> Self {
                    v as $ty
                }
            }
        )*
    };
}

impl_scalar!(i8, u8, i16, u16, i32, u32, f32, f64);

// Not a PLY scalar type; used internally to widen polygon indices before
// the range check.
impl_scalar!(i64);

/// Returns the function decoding one native-endian value of kind `src`
/// from a byte slice and converting it to `T`.
fn reader_for<T: Scalar>(src: ScalarType) -> fn(&[u8]) -> T {
    match src {
        ScalarType::Char => |b| T::from_i64(b[0] as i8 as i64),
        ScalarType::UChar => |b| T::from_i64(b[0] as i64),
        ScalarType::Short => |b| T::from_i64(NativeEndian::read_i16(b) as i64),
        ScalarType::UShort => |b| T::from_i64(NativeEndian::read_u16(b) as i64),
        ScalarType::Int => |b| T::from_i64(NativeEndian::read_i32(b) as i64),
        ScalarType::UInt => |b| T::from_i64(NativeEndian::read_u32(b) as i64),
        ScalarType::Float => |b| T::from_f64(NativeEndian::read_f32(b) as f64),
        ScalarType::Double => |b| T::from_f64(NativeEndian::read_f64(b)),
    }
}

/// Copies the selected fixed-size properties of every row into `dest`,
/// converting each value to `T`.
///
/// Values are laid out row-major: all selected values of row 0 (in the
/// order given by `props`, a converted list contributing its full fixed
/// width), then row 1, and so on. `dest` must hold exactly
/// `count * total width` values.
pub(crate) fn extract_properties<T: Scalar>(
    def: &ElementDef,
    block: &RowBlock,
    props: &[PropIndex],
    dest: &mut [T],
) -> Result<(), Error> {
    // Pre-compute (slot offset in dest row, slot offset in block row,
    // width, item size, read fn) per selected property.
    let mut total_width = 0;
    let mut slots = SmallVec::<[(usize, usize, usize, usize, fn(&[u8]) -> T); 4]>::new();

    for &prop in props {
        let p = &def.property_defs[prop];
        let width = p.fixed_width().ok_or_else(|| Error::ListProperty(p.name.clone()))?;
        let ty = p.ty.scalar_type();

        slots.push((
            total_width,
            block.layout.offsets[prop.as_usize()],
            width,
            ty.size(),
            reader_for::<T>(ty),
        ));
        total_width += width;
    }

    assert_eq!(
        dest.len(),
        block.count * total_width,
        "destination buffer has the wrong size",
    );

    for &(dest_base, src_offset, width, item_size, read) in &slots {
        for r in 0..block.count {
            let row = block.row(r);
            let out = &mut dest[r * total_width + dest_base..];
            for i in 0..width {
                out[i] = read(&row[src_offset + i * item_size..]);
            }
        }
    }

    Ok(())
}

/// Sum of the per-row counts of the given list property.
pub(crate) fn sum_of_list_counts(
    def: &ElementDef,
    block: &RowBlock,
    prop: PropIndex,
) -> Result<u64, Error> {
    let slot_offset = list_slot(def, block, prop)?;

    let mut total = 0u64;
    for r in 0..block.count {
        total += block.list_entry(r, slot_offset).0 as u64;
    }

    Ok(total)
}

/// Concatenates all per-row payloads of the given list property into
/// `dest`, in row order, converting each value to `T`.
///
/// `dest` must hold exactly [`sum_of_list_counts`] values.
pub(crate) fn extract_list_property<T: Scalar>(
    def: &ElementDef,
    block: &RowBlock,
    prop: PropIndex,
    dest: &mut [T],
) -> Result<(), Error> {
    let slot_offset = list_slot(def, block, prop)?;
    let item_type = def.property_defs[prop].ty.scalar_type();
    let item_size = item_type.size();
    let read = reader_for::<T>(item_type);

    let mut out = 0;
    for r in 0..block.count {
        let (count, data_offset) = block.list_entry(r, slot_offset);
        let payload = &block.list_data[data_offset as usize..];

        assert!(
            out + count as usize <= dest.len(),
            "destination buffer has the wrong size",
        );
        for i in 0..count as usize {
            dest[out + i] = read(&payload[i * item_size..]);
        }
        out += count as usize;
    }

    assert_eq!(out, dest.len(), "destination buffer has the wrong size");

    Ok(())
}

/// Whether any row of the given list property holds more than 3 indices.
pub(crate) fn requires_triangulation(
    def: &ElementDef,
    block: &RowBlock,
    prop: PropIndex,
) -> Result<bool, Error> {
    let slot_offset = list_slot(def, block, prop)?;

    Ok((0..block.count).any(|r| block.list_entry(r, slot_offset).0 > 3))
}

/// Number of triangles fan triangulation of the given list property will
/// produce: the sum over all rows of `max(0, count - 2)`.
pub(crate) fn num_triangles(
    def: &ElementDef,
    block: &RowBlock,
    prop: PropIndex,
) -> Result<u64, Error> {
    let slot_offset = list_slot(def, block, prop)?;

    let mut total = 0u64;
    for r in 0..block.count {
        let count = block.list_entry(r, slot_offset).0 as u64;
        total += count.saturating_sub(2);
    }

    Ok(total)
}

/// Fan-triangulates every polygon of the given list property and writes
/// `3 * num_triangles` vertex indices into `dest`, converted to `T`.
///
/// Rows with fewer than 3 indices contribute nothing; triangles are
/// emitted as-is. For larger polygons the fan start is chosen by testing
/// all possible start vertices against the caller-supplied positions and
/// picking the one whose smallest triangle is largest, which avoids
/// degenerate slivers on non-convex polygons. Ties go to the lowest start
/// index.
///
/// `positions` holds tightly packed xyz coordinates for `num_verts`
/// vertices; every polygon index must lie in `[0, num_verts)`.
pub(crate) fn extract_triangles<T: Scalar>(
    def: &ElementDef,
    block: &RowBlock,
    prop: PropIndex,
    positions: &[f32],
    num_verts: u32,
    dest: &mut [T],
) -> Result<(), Error> {
    let slot_offset = list_slot(def, block, prop)?;
    let item_type = def.property_defs[prop].ty.scalar_type();
    let item_size = item_type.size();
    let read_index = reader_for::<i64>(item_type);

    assert!(
        positions.len() >= num_verts as usize * 3,
        "positions buffer too small for num_verts",
    );

    let mut polygon = SmallVec::<[u32; 16]>::new();
    let mut out = 0;
    let write = |dest: &mut [T], out: &mut usize, idx: u32| {
        assert!(*out < dest.len(), "destination buffer has the wrong size");
        dest[*out] = T::from_i64(idx as i64);
        *out += 1;
    };

    for r in 0..block.count {
        let (count, data_offset) = block.list_entry(r, slot_offset);
        let n = count as usize;
        if n < 3 {
            continue;
        }

        let payload = &block.list_data[data_offset as usize..];
        polygon.clear();
        for i in 0..n {
            let idx = read_index(&payload[i * item_size..]);
            if idx < 0 || idx >= num_verts as i64 {
                return Err(Error::OutOfRange {
                    index: idx.max(0) as u64,
                    limit: num_verts as u64,
                });
            }
            polygon.push(idx as u32);
        }

        if n == 3 {
            for &idx in &polygon {
                write(dest, &mut out, idx);
            }
            continue;
        }

        let start = best_fan_start(&polygon, positions);
        for i in 1..n - 1 {
            write(dest, &mut out, polygon[start]);
            write(dest, &mut out, polygon[(start + i) % n]);
            write(dest, &mut out, polygon[(start + i + 1) % n]);
        }
    }

    assert_eq!(out, dest.len(), "destination buffer has the wrong size");

    Ok(())
}

/// Picks the fan start vertex whose smallest fan triangle has the largest
/// area. Ties are broken toward the lowest start index.
fn best_fan_start(polygon: &[u32], positions: &[f32]) -> usize {
    let n = polygon.len();
    let pos = |i: usize| -> Point3<f32> {
        let base = polygon[i] as usize * 3;
        Point3::new(positions[base], positions[base + 1], positions[base + 2])
    };

    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;
    for start in 0..n {
        let apex = pos(start);

        let mut smallest = f32::INFINITY;
        for i in 1..n - 1 {
            let b = pos((start + i) % n);
            let c = pos((start + i + 1) % n);
            let area = (b - apex).cross(c - apex).magnitude() * 0.5;
            smallest = smallest.min(area);
        }

        if smallest > best_score {
            best_score = smallest;
            best = start;
        }
    }

    best
}

/// Returns the row-slot offset of `prop`, which must be a variable-length
/// list property of `def`.
fn list_slot(def: &ElementDef, block: &RowBlock, prop: PropIndex) -> Result<usize, Error> {
    let p = &def.property_defs[prop];
    match p.ty {
        PropertyType::List { .. } if p.fixed_len.is_none() => {
            Ok(block.layout.offsets[prop.as_usize()])
        }
        _ => Err(Error::ListProperty(p.name.clone())),
    }
}
