//! The in-memory description of a PLY file: elements, properties and their
//! scalar types, in header order.
//!
//! The schema is produced by header parsing and drives both body decoding
//! and extraction. Property values of a loaded element live in a densely
//! packed per-row byte layout described by [`RowLayout`].

use std::{
    fmt,
    ops,
    str::FromStr,
};

use derive_more::From;


/// One of the eight PLY scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    /// Returns the number of bytes a value of this type occupies.
    pub fn size(&self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt => 4,
            ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }

    /// Returns `true` if and only if the type is either `float` or `double`.
    pub fn is_floating_point(&self) -> bool {
        matches!(self, ScalarType::Float | ScalarType::Double)
    }

    /// Returns `true` if and only if the type is one of `char`, `short` or
    /// `int`.
    pub fn is_signed_integer(&self) -> bool {
        matches!(self, ScalarType::Char | ScalarType::Short | ScalarType::Int)
    }

    /// Returns `true` if and only if the type is one of `uchar`, `ushort`
    /// or `uint`.
    pub fn is_unsigned_integer(&self) -> bool {
        matches!(self, ScalarType::UChar | ScalarType::UShort | ScalarType::UInt)
    }

    /// The canonical name of this type in a PLY header.
    pub fn ply_type_name(&self) -> &'static str {
        match self {
            ScalarType::Char => "char",
            ScalarType::UChar => "uchar",
            ScalarType::Short => "short",
            ScalarType::UShort => "ushort",
            ScalarType::Int => "int",
            ScalarType::UInt => "uint",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
        }
    }
}

/// The error emitted when the `FromStr` implementation for `ScalarType`
/// cannot parse the given string.
pub struct ScalarTypeParseError(String);

impl fmt::Display for ScalarTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" is not a valid PLY scalar type", self.0)
    }
}

impl fmt::Debug for ScalarTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for ScalarType {
    type Err = ScalarTypeParseError;

    /// Parses a scalar type name as it appears in a header. Both the
    /// classic names and the sized aliases (`int8`, `uint8`, `int16`,
    /// `uint16`, `int32`, `uint32`, `float32`, `float64`) are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "char" | "int8" => Ok(ScalarType::Char),
            "uchar" | "uint8" => Ok(ScalarType::UChar),
            "short" | "int16" => Ok(ScalarType::Short),
            "ushort" | "uint16" => Ok(ScalarType::UShort),
            "int" | "int32" => Ok(ScalarType::Int),
            "uint" | "uint32" => Ok(ScalarType::UInt),
            "float" | "float32" => Ok(ScalarType::Float),
            "double" | "float64" => Ok(ScalarType::Double),
            other => Err(ScalarTypeParseError(other.to_string())),
        }
    }
}

/// The type in which a list property stores its per-row length.
///
/// Floating point or signed types don't make sense as list lengths, so
/// only the unsigned integer types are allowed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLenType {
    UChar,
    UShort,
    UInt,
}

impl ListLenType {
    pub fn from_scalar_type(ty: ScalarType) -> Option<Self> {
        match ty {
            ScalarType::UChar => Some(ListLenType::UChar),
            ScalarType::UShort => Some(ListLenType::UShort),
            ScalarType::UInt => Some(ListLenType::UInt),
            _ => None,
        }
    }

    pub fn to_scalar_type(self) -> ScalarType {
        match self {
            ListLenType::UChar => ScalarType::UChar,
            ListLenType::UShort => ScalarType::UShort,
            ListLenType::UInt => ScalarType::UInt,
        }
    }

    /// Returns the number of bytes this type occupies.
    pub fn size(&self) -> usize {
        match self {
            ListLenType::UChar => 1,
            ListLenType::UShort => 2,
            ListLenType::UInt => 4,
        }
    }
}

/// The type of a property: a single scalar or a variable-length list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Scalar(ScalarType),
    List {
        len_type: ListLenType,
        item_type: ScalarType,
    },
}

impl PropertyType {
    pub fn len_type(&self) -> Option<ListLenType> {
        match self {
            PropertyType::Scalar(_) => None,
            PropertyType::List { len_type, .. } => Some(*len_type),
        }
    }

    /// The scalar type of the property's values (the item type for lists).
    pub fn scalar_type(&self) -> ScalarType {
        match *self {
            PropertyType::Scalar(scalar_type) => scalar_type,
            PropertyType::List { item_type, .. } => item_type,
        }
    }
}

/// The header definition of one property of an element.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    pub ty: PropertyType,

    /// `Some(n)` once the property was converted to fixed size `n` via
    /// [`ElementDef::convert_list_to_fixed_size`]. A converted property
    /// decodes like a non-list (its row slot holds exactly `n` items, the
    /// on-disk count is validated and discarded).
    pub fixed_len: Option<u32>,
}

impl PropertyDef {
    pub(crate) fn scalar(name: String, ty: ScalarType) -> Self {
        Self {
            name,
            ty: PropertyType::Scalar(ty),
            fixed_len: None,
        }
    }

    pub(crate) fn list(name: String, len_type: ListLenType, item_type: ScalarType) -> Self {
        Self {
            name,
            ty: PropertyType::List { len_type, item_type },
            fixed_len: None,
        }
    }

    /// Whether this property still decodes as a variable-length list.
    /// `false` for scalars and for lists converted to a fixed size.
    pub fn is_list(&self) -> bool {
        matches!(self.ty, PropertyType::List { .. }) && self.fixed_len.is_none()
    }

    /// Whether this property was declared as a list in the header
    /// (regardless of a later fixed-size conversion).
    pub fn is_declared_list(&self) -> bool {
        matches!(self.ty, PropertyType::List { .. })
    }

    /// Number of scalar values in this property's row slot: 1 for a
    /// scalar, `n` for a list converted to fixed size `n`. `None` for a
    /// variable-length list.
    pub fn fixed_width(&self) -> Option<usize> {
        match self.ty {
            PropertyType::Scalar(_) => Some(1),
            PropertyType::List { .. } => self.fixed_len.map(|n| n as usize),
        }
    }

    /// Size and alignment of this property's slot in the packed row.
    ///
    /// A variable-length list occupies a fixed 8 byte slot holding
    /// `(count: u32, byte offset: u32)` into the side payload arena.
    pub(crate) fn slot(&self) -> (usize, usize) {
        match self.ty {
            PropertyType::Scalar(ty) => (ty.size(), ty.size()),
            PropertyType::List { item_type, .. } => match self.fixed_len {
                Some(n) => (n as usize * item_type.size(), item_type.size()),
                None => (LIST_SLOT_SIZE, 4),
            },
        }
    }

    /// Bytes this property occupies in one on-disk row of a binary body,
    /// if that is fixed. `None` for a variable-length list.
    fn disk_len(&self) -> Option<u64> {
        match self.ty {
            PropertyType::Scalar(ty) => Some(ty.size() as u64),
            PropertyType::List { len_type, item_type } => self.fixed_len.map(|n| {
                len_type.size() as u64 + n as u64 * item_type.size() as u64
            }),
        }
    }
}

/// Row-slot size of a variable-length list: `(count: u32, offset: u32)`.
pub(crate) const LIST_SLOT_SIZE: usize = 8;

/// Index of a specific property in the ordered list of properties of one
/// element. Can be used to index a [`PropVec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, From)]
pub struct PropIndex(pub u32);

impl PropIndex {
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

/// A vector holding one entry per property of an element, indexed by
/// [`PropIndex`]. Simply a `Vec` wrapper for strong typing.
#[derive(Debug, Clone, From)]
pub struct PropVec<T>(Vec<T>);

impl<T> ops::Index<PropIndex> for PropVec<T> {
    type Output = T;
    fn index(&self, idx: PropIndex) -> &Self::Output {
        &self.0[idx.as_usize()]
    }
}

impl<T> ops::IndexMut<PropIndex> for PropVec<T> {
    fn index_mut(&mut self, idx: PropIndex) -> &mut Self::Output {
        &mut self.0[idx.as_usize()]
    }
}

impl<T> ops::Deref for PropVec<T> {
    type Target = Vec<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> ops::DerefMut for PropVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The header definition of one element: its name, the number of rows in
/// the body and the ordered property definitions.
#[derive(Debug, Clone)]
pub struct ElementDef {
    pub name: String,

    /// Number of rows of this element in the body.
    pub count: u64,

    /// Definitions for all properties of this element, in header order
    /// (which is also the order of the values within one body row).
    pub property_defs: PropVec<PropertyDef>,
}

impl ElementDef {
    pub(crate) fn new(name: String, count: u64) -> Self {
        Self {
            name,
            count,
            property_defs: Vec::new().into(),
        }
    }

    /// Returns the index of the property with the given name.
    pub fn prop_pos(&self, prop_name: &str) -> Option<PropIndex> {
        self.property_defs.iter()
            .position(|p| p.name == prop_name)
            .map(|idx| PropIndex(idx as u32))
    }

    /// Whether any property of this element still decodes as a
    /// variable-length list. Such an element has no fixed on-disk row
    /// size: skipping it requires scanning every row.
    pub fn has_lists(&self) -> bool {
        self.property_defs.iter().any(|p| p.is_list())
    }

    /// Declares the list property at `prop` to have exactly `len` items
    /// in every row. Afterwards the property decodes like a fixed-size
    /// slot of `len` items; a row whose stored count differs fails the
    /// load with a `BadListLength` error.
    ///
    /// Returns `false` (and changes nothing) if the property is not a
    /// variable-length list or `len` is zero.
    pub fn convert_list_to_fixed_size(&mut self, prop: PropIndex, len: u32) -> bool {
        if prop.as_usize() >= self.property_defs.len() || len == 0 {
            return false;
        }

        let def = &mut self.property_defs[prop];
        if !def.is_list() {
            return false;
        }

        def.fixed_len = Some(len);
        true
    }

    /// Computes the packed row layout for the current state of this
    /// element's schema.
    pub(crate) fn layout(&self) -> RowLayout {
        let mut offsets = Vec::with_capacity(self.property_defs.len());
        let mut stride = 0;
        let mut max_align = 1;
        let mut packed = true;
        let mut disk_len = Some(0u64);

        for def in self.property_defs.iter() {
            let (size, align) = def.slot();
            let offset = align_up(stride, align);
            packed &= offset == stride;

            offsets.push(offset);
            stride = offset + size;
            max_align = max_align.max(align);

            disk_len = match (disk_len, def.disk_len()) {
                (Some(total), Some(len)) => Some(total + len),
                _ => None,
            };

            // The bulk load path copies on-disk rows verbatim, which is
            // only byte-identical for plain scalars.
            if !matches!(def.ty, PropertyType::Scalar(_)) {
                packed = false;
            }
        }

        let padded_stride = align_up(stride, max_align);
        packed &= padded_stride == stride;

        RowLayout {
            offsets,
            stride: padded_stride,
            disk_len,
            verbatim: packed,
        }
    }
}

/// The packed in-memory layout of one decoded row of an element.
///
/// Every slot is aligned to its scalar's size; the row stride is padded to
/// the largest slot alignment so rows stay aligned across the block.
#[derive(Debug, Clone)]
pub(crate) struct RowLayout {
    /// Byte offset of each property's slot within a row, in property
    /// order.
    pub offsets: Vec<usize>,

    /// Bytes per packed row.
    pub stride: usize,

    /// Bytes per on-disk row of a binary body, if fixed (`None` iff the
    /// element has a variable-length list). Enables O(1) skipping.
    pub disk_len: Option<u64>,

    /// Whether a packed row is byte-identical to an on-disk binary row
    /// (all plain scalars, no padding). Enables bulk loading.
    pub verbatim: bool,
}

fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}
