//! A streaming reader for the Stanford PLY file format.
//!
//! PLY is a popular and flexible format for meshes and point clouds. A
//! file describes its own layout in an ASCII header: a sequence of
//! *elements* (usually `vertex` and `face`), each a table with a row
//! count and an ordered list of typed *properties*, where a property is
//! either a scalar or a variable-length list. The body follows in one of
//! three encodings: ASCII, binary little endian or binary big endian.
//!
//! The flexibility is what makes PLY annoying to read quickly: every
//! file can order and type its properties differently, and list
//! properties give rows a variable on-disk size. This crate deals with
//! that once, so you don't have to: the header is parsed into a schema
//! up front, and the body is then visited element by element through a
//! forward-only cursor. You only pay for what you ask: elements you
//! never load are skipped (in O(1) for fixed-size elements of binary
//! files), and extraction copies exactly the properties you select into
//! buffers you allocate, converting scalar types on the fly.
//!
//! Entry point: [`Reader`]. Polygonal faces can be fan-triangulated
//! during extraction ([`Reader::extract_triangles`]), picking the fan
//! apex that avoids degenerate triangles.
//!
//! ### Links:
//! - ["Specification"](http://paulbourke.net/dataformats/ply/)
//! - [Wikipedia](https://en.wikipedia.org/wiki/PLY_(file_format))

use std::fmt;

pub mod error;
pub mod schema;

mod decode;
mod extract;
mod info;
mod parse;
mod read;

#[cfg(test)]
mod tests;

pub use crate::{
    error::Error,
    extract::Scalar,
    read::Reader,
    schema::{
        ElementDef, ListLenType, PropIndex, PropertyDef, PropertyType, ScalarType,
    },
};


/// Name of the element that by convention holds the vertices.
pub const VERTEX_ELEMENT_NAME: &str = "vertex";

/// Name of the element that by convention holds the faces.
pub const FACE_ELEMENT_NAME: &str = "face";


/// The encoding of a PLY file body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Everything is stored as ASCII text with whitespace-separated
    /// values. Space-inefficient, but human readable.
    Ascii,

    /// Binary encoding where all numeric types are stored in little
    /// endian layout. The header is still ASCII.
    BinaryLittleEndian,

    /// Binary encoding where all numeric types are stored in big endian
    /// layout. The header is still ASCII.
    BinaryBigEndian,
}

impl Encoding {
    /// Returns the binary encoding with native endianness (little endian
    /// on x86).
    pub fn binary_native() -> Self {
        if cfg!(target_endian = "big") {
            Encoding::BinaryBigEndian
        } else {
            Encoding::BinaryLittleEndian
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Encoding::Ascii => "ascii",
            Encoding::BinaryLittleEndian => "binary_little_endian",
            Encoding::BinaryBigEndian => "binary_big_endian",
        };
        f.write_str(s)
    }
}
