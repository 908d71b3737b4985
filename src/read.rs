//! Parsing PLY files: the header parser and the element cursor.
//!
//! # Random notes on parsing and the file format
//!
//! - The "specification" talks about carriage-return terminated lines, but
//!   real files end their header lines with '\n', occasionally preceded by
//!   '\r' (files written on Windows). We accept both and never normalize
//!   anything in the binary body.
//! - Some tools write the sized type aliases (`float32`, `uint8`, ...)
//!   instead of the classic names; both are accepted.

use std::{
    fs::File,
    io::Read,
    path::Path,
    str::FromStr,
};

use crate::{
    Encoding,
    decode::{self, RowBlock},
    error::Error,
    extract::{self, Scalar},
    parse::Buffer,
    schema::{ElementDef, ListLenType, PropIndex, PropertyDef, ScalarType},
};


/// A reader able to read binary and ASCII PLY files.
///
/// Created with [`Reader::open`] or [`Reader::new`]; both parse the header
/// eagerly, so the element schema is available immediately. The body is
/// then visited strictly in file order through a cursor: inspect the
/// current element via [`element`][Reader::element], materialize its rows
/// with [`load_element`][Reader::load_element], pull data out with the
/// `extract_*` methods, and move on with
/// [`next_element`][Reader::next_element]. Elements you don't load are
/// skipped without decoding more than necessary, so reading one property
/// out of a multi-gigabyte file stays cheap.
///
/// # Example
///
/// ```no_run
/// use skimply::{Reader, VERTEX_ELEMENT_NAME};
///
/// let mut reader = Reader::open("bunny.ply")?;
/// while reader.has_element() {
///     if reader.element_is(VERTEX_ELEMENT_NAME) {
///         let props = reader.element().unwrap().find_pos().expect("no positions");
///         reader.load_element()?;
///         let mut positions = vec![0.0f32; reader.num_rows() as usize * 3];
///         reader.extract_properties(&props, &mut positions)?;
///     }
///     reader.next_element()?;
/// }
/// # Ok::<(), skimply::Error>(())
/// ```
#[derive(Debug)]
pub struct Reader<R: Read> {
    buf: Buffer<R>,
    encoding: Encoding,
    elements: Vec<ElementDef>,
    comments: Vec<String>,
    obj_info: Vec<String>,

    /// Index of the current element in `elements`.
    cursor: usize,

    /// The decoded rows of the current element, if loaded.
    block: Option<RowBlock>,

    /// Latched once any stream, schema or row error occurred. The stream
    /// position is unreliable afterwards, so every further load or
    /// advance refuses with `Error::InvalidState`.
    poisoned: bool,
}

impl Reader<File> {
    /// Tries to open the file specified by the given path and creates a
    /// new `Reader` from that file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        // No `BufReader` needed: the internal parse buffer does the
        // buffering.
        Self::new(File::open(path).map_err(Error::Io)?)
    }
}

impl<R: Read> Reader<R> {
    /// Creates a new `Reader` from the given `io::Read` instance and
    /// parses the header of the given input.
    ///
    /// If you want to open a file, rather use [`Reader::open`].
    pub fn new(reader: R) -> Result<Self, Error> {
        let mut buf = Buffer::new(reader)?;

        // PLY files always start with `ply`. This serves as magic number.
        buf.read_line(|line, offset| {
            if line.trim_end() == "ply" {
                Ok(())
            } else {
                Err(Error::MalformedHeader {
                    msg: "not a valid PLY file (does not start with \"ply\")".into(),
                    offset,
                })
            }
        })?;

        let mut encoding = None;
        let mut elements: Vec<ElementDef> = Vec::new();
        let mut comments = Vec::new();
        let mut obj_info = Vec::new();

        loop {
            let line = buf.read_line(parse_header_line)?;

            match line {
                HeaderLine::Comment(text) => comments.push(text),
                HeaderLine::ObjInfo(text) => obj_info.push(text),

                HeaderLine::Format { encoding: enc, offset } => {
                    if encoding.replace(enc).is_some() {
                        return Err(Error::MalformedHeader {
                            msg: "duplicate format line".into(),
                            offset,
                        });
                    }
                }

                HeaderLine::Element { name, count, offset } => {
                    if encoding.is_none() {
                        return Err(Error::MalformedHeader {
                            msg: "element definition before format line".into(),
                            offset,
                        });
                    }
                    if elements.iter().any(|e| e.name == name) {
                        return Err(Error::MalformedHeader {
                            msg: format!("duplicate element definition for '{}'", name),
                            offset,
                        });
                    }

                    elements.push(ElementDef::new(name, count));
                }

                HeaderLine::Property { def, offset } => {
                    let elem = elements.last_mut().ok_or_else(|| Error::MalformedHeader {
                        msg: "property definition without preceding element definition".into(),
                        offset,
                    })?;
                    elem.property_defs.push(def);
                }

                HeaderLine::EndHeader => break,
            }
        }

        let encoding = encoding.ok_or(Error::MalformedHeader {
            msg: "header ended without a format line".into(),
            offset: buf.offset(),
        })?;

        Ok(Self {
            buf,
            encoding,
            elements,
            comments,
            obj_info,
            cursor: 0,
            block: None,
            poisoned: false,
        })
    }

    /// Returns the encoding of this PLY file.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Returns all comments in the PLY file (in the order in which they
    /// appear in the file header).
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Returns all `obj_info` lines of the header, in order.
    pub fn obj_info(&self) -> &[String] {
        &self.obj_info
    }

    /// Returns the definitions of all elements in the file (in the order
    /// in which they appear in the header, which is also body order).
    pub fn elements(&self) -> &[ElementDef] {
        &self.elements
    }

    /// Whether the reader is still usable. `false` once any stream,
    /// schema or row error was encountered.
    pub fn valid(&self) -> bool {
        !self.poisoned
    }

    /// Whether the cursor still points at an element.
    pub fn has_element(&self) -> bool {
        self.cursor < self.elements.len()
    }

    /// The element the cursor currently points at.
    pub fn element(&self) -> Option<&ElementDef> {
        self.elements.get(self.cursor)
    }

    /// Whether the current element has the given name.
    pub fn element_is(&self, name: &str) -> bool {
        self.element().map_or(false, |e| e.name == name)
    }

    /// The element definition at the given index.
    pub fn get_element(&self, index: usize) -> Option<&ElementDef> {
        self.elements.get(index)
    }

    /// Returns the index of the element with the given name.
    pub fn find_element(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    /// Number of rows of the current element (0 when the cursor is past
    /// the last element).
    pub fn num_rows(&self) -> u64 {
        self.element().map_or(0, |e| e.count)
    }

    /// Declares the list property `prop` of element `element_index` to
    /// hold exactly `len` items per row, making it extractable through
    /// [`extract_properties`][Reader::extract_properties]. See
    /// [`ElementDef::convert_list_to_fixed_size`].
    ///
    /// Only possible for elements whose rows have not been decoded or
    /// skipped yet; returns `false` otherwise.
    pub fn convert_list_to_fixed_size(
        &mut self,
        element_index: usize,
        prop: PropIndex,
        len: u32,
    ) -> bool {
        if self.poisoned || element_index < self.cursor {
            return false;
        }
        if element_index == self.cursor && self.block.is_some() {
            return false;
        }

        match self.elements.get_mut(element_index) {
            Some(elem) => elem.convert_list_to_fixed_size(prop, len),
            None => false,
        }
    }

    /// Decodes all rows of the current element, so that its properties
    /// can be extracted. Loading is idempotent: a second call is a no-op.
    pub fn load_element(&mut self) -> Result<(), Error> {
        self.guard()?;
        if self.block.is_some() {
            return Ok(());
        }

        let def = match self.elements.get(self.cursor) {
            Some(def) => def,
            None => return Err(Error::InvalidState),
        };

        match decode::load_block(&mut self.buf, def, self.encoding) {
            Ok(block) => {
                self.block = Some(block);
                Ok(())
            }
            Err(e) => Err(self.latch(e)),
        }
    }

    /// Discards the current element's decoded rows (if any) and advances
    /// the cursor to the next element.
    ///
    /// If the current element was never loaded, its body bytes are
    /// skipped: in one step for a fixed element of a binary body, by
    /// scanning row by row otherwise.
    pub fn next_element(&mut self) -> Result<(), Error> {
        self.guard()?;
        if self.cursor >= self.elements.len() {
            return Err(Error::InvalidState);
        }

        if self.block.take().is_none() {
            let def = &self.elements[self.cursor];
            if let Err(e) = decode::skip_element(&mut self.buf, def, self.encoding) {
                return Err(self.latch(e));
            }
        }

        self.cursor += 1;
        Ok(())
    }

    // ===== Extraction ======================================================

    /// Copies the selected fixed-size properties of the loaded element
    /// into `dest`, converting every value to `T`.
    ///
    /// The values are laid out row-major: all selected values of row 0 in
    /// the order given by `props` (a list converted to fixed size `n`
    /// contributes its `n` values), then row 1, and so on. `dest` must
    /// hold exactly `num_rows * total width` values. Selecting a
    /// variable-length list fails with [`Error::ListProperty`].
    pub fn extract_properties<T: Scalar>(
        &self,
        props: &[PropIndex],
        dest: &mut [T],
    ) -> Result<(), Error> {
        let (def, block) = self.loaded()?;
        extract::extract_properties(def, block, props, dest)
    }

    /// Sum of the per-row list lengths of the given list property of the
    /// loaded element. This is the destination size needed by
    /// [`extract_list_property`][Reader::extract_list_property].
    pub fn sum_of_list_counts(&self, prop: PropIndex) -> Result<u64, Error> {
        let (def, block) = self.loaded()?;
        extract::sum_of_list_counts(def, block, prop)
    }

    /// Concatenates all per-row values of the given list property into
    /// `dest` in row order, converting every value to `T`.
    pub fn extract_list_property<T: Scalar>(
        &self,
        prop: PropIndex,
        dest: &mut [T],
    ) -> Result<(), Error> {
        let (def, block) = self.loaded()?;
        extract::extract_list_property(def, block, prop, dest)
    }

    /// Whether any row of the given list property holds more than three
    /// indices, i.e. whether
    /// [`extract_triangles`][Reader::extract_triangles] actually has to
    /// triangulate.
    pub fn requires_triangulation(&self, prop: PropIndex) -> Result<bool, Error> {
        let (def, block) = self.loaded()?;
        extract::requires_triangulation(def, block, prop)
    }

    /// Number of triangles fan triangulation of the given list property
    /// produces: the sum over all rows of `max(0, len - 2)`.
    pub fn num_triangles(&self, prop: PropIndex) -> Result<u64, Error> {
        let (def, block) = self.loaded()?;
        extract::num_triangles(def, block, prop)
    }

    /// Triangulates all polygons of the given list property and writes
    /// `3 * num_triangles` vertex indices into `dest`.
    ///
    /// `positions` are the tightly packed xyz coordinates of the
    /// `num_verts` vertices the polygon indices refer to; they guide the
    /// choice of fan apex for polygons with more than three vertices
    /// (the fan whose smallest triangle is largest wins, so degenerate
    /// slivers on non-convex polygons are avoided). An index outside
    /// `[0, num_verts)` fails with [`Error::OutOfRange`].
    pub fn extract_triangles<T: Scalar>(
        &mut self,
        prop: PropIndex,
        positions: &[f32],
        num_verts: u32,
        dest: &mut [T],
    ) -> Result<(), Error> {
        let (def, block) = self.loaded()?;
        match extract::extract_triangles(def, block, prop, positions, num_verts, dest) {
            Err(e @ Error::OutOfRange { .. }) => Err(self.latch(e)),
            other => other,
        }
    }

    // ===== Semantic finders on the current element =========================

    /// [`ElementDef::find_pos`] on the current element.
    pub fn find_pos(&self) -> Option<[PropIndex; 3]> {
        self.element()?.find_pos()
    }

    /// [`ElementDef::find_normal`] on the current element.
    pub fn find_normal(&self) -> Option<[PropIndex; 3]> {
        self.element()?.find_normal()
    }

    /// [`ElementDef::find_texcoord`] on the current element.
    pub fn find_texcoord(&self) -> Option<[PropIndex; 2]> {
        self.element()?.find_texcoord()
    }

    /// [`ElementDef::find_color`] on the current element.
    pub fn find_color(&self) -> Option<[PropIndex; 3]> {
        self.element()?.find_color()
    }

    /// [`ElementDef::find_color_rgba`] on the current element.
    pub fn find_color_rgba(&self) -> Option<[PropIndex; 4]> {
        self.element()?.find_color_rgba()
    }

    /// [`ElementDef::find_indices`] on the current element.
    pub fn find_indices(&self) -> Option<PropIndex> {
        self.element()?.find_indices()
    }

    // ===== Internals =======================================================

    fn guard(&self) -> Result<(), Error> {
        if self.poisoned {
            Err(Error::InvalidState)
        } else {
            Ok(())
        }
    }

    fn latch(&mut self, e: Error) -> Error {
        self.poisoned = true;
        self.block = None;
        e
    }

    /// The current element and its loaded block, or `InvalidState` if the
    /// reader is poisoned or nothing is loaded.
    fn loaded(&self) -> Result<(&ElementDef, &RowBlock), Error> {
        self.guard()?;
        match (self.elements.get(self.cursor), &self.block) {
            (Some(def), Some(block)) => Ok((def, block)),
            _ => Err(Error::InvalidState),
        }
    }
}


// ===========================================================================
// ===== Header line parsing
// ===========================================================================

enum HeaderLine {
    Format { encoding: Encoding, offset: usize },
    Comment(String),
    ObjInfo(String),
    Element { name: String, count: u64, offset: usize },
    Property { def: PropertyDef, offset: usize },
    EndHeader,
}

fn parse_header_line(line: &str, offset: usize) -> Result<HeaderLine, Error> {
    let malformed = |msg: String| Error::MalformedHeader { msg, offset };

    let line = line.trim_start();
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next().unwrap_or("");

    let out = match keyword {
        "comment" => HeaderLine::Comment(rest_of_line(line, keyword)),
        "obj_info" => HeaderLine::ObjInfo(rest_of_line(line, keyword)),

        "format" => {
            let encoding = match tokens.next() {
                Some("ascii") => Encoding::Ascii,
                Some("binary_little_endian") => Encoding::BinaryLittleEndian,
                Some("binary_big_endian") => Encoding::BinaryBigEndian,
                other => {
                    return Err(malformed(format!(
                        "expected \"ascii\", \"binary_little_endian\" or \
                            \"binary_big_endian\", found '{}'",
                        other.unwrap_or(""),
                    )));
                }
            };

            let version = tokens.next().unwrap_or("");
            if version != "1.0" {
                return Err(Error::UnsupportedVersion(version.to_string()));
            }

            HeaderLine::Format { encoding, offset }
        }

        "element" => {
            let name = tokens.next()
                .ok_or_else(|| malformed("element definition without a name".into()))?;
            let count = tokens.next()
                .and_then(|n| n.parse::<u64>().ok())
                .ok_or_else(|| malformed(format!(
                    "invalid element count for '{}'", name,
                )))?;

            HeaderLine::Element { name: name.to_string(), count, offset }
        }

        "property" => {
            let first = tokens.next()
                .ok_or_else(|| malformed("property definition without a type".into()))?;

            let def = if first == "list" {
                let len_type = parse_scalar_type(tokens.next(), offset)?;
                let item_type = parse_scalar_type(tokens.next(), offset)?;
                let name = tokens.next()
                    .ok_or_else(|| malformed("list property without a name".into()))?;

                // Floating point or signed length types don't make sense.
                let len_type = ListLenType::from_scalar_type(len_type).ok_or_else(|| {
                    malformed(format!(
                        "only unsigned integers can be used to store list lengths \
                            (property '{}')",
                        name,
                    ))
                })?;

                PropertyDef::list(name.to_string(), len_type, item_type)
            } else {
                let ty = parse_scalar_type(Some(first), offset)?;
                let name = tokens.next()
                    .ok_or_else(|| malformed("property definition without a name".into()))?;

                PropertyDef::scalar(name.to_string(), ty)
            };

            HeaderLine::Property { def, offset }
        }

        "end_header" => HeaderLine::EndHeader,

        other => {
            return Err(malformed(format!(
                "expected line starting with \"comment\", \"obj_info\", \"format\", \
                    \"element\", \"property\" or \"end_header\", found '{}'",
                other,
            )));
        }
    };

    Ok(out)
}

/// Everything after the keyword, with the separating whitespace stripped.
fn rest_of_line(line: &str, keyword: &str) -> String {
    line[keyword.len()..].trim_start().to_string()
}

fn parse_scalar_type(token: Option<&str>, offset: usize) -> Result<ScalarType, Error> {
    let token = token.ok_or_else(|| Error::MalformedHeader {
        msg: "missing scalar type in property definition".into(),
        offset,
    })?;

    ScalarType::from_str(token).map_err(|e| Error::MalformedHeader {
        msg: e.to_string(),
        offset,
    })
}
