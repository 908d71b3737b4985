//! Semantic property lookup: finding the well-known properties (positions,
//! normals, texture coordinates, colors, vertex indices) by their
//! conventional names.
//!
//! PLY attaches no meaning to property names, but in practice nearly all
//! files follow the same conventions (`x`/`y`/`z` for positions and so
//! on). The finders below look those conventions up on an element and
//! return the property indices to feed into the extraction API. They
//! return `None` as soon as any required property is missing or has the
//! wrong shape.

use crate::schema::{ElementDef, PropIndex};


/// The texture coordinate naming conventions in the wild, in the order
/// they are tried.
const TEXCOORD_NAMES: [[&str; 2]; 4] = [
    ["u", "v"],
    ["s", "t"],
    ["texture_u", "texture_v"],
    ["texture_s", "texture_t"],
];

impl ElementDef {
    /// Finds the position properties `x`, `y`, `z` (in that order).
    pub fn find_pos(&self) -> Option<[PropIndex; 3]> {
        self.find_fixed_triple(["x", "y", "z"])
    }

    /// Finds the normal properties `nx`, `ny`, `nz`.
    pub fn find_normal(&self) -> Option<[PropIndex; 3]> {
        self.find_fixed_triple(["nx", "ny", "nz"])
    }

    /// Finds a texture coordinate pair: the first complete pair out of
    /// `(u, v)`, `(s, t)`, `(texture_u, texture_v)` and
    /// `(texture_s, texture_t)`.
    pub fn find_texcoord(&self) -> Option<[PropIndex; 2]> {
        TEXCOORD_NAMES.iter().find_map(|[u, v]| {
            Some([self.find_fixed(u)?, self.find_fixed(v)?])
        })
    }

    /// Finds the color properties `red`, `green`, `blue`.
    pub fn find_color(&self) -> Option<[PropIndex; 3]> {
        self.find_fixed_triple(["red", "green", "blue"])
    }

    /// Finds the color properties `red`, `green`, `blue`, `alpha`. Unlike
    /// [`find_color`][ElementDef::find_color], all four must exist.
    pub fn find_color_rgba(&self) -> Option<[PropIndex; 4]> {
        Some([
            self.find_fixed("red")?,
            self.find_fixed("green")?,
            self.find_fixed("blue")?,
            self.find_fixed("alpha")?,
        ])
    }

    /// Finds the vertex index list of a face element: a property declared
    /// as a list, named `vertex_indices` or (second choice)
    /// `vertex_index`.
    pub fn find_indices(&self) -> Option<PropIndex> {
        ["vertex_indices", "vertex_index"].iter().find_map(|name| {
            let idx = self.prop_pos(name)?;
            if self.property_defs[idx].is_declared_list() {
                Some(idx)
            } else {
                None
            }
        })
    }

    /// Looks up a property by name, requiring it to be fixed-size (a
    /// scalar or a list converted to a fixed size).
    fn find_fixed(&self, name: &str) -> Option<PropIndex> {
        let idx = self.prop_pos(name)?;
        if self.property_defs[idx].fixed_width().is_some() {
            Some(idx)
        } else {
            None
        }
    }

    fn find_fixed_triple(&self, names: [&str; 3]) -> Option<[PropIndex; 3]> {
        let [a, b, c] = names;
        Some([self.find_fixed(a)?, self.find_fixed(b)?, self.find_fixed(c)?])
    }
}
