use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::{
    Encoding,
    Error,
    FACE_ELEMENT_NAME,
    PropIndex,
    Reader,
    VERTEX_ELEMENT_NAME,
};


fn file(encoding: &str, schema: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!("ply\nformat {} 1.0\n{}end_header\n", encoding, schema).into_bytes();
    out.extend_from_slice(body);
    out
}

fn reader(bytes: &[u8]) -> Reader<Cursor<&[u8]>> {
    Reader::new(Cursor::new(bytes)).expect("failed to parse header")
}

const CUBE_POSITIONS: [f32; 24] = [
    0.0, 0.0, 0.0,
    1.0, 0.0, 0.0,
    1.0, 1.0, 0.0,
    0.0, 1.0, 0.0,
    0.0, 0.0, 1.0,
    1.0, 0.0, 1.0,
    1.0, 1.0, 1.0,
    0.0, 1.0, 1.0,
];

const CUBE_TRIS: [i32; 36] = [
    0, 2, 1,  0, 3, 2,
    4, 5, 6,  4, 6, 7,
    0, 1, 5,  0, 5, 4,
    1, 2, 6,  1, 6, 5,
    2, 3, 7,  2, 7, 6,
    3, 0, 4,  3, 4, 7,
];

fn ascii_cube() -> Vec<u8> {
    let mut body = String::new();
    for v in CUBE_POSITIONS.chunks(3) {
        body.push_str(&format!("{} {} {}\n", v[0], v[1], v[2]));
    }
    for t in CUBE_TRIS.chunks(3) {
        body.push_str(&format!("3 {} {} {}\n", t[0], t[1], t[2]));
    }

    file(
        "ascii",
        "element vertex 8\n\
            property float x\n\
            property float y\n\
            property float z\n\
            element face 12\n\
            property list uchar int vertex_indices\n",
        body.as_bytes(),
    )
}

#[test]
fn ascii_cube_positions_and_faces() -> Result<(), Error> {
    let data = ascii_cube();
    let mut r = reader(&data);

    assert_eq!(r.encoding(), Encoding::Ascii);
    assert!(r.has_element());
    assert!(r.element_is(VERTEX_ELEMENT_NAME));
    assert_eq!(r.num_rows(), 8);

    let pos = r.find_pos().expect("no position properties");
    assert_eq!(pos, [PropIndex(0), PropIndex(1), PropIndex(2)]);

    r.load_element()?;
    let mut positions = vec![0.0f32; 24];
    r.extract_properties(&pos, &mut positions)?;
    assert_eq!(positions, CUBE_POSITIONS);

    r.next_element()?;
    assert!(r.element_is(FACE_ELEMENT_NAME));
    let idx_prop = r.find_indices().expect("no vertex_indices property");

    r.load_element()?;
    assert!(!r.requires_triangulation(idx_prop)?);
    assert_eq!(r.sum_of_list_counts(idx_prop)?, 36);

    let mut indices = vec![0i32; 36];
    r.extract_list_property(idx_prop, &mut indices)?;
    assert_eq!(indices, CUBE_TRIS);

    r.next_element()?;
    assert!(!r.has_element());
    assert!(r.valid());

    Ok(())
}

#[test]
fn missing_position_property() {
    let data = file(
        "ascii",
        "element vertex 2\n\
            property float x\n\
            property float y\n",
        b"0 0\n1 1\n",
    );
    let r = reader(&data);

    assert_eq!(r.find_pos(), None);
    assert!(r.valid());
}

fn quad_file_le() -> Vec<u8> {
    let mut body = Vec::new();
    for &v in &[0.0f32, 0.0, 0.0,  1.0, 0.0, 0.0,  1.0, 1.0, 0.0,  0.0, 1.0, 0.0] {
        body.write_f32::<LittleEndian>(v).unwrap();
    }
    body.push(4);
    for i in 0..4 {
        body.write_i32::<LittleEndian>(i).unwrap();
    }

    file(
        "binary_little_endian",
        "element vertex 4\n\
            property float x\n\
            property float y\n\
            property float z\n\
            element face 1\n\
            property list uchar int vertex_indices\n",
        &body,
    )
}

#[test]
fn binary_le_quad_triangulates() -> Result<(), Error> {
    let data = quad_file_le();
    let mut r = reader(&data);

    let pos = r.find_pos().unwrap();
    r.load_element()?;
    let mut positions = vec![0.0f32; 12];
    r.extract_properties(&pos, &mut positions)?;

    r.next_element()?;
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    assert!(r.requires_triangulation(idx_prop)?);
    assert_eq!(r.num_triangles(idx_prop)?, 2);

    let mut indices = vec![0i32; 6];
    r.extract_triangles(idx_prop, &positions, 4, &mut indices)?;

    // On a planar square all fan starts tie, so the lowest one wins.
    assert_eq!(indices, [0, 1, 2, 0, 2, 3]);

    Ok(())
}

#[test]
fn fan_start_avoids_degenerate_triangles() -> Result<(), Error> {
    // A quad with its third vertex pulled inward (non-convex there). The
    // fans starting at vertex 1 or 3 have the largest smallest triangle;
    // the tie is broken toward 1.
    let positions = [
        0.0f32, 0.0, 0.0,
        2.0, 0.0, 0.0,
        1.0, 0.25, 0.0,
        0.0, 2.0, 0.0,
    ];

    let mut body = Vec::new();
    body.push(4u8);
    for i in 0..4 {
        body.write_u32::<LittleEndian>(i).unwrap();
    }
    let data = file(
        "binary_little_endian",
        "element face 1\n\
            property list uchar uint vertex_indices\n",
        &body,
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    let mut indices = vec![0u32; 6];
    r.extract_triangles(idx_prop, &positions, 4, &mut indices)?;
    assert_eq!(indices, [1, 2, 3, 1, 3, 0]);

    Ok(())
}

#[test]
fn big_endian_float_matches_little_endian() -> Result<(), Error> {
    let schema = "element vertex 1\nproperty float x\n";
    let be = file("binary_big_endian", schema, &[0x40, 0x49, 0x0F, 0xD0]);
    let le = file("binary_little_endian", schema, &[0xD0, 0x0F, 0x49, 0x40]);

    let mut out = [0.0f32; 2];
    for (i, data) in [be, le].iter().enumerate() {
        let mut r = reader(data);
        r.load_element()?;
        let mut v = [0.0f32];
        r.extract_properties(&[PropIndex(0)], &mut v)?;
        out[i] = v[0];
    }

    assert_eq!(out[0].to_bits(), out[1].to_bits());
    assert!((out[0] - 3.14159).abs() < 1e-6);

    Ok(())
}

#[test]
fn endianness_pair_equivalence() -> Result<(), Error> {
    let schema = "element vertex 3\n\
        property ushort a\n\
        property float b\n\
        property double c\n";

    let rows: [(u16, f32, f64); 3] = [
        (1, 1.5, -2.25),
        (65535, -0.125, 1e100),
        (256, f32::INFINITY, 0.0),
    ];

    let mut le = Vec::new();
    let mut be = Vec::new();
    for &(a, b, c) in &rows {
        le.write_u16::<LittleEndian>(a).unwrap();
        le.write_f32::<LittleEndian>(b).unwrap();
        le.write_f64::<LittleEndian>(c).unwrap();
        be.write_u16::<BigEndian>(a).unwrap();
        be.write_f32::<BigEndian>(b).unwrap();
        be.write_f64::<BigEndian>(c).unwrap();
    }

    let le = file("binary_little_endian", schema, &le);
    let be = file("binary_big_endian", schema, &be);

    let mut out = Vec::new();
    for data in &[le, be] {
        let mut r = reader(data);
        r.load_element()?;
        let mut v = vec![0.0f64; 9];
        r.extract_properties(&[PropIndex(0), PropIndex(1), PropIndex(2)], &mut v)?;
        out.push(v);
    }

    assert_eq!(out[0], out[1]);
    assert_eq!(out[0][0], 1.0);
    assert_eq!(out[0][3], 65535.0);

    Ok(())
}

#[test]
fn fixed_size_conversion_validates_count() {
    // Second face has 4 vertices, violating the conversion to 3.
    let data = file(
        "ascii",
        "element face 2\n\
            property list uchar int vertex_indices\n",
        b"3 0 1 2\n4 0 1 2 3\n",
    );

    let mut r = reader(&data);
    let idx_prop = r.element().unwrap().find_indices().unwrap();
    assert!(r.convert_list_to_fixed_size(0, idx_prop, 3));

    let err = r.load_element().unwrap_err();
    assert!(matches!(
        err,
        Error::BadListLength { len: 4, expected: Some(3), .. }
    ));

    assert!(!r.valid());
    assert!(matches!(r.load_element(), Err(Error::InvalidState)));
    assert!(matches!(r.next_element(), Err(Error::InvalidState)));
}

#[test]
fn converted_list_extracts_like_scalars() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element face 2\n\
            property list uchar int vertex_indices\n",
        b"3 0 1 2\n3 2 1 0\n",
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    assert!(r.convert_list_to_fixed_size(0, idx_prop, 3));

    r.load_element()?;
    let mut indices = vec![0i32; 6];
    r.extract_properties(&[idx_prop], &mut indices)?;
    assert_eq!(indices, [0, 1, 2, 2, 1, 0]);

    Ok(())
}

#[test]
fn skip_unloaded_elements() -> Result<(), Error> {
    let mut body = Vec::new();
    for i in 0..1000u32 {
        body.write_u32::<LittleEndian>(i).unwrap();
    }
    for i in 0..1000u32 {
        let count = (i % 4) as u8;
        body.push(count);
        for _ in 0..count {
            body.write_u32::<LittleEndian>(i).unwrap();
        }
    }
    for i in 0..10u32 {
        body.write_u32::<LittleEndian>(100 + i).unwrap();
    }

    let data = file(
        "binary_little_endian",
        "element a 1000\n\
            property uint val\n\
            element b 1000\n\
            property list uchar uint vals\n\
            element c 10\n\
            property uint val\n",
        &body,
    );

    let mut r = reader(&data);

    // Load and check `a`.
    r.load_element()?;
    let mut vals = vec![0u32; 1000];
    r.extract_properties(&[PropIndex(0)], &mut vals)?;
    assert!(vals.iter().enumerate().all(|(i, &v)| v == i as u32));
    r.next_element()?;

    // `b` is list-bearing and never loaded: skipping it has to scan.
    assert!(r.element_is("b"));
    r.next_element()?;

    // `c` must start at the correct stream offset.
    assert!(r.element_is("c"));
    r.load_element()?;
    let mut vals = vec![0u32; 10];
    r.extract_properties(&[PropIndex(0)], &mut vals)?;
    assert_eq!(vals, (100..110).collect::<Vec<_>>());

    r.next_element()?;
    assert!(!r.has_element());

    Ok(())
}

#[test]
fn empty_and_propertyless_elements() -> Result<(), Error> {
    let mut body = Vec::new();
    body.write_f32::<LittleEndian>(7.5).unwrap();

    let data = file(
        "binary_little_endian",
        "element nothing 0\n\
            property int val\n\
            element marker 5\n\
            element vertex 1\n\
            property float x\n",
        &body,
    );

    let mut r = reader(&data);

    // count = 0: loads into an empty block.
    r.load_element()?;
    assert_eq!(r.num_rows(), 0);
    r.next_element()?;

    // Five rows with no properties occupy no bytes at all.
    assert!(r.element_is("marker"));
    r.next_element()?;

    r.load_element()?;
    let mut v = [0.0f32];
    r.extract_properties(&[PropIndex(0)], &mut v)?;
    assert_eq!(v[0], 7.5);

    Ok(())
}

#[test]
fn zero_length_list_rows() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element face 3\n\
            property list uchar int vertex_indices\n",
        b"0\n2 1 2\n0\n",
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    assert_eq!(r.sum_of_list_counts(idx_prop)?, 2);
    assert!(!r.requires_triangulation(idx_prop)?);
    assert_eq!(r.num_triangles(idx_prop)?, 0);

    let mut out = vec![0i32; 2];
    r.extract_list_property(idx_prop, &mut out)?;
    assert_eq!(out, [1, 2]);

    // Degenerate rows contribute no triangles at all.
    let mut tris = vec![0i32; 0];
    r.extract_triangles(idx_prop, &[0.0; 9], 3, &mut tris)?;

    Ok(())
}

#[test]
fn small_polygons_contribute_no_triangles() -> Result<(), Error> {
    let positions = [
        0.0f32, 0.0, 0.0,
        1.0, 0.0, 0.0,
        1.0, 1.0, 0.0,
        0.0, 1.0, 0.0,
        0.5, 2.0, 0.0,
    ];

    let data = file(
        "ascii",
        "element face 3\n\
            property list uchar int vertex_indices\n",
        b"2 0 1\n3 0 1 2\n5 0 1 2 3 4\n",
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    assert_eq!(r.num_triangles(idx_prop)?, 0 + 1 + 3);

    let mut tris = vec![0i32; 12];
    r.extract_triangles(idx_prop, &positions, 5, &mut tris)?;

    // The two-vertex row is dropped, the triangle passes through as-is.
    assert_eq!(&tris[..3], &[0, 1, 2]);
    for &idx in &tris {
        assert!((0..5).contains(&idx));
    }

    Ok(())
}

#[test]
fn mixed_scalar_and_list_properties() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element thing 2\n\
            property uchar tag\n\
            property list uchar short values\n\
            property float weight\n",
        b"7 2 10 20 1.5\n9 3 30 40 50 -0.5\n",
    );

    let mut r = reader(&data);
    r.load_element()?;

    let mut tags = vec![0u8; 2];
    r.extract_properties(&[PropIndex(0)], &mut tags)?;
    assert_eq!(tags, [7, 9]);

    let mut weights = vec![0.0f32; 2];
    r.extract_properties(&[PropIndex(2)], &mut weights)?;
    assert_eq!(weights, [1.5, -0.5]);

    let list_prop = PropIndex(1);
    assert_eq!(r.sum_of_list_counts(list_prop)?, 5);
    let mut values = vec![0i16; 5];
    r.extract_list_property(list_prop, &mut values)?;
    assert_eq!(values, [10, 20, 30, 40, 50]);

    Ok(())
}

#[test]
fn extraction_is_idempotent() -> Result<(), Error> {
    let data = ascii_cube();
    let mut r = reader(&data);
    let pos = r.find_pos().unwrap();
    r.load_element()?;

    let mut a = vec![0.0f32; 24];
    let mut b = vec![1.0f32; 24];
    r.extract_properties(&pos, &mut a)?;
    r.extract_properties(&pos, &mut b)?;

    let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a), bits(&b));

    Ok(())
}

#[test]
fn scalar_conversion_rules() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element v 1\n\
            property int a\n\
            property int b\n\
            property float c\n\
            property float d\n\
            property uint e\n\
            property double f\n",
        b"300 -1 2.9 -2.9 4000000000 0.1\n",
    );

    let mut r = reader(&data);
    r.load_element()?;

    // Narrowing integer conversions truncate (two's complement).
    let mut small = vec![0u8; 2];
    r.extract_properties(&[PropIndex(0), PropIndex(1)], &mut small)?;
    assert_eq!(small, [44, 255]);

    // Float to integer truncates toward zero.
    let mut ints = vec![0i32; 2];
    r.extract_properties(&[PropIndex(2), PropIndex(3)], &mut ints)?;
    assert_eq!(ints, [2, -2]);

    // Unsigned values above i32::MAX wrap.
    let mut wrapped = vec![0i32];
    r.extract_properties(&[PropIndex(4)], &mut wrapped)?;
    assert_eq!(wrapped[0], 4_000_000_000u32 as i32);

    // Integer to float is exact, double to float is an IEEE cast.
    let mut floats = vec![0.0f32; 2];
    r.extract_properties(&[PropIndex(0), PropIndex(5)], &mut floats)?;
    assert_eq!(floats[0], 300.0);
    assert_eq!(floats[1], 0.1f64 as f32);

    Ok(())
}

#[test]
fn ascii_accepts_nan_and_inf() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element v 2\n\
            property float a\n\
            property float b\n\
            property float c\n",
        b"nan inf -inf\nNaN +Infinity 1e3\n",
    );

    let mut r = reader(&data);
    r.load_element()?;

    let mut v = vec![0.0f32; 6];
    r.extract_properties(&[PropIndex(0), PropIndex(1), PropIndex(2)], &mut v)?;

    assert!(v[0].is_nan());
    assert_eq!(v[1], f32::INFINITY);
    assert_eq!(v[2], f32::NEG_INFINITY);
    assert!(v[3].is_nan());
    assert_eq!(v[4], f32::INFINITY);
    assert_eq!(v[5], 1000.0);

    Ok(())
}

#[test]
fn crlf_header_lines() -> Result<(), Error> {
    let header = "ply\r\nformat ascii 1.0\r\ncomment written on windows\r\n\
        element vertex 1\r\nproperty float x\r\nend_header\r\n";
    let mut data = header.as_bytes().to_vec();
    data.extend_from_slice(b"0.5\n");

    let mut r = reader(&data);
    assert_eq!(r.comments(), ["written on windows"]);

    r.load_element()?;
    let mut v = [0.0f32];
    r.extract_properties(&[PropIndex(0)], &mut v)?;
    assert_eq!(v[0], 0.5);

    Ok(())
}

#[test]
fn comments_and_obj_info_are_retained() {
    let data = file(
        "ascii",
        "comment made by hand\n\
            obj_info scanned upside down\n\
            element vertex 0\n\
            property float x\n",
        b"",
    );

    let r = reader(&data);
    assert_eq!(r.comments(), ["made by hand"]);
    assert_eq!(r.obj_info(), ["scanned upside down"]);
}

#[test]
fn header_errors() {
    let parse = |bytes: &[u8]| Reader::new(Cursor::new(bytes.to_vec())).map(drop).unwrap_err();

    let err = parse(b"ply\nformat ascii 2.0\nend_header\n");
    assert!(matches!(err, Error::UnsupportedVersion(v) if v == "2.0"));

    let err = parse(b"ply\nformat ascii 1.0\nelephant vertex 3\nend_header\n");
    assert!(matches!(err, Error::MalformedHeader { .. }));

    let err = parse(b"ply\nformat ascii 1.0\nproperty float x\nend_header\n");
    assert!(matches!(err, Error::MalformedHeader { .. }));

    let err = parse(
        b"ply\nformat ascii 1.0\nelement v 1\nproperty list int int vals\nend_header\n"
    );
    assert!(matches!(err, Error::MalformedHeader { .. }));

    let err = parse(
        b"ply\nformat ascii 1.0\nelement v 1\nelement v 2\nend_header\n"
    );
    assert!(matches!(err, Error::MalformedHeader { .. }));

    let err = parse(b"obj\nformat ascii 1.0\nend_header\n");
    assert!(matches!(err, Error::MalformedHeader { .. }));
}

#[test]
fn list_scalar_mismatches() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element thing 1\n\
            property float x\n\
            property list uchar int vals\n",
        b"1.0 2 3 4\n",
    );

    let mut r = reader(&data);
    r.load_element()?;

    let mut v = [0.0f32];
    let err = r.extract_properties(&[PropIndex(1)], &mut v).unwrap_err();
    assert!(matches!(err, Error::ListProperty(name) if name == "vals"));

    let err = r.sum_of_list_counts(PropIndex(0)).unwrap_err();
    assert!(matches!(err, Error::ListProperty(name) if name == "x"));

    let mut out = [0i32; 1];
    let err = r.extract_list_property(PropIndex(0), &mut out).unwrap_err();
    assert!(matches!(err, Error::ListProperty(name) if name == "x"));

    // Shape mismatches don't poison the reader.
    assert!(r.valid());

    Ok(())
}

#[test]
fn truncated_body_fails_with_eof() {
    let mut body = Vec::new();
    body.write_f32::<LittleEndian>(1.0).unwrap();

    let data = file(
        "binary_little_endian",
        "element vertex 2\nproperty float x\n",
        &body,
    );

    let mut r = reader(&data);
    let err = r.load_element().unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof));
    assert!(!r.valid());
}

#[test]
fn missing_ascii_tokens_fail_with_eof() {
    let data = file(
        "ascii",
        "element vertex 2\nproperty float x\n",
        b"1.0\n",
    );

    let mut r = reader(&data);
    let err = r.load_element().unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof));
}

#[test]
fn invalid_ascii_number() {
    let data = file(
        "ascii",
        "element vertex 1\nproperty float x\n",
        b"fast\n",
    );

    let mut r = reader(&data);
    let err = r.load_element().unwrap_err();
    assert!(matches!(err, Error::NumericParse { .. }));
    assert!(!r.valid());
}

#[test]
fn absurd_list_count_is_rejected() {
    let mut body = Vec::new();
    body.write_u32::<LittleEndian>(0xFFFF_FFFF).unwrap();

    let data = file(
        "binary_little_endian",
        "element face 1\nproperty list uint int vertex_indices\n",
        &body,
    );

    let mut r = reader(&data);
    let err = r.load_element().unwrap_err();
    assert!(matches!(err, Error::BadListLength { expected: None, .. }));
    assert!(!r.valid());
}

#[test]
fn out_of_range_triangulation_index() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element face 1\nproperty list uchar int vertex_indices\n",
        b"4 0 1 2 9\n",
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    let positions = [0.0f32; 12];
    let mut tris = vec![0i32; 6];
    let err = r.extract_triangles(idx_prop, &positions, 4, &mut tris).unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 9, limit: 4 }));
    assert!(!r.valid());

    Ok(())
}

#[test]
fn sized_type_aliases() -> Result<(), Error> {
    let data = file(
        "ascii",
        "element vertex 1\n\
            property float32 x\n\
            property uint8 g\n\
            property int16 s\n\
            property float64 d\n",
        b"1.25 200 -12 2.5\n",
    );

    let mut r = reader(&data);
    r.load_element()?;

    let mut v = vec![0.0f64; 4];
    let props = [PropIndex(0), PropIndex(1), PropIndex(2), PropIndex(3)];
    r.extract_properties(&props, &mut v)?;
    assert_eq!(v, [1.25, 200.0, -12.0, 2.5]);

    Ok(())
}

#[test]
fn texcoord_and_color_finders() {
    let data = file(
        "ascii",
        "element vertex 0\n\
            property float x\n\
            property float y\n\
            property float z\n\
            property float s\n\
            property float t\n\
            property uchar red\n\
            property uchar green\n\
            property uchar blue\n",
        b"",
    );

    let r = reader(&data);
    let elem = r.element().unwrap();

    assert_eq!(elem.find_texcoord(), Some([PropIndex(3), PropIndex(4)]));
    assert_eq!(elem.find_color(), Some([PropIndex(5), PropIndex(6), PropIndex(7)]));
    // No alpha, so the rgba variant must refuse.
    assert_eq!(elem.find_color_rgba(), None);
    assert_eq!(elem.find_normal(), None);
}

#[test]
fn binary_lists_in_big_endian() -> Result<(), Error> {
    let mut body = Vec::new();
    body.write_u16::<BigEndian>(3).unwrap();
    for &i in &[10i32, 20, 30] {
        body.write_i32::<BigEndian>(i).unwrap();
    }

    let data = file(
        "binary_big_endian",
        "element face 1\nproperty list ushort int vertex_indices\n",
        &body,
    );

    let mut r = reader(&data);
    let idx_prop = r.find_indices().unwrap();
    r.load_element()?;

    assert_eq!(r.sum_of_list_counts(idx_prop)?, 3);
    let mut out = vec![0i32; 3];
    r.extract_list_property(idx_prop, &mut out)?;
    assert_eq!(out, [10, 20, 30]);

    Ok(())
}
