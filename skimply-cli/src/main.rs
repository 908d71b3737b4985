use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    process,
    time::Instant,
};

use structopt::StructOpt;

use skimply::{FACE_ELEMENT_NAME, Reader, VERTEX_ELEMENT_NAME};

#[macro_use]
mod ui;

mod args;

use crate::args::Args;


/// We just catch potential errors here and pretty print them. The actual
/// useful code is in `run()`.
fn main() {
    if let Err(e) = run() {
        error!("An error occured: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::from_args();

    let filenames = expand_file_args(&args.files)?;
    if filenames.is_empty() {
        info!("No input files provided.");
        return Ok(());
    }

    let width = filenames.iter()
        .map(|f| f.to_string_lossy().len())
        .max()
        .unwrap_or(0);

    let overall = Instant::now();
    let mut num_passed = 0;
    let mut num_failed = 0;

    for filename in &filenames {
        let start = Instant::now();
        let result = parse_file(filename, args.assume_triangles);
        let elapsed = start.elapsed();

        let ok = result.is_ok();
        println!(
            "{:<width$}  {}  {:>8.3} ms",
            filename.to_string_lossy(),
            ui::status_cell(ok),
            elapsed.as_secs_f64() * 1000.0,
            width = width,
        );

        if ok {
            num_passed += 1;
        } else {
            num_failed += 1;
        }
    }

    println!("----");
    println!("{:.3} ms total", overall.elapsed().as_secs_f64() * 1000.0);
    println!("{} passed", num_passed);
    println!("{} failed", num_failed);

    if num_failed > 0 {
        process::exit(1);
    }

    Ok(())
}

/// Expands the file arguments: a `.txt` file is read as a list of
/// filenames, one per line; everything else is taken as-is.
fn expand_file_args(files: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut out = Vec::new();
    for file in files {
        if file.extension().map_or(false, |ext| ext == "txt") {
            let list = fs::read_to_string(file)
                .map_err(|e| format!("failed to open {}: {}", file.display(), e))?;
            out.extend(
                list.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(PathBuf::from),
            );
        } else {
            out.push(file.clone());
        }
    }

    Ok(out)
}

/// A triangle mesh assembled from the extracted buffers, the way a real
/// consumer would build one. Only `pos` and `indices` are required.
struct TriMesh {
    pos: Vec<f32>,
    normal: Option<Vec<f32>>,
    uv: Option<Vec<f32>>,
    color: Option<Vec<u8>>,
    indices: Vec<i32>,
    num_verts: u32,
}

impl TriMesh {
    fn all_indices_valid(&self) -> bool {
        self.indices.iter().all(|&i| i >= 0 && (i as u32) < self.num_verts)
    }
}

/// Parses one PLY file, extracting positions (plus normals, texture
/// coordinates and colors where present) and triangulated face indices.
fn parse_file(path: &Path, assume_triangles: bool) -> Result<TriMesh, Box<dyn Error>> {
    let mut reader = Reader::open(path)?;

    // With `--assume-triangles` the face list is declared to hold exactly
    // three indices per row up front, which makes the face element
    // fixed-size and its extraction a plain copy.
    let mut assume_triangles = assume_triangles;
    if assume_triangles {
        let face_index = reader.find_element(FACE_ELEMENT_NAME)
            .ok_or("no 'face' element")?;
        let idx_prop = reader.get_element(face_index).and_then(|e| e.find_indices());

        assume_triangles = match idx_prop {
            Some(prop) => reader.convert_list_to_fixed_size(face_index, prop, 3),
            None => false,
        };
    }

    let mut mesh = TriMesh {
        pos: Vec::new(),
        normal: None,
        uv: None,
        color: None,
        indices: Vec::new(),
        num_verts: 0,
    };
    let mut got_verts = false;
    let mut got_faces = false;

    while reader.has_element() && (!got_verts || !got_faces) {
        if reader.element_is(VERTEX_ELEMENT_NAME) {
            let pos_props = reader.find_pos().ok_or("vertex element without positions")?;
            reader.load_element()?;

            mesh.num_verts = reader.num_rows() as u32;
            mesh.pos = vec![0.0; mesh.num_verts as usize * 3];
            reader.extract_properties(&pos_props, &mut mesh.pos)?;

            if let Some(props) = reader.find_normal() {
                let mut normal = vec![0.0; mesh.num_verts as usize * 3];
                reader.extract_properties(&props, &mut normal)?;
                mesh.normal = Some(normal);
            }
            if let Some(props) = reader.find_texcoord() {
                let mut uv = vec![0.0; mesh.num_verts as usize * 2];
                reader.extract_properties(&props, &mut uv)?;
                mesh.uv = Some(uv);
            }
            if let Some(props) = reader.find_color_rgba() {
                let mut color = vec![0u8; mesh.num_verts as usize * 4];
                reader.extract_properties(&props, &mut color)?;
                mesh.color = Some(color);
            }

            got_verts = true;
        } else if !got_faces && reader.element_is(FACE_ELEMENT_NAME) {
            let idx_prop = reader.find_indices().ok_or("face element without indices")?;
            reader.load_element()?;

            if assume_triangles {
                mesh.indices = vec![0; reader.num_rows() as usize * 3];
                reader.extract_properties(&[idx_prop], &mut mesh.indices)?;
            } else if reader.requires_triangulation(idx_prop)? {
                if !got_verts {
                    return Err("face data needing triangulation found before vertex data".into());
                }

                let num_tris = reader.num_triangles(idx_prop)?;
                mesh.indices = vec![0; num_tris as usize * 3];
                reader.extract_triangles(
                    idx_prop,
                    &mesh.pos,
                    mesh.num_verts,
                    &mut mesh.indices,
                )?;
            } else {
                let num_indices = reader.sum_of_list_counts(idx_prop)?;
                mesh.indices = vec![0; num_indices as usize];
                reader.extract_list_property(idx_prop, &mut mesh.indices)?;
            }

            got_faces = true;
        }

        reader.next_element()?;
    }

    if !got_verts || !got_faces {
        return Err("file contains no vertex or no face data".into());
    }
    if !mesh.all_indices_valid() {
        return Err("face indices out of range".into());
    }

    Ok(mesh)
}
