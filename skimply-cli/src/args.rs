//! Defines `Args` which is used to parse command line arguments.

use std::path::PathBuf;

use structopt::StructOpt;


#[derive(StructOpt, Debug)]
#[structopt(
    name = "skimply",
    about = "Parses PLY files and prints a pass/fail table with timings.",
)]
pub struct Args {
    /// If set, the face list is converted to a fixed size of three
    /// indices per face, skipping polygon triangulation. A file
    /// containing a face with a different vertex count then fails.
    #[structopt(long = "assume-triangles")]
    pub assume_triangles: bool,

    /// PLY files to parse. A file with a `.txt` extension is read as a
    /// list of filenames, one per line.
    pub files: Vec<PathBuf>,
}
