//! # Voxel City Command Line Entry Point
//!
//! Calls into the library's `run()` function, which sets up logging and dispatches the
//! subcommand.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info voxel-city mesh --input scene.json --output-dir out --name city
//! ```

fn main() -> anyhow::Result<()> {
    voxel_city::run()
}
