use std::{fs::OpenOptions, path::Path};

const CLIENT_PATH: &str = "res/client";

fn main() {
    println!("cargo:rerun-if-changed={CLIENT_PATH}");

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let tarball_path = Path::new(&out_dir).join("client.tar");

    let tarball_writer = OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(tarball_path)
        .expect("Failed to open client tarball for writing");

    let mut tarball = tar::Builder::new(tarball_writer);
    tarball
        .append_dir_all(".", CLIENT_PATH)
        .expect("Failed to append client files to tarball");
}
