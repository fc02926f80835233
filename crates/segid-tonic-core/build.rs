/// Builds the gRPC client and server code for `proto/segid.proto` using
/// `tonic-prost-build`.
///
/// The generated modules land in `OUT_DIR` and are pulled in by
/// `tonic::include_proto!("segid")`. A file descriptor set is written next to
/// them so the server can expose gRPC reflection.
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails; both abort the
/// build with the underlying error.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let descriptor_path = out_dir.join("segid_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/segid.proto");
    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/segid.proto"], &["proto"])
        .expect("failed to compile proto/segid.proto");
}
