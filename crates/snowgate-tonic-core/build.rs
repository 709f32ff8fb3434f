/// Builds the gRPC client and server code for `proto/snowgate.proto` using
/// `tonic-prost-build`.
///
/// Generated code lands in the crate's `OUT_DIR` and is exposed through the
/// `proto` module:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("snowgate");
/// }
/// ```
///
/// A file descriptor set is written alongside it for server reflection.
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails (for example when
/// `protoc` is missing).
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("snowgate_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/snowgate.proto"], &["proto"])
        .unwrap();
}
