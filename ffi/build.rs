fn main() {
    let crate_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    cbindgen::generate(crate_dir)
        .expect("Unable to generate C FFI bindings")
        .write_to_file("tcambuf.h");
}
