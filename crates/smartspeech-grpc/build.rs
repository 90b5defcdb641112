use std::path::PathBuf;

fn main() {
    // Prefer a protoc from the environment and fall back to the bundled one.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().expect("no bundled protoc for this host");
        std::env::set_var("PROTOC", protoc);
    }
    let well_known = protoc_bin_vendored::include_path().expect("no bundled protobuf includes");

    let protos: Vec<PathBuf> = ["recognition.proto", "task.proto", "storage.proto"]
        .iter()
        .map(|name| PathBuf::from("proto").join(name))
        .collect();

    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .bytes(["."])
        .compile_protos(&protos, &[PathBuf::from("proto"), well_known])
        .expect("failed to compile SmartSpeech protos");
}
