use std::{env, fs::File, io::Write, path::Path};

fn main() {
    // write build time info
    built::write_built_file().expect("Failed to acquire build-time information");
    // unconditionally rerun this build script so build time info is always up to date
    #[cfg(not(debug_assertions))]
    println!("cargo:rerun-if-changed=foobaz");

    // the following lines allow overriding the default contraction params through env vars.
    // If the env var is set, we enable a cfg flag and write the value to a file in OUT_DIR.
    // The module where the parameter is used either defines the param with a default value
    // or includes the file created here.
    let out_dir = env::var("OUT_DIR").unwrap();

    for (var, flag) in [
        ("CH_PERIODIC_UPDATES", "override_ch_periodic_updates"),
        ("CH_LAZY_UPDATES", "override_ch_lazy_updates"),
        ("CH_NEIGHBOR_UPDATES", "override_ch_neighbor_updates"),
        ("CH_CONTRACTED_NODES", "override_ch_contracted_nodes"),
    ] {
        if let Ok(val) = env::var(var) {
            let dest_path = Path::new(&out_dir).join(var);
            let mut f = File::create(&dest_path).unwrap();
            f.write_all(val.trim().as_bytes()).unwrap();
            println!("cargo:rustc-cfg={}", flag);
        }
        println!("cargo:rerun-if-env-changed={}", var);
    }
}
