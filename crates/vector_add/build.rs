fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../vector_add_kernels");

    // the CPU runtime links the kernels crate directly, PTX is only needed for `cuda`
    #[cfg(feature = "cuda")]
    {
        use std::env;
        use std::path;

        use cuda_builder::CudaBuilder;

        let out_path = path::PathBuf::from(env::var("OUT_DIR").unwrap());
        CudaBuilder::new("../vector_add_kernels")
            .copy_to(out_path.join("vector_add_kernels.ptx"))
            .build()
            .unwrap();
    }
}
