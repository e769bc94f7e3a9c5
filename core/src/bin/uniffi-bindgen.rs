// Generates Kotlin/Swift bindings in library mode:
// cargo run -p bgmode-core --bin uniffi-bindgen -- generate \
//     --library target/release/libbgmode_mobile.so --language kotlin --out-dir out

fn main() {
    uniffi::uniffi_bindgen_main()
}
