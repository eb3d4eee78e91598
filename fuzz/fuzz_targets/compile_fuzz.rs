//! Compile fuzz target: feed arbitrary text through lexer, parser and the
//! semantic passes, then project successful results to JSON and back.
//! None of it may panic.
//! Build with: cargo fuzz run compile_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(root) = rpcidl::compile_str("fuzz.idl", s) {
        let schema = rpcidl::ast_to_json(&root);
        let _ = rpcidl::json_to_ast(&schema);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run compile_fuzz");
}
