//! Decode fuzz target: arbitrary JSON against a fixed schema. Decoding may
//! fail but must not panic, and whatever decodes must encode again.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const SCHEMA: &str = r#"
type Shape = enum { circle { radius: float } point }
type Item = {
  id: uuid
  when: datetime?
  day: date
  price: money
  amount: decimal
  big: bigint
  raw: bytes
  link: url
  code: hex
  shapes: Shape[]
}
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let root = rpcidl::compile_str("fuzz.idl", SCHEMA).expect("schema compiles");
    let codec = rpcidl::Codec::from_schema(rpcidl::ast_to_json(&root));
    if let Ok(decoded) = codec.decode("Item", &value) {
        codec.encode("Item", &decoded).expect("decoded values encode");
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
