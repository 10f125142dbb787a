#![no_main]

use libfuzzer_sys::fuzz_target;
use modkit_jwt_realm::JwkSet;

fuzz_target!(|data: &[u8]| {
    let _ = JwkSet::parse_slice(data);
});
