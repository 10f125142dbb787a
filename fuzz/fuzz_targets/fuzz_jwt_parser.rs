#![no_main]

use libfuzzer_sys::fuzz_target;
use modkit_jwt_realm::token;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Header, claims and signature decoding must never panic
        let _ = token::parse(s);
    }
});
