#![no_main]

use libfuzzer_sys::fuzz_target;
use dotsign::blob::{is_valid_public_key, public_parameters, try_parse_key};

fuzz_target!(|data: &[u8]| {
    let _ = is_valid_public_key(data);
    let _ = public_parameters(data);
    if let Some(parsed) = try_parse_key(data) {
        assert!(is_valid_public_key(&parsed.public_key));
    }
});
