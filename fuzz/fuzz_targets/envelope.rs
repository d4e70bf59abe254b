#![no_main]
use libfuzzer_sys::fuzz_target;
use rdrop_common::{parse_inner_envelope, parse_resend_payload, parse_server_envelope};

fuzz_target!(|data: &[u8]| {
    let Ok(data) = std::str::from_utf8(data) else {
        return;
    };

    let _ = parse_inner_envelope(data);
    let _ = parse_resend_payload(data);
    if let Ok(value) = serde_json::from_str(data) {
        let _ = parse_server_envelope(value);
    }
});
