#![no_main]

use libfuzzer_sys::fuzz_target;

use gpsdo::fuzz::FuzzRxBuffer;

fuzz_target!(|data: &[u8]| {
    let mut rx = FuzzRxBuffer::new();
    for &byte in data {
        rx.push(byte);
        while rx.extract_frame().is_some() {}
    }
});
