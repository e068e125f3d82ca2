//! Fuzz testing for request validation.
//!
//! Feeds arbitrary bytes to every function that sees untrusted input before
//! the store does. None of them may panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the validation fuzz target
//! cargo +nightly fuzz run fuzz_validation
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `validate_name`: first/last name validation
//! - `parse_person_id`: path identifier parsing
//! - `CreatePersonRequest`: body decoding followed by validation

#![no_main]

use bungalow::models::CreatePersonRequest;
use bungalow::validation::{parse_person_id, validate_name};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_name(s, "firstName");

        // Accepted ids agree with plain integer parsing
        if let Ok(id) = parse_person_id(s) {
            assert_eq!(s.parse::<i32>().ok(), Some(id));
        }
    }

    if let Ok(request) = serde_json::from_slice::<CreatePersonRequest>(data) {
        let _ = request.into_new_person();
    }
});
