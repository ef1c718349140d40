//! Shared proptest generators.

use proptest::prelude::*;
use std::time::Duration;

/// HTTP methods a gateway forwards.
pub fn http_method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("PATCH".to_string()),
        Just("DELETE".to_string()),
    ]
}

/// Absolute API paths such as `/api/enrollments/42`.
pub fn api_path_strategy() -> impl Strategy<Value = String> {
    "(/[a-z][a-z0-9-]{0,15}){1,4}".prop_map(|p| format!("/api{p}"))
}

/// Arbitrary request bodies, including empty ones.
pub fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

/// Non-empty bodies, for tests that flip a byte.
pub fn non_empty_body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..2048)
}

/// Shared secrets of realistic length.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/=_-]{32,64}"
}

/// Usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._]{2,20}"
}

/// User ids in UUID text form.
pub fn user_id_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| uuid::Uuid::from_u128(n).to_string())
}

/// Role sets drawn from the platform roles.
pub fn roles_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(vec!["STUDENT", "INSTRUCTOR", "ADMIN"], 0..=3)
        .prop_map(|roles| roles.into_iter().map(String::from).collect())
}

/// Epoch seconds between 2020 and 2040.
pub fn epoch_secs_strategy() -> impl Strategy<Value = i64> {
    1_577_836_800i64..2_208_988_800
}

/// Token lifetimes from one second to one week.
pub fn token_ttl_strategy() -> impl Strategy<Value = Duration> {
    (1u64..=604_800).prop_map(Duration::from_secs)
}

/// Replay windows from ten seconds to one hour.
pub fn window_strategy() -> impl Strategy<Value = Duration> {
    (10u64..=3_600).prop_map(Duration::from_secs)
}
