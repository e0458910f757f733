//! Identifier and capability token generation

use rand::Rng;
use rand::distributions::Alphanumeric;

const JOB_ID_LEN: usize = 20;
const COMPUTE_CLIENT_ID_LEN: usize = 12;
const PRIVATE_KEY_LEN: usize = 32;

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_job_id() -> String {
    random_token(JOB_ID_LEN)
}

pub fn generate_job_private_key() -> String {
    random_token(PRIVATE_KEY_LEN)
}

pub fn generate_compute_client_id() -> String {
    random_token(COMPUTE_CLIENT_ID_LEN)
}

pub fn generate_compute_client_private_key() -> String {
    random_token(PRIVATE_KEY_LEN)
}
