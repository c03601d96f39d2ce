use sha3::{Digest, Sha3_256};

pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, digest: &str) -> bool {
    password_digest(password).eq_ignore_ascii_case(digest)
}
