//! Human-referenceable identifiers: `RPT-<base36 millis>-<random>`.

use chrono::Utc;
use rand::Rng;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

fn token(prefix: &str, suffix_len: usize) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!("{prefix}-{}-{}", base36(millis), random_suffix(suffix_len))
}

pub fn report_id() -> String {
    token("RPT", 5)
}

pub fn edit_id() -> String {
    token("EDIT", 3)
}
