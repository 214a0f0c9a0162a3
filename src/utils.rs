/// Longest payload prefix quoted in a contract-violation diagnostic.
pub const EXCERPT_LEN: usize = 80;

/// First `EXCERPT_LEN` characters of a payload with whitespace runs collapsed
/// to single spaces, so an HTML error page fits on one log line.
pub fn payload_excerpt(payload: &str) -> String {
    let head: String = payload.chars().take(EXCERPT_LEN).collect();
    head.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn pad2(n: u8) -> String {
    format!("{:02}", n)
}

/// Ticket line label: A, B, ..., Z, AA, AB, ... so labels never repeat.
pub fn set_letter(index: usize) -> String {
    let mut label = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Thousands-separated won amount, e.g. `5000` -> `5,000원`.
pub fn format_won(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("{}원", out)
}
