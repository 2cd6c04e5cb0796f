// Compact event counts for narrow terminal cells
pub fn format_count(count: u64) -> String {
    const K: u64 = 1000;
    const M: u64 = 1000 * K;
    const G: u64 = 1000 * M;
    if count >= G {
        format!("{:.2}G", count as f64 / G as f64)
    } else if count >= M {
        format!("{:.2}M", count as f64 / M as f64)
    } else if count >= K {
        format!("{:.2}k", count as f64 / K as f64)
    } else {
        format!("{}", count)
    }
}

pub fn format_share(part: u64, whole: u64) -> String {
    if whole == 0 {
        "-".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / whole as f64)
    }
}
