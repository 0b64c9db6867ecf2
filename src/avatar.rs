const PALETTE: [&str; 12] = [
    "#FF5733", "#33FF57", "#3357FF", "#FF33A1", "#A1FF33", "#57FF33",
    "#33A1FF", "#FFB533", "#33FFB5", "#B533FF", "#FF336B", "#336BFF",
];

const NEUTRAL: &str = "#ccc";

/// Stable placeholder colour for an avatar without a picture.
pub fn placeholder_color(id: &str) -> &'static str {
    if id.is_empty() {
        return NEUTRAL;
    }
    let hash: u64 = id.encode_utf16().map(u64::from).sum();
    PALETTE[(hash % PALETTE.len() as u64) as usize]
}

/// Uppercased first character of `name`, or empty.
pub fn initial(name: &str) -> String {
    name.trim().chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default()
}
